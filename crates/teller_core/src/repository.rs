//! Member persistence over provider-supplied connections.

use crate::error::{DataAccessError, DataAccessResult};
use crate::member::Member;
use crate::provider::ConnectionProvider;
use crate::translate::ExceptionTranslator;
use teller_driver::Value;

/// Data access for the `member` table.
///
/// Every operation leases a connection from the provider for exactly one
/// parameterized statement and never commits or rolls back itself:
/// whether a statement joins a transaction is decided entirely by the
/// lease. Vendor failures are translated into the portable taxonomy
/// before they propagate.
#[derive(Debug, Clone)]
pub struct MemberRepository {
    provider: ConnectionProvider,
    translator: ExceptionTranslator,
}

impl MemberRepository {
    /// Creates a repository over a provider, translating vendor failures
    /// through `translator`.
    #[must_use]
    pub fn new(provider: ConnectionProvider, translator: ExceptionTranslator) -> Self {
        Self {
            provider,
            translator,
        }
    }

    /// Inserts a new member row.
    ///
    /// # Errors
    ///
    /// Fails with [`DataAccessError::DuplicateKey`] when the id is
    /// already taken, or another translated kind on other vendor
    /// failures.
    pub fn save(&self, member: &Member) -> DataAccessResult<()> {
        let sql = "insert into member(member_id, money) values(?, ?)";
        let lease = self.provider.get_connection()?;
        let rows = lease
            .execute(
                sql,
                &[
                    Value::from(member.member_id()),
                    Value::from(member.money()),
                ],
            )
            .map_err(|e| self.translator.translate("save", sql, e))?;
        tracing::debug!(rows, member_id = member.member_id(), "member saved");
        Ok(())
    }

    /// Loads a member by primary key.
    ///
    /// # Errors
    ///
    /// Fails with [`DataAccessError::NotFound`] when no row matches;
    /// vendor failures are translated.
    pub fn find_by_id(&self, member_id: &str) -> DataAccessResult<Member> {
        let sql = "select * from member where member_id = ?";
        let lease = self.provider.get_connection()?;
        let rows = lease
            .query(sql, &[Value::from(member_id)])
            .map_err(|e| self.translator.translate("find_by_id", sql, e))?;
        let Some(row) = rows.first() else {
            return Err(DataAccessError::NotFound {
                member_id: member_id.to_owned(),
            });
        };
        let id = row
            .text("member_id")
            .map_err(|e| self.translator.translate("find_by_id", sql, e))?;
        let money = row
            .int("money")
            .map_err(|e| self.translator.translate("find_by_id", sql, e))?;
        Ok(Member::new(id, money))
    }

    /// Overwrites a member's balance.
    ///
    /// # Errors
    ///
    /// Vendor failures are translated. A missing row is not an error
    /// here; it shows up as an affected-row count of zero in the log.
    pub fn update(&self, member_id: &str, money: i64) -> DataAccessResult<()> {
        let sql = "update member set money = ? where member_id = ?";
        let lease = self.provider.get_connection()?;
        let rows = lease
            .execute(sql, &[Value::from(money), Value::from(member_id)])
            .map_err(|e| self.translator.translate("update", sql, e))?;
        tracing::debug!(rows, member_id, money, "member updated");
        Ok(())
    }

    /// Removes a member row.
    ///
    /// # Errors
    ///
    /// Vendor failures are translated.
    pub fn delete(&self, member_id: &str) -> DataAccessResult<()> {
        let sql = "delete from member where member_id = ?";
        let lease = self.provider.get_connection()?;
        let rows = lease
            .execute(sql, &[Value::from(member_id)])
            .map_err(|e| self.translator.translate("delete", sql, e))?;
        tracing::debug!(rows, member_id, "member deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TransactionContext;
    use crate::error::ErrorKind;
    use std::sync::Arc;
    use teller_driver::{ConnectionPool, MemoryDriver, PoolConfig};

    fn repository() -> (Arc<MemoryDriver>, MemberRepository) {
        let driver = Arc::new(MemoryDriver::new());
        let pool = Arc::new(ConnectionPool::new(
            Box::new(Arc::clone(&driver)),
            PoolConfig::new().max_size(2),
        ));
        let context = Arc::new(TransactionContext::new());
        let provider = ConnectionProvider::new(pool, context);
        (
            driver,
            MemberRepository::new(provider, ExceptionTranslator::default()),
        )
    }

    #[test]
    fn crud_round_trip() {
        let (_driver, repository) = repository();
        let member = Member::new("memberV0", 10_000);

        repository.save(&member).unwrap();
        let found = repository.find_by_id("memberV0").unwrap();
        assert_eq!(found, member);

        repository.update("memberV0", 20_000).unwrap();
        let updated = repository.find_by_id("memberV0").unwrap();
        assert_eq!(updated.money(), 20_000);

        repository.delete("memberV0").unwrap();
        let err = repository.find_by_id("memberV0").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn find_by_id_on_absent_key_is_not_found() {
        let (_driver, repository) = repository();
        let err = repository.find_by_id("nobody").unwrap_err();
        match err {
            DataAccessError::NotFound { member_id } => assert_eq!(member_id, "nobody"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn second_save_of_same_key_is_duplicate_key() {
        let (driver, repository) = repository();
        let member = Member::new("memberA", 10_000);

        repository.save(&member).unwrap();
        let err = repository.save(&member).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateKey);
        assert_eq!(err.vendor_code(), Some(23505));

        // exactly one row remains for the key
        assert_eq!(driver.snapshot(), vec![("memberA".to_owned(), 10_000)]);
    }

    #[test]
    fn overlong_id_is_a_data_integrity_violation() {
        let (_driver, repository) = repository();
        let member = Member::new("x".repeat(300), 0);
        let err = repository.save(&member).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataIntegrityViolation);
    }

    #[test]
    fn update_of_missing_row_is_not_an_error() {
        let (_driver, repository) = repository();
        repository.update("missing", 1_000).unwrap();
    }
}
