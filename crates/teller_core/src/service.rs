//! Money-transfer orchestration.

use crate::error::{DataAccessError, DataAccessResult, ErrorKind};
use crate::manager::{TransactionDefinition, TransactionManager};
use crate::member::Member;
use crate::repository::MemberRepository;
use rand::Rng;

/// Business-rule configuration for [`TransferService`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Payee id that always fails validation mid-transfer.
    pub blocked_payee: String,
    /// Retry `register` once with a regenerated id on a duplicate key.
    pub retry_on_duplicate_key: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            blocked_payee: "ex".to_owned(),
            retry_on_duplicate_key: true,
        }
    }
}

/// Orchestrates multi-statement business operations over one transaction.
///
/// The service decides what constitutes a business-rule failure; the
/// repository underneath stays transaction-agnostic and the manager owns
/// the commit/rollback decision through
/// [`TransactionManager::execute`].
#[derive(Debug)]
pub struct TransferService {
    manager: TransactionManager,
    repository: MemberRepository,
    config: ServiceConfig,
}

impl TransferService {
    /// Creates a service with the default configuration.
    #[must_use]
    pub fn new(manager: TransactionManager, repository: MemberRepository) -> Self {
        Self::with_config(manager, repository, ServiceConfig::default())
    }

    /// Creates a service with an explicit configuration.
    #[must_use]
    pub fn with_config(
        manager: TransactionManager,
        repository: MemberRepository,
        config: ServiceConfig,
    ) -> Self {
        Self {
            manager,
            repository,
            config,
        }
    }

    /// Moves `amount` from one member to another as one atomic unit.
    ///
    /// The payer is debited before the payee is validated, and the payee
    /// credited only after validation passes; a validation failure after
    /// the debit therefore exercises the rollback path, which is the
    /// observable property the transaction layer exists for.
    ///
    /// # Errors
    ///
    /// Every failure - missing member, validation rejection, translated
    /// data error, commit failure - surfaces as
    /// [`DataAccessError::BusinessOperationFailed`]; the original cause
    /// is attached unless the failure *is* the business rejection.
    pub fn transfer(&self, from_id: &str, to_id: &str, amount: i64) -> DataAccessResult<()> {
        tracing::debug!(from_id, to_id, amount, "account transfer requested");
        self.manager
            .execute(&TransactionDefinition::new(), || {
                self.transfer_inner(from_id, to_id, amount)
            })
            .map_err(wrap_business)
    }

    fn transfer_inner(&self, from_id: &str, to_id: &str, amount: i64) -> DataAccessResult<()> {
        let from = self.repository.find_by_id(from_id)?;
        let to = self.repository.find_by_id(to_id)?;

        self.repository.update(from_id, from.money() - amount)?;
        self.validate(&to)?;
        self.repository.update(to_id, to.money() + amount)?;
        Ok(())
    }

    fn validate(&self, payee: &Member) -> DataAccessResult<()> {
        if payee.member_id() == self.config.blocked_payee {
            return Err(DataAccessError::business(format!(
                "transfer to {} rejected",
                payee.member_id()
            )));
        }
        Ok(())
    }

    /// Creates a member outside any transaction.
    ///
    /// A duplicate id is the one recoverable failure: when the retry
    /// policy is enabled the service regenerates the id once and saves
    /// again, returning the member actually stored.
    ///
    /// # Errors
    ///
    /// Propagates repository failures; with retry disabled that includes
    /// [`DataAccessError::DuplicateKey`].
    pub fn register(&self, member_id: &str, money: i64) -> DataAccessResult<Member> {
        let member = Member::new(member_id, money);
        match self.repository.save(&member) {
            Ok(()) => Ok(member),
            Err(err)
                if err.kind() == ErrorKind::DuplicateKey && self.config.retry_on_duplicate_key =>
            {
                let retry_id = regenerate_id(member_id);
                tracing::debug!(member_id, retry_id = %retry_id, "duplicate key, retrying");
                let retry = Member::new(retry_id, money);
                self.repository.save(&retry)?;
                Ok(retry)
            }
            Err(err) => Err(err),
        }
    }
}

fn regenerate_id(member_id: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("{member_id}-{suffix}")
}

fn wrap_business(err: DataAccessError) -> DataAccessError {
    match err {
        err @ DataAccessError::BusinessOperationFailed { .. } => err,
        other => DataAccessError::BusinessOperationFailed {
            message: "account transfer failed".to_owned(),
            source: Some(Box::new(other)),
        },
    }
}
