//! Vendor-code translation.

use crate::error::{DataAccessError, ErrorKind};
use std::collections::HashMap;
use teller_driver::{codes, DriverError};

/// Maps backend-specific vendor codes onto the portable [`ErrorKind`]
/// taxonomy.
///
/// The table is data, not logic: a backend is described by the code →
/// kind pairs it emits, and supporting another backend means supplying
/// another table. Codes with no entry fall back to [`ErrorKind::Unknown`].
#[derive(Debug, Clone)]
pub struct ErrorCodeTable {
    backend: String,
    entries: HashMap<i32, ErrorKind>,
}

impl ErrorCodeTable {
    /// Creates an empty table for the named backend.
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            entries: HashMap::new(),
        }
    }

    /// Adds one code → kind entry.
    #[must_use]
    pub fn with(mut self, code: i32, kind: ErrorKind) -> Self {
        self.entries.insert(code, kind);
        self
    }

    /// The H2-flavored table matching the bundled memory engine.
    #[must_use]
    pub fn h2() -> Self {
        Self::new("h2")
            .with(codes::DUPLICATE_KEY_1, ErrorKind::DuplicateKey)
            .with(42000, ErrorKind::BadStatement)
            .with(codes::SYNTAX_ERROR_2, ErrorKind::BadStatement)
            .with(42101, ErrorKind::BadStatement)
            .with(codes::TABLE_OR_VIEW_NOT_FOUND_1, ErrorKind::BadStatement)
            .with(codes::COLUMN_NOT_FOUND_1, ErrorKind::BadStatement)
            .with(codes::VALUE_TOO_LONG_2, ErrorKind::DataIntegrityViolation)
            .with(
                codes::NUMERIC_VALUE_OUT_OF_RANGE_1,
                ErrorKind::DataIntegrityViolation,
            )
            .with(
                codes::DATA_CONVERSION_ERROR_1,
                ErrorKind::DataIntegrityViolation,
            )
            .with(codes::NULL_NOT_ALLOWED, ErrorKind::DataIntegrityViolation)
            .with(codes::PARAMETER_NOT_SET_1, ErrorKind::BadStatement)
            .with(8000, ErrorKind::TransientConnection)
            .with(8001, ErrorKind::TransientConnection)
            .with(8003, ErrorKind::TransientConnection)
            .with(8004, ErrorKind::TransientConnection)
            .with(codes::CONNECTION_BROKEN_1, ErrorKind::TransientConnection)
            .with(codes::DATABASE_IS_CLOSED, ErrorKind::TransientConnection)
    }

    /// The backend this table describes.
    #[must_use]
    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Classifies a vendor code, defaulting to [`ErrorKind::Unknown`].
    #[must_use]
    pub fn classify(&self, code: i32) -> ErrorKind {
        self.entries.get(&code).copied().unwrap_or(ErrorKind::Unknown)
    }
}

impl Default for ErrorCodeTable {
    fn default() -> Self {
        Self::h2()
    }
}

/// Translates vendor failures into [`DataAccessError`]s.
#[derive(Debug, Clone, Default)]
pub struct ExceptionTranslator {
    table: ErrorCodeTable,
}

impl ExceptionTranslator {
    /// Creates a translator over the given code table.
    #[must_use]
    pub fn new(table: ErrorCodeTable) -> Self {
        Self { table }
    }

    /// Translates one vendor failure.
    ///
    /// `operation` names the data-access call for diagnostics; `sql` is
    /// the statement text, carried for diagnostics only and never used
    /// for classification.
    #[must_use]
    pub fn translate(&self, operation: &str, sql: &str, source: DriverError) -> DataAccessError {
        let vendor_code = source.code();
        let kind = self.table.classify(vendor_code);
        tracing::debug!(
            backend = self.table.backend(),
            operation,
            vendor_code,
            ?kind,
            "translating vendor failure"
        );
        let operation = operation.to_owned();
        let sql = sql.to_owned();
        match kind {
            ErrorKind::DuplicateKey => DataAccessError::DuplicateKey {
                operation,
                sql,
                vendor_code,
                source,
            },
            ErrorKind::BadStatement => DataAccessError::BadStatement {
                operation,
                sql,
                vendor_code,
                source,
            },
            ErrorKind::DataIntegrityViolation => DataAccessError::DataIntegrityViolation {
                operation,
                sql,
                vendor_code,
                source,
            },
            ErrorKind::TransientConnection => DataAccessError::TransientConnection {
                operation,
                sql,
                vendor_code,
                source,
            },
            // tables may only classify into the vendor-translated kinds;
            // anything else degrades to Unknown
            _ => DataAccessError::Unknown {
                operation,
                sql,
                vendor_code,
                source,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translate(code: i32) -> DataAccessError {
        ExceptionTranslator::default().translate(
            "save",
            "insert into member(member_id, money) values(?, ?)",
            DriverError::new(code, "boom"),
        )
    }

    #[test]
    fn duplicate_key_code_translates_to_duplicate_key() {
        let err = translate(23505);
        assert_eq!(err.kind(), ErrorKind::DuplicateKey);
        assert_eq!(err.vendor_code(), Some(23505));
    }

    #[test]
    fn unmapped_code_translates_to_unknown() {
        let err = translate(99999);
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(err.vendor_code(), Some(99999));
    }

    #[test]
    fn syntax_family_translates_to_bad_statement() {
        for code in [42000, 42001, 42101, 42102, 42122] {
            assert_eq!(translate(code).kind(), ErrorKind::BadStatement, "{code}");
        }
    }

    #[test]
    fn integrity_family_translates_to_integrity_violation() {
        for code in [22001, 22003, 22018, 23502] {
            assert_eq!(
                translate(code).kind(),
                ErrorKind::DataIntegrityViolation,
                "{code}"
            );
        }
    }

    #[test]
    fn connection_family_translates_to_transient() {
        for code in [8000, 8001, 90067, 90098] {
            assert_eq!(
                translate(code).kind(),
                ErrorKind::TransientConnection,
                "{code}"
            );
        }
    }

    #[test]
    fn custom_table_overrides_classification() {
        let table = ErrorCodeTable::new("other-db").with(1062, ErrorKind::DuplicateKey);
        let translator = ExceptionTranslator::new(table);

        let err = translator.translate("save", "insert ...", DriverError::new(1062, "dup"));
        assert_eq!(err.kind(), ErrorKind::DuplicateKey);

        // the h2 code means nothing to this backend
        let err = translator.translate("save", "insert ...", DriverError::new(23505, "dup"));
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }

    #[test]
    fn non_translated_kind_in_table_degrades_to_unknown() {
        let table = ErrorCodeTable::new("weird").with(1, ErrorKind::NotFound);
        let err = ExceptionTranslator::new(table).translate("op", "sql", DriverError::new(1, "x"));
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }
}
