//! Vendor failure signal and pool errors.

use std::time::Duration;
use thiserror::Error;

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// A vendor-specific failure raised by a driver.
///
/// Carries the backend's integer error code. Code values are not portable
/// across backends; callers that need a stable classification must map
/// codes through a translation table instead of matching on them directly.
#[derive(Debug, Clone, Error)]
#[error("vendor error [{code}]: {message}")]
pub struct DriverError {
    code: i32,
    message: String,
}

impl DriverError {
    /// Creates a vendor failure with the given code and message.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Returns the backend-specific error code.
    #[must_use]
    pub fn code(&self) -> i32 {
        self.code
    }

    /// Returns the human-readable failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors that can occur when checking connections out of the pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// No idle connection became available within the wait budget.
    #[error("connection pool exhausted after waiting {waited:?} (capacity {capacity})")]
    Exhausted {
        /// How long the caller waited before giving up.
        waited: Duration,
        /// The pool's configured maximum size.
        capacity: usize,
    },

    /// Opening a brand-new physical connection failed.
    #[error("failed to open connection: {0}")]
    Connect(#[source] DriverError),

    /// The pool has been shut down.
    #[error("connection pool is closed")]
    Closed,
}

/// H2-flavored vendor error codes emitted by the bundled memory engine.
///
/// Constant names follow the backend's own naming so a code seen in a log
/// can be looked up verbatim.
pub mod codes {
    /// Unique index or primary key violation.
    pub const DUPLICATE_KEY_1: i32 = 23505;
    /// General syntax error in a statement.
    pub const SYNTAX_ERROR_2: i32 = 42001;
    /// Table or view not found.
    pub const TABLE_OR_VIEW_NOT_FOUND_1: i32 = 42102;
    /// Column not found.
    pub const COLUMN_NOT_FOUND_1: i32 = 42122;
    /// Value too long for a column.
    pub const VALUE_TOO_LONG_2: i32 = 22001;
    /// Numeric value out of range.
    pub const NUMERIC_VALUE_OUT_OF_RANGE_1: i32 = 22003;
    /// Parameter could not be converted to the column type.
    pub const DATA_CONVERSION_ERROR_1: i32 = 22018;
    /// NULL written to a NOT NULL column.
    pub const NULL_NOT_ALLOWED: i32 = 23502;
    /// A statement parameter was left unbound.
    pub const PARAMETER_NOT_SET_1: i32 = 90012;
    /// Update statement issued through the query entry point or vice versa.
    pub const METHOD_NOT_ALLOWED_FOR_QUERY: i32 = 90001;
    /// Connection broken.
    pub const CONNECTION_BROKEN_1: i32 = 90067;
    /// Database already closed.
    pub const DATABASE_IS_CLOSED: i32 = 90098;
}
