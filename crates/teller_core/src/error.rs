//! Portable data-access error taxonomy.

use teller_driver::{DriverError, PoolError};
use thiserror::Error;

/// Result type for data-access operations.
pub type DataAccessResult<T> = Result<T, DataAccessError>;

/// Classification of a data-access failure, independent of backend.
///
/// `DuplicateKey` is the one recoverable kind: callers may catch it and
/// retry with a different key. Everything else is treated as
/// non-recoverable above the repository layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No pool connection became available within the wait budget.
    ResourceExhausted,
    /// A transaction could not be started.
    TransactionStartFailure,
    /// A transaction could not be committed, or a terminal operation was
    /// misused.
    CommitFailure,
    /// A lookup matched no row.
    NotFound,
    /// A unique key was violated.
    DuplicateKey,
    /// The statement itself was malformed.
    BadStatement,
    /// A constraint other than uniqueness was violated.
    DataIntegrityViolation,
    /// The connection to the backend failed; retrying later may succeed.
    TransientConnection,
    /// A vendor failure with no table entry.
    Unknown,
    /// A business operation failed as a whole.
    BusinessOperationFailed,
}

/// Errors surfaced by the data-access layers.
///
/// Repositories only translate vendor codes into these and propagate;
/// the transaction manager wraps its own lifecycle failures; the service
/// layer wraps everything it cannot recover into
/// `BusinessOperationFailed`.
#[derive(Debug, Error)]
pub enum DataAccessError {
    /// No pool connection became available within the wait budget.
    #[error("no connection available: {source}")]
    ResourceExhausted {
        /// The pool failure.
        #[source]
        source: PoolError,
    },

    /// Beginning a transaction failed before any work ran.
    #[error("could not start transaction: {source}")]
    TransactionStartFailure {
        /// What went wrong while setting the transaction up.
        #[source]
        source: Box<DataAccessError>,
    },

    /// Committing failed, or a terminal operation was misused.
    #[error("commit failed: {message}")]
    CommitFailure {
        /// What went wrong.
        message: String,
        /// The vendor failure, when the backend rejected the commit.
        #[source]
        source: Option<DriverError>,
    },

    /// A lookup matched no row.
    #[error("member not found: member_id={member_id}")]
    NotFound {
        /// The key that was looked up.
        member_id: String,
    },

    /// A unique key was violated.
    #[error("duplicate key during {operation} [vendor code {vendor_code}] executing `{sql}`")]
    DuplicateKey {
        /// The repository operation that failed.
        operation: String,
        /// The statement text, for diagnostics only.
        sql: String,
        /// The backend's error code.
        vendor_code: i32,
        /// The vendor failure.
        #[source]
        source: DriverError,
    },

    /// The statement itself was malformed.
    #[error("bad statement during {operation} [vendor code {vendor_code}] executing `{sql}`")]
    BadStatement {
        /// The repository operation that failed.
        operation: String,
        /// The statement text, for diagnostics only.
        sql: String,
        /// The backend's error code.
        vendor_code: i32,
        /// The vendor failure.
        #[source]
        source: DriverError,
    },

    /// A constraint other than uniqueness was violated.
    #[error(
        "data integrity violation during {operation} [vendor code {vendor_code}] executing `{sql}`"
    )]
    DataIntegrityViolation {
        /// The repository operation that failed.
        operation: String,
        /// The statement text, for diagnostics only.
        sql: String,
        /// The backend's error code.
        vendor_code: i32,
        /// The vendor failure.
        #[source]
        source: DriverError,
    },

    /// The connection to the backend failed mid-operation.
    #[error(
        "transient connection failure during {operation} [vendor code {vendor_code}] executing `{sql}`"
    )]
    TransientConnection {
        /// The repository operation that failed.
        operation: String,
        /// The statement text, for diagnostics only.
        sql: String,
        /// The backend's error code.
        vendor_code: i32,
        /// The vendor failure.
        #[source]
        source: DriverError,
    },

    /// A vendor failure with no translation table entry.
    #[error("unclassified failure during {operation} [vendor code {vendor_code}] executing `{sql}`")]
    Unknown {
        /// The repository operation that failed.
        operation: String,
        /// The statement text, for diagnostics only.
        sql: String,
        /// The backend's error code.
        vendor_code: i32,
        /// The vendor failure.
        #[source]
        source: DriverError,
    },

    /// A business operation failed as a whole.
    #[error("business operation failed: {message}")]
    BusinessOperationFailed {
        /// What the operation was doing.
        message: String,
        /// The underlying data-access failure, when one caused this.
        #[source]
        source: Option<Box<DataAccessError>>,
    },
}

impl DataAccessError {
    /// Returns this error's place in the taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ResourceExhausted { .. } => ErrorKind::ResourceExhausted,
            Self::TransactionStartFailure { .. } => ErrorKind::TransactionStartFailure,
            Self::CommitFailure { .. } => ErrorKind::CommitFailure,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            Self::BadStatement { .. } => ErrorKind::BadStatement,
            Self::DataIntegrityViolation { .. } => ErrorKind::DataIntegrityViolation,
            Self::TransientConnection { .. } => ErrorKind::TransientConnection,
            Self::Unknown { .. } => ErrorKind::Unknown,
            Self::BusinessOperationFailed { .. } => ErrorKind::BusinessOperationFailed,
        }
    }

    /// Returns the vendor code this error carries, if any.
    #[must_use]
    pub fn vendor_code(&self) -> Option<i32> {
        match self {
            Self::DuplicateKey { vendor_code, .. }
            | Self::BadStatement { vendor_code, .. }
            | Self::DataIntegrityViolation { vendor_code, .. }
            | Self::TransientConnection { vendor_code, .. }
            | Self::Unknown { vendor_code, .. } => Some(*vendor_code),
            _ => None,
        }
    }

    /// Returns the cause of a business failure, if one was recorded.
    #[must_use]
    pub fn business_cause(&self) -> Option<&DataAccessError> {
        match self {
            Self::BusinessOperationFailed { source, .. } => source.as_deref(),
            _ => None,
        }
    }

    /// Creates a business failure with no data-access cause (a rule
    /// rejection rather than an infrastructure fault).
    pub fn business(message: impl Into<String>) -> Self {
        Self::BusinessOperationFailed {
            message: message.into(),
            source: None,
        }
    }
}
