//! Driver-facing connection traits.

use crate::error::DriverResult;
use crate::value::{Row, Value};
use std::fmt;

/// Process-unique identity of a physical connection.
///
/// Callers use this to assert "same connection" (transaction reuse)
/// without needing access to the connection object itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates an id from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Transaction isolation level, passed through to the backend.
///
/// The bundled memory engine accepts and ignores these; real backends
/// map them onto their own modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    /// Statements see only committed data.
    ReadCommitted,
    /// Reads repeat within the transaction.
    RepeatableRead,
    /// Full serializable execution.
    Serializable,
}

/// A single physical connection to a relational backend.
///
/// # Invariants
///
/// - `execute`/`query` run exactly one parameterized statement
/// - With autocommit on (the initial state), every statement is durable
///   when the call returns
/// - With autocommit off, effects stage until `commit`; `rollback`
///   discards them
/// - Implementations must be `Send` so connections can move between
///   threads through the pool
pub trait Connection: Send {
    /// Returns this connection's process-unique id.
    fn id(&self) -> ConnectionId;

    /// Runs one non-query statement and returns the affected row count.
    ///
    /// # Errors
    ///
    /// Returns a vendor failure if the statement cannot be parsed,
    /// violates a constraint, or the connection is unusable.
    fn execute(&mut self, sql: &str, params: &[Value]) -> DriverResult<u64>;

    /// Runs one query statement and returns all matching rows.
    ///
    /// # Errors
    ///
    /// Returns a vendor failure if the statement cannot be parsed or the
    /// connection is unusable.
    fn query(&mut self, sql: &str, params: &[Value]) -> DriverResult<Vec<Row>>;

    /// Switches autocommit mode.
    ///
    /// Turning autocommit back on while writes are staged commits them,
    /// matching the usual driver contract.
    ///
    /// # Errors
    ///
    /// Returns a vendor failure if the connection is unusable.
    fn set_auto_commit(&mut self, auto_commit: bool) -> DriverResult<()>;

    /// Returns the current autocommit flag.
    fn auto_commit(&self) -> bool;

    /// Sets the isolation level for subsequent transactions.
    ///
    /// # Errors
    ///
    /// Returns a vendor failure if the connection is unusable.
    fn set_isolation(&mut self, level: IsolationLevel) -> DriverResult<()>;

    /// Makes all staged writes durable.
    ///
    /// # Errors
    ///
    /// Returns a vendor failure if the commit cannot be performed.
    fn commit(&mut self) -> DriverResult<()>;

    /// Discards all staged writes.
    ///
    /// # Errors
    ///
    /// Returns a vendor failure if the connection is unusable.
    fn rollback(&mut self) -> DriverResult<()>;
}

/// A factory for physical connections.
pub trait Driver: Send + Sync {
    /// Opens a new physical connection.
    ///
    /// # Errors
    ///
    /// Returns a vendor failure if the backend refuses the connection.
    fn connect(&self) -> DriverResult<Box<dyn Connection>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
    }

    #[test]
    fn connection_id_ordering() {
        assert!(ConnectionId::new(1) < ConnectionId::new(2));
        assert_eq!(ConnectionId::new(3), ConnectionId::new(3));
    }
}
