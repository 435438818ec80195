//! Transaction-aware connection acquisition.

use crate::context::TransactionContext;
use crate::error::{DataAccessError, DataAccessResult};
use std::sync::Arc;
use teller_driver::{
    Connection, ConnectionHandle, ConnectionId, ConnectionPool, DriverResult, Row, Value,
};

/// Hands out connections, preferring the calling thread's bound one.
///
/// This indirection is what makes repository code transaction-agnostic:
/// a repository always leases a connection before work and lets the lease
/// go after, but the effect differs. Inside a transaction the lease is
/// the bound connection and dropping it releases nothing (the manager
/// owns that connection's lifecycle); outside, the lease is a fresh pool
/// connection returned on drop.
#[derive(Debug, Clone)]
pub struct ConnectionProvider {
    pool: Arc<ConnectionPool>,
    context: Arc<TransactionContext>,
}

impl ConnectionProvider {
    /// Creates a provider over a pool and a context.
    #[must_use]
    pub fn new(pool: Arc<ConnectionPool>, context: Arc<TransactionContext>) -> Self {
        Self { pool, context }
    }

    /// Leases a connection for the calling thread.
    ///
    /// # Errors
    ///
    /// Fails with [`DataAccessError::ResourceExhausted`] when no
    /// transaction is active and the pool cannot supply a connection
    /// within its wait budget.
    pub fn get_connection(&self) -> DataAccessResult<ConnectionLease> {
        if let Some(handle) = self.context.bound() {
            tracing::trace!(connection = %handle.id(), "reusing transaction-bound connection");
            return Ok(ConnectionLease { handle, pool: None });
        }
        let handle = self
            .pool
            .acquire()
            .map_err(|source| DataAccessError::ResourceExhausted { source })?;
        tracing::trace!(connection = %handle.id(), "leased pool connection");
        Ok(ConnectionLease {
            handle,
            pool: Some(Arc::clone(&self.pool)),
        })
    }
}

/// A scoped hold on one connection.
///
/// Dropping the lease is the release: a non-transactional lease returns
/// its connection to the pool, a lease on the transaction-bound
/// connection leaves release to the manager. Because release rides on
/// drop glue it runs on every exit path - success, early `?` return, or
/// panic.
#[derive(Debug)]
pub struct ConnectionLease {
    handle: Arc<ConnectionHandle>,
    /// `None` marks a lease on the transaction-bound connection.
    pool: Option<Arc<ConnectionPool>>,
}

impl ConnectionLease {
    /// Identity of the leased connection.
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.handle.id()
    }

    /// True when this lease rides an active transaction's connection.
    #[must_use]
    pub fn is_transactional(&self) -> bool {
        self.pool.is_none()
    }

    /// Runs one non-query statement on the leased connection.
    ///
    /// # Errors
    ///
    /// Propagates the driver's vendor failure untranslated.
    pub fn execute(&self, sql: &str, params: &[Value]) -> DriverResult<u64> {
        let mut conn = self.handle.lock();
        conn.execute(sql, params)
    }

    /// Runs one query statement on the leased connection.
    ///
    /// # Errors
    ///
    /// Propagates the driver's vendor failure untranslated.
    pub fn query(&self, sql: &str, params: &[Value]) -> DriverResult<Vec<Row>> {
        let mut conn = self.handle.lock();
        conn.query(sql, params)
    }
}

impl Drop for ConnectionLease {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.release(Arc::clone(&self.handle));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teller_driver::{MemoryDriver, PoolConfig};

    fn wiring() -> (Arc<ConnectionPool>, Arc<TransactionContext>, ConnectionProvider) {
        let pool = Arc::new(ConnectionPool::new(
            Box::new(MemoryDriver::new()),
            PoolConfig::new().max_size(2),
        ));
        let context = Arc::new(TransactionContext::new());
        let provider = ConnectionProvider::new(Arc::clone(&pool), Arc::clone(&context));
        (pool, context, provider)
    }

    #[test]
    fn lease_without_transaction_comes_from_the_pool() {
        let (pool, _context, provider) = wiring();
        let lease = provider.get_connection().unwrap();
        assert!(!lease.is_transactional());
        assert_eq!(pool.checked_out(), 1);
    }

    #[test]
    fn dropping_a_pool_lease_releases_the_connection() {
        let (pool, _context, provider) = wiring();
        let id = {
            let lease = provider.get_connection().unwrap();
            lease.id()
        };
        assert_eq!(pool.checked_out(), 0);
        // and the same physical connection is idle again
        let lease = provider.get_connection().unwrap();
        assert_eq!(lease.id(), id);
    }

    #[test]
    fn overlapping_leases_without_transaction_are_distinct_connections() {
        let (_pool, _context, provider) = wiring();
        let a = provider.get_connection().unwrap();
        let b = provider.get_connection().unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn lease_inside_transaction_is_the_bound_connection() {
        let (pool, context, provider) = wiring();
        let bound = pool.acquire().unwrap();
        let bound_id = bound.id();
        context.bind(bound);

        let lease = provider.get_connection().unwrap();
        assert!(lease.is_transactional());
        assert_eq!(lease.id(), bound_id);

        // repeated leases on the same thread see the same connection
        let again = provider.get_connection().unwrap();
        assert_eq!(again.id(), bound_id);

        context.unbind();
    }

    #[test]
    fn dropping_a_transactional_lease_does_not_release() {
        let (pool, context, provider) = wiring();
        let bound = pool.acquire().unwrap();
        context.bind(bound);
        assert_eq!(pool.checked_out(), 1);

        drop(provider.get_connection().unwrap());
        // still checked out: the manager owns the bound connection
        assert_eq!(pool.checked_out(), 1);

        pool.release(context.unbind().unwrap());
        assert_eq!(pool.checked_out(), 0);
    }

    #[test]
    fn exhausted_pool_surfaces_resource_exhausted() {
        let pool = Arc::new(ConnectionPool::new(
            Box::new(MemoryDriver::new()),
            PoolConfig::new()
                .max_size(1)
                .acquire_timeout(std::time::Duration::from_millis(10)),
        ));
        let context = Arc::new(TransactionContext::new());
        let provider = ConnectionProvider::new(Arc::clone(&pool), context);

        let _held = provider.get_connection().unwrap();
        let err = provider.get_connection().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ResourceExhausted);
    }
}
