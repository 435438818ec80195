//! Bounded blocking connection pool.

use crate::connection::{Connection, ConnectionId, Driver};
use crate::error::PoolError;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Pool sizing and wait budget.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of physical connections, idle plus checked out.
    pub max_size: usize,
    /// How long `acquire` may block waiting for an idle connection.
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

impl PoolConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum pool size.
    #[must_use]
    pub const fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Sets the acquire wait budget.
    #[must_use]
    pub const fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

/// A pooled physical connection with a stable identity.
///
/// The handle wraps the connection in a mutex so the one physical
/// connection can be shared between a transaction binding and the data
/// access call currently running on it.
pub struct ConnectionHandle {
    id: ConnectionId,
    conn: Mutex<Box<dyn Connection>>,
}

impl ConnectionHandle {
    fn new(conn: Box<dyn Connection>) -> Self {
        Self {
            id: conn.id(),
            conn: Mutex::new(conn),
        }
    }

    /// Returns the identity of the underlying connection.
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Locks the underlying connection for one operation.
    pub fn lock(&self) -> MutexGuard<'_, Box<dyn Connection>> {
        self.conn.lock()
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// A bounded pool over a [`Driver`].
///
/// Connections are opened lazily up to `max_size`. `acquire` pops an idle
/// connection or blocks on a condition variable until one is released,
/// failing with [`PoolError::Exhausted`] when the wait budget runs out.
/// A handle checked out by one caller is never handed to another until it
/// is released.
pub struct ConnectionPool {
    driver: Box<dyn Driver>,
    config: PoolConfig,
    inner: Mutex<PoolInner>,
    available: Condvar,
}

#[derive(Debug)]
struct PoolInner {
    idle: Vec<Arc<ConnectionHandle>>,
    /// Idle plus checked-out connections.
    total: usize,
    closed: bool,
}

impl ConnectionPool {
    /// Creates a pool over `driver`.
    #[must_use]
    pub fn new(driver: Box<dyn Driver>, config: PoolConfig) -> Self {
        Self {
            driver,
            config,
            inner: Mutex::new(PoolInner {
                idle: Vec::new(),
                total: 0,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Checks a connection out, waiting up to the configured budget.
    ///
    /// # Errors
    ///
    /// [`PoolError::Exhausted`] when no connection frees up in time,
    /// [`PoolError::Connect`] when opening a new connection fails, and
    /// [`PoolError::Closed`] after [`ConnectionPool::close`].
    pub fn acquire(&self) -> Result<Arc<ConnectionHandle>, PoolError> {
        self.acquire_within(self.config.acquire_timeout)
    }

    /// Checks a connection out with an explicit wait budget.
    ///
    /// # Errors
    ///
    /// Same as [`ConnectionPool::acquire`].
    pub fn acquire_within(&self, timeout: Duration) -> Result<Arc<ConnectionHandle>, PoolError> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        loop {
            if inner.closed {
                return Err(PoolError::Closed);
            }
            if let Some(handle) = inner.idle.pop() {
                return Ok(handle);
            }
            if inner.total < self.config.max_size {
                return self.open_connection(inner);
            }
            if self.available.wait_until(&mut inner, deadline).timed_out() {
                // a release may have raced the timeout; check once more
                if let Some(handle) = inner.idle.pop() {
                    return Ok(handle);
                }
                return Err(PoolError::Exhausted {
                    waited: timeout,
                    capacity: self.config.max_size,
                });
            }
        }
    }

    /// Opens a fresh connection outside the lock so a slow connect does
    /// not stall releases.
    fn open_connection(
        &self,
        mut inner: MutexGuard<'_, PoolInner>,
    ) -> Result<Arc<ConnectionHandle>, PoolError> {
        inner.total += 1;
        drop(inner);
        match self.driver.connect() {
            Ok(conn) => Ok(Arc::new(ConnectionHandle::new(conn))),
            Err(err) => {
                self.inner.lock().total -= 1;
                // capacity freed; a blocked acquire may now open its own
                self.available.notify_one();
                Err(PoolError::Connect(err))
            }
        }
    }

    /// Returns a checked-out connection to the idle set and wakes one
    /// waiter. Callers must not retain usable clones of the handle.
    pub fn release(&self, handle: Arc<ConnectionHandle>) {
        let mut inner = self.inner.lock();
        if inner.closed {
            inner.total -= 1;
            return;
        }
        inner.idle.push(handle);
        drop(inner);
        self.available.notify_one();
    }

    /// Closes the pool: drops idle connections and makes every further
    /// acquire fail. Checked-out connections are dropped as they return.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        let idle = inner.idle.len();
        inner.total -= idle;
        inner.idle.clear();
        drop(inner);
        self.available.notify_all();
    }

    /// Number of idle connections right now.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.inner.lock().idle.len()
    }

    /// Number of connections currently checked out.
    #[must_use]
    pub fn checked_out(&self) -> usize {
        let inner = self.inner.lock();
        inner.total - inner.idle.len()
    }

    /// The configured maximum size.
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.config.max_size
    }
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("max_size", &self.config.max_size)
            .field("idle", &self.idle_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDriver;
    use std::thread;

    fn pool_of(max_size: usize, timeout_ms: u64) -> ConnectionPool {
        ConnectionPool::new(
            Box::new(MemoryDriver::new()),
            PoolConfig::new()
                .max_size(max_size)
                .acquire_timeout(Duration::from_millis(timeout_ms)),
        )
    }

    #[test]
    fn connections_open_lazily() {
        let pool = pool_of(2, 10);
        assert_eq!(pool.idle_count(), 0);
        let a = pool.acquire().unwrap();
        assert_eq!(pool.checked_out(), 1);
        pool.release(a);
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(pool.checked_out(), 0);
    }

    #[test]
    fn released_connection_is_reused() {
        let pool = pool_of(2, 10);
        let a = pool.acquire().unwrap();
        let id = a.id();
        pool.release(a);
        let b = pool.acquire().unwrap();
        assert_eq!(b.id(), id);
    }

    #[test]
    fn concurrent_acquires_get_distinct_connections() {
        let pool = pool_of(2, 10);
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn exhausted_pool_times_out() {
        let pool = pool_of(1, 20);
        let _held = pool.acquire().unwrap();
        let err = pool.acquire().unwrap_err();
        assert!(matches!(err, PoolError::Exhausted { capacity: 1, .. }));
    }

    #[test]
    fn blocked_acquire_wakes_on_release() {
        let pool = Arc::new(pool_of(1, 2_000));
        let held = pool.acquire().unwrap();
        let held_id = held.id();

        let waiter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.acquire().map(|h| h.id()))
        };

        // give the waiter time to block, then free the connection
        thread::sleep(Duration::from_millis(50));
        pool.release(held);

        let woken_id = waiter.join().unwrap().unwrap();
        assert_eq!(woken_id, held_id);
    }

    #[test]
    fn closed_pool_rejects_acquire() {
        let pool = pool_of(1, 10);
        pool.close();
        assert!(matches!(pool.acquire(), Err(PoolError::Closed)));
    }

    #[test]
    fn release_into_closed_pool_drops_connection() {
        let pool = pool_of(1, 10);
        let a = pool.acquire().unwrap();
        pool.close();
        pool.release(a);
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(pool.checked_out(), 0);
    }
}
