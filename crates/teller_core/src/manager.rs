//! Transaction lifecycle management.

use crate::context::TransactionContext;
use crate::error::{DataAccessError, DataAccessResult};
use crate::translate::ExceptionTranslator;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use teller_driver::{
    Connection, ConnectionHandle, ConnectionId, ConnectionPool, DriverResult, IsolationLevel,
};

/// Policy for a begin request while a transaction is already active on
/// the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    /// Join the active transaction if there is one, else start fresh.
    #[default]
    Required,
}

/// Per-transaction configuration.
#[derive(Debug, Clone, Default)]
pub struct TransactionDefinition {
    /// How to relate to a transaction already active on the thread.
    pub propagation: Propagation,
    /// Isolation level passed through to the connection, if set.
    pub isolation: Option<IsolationLevel>,
}

impl TransactionDefinition {
    /// Creates a definition with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the isolation level.
    #[must_use]
    pub const fn isolation(mut self, level: IsolationLevel) -> Self {
        self.isolation = Some(level);
        self
    }

    /// Sets the propagation policy.
    #[must_use]
    pub const fn propagation(mut self, propagation: Propagation) -> Self {
        self.propagation = propagation;
        self
    }
}

/// Outcome token for one logical transaction.
///
/// Returned by [`TransactionManager::begin`] and consumed by exactly one
/// terminal operation: commit strictly errors on a second use, rollback
/// of an already-completed status is a logged no-op. Dropping a
/// never-terminated status is a bug in the caller and is logged loudly.
#[derive(Debug)]
pub struct TransactionStatus {
    unit: ThreadId,
    connection_id: ConnectionId,
    new_transaction: bool,
    completed: bool,
}

impl TransactionStatus {
    /// True when this status opened the transaction (rather than joining
    /// one already active on the thread).
    #[must_use]
    pub fn is_new_transaction(&self) -> bool {
        self.new_transaction
    }

    /// Identity of the transaction's connection.
    #[must_use]
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// True once a terminal operation has consumed this status.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

impl Drop for TransactionStatus {
    fn drop(&mut self) {
        if !self.completed && self.new_transaction {
            tracing::warn!(
                connection = %self.connection_id,
                "transaction status dropped without commit or rollback"
            );
        }
    }
}

/// Begins, commits, and rolls back logical transactions over one pool.
///
/// The manager exclusively owns the context binding for a transaction's
/// duration: begin acquires a connection, turns autocommit off, and binds
/// it to the calling thread; the terminal operations restore autocommit,
/// unbind, and release the connection back to the pool on every path.
///
/// [`TransactionManager::execute`] is the intended entry point for new
/// code; manual begin/commit/rollback is the primitive it is built from.
#[derive(Debug)]
pub struct TransactionManager {
    pool: Arc<ConnectionPool>,
    context: Arc<TransactionContext>,
    translator: ExceptionTranslator,
}

impl TransactionManager {
    /// Creates a manager over a pool and a context, using the default
    /// translation table for connection-setup failures.
    #[must_use]
    pub fn new(pool: Arc<ConnectionPool>, context: Arc<TransactionContext>) -> Self {
        Self::with_translator(pool, context, ExceptionTranslator::default())
    }

    /// Creates a manager with an explicit translator.
    #[must_use]
    pub fn with_translator(
        pool: Arc<ConnectionPool>,
        context: Arc<TransactionContext>,
        translator: ExceptionTranslator,
    ) -> Self {
        Self {
            pool,
            context,
            translator,
        }
    }

    /// Begins a logical transaction for the calling thread.
    ///
    /// With [`Propagation::Required`] and a transaction already active,
    /// the returned status joins it: `is_new_transaction()` is false and
    /// its terminal operations are no-ops, leaving the decision to the
    /// outer scope.
    ///
    /// # Errors
    ///
    /// Fails with [`DataAccessError::TransactionStartFailure`] when no
    /// connection can be acquired or the connection refuses setup.
    pub fn begin(&self, definition: &TransactionDefinition) -> DataAccessResult<TransactionStatus> {
        let Propagation::Required = definition.propagation;
        if let Some(bound) = self.context.bound() {
            tracing::debug!(connection = %bound.id(), "joining active transaction");
            return Ok(TransactionStatus {
                unit: thread::current().id(),
                connection_id: bound.id(),
                new_transaction: false,
                completed: false,
            });
        }

        let handle = self.pool.acquire().map_err(|source| {
            DataAccessError::TransactionStartFailure {
                source: Box::new(DataAccessError::ResourceExhausted { source }),
            }
        })?;
        if let Err(err) = Self::prepare(&handle, definition) {
            let translated = self.translator.translate("begin", "(connection setup)", err);
            self.pool.release(handle);
            return Err(DataAccessError::TransactionStartFailure {
                source: Box::new(translated),
            });
        }

        let connection_id = handle.id();
        self.context.bind(handle);
        tracing::debug!(connection = %connection_id, "transaction started");
        Ok(TransactionStatus {
            unit: thread::current().id(),
            connection_id,
            new_transaction: true,
            completed: false,
        })
    }

    fn prepare(handle: &ConnectionHandle, definition: &TransactionDefinition) -> DriverResult<()> {
        let mut conn = handle.lock();
        if let Some(level) = definition.isolation {
            conn.set_isolation(level)?;
        }
        conn.set_auto_commit(false)
    }

    /// Commits the transaction described by `status`.
    ///
    /// The connection is restored to autocommit, unbound, and released
    /// even when the commit call itself fails.
    ///
    /// # Errors
    ///
    /// Fails with [`DataAccessError::CommitFailure`] when the backend
    /// rejects the commit or the status is misused (already completed,
    /// wrong thread, nothing bound).
    pub fn commit(&self, status: &mut TransactionStatus) -> DataAccessResult<()> {
        if status.completed {
            return Err(Self::misuse("transaction already completed"));
        }
        if !status.new_transaction {
            status.completed = true;
            tracing::debug!("participating scope complete; outer transaction will commit");
            return Ok(());
        }
        if status.unit != thread::current().id() {
            return Err(Self::misuse("transaction status used from a different thread"));
        }
        let Some(handle) = self.context.unbind() else {
            return Err(Self::misuse("no transaction bound to the current thread"));
        };
        status.completed = true;

        let commit_result = handle.lock().commit();
        self.restore_and_release(handle);
        match commit_result {
            Ok(()) => {
                tracing::debug!(connection = %status.connection_id, "transaction committed");
                Ok(())
            }
            Err(source) => Err(DataAccessError::CommitFailure {
                message: format!("connection {} rejected commit", status.connection_id),
                source: Some(source),
            }),
        }
    }

    /// Rolls back the transaction described by `status`.
    ///
    /// A failure of the underlying rollback call is logged and suppressed
    /// because the caller is typically already unwinding from the error
    /// that triggered the rollback; the connection is still restored,
    /// unbound, and released. Rolling back an already-completed status is
    /// a logged no-op.
    ///
    /// # Errors
    ///
    /// Currently infallible; the `Result` keeps the terminal operations
    /// symmetric at call sites.
    pub fn rollback(&self, status: &mut TransactionStatus) -> DataAccessResult<()> {
        if status.completed {
            tracing::warn!("rollback requested on an already-completed transaction; ignoring");
            return Ok(());
        }
        if !status.new_transaction {
            status.completed = true;
            tracing::debug!("participating scope abandoned; error propagation reaches the outer scope");
            return Ok(());
        }
        if status.unit != thread::current().id() {
            tracing::warn!("transaction status used from a different thread; ignoring rollback");
            return Ok(());
        }
        let Some(handle) = self.context.unbind() else {
            tracing::warn!("no transaction bound to the current thread; ignoring rollback");
            return Ok(());
        };
        status.completed = true;

        if let Err(err) = handle.lock().rollback() {
            tracing::warn!(
                error = %err,
                connection = %status.connection_id,
                "rollback failed; releasing connection anyway"
            );
        } else {
            tracing::debug!(connection = %status.connection_id, "transaction rolled back");
        }
        self.restore_and_release(handle);
        Ok(())
    }

    /// Runs `work` inside a transaction.
    ///
    /// Commits when `work` returns `Ok`; rolls back and re-raises the
    /// original error when it returns `Err`.
    ///
    /// # Errors
    ///
    /// Propagates begin and commit failures, and whatever error `work`
    /// returned.
    pub fn execute<T, F>(&self, definition: &TransactionDefinition, work: F) -> DataAccessResult<T>
    where
        F: FnOnce() -> DataAccessResult<T>,
    {
        let mut status = self.begin(definition)?;
        match work() {
            Ok(value) => {
                self.commit(&mut status)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback(&mut status) {
                    tracing::warn!(error = %rollback_err, "rollback after failed work also failed");
                }
                Err(err)
            }
        }
    }

    fn misuse(message: &str) -> DataAccessError {
        DataAccessError::CommitFailure {
            message: message.to_owned(),
            source: None,
        }
    }

    fn restore_and_release(&self, handle: Arc<ConnectionHandle>) {
        {
            let mut conn = handle.lock();
            if let Err(err) = conn.set_auto_commit(true) {
                tracing::warn!(
                    error = %err,
                    connection = %handle.id(),
                    "could not restore autocommit before release"
                );
            }
        }
        self.pool.release(handle);
    }
}
