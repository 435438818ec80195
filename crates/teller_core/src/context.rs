//! Per-execution-unit connection binding.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use teller_driver::ConnectionHandle;

/// Registry binding an execution unit (thread) to the one physical
/// connection of its in-flight transaction.
///
/// One instance is shared between a [`crate::TransactionManager`] and the
/// [`crate::ConnectionProvider`]s of one wiring. It is deliberately an
/// injectable value rather than process-global state: independent wirings
/// (and independent tests) cannot leak bindings into each other, while a
/// single wiring shared across threads still keeps concurrent
/// transactions on separate connections because entries are keyed by
/// thread id.
///
/// The manager exclusively owns bind/unbind; everything else only reads.
#[derive(Debug, Default)]
pub struct TransactionContext {
    bindings: Mutex<HashMap<ThreadId, Arc<ConnectionHandle>>>,
}

impl TransactionContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the connection bound to the calling thread, if any.
    #[must_use]
    pub fn bound(&self) -> Option<Arc<ConnectionHandle>> {
        self.bindings
            .lock()
            .get(&thread::current().id())
            .map(Arc::clone)
    }

    /// True when the calling thread has an active binding.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.bindings.lock().contains_key(&thread::current().id())
    }

    /// Binds `handle` to the calling thread.
    ///
    /// The caller must have checked the thread is unbound; rebinding
    /// would orphan the previous transaction's connection.
    pub(crate) fn bind(&self, handle: Arc<ConnectionHandle>) {
        let previous = self
            .bindings
            .lock()
            .insert(thread::current().id(), handle);
        debug_assert!(previous.is_none(), "rebinding an already-bound thread");
    }

    /// Removes and returns the calling thread's binding.
    pub(crate) fn unbind(&self) -> Option<Arc<ConnectionHandle>> {
        self.bindings.lock().remove(&thread::current().id())
    }

    /// Number of threads with an active binding.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.bindings.lock().len()
    }
}
