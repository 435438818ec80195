//! # Teller Core
//!
//! Transaction synchronization, exception translation, and the transfer
//! service for Teller.
//!
//! This crate provides:
//! - A per-thread [`TransactionContext`] binding a logical transaction to
//!   its one physical connection
//! - A [`ConnectionProvider`] that makes repositories transaction-agnostic
//! - A [`TransactionManager`] owning begin/commit/rollback and the
//!   `execute` combinator
//! - Table-driven [`ExceptionTranslator`] from vendor codes to a portable
//!   taxonomy
//! - The [`MemberRepository`] and [`TransferService`] built on top
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use teller_core::{
//!     ConnectionProvider, ExceptionTranslator, MemberRepository, TransactionContext,
//!     TransactionManager, TransferService,
//! };
//! use teller_driver::{ConnectionPool, MemoryDriver, PoolConfig};
//!
//! let pool = Arc::new(ConnectionPool::new(
//!     Box::new(MemoryDriver::new()),
//!     PoolConfig::default(),
//! ));
//! let context = Arc::new(TransactionContext::new());
//! let provider = ConnectionProvider::new(Arc::clone(&pool), Arc::clone(&context));
//! let repository = MemberRepository::new(provider, ExceptionTranslator::default());
//! let manager = TransactionManager::new(pool, context);
//! let service = TransferService::new(manager, repository);
//!
//! service.register("memberA", 10_000).unwrap();
//! service.register("memberB", 10_000).unwrap();
//! service.transfer("memberA", "memberB", 2_000).unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod context;
mod error;
mod manager;
mod member;
mod provider;
mod repository;
mod service;
mod translate;

pub use context::TransactionContext;
pub use error::{DataAccessError, DataAccessResult, ErrorKind};
pub use manager::{Propagation, TransactionDefinition, TransactionManager, TransactionStatus};
pub use member::Member;
pub use provider::{ConnectionLease, ConnectionProvider};
pub use repository::MemberRepository;
pub use service::{ServiceConfig, TransferService};
pub use translate::{ErrorCodeTable, ExceptionTranslator};
