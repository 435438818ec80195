//! # Teller Driver
//!
//! Connection traits, bounded pool, and in-memory engine for Teller.
//!
//! This crate is the "physical" layer underneath the transaction core.
//! It knows how to open connections, hand them out from a bounded pool,
//! and run single parameterized statements. It knows nothing about
//! logical transactions, repositories, or error taxonomies - a failure
//! here is a vendor signal carrying a backend-specific integer code,
//! and the core crate owns all interpretation of those codes.
//!
//! ## Design Principles
//!
//! - Connections run exactly one statement per call (execute or query)
//! - Vendor failures carry integer codes, never a portable classification
//! - The pool enforces exclusive checkout: a handle given to one caller
//!   is never handed to another until it is released
//!
//! ## Available Drivers
//!
//! - [`MemoryDriver`] - For testing and ephemeral use; a single `member`
//!   table with an H2-flavored vendor-code surface
//!
//! ## Example
//!
//! ```rust
//! use teller_driver::{Connection, ConnectionPool, MemoryDriver, PoolConfig, Value};
//!
//! let pool = ConnectionPool::new(Box::new(MemoryDriver::new()), PoolConfig::default());
//! let handle = pool.acquire().unwrap();
//! {
//!     let mut conn = handle.lock();
//!     conn.execute(
//!         "insert into member(member_id, money) values(?, ?)",
//!         &[Value::from("memberA"), Value::from(10_000_i64)],
//!     )
//!     .unwrap();
//! }
//! pool.release(handle);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod connection;
mod error;
mod memory;
mod pool;
mod sql;
mod value;

pub use connection::{Connection, ConnectionId, Driver, IsolationLevel};
pub use error::{codes, DriverError, DriverResult, PoolError};
pub use memory::MemoryDriver;
pub use pool::{ConnectionHandle, ConnectionPool, PoolConfig};
pub use value::{Row, Value};
