//! # graph-pool
//!
//! Connection pool and sessions for a graph query service.
//!
//! A [`ConnectionPool`] is initialized with a list of `host:port` addresses.
//! It opens connections eagerly, drops addresses it cannot reach, and hands
//! out [`Session`]s: an authenticated server session on a connection leased
//! exclusively to the caller. Releasing (or dropping) the session signs out
//! and returns the connection to the pool.
//!
//! ## Features
//!
//! - Per-address or pool-wide maximum ([`SizeScope`])
//! - Start at the minimum or filled to the maximum ([`InitSize`])
//! - Pluggable address selection ([`RoundRobin`] by default, [`LeastUsed`])
//! - Non-queuing [`get_session`](ConnectionPool::get_session) and a bounded
//!   wait variant
//! - Background idle health check and idle expiry
//! - Session reconnect with [`Session::retry_connect`]
//! - Status and metrics for observability
//!
//! ## Example
//!
//! ```rust,ignore
//! use graph_pool::{Config, ConnectionPool, LeastUsed};
//! use std::time::Duration;
//!
//! let config = Config::new()
//!     .max_connection_pool_size(20)
//!     .timeout(Duration::from_secs(3))
//!     .idle_check_interval(Duration::from_secs(30));
//!
//! let mut pool = ConnectionPool::new(factory).with_policy(LeastUsed);
//! pool.init(["graphd1:9669", "graphd2:9669"], config)?;
//!
//! let mut session = pool.get_session("root", "nebula");
//! let resp = session.execute("YIELD 1");
//! if resp.error_code.is_transport_failure() {
//!     session.retry_connect();
//! }
//!
//! let metrics = pool.metrics();
//! println!("Checkout success rate: {:.2}", metrics.checkout_success_rate());
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod policy;
pub mod pool;
pub mod session;

// Configuration
pub use config::{Config, InitSize, SizeScope};

// Error types
pub use error::PoolError;

// Pool types
pub use policy::{AddressLoad, LeastUsed, RoundRobin, SelectionPolicy};
pub use pool::{ConnectionPool, PoolMetrics, PoolStatus};
pub use session::Session;
