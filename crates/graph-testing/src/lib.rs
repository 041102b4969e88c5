//! # graph-testing
//!
//! Test infrastructure for the graph client crates.
//!
//! [`MockGraphServer`] is an in-process graph service listening on an
//! ephemeral loopback port. It speaks JSON over the same header-framed codec
//! the client uses, tracks sessions, and understands a handful of statements
//! (see [`statement`]). [`JsonGraphClient`] is the matching
//! [`GraphClient`](graph_client::GraphClient); pass
//! [`JsonGraphClient::factory`] to a connection or pool.
//!
//! ## Example
//!
//! ```rust,no_run
//! use graph_client::{ConnectOptions, Connection};
//! use graph_testing::{JsonGraphClient, MockGraphServer};
//!
//! let server = MockGraphServer::start().unwrap();
//! let mut conn = Connection::new(JsonGraphClient::factory());
//! conn.open(&server.host_addr(), &ConnectOptions::new()).unwrap();
//!
//! let auth = conn.authenticate("root", "nebula");
//! let resp = conn.execute(auth.session_id.unwrap(), "YIELD 1");
//! assert!(resp.is_succeeded());
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod error;
pub mod server;
pub mod statement;
pub mod wire;

pub use client::JsonGraphClient;
pub use error::MockError;
pub use server::{DEFAULT_PASSWORD, DEFAULT_USERNAME, MockGraphServer, MockServerBuilder};

/// Install a test subscriber writing through the test harness.
///
/// Safe to call from every test; only the first call takes effect.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
