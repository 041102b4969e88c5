//! # graph-client
//!
//! Connection to a graph query service with both blocking and callback APIs.
//!
//! A [`Connection`] owns one transport link and a private single-threaded
//! event loop. All socket I/O and RPC completions happen on that loop; the
//! public methods either block the caller until the loop delivers a result or
//! register a callback that the loop invokes later. Transport failures never
//! escape as errors from the request methods: they come back as responses
//! carrying [`ErrorCode::RpcFailure`] or [`ErrorCode::Disconnected`].
//!
//! The wire encoding is not implemented here. Callers supply a
//! [`GraphClientFactory`] that builds a [`GraphClient`] on top of the framed
//! [`LinkChannel`] once the socket is up.
//!
//! ## Example
//!
//! ```rust,ignore
//! use graph_client::{ConnectOptions, Connection, HostAddr};
//! use std::time::Duration;
//!
//! let mut conn = Connection::new(factory);
//! let addr: HostAddr = "graphd:9669".parse()?;
//! conn.open(&addr, &ConnectOptions::new().timeout(Duration::from_secs(3)))?;
//!
//! let auth = conn.authenticate("root", "nebula");
//! let session_id = auth.session_id.unwrap_or_default();
//! let resp = conn.execute(session_id, "YIELD 1");
//! assert!(resp.is_succeeded());
//!
//! conn.async_execute(session_id, "YIELD 1", |resp| {
//!     println!("latency: {}us", resp.latency_us);
//! });
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod address;
pub mod config;
pub mod connection;
pub mod error;
pub mod event_loop;
pub mod handler;
pub mod rpc;

pub use address::HostAddr;
pub use config::ConnectOptions;
pub use connection::Connection;
pub use error::{AddressError, ClientError, ConnectError, RpcError};
pub use event_loop::{EventLoop, LoopError};
pub use graph_protocol::{
    AuthResponse, DataSet, ErrorCode, ExecutionResponse, ParameterMap, PlanDescription, Row,
    Value, VerifyClientVersionRequest, VerifyClientVersionResponse,
};
pub use handler::{ErrorHandler, LogErrorHandler};
pub use rpc::{GraphClient, GraphClientFactory, LinkChannel};
