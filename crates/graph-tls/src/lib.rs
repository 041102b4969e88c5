//! # graph-tls
//!
//! Transport establishment for graph client connections.
//!
//! This crate turns a resolved socket address into a ready-to-use byte
//! stream, optionally wrapped in TLS. It is the only place that knows about
//! certificates: callers hand it a [`TlsConfig`] (a CA bundle path, or nothing
//! for the bundled webpki roots) and get back a [`TransportStream`] that the
//! framing layer can sit on.
//!
//! ## Example
//!
//! ```rust,ignore
//! use graph_tls::{TlsConfig, connect};
//! use std::time::Duration;
//!
//! let connector = TlsConfig::new().ca_path("/etc/graph/ca.pem").connector()?;
//! let stream = connect(addr, "graphd", Some(Duration::from_secs(3)), Some(&connector)).await?;
//! assert!(stream.is_tls());
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod stream;

pub use config::{TlsConfig, server_name};
pub use error::{TlsError, TransportError};
pub use stream::{TransportStream, connect};
pub use tokio_rustls::TlsConnector;
