//! # graph-protocol
//!
//! Typed requests, responses and values exchanged with a graph query service.
//!
//! This crate carries no I/O. It defines the vocabulary the transport and
//! pooling crates speak: the [`ErrorCode`] taxonomy, the [`Value`] and
//! [`DataSet`] result model, and the response envelopes returned by every
//! client operation.
//!
//! Every response type upholds one invariant: an error message is present if
//! and only if the error code is not [`ErrorCode::Succeeded`]. The provided
//! constructors are the only way the client crates build responses.
//!
//! ## Example
//!
//! ```
//! use graph_protocol::{DataSet, ErrorCode, ExecutionResponse, Value};
//!
//! let mut data = DataSet::new(["1"]);
//! data.push_row(vec![Value::Int(1)]).unwrap();
//!
//! let resp = ExecutionResponse::succeeded(120, Some(data), None);
//! assert_eq!(resp.error_code, ErrorCode::Succeeded);
//! assert!(resp.error_msg.is_none());
//!
//! let failed = ExecutionResponse::disconnected();
//! assert_eq!(failed.error_code, ErrorCode::Disconnected);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod error_code;
pub mod response;
pub mod value;

pub use error::ProtocolError;
pub use error_code::ErrorCode;
pub use response::{
    AuthResponse, ExecutionResponse, PlanDescription, VerifyClientVersionRequest,
    VerifyClientVersionResponse,
};
pub use value::{DataSet, ParameterMap, Row, Value};

/// Protocol version announced by the client during the version handshake.
pub const CLIENT_VERSION: &str = "3.0.0";

/// Message attached to responses produced while no connection is open.
pub const NOT_OPEN_MESSAGE: &str = "Not open connection.";
