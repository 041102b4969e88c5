//! Per-connection error reporting.

use crate::address::HostAddr;
use crate::error::{ConnectError, RpcError};

/// Receives transport failures observed by one connection.
///
/// Installed per [`Connection`](crate::Connection) with
/// [`with_error_handler`](crate::Connection::with_error_handler). Calls can
/// arrive on the caller's thread or on the connection's event loop thread, so
/// implementations must not block.
pub trait ErrorHandler: Send + Sync {
    /// A connect attempt failed.
    fn on_connect_error(&self, addr: &HostAddr, err: &ConnectError);

    /// An RPC failed at the transport level.
    fn on_rpc_error(&self, addr: Option<&HostAddr>, operation: &'static str, err: &RpcError);
}

/// Default handler: logs through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorHandler;

impl ErrorHandler for LogErrorHandler {
    fn on_connect_error(&self, addr: &HostAddr, err: &ConnectError) {
        tracing::error!(host = addr.host(), port = addr.port(), error = %err, "connect failed");
    }

    fn on_rpc_error(&self, addr: Option<&HostAddr>, operation: &'static str, err: &RpcError) {
        match addr {
            Some(addr) => tracing::error!(
                host = addr.host(),
                port = addr.port(),
                operation,
                error = %err,
                "rpc failed"
            ),
            None => tracing::error!(operation, error = %err, "rpc failed"),
        }
    }
}
