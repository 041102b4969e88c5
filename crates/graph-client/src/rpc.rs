//! The RPC client seam.
//!
//! The connection does not encode requests itself. Once the socket and
//! channel are up it asks a [`GraphClientFactory`] for a [`GraphClient`] and
//! issues every operation through it. Implementations run entirely on the
//! connection's event loop.

use std::sync::Arc;

use async_trait::async_trait;
use graph_codec::Channel;
use graph_protocol::{
    AuthResponse, ExecutionResponse, ParameterMap, VerifyClientVersionRequest,
    VerifyClientVersionResponse,
};
use graph_tls::TransportStream;

use crate::error::RpcError;

/// The framed channel handed to [`GraphClientFactory::new_client`].
pub type LinkChannel = Channel<TransportStream>;

/// Header announcing the client protocol version on every request.
pub const CLIENT_VERSION_HEADER: &str = "client_version";

/// Typed RPC client, one method per service operation.
#[async_trait]
pub trait GraphClient: Send + Sync {
    /// Authenticate and open a server-side session.
    async fn authenticate(&self, username: &str, password: &str)
    -> Result<AuthResponse, RpcError>;

    /// Close a server-side session.
    async fn signout(&self, session_id: i64) -> Result<(), RpcError>;

    /// Execute a statement.
    async fn execute(&self, session_id: i64, stmt: &str) -> Result<ExecutionResponse, RpcError>;

    /// Execute a statement with named parameters.
    async fn execute_with_parameter(
        &self,
        session_id: i64,
        stmt: &str,
        params: &ParameterMap,
    ) -> Result<ExecutionResponse, RpcError>;

    /// Execute a statement and return the result as JSON text.
    async fn execute_json(&self, session_id: i64, stmt: &str) -> Result<String, RpcError>;

    /// Execute a statement with named parameters, returning JSON text.
    async fn execute_json_with_parameter(
        &self,
        session_id: i64,
        stmt: &str,
        params: &ParameterMap,
    ) -> Result<String, RpcError>;

    /// Check protocol compatibility.
    async fn verify_client_version(
        &self,
        req: &VerifyClientVersionRequest,
    ) -> Result<VerifyClientVersionResponse, RpcError>;
}

/// Builds a [`GraphClient`] over an established channel.
pub trait GraphClientFactory: Send + Sync {
    /// Wrap the channel. Called on the connection's event loop.
    fn new_client(&self, channel: LinkChannel) -> Arc<dyn GraphClient>;
}

impl<F> GraphClientFactory for F
where
    F: Fn(LinkChannel) -> Arc<dyn GraphClient> + Send + Sync,
{
    fn new_client(&self, channel: LinkChannel) -> Arc<dyn GraphClient> {
        self(channel)
    }
}
