//! [`GraphClient`] speaking the mock service's JSON messages.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use graph_client::{GraphClient, GraphClientFactory, LinkChannel, RpcError};
use graph_protocol::{
    AuthResponse, ExecutionResponse, ParameterMap, VerifyClientVersionRequest,
    VerifyClientVersionResponse,
};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::wire::{Reply, Request};

/// JSON-over-frames RPC client.
///
/// The channel allows one request in flight, so calls are serialized through
/// an async mutex.
pub struct JsonGraphClient {
    channel: Mutex<LinkChannel>,
}

impl JsonGraphClient {
    /// Wrap an established channel.
    #[must_use]
    pub fn new(channel: LinkChannel) -> Self {
        Self {
            channel: Mutex::new(channel),
        }
    }

    /// Factory building a [`JsonGraphClient`] for every opened connection.
    #[must_use]
    pub fn factory() -> Arc<dyn GraphClientFactory> {
        Arc::new(|channel: LinkChannel| {
            Arc::new(JsonGraphClient::new(channel)) as Arc<dyn GraphClient>
        })
    }

    async fn call<T: DeserializeOwned>(&self, req: &Request) -> Result<T, RpcError> {
        let payload = serde_json::to_vec(req).map_err(|e| RpcError::Encode(e.to_string()))?;
        let reply = self.channel.lock().await.call(Bytes::from(payload)).await?;
        match serde_json::from_slice::<Reply<T>>(&reply)
            .map_err(|e| RpcError::Decode(e.to_string()))?
        {
            Reply::Ok(value) => Ok(value),
            Reply::Err(msg) => Err(RpcError::Remote(msg)),
        }
    }
}

#[async_trait]
impl GraphClient for JsonGraphClient {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthResponse, RpcError> {
        self.call(&Request::Authenticate {
            username: username.to_string(),
            password: password.to_string(),
        })
        .await
    }

    async fn signout(&self, session_id: i64) -> Result<(), RpcError> {
        self.call(&Request::Signout { session_id }).await
    }

    async fn execute(&self, session_id: i64, stmt: &str) -> Result<ExecutionResponse, RpcError> {
        self.call(&Request::Execute {
            session_id,
            stmt: stmt.to_string(),
            params: None,
        })
        .await
    }

    async fn execute_with_parameter(
        &self,
        session_id: i64,
        stmt: &str,
        params: &ParameterMap,
    ) -> Result<ExecutionResponse, RpcError> {
        self.call(&Request::Execute {
            session_id,
            stmt: stmt.to_string(),
            params: Some(params.clone()),
        })
        .await
    }

    async fn execute_json(&self, session_id: i64, stmt: &str) -> Result<String, RpcError> {
        self.call(&Request::ExecuteJson {
            session_id,
            stmt: stmt.to_string(),
            params: None,
        })
        .await
    }

    async fn execute_json_with_parameter(
        &self,
        session_id: i64,
        stmt: &str,
        params: &ParameterMap,
    ) -> Result<String, RpcError> {
        self.call(&Request::ExecuteJson {
            session_id,
            stmt: stmt.to_string(),
            params: Some(params.clone()),
        })
        .await
    }

    async fn verify_client_version(
        &self,
        req: &VerifyClientVersionRequest,
    ) -> Result<VerifyClientVersionResponse, RpcError> {
        self.call(&Request::VerifyClientVersion {
            version: req.version.clone(),
        })
        .await
    }
}
