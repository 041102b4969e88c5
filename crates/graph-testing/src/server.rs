//! In-process mock graph service.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use graph_client::HostAddr;
use graph_codec::FrameStream;
use graph_protocol::{
    AuthResponse, ErrorCode, ExecutionResponse, ParameterMap, VerifyClientVersionResponse,
};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::MockError;
use crate::statement::{self, Statement};
use crate::wire::{Reply, Request};

/// Default user accepted by the mock service.
pub const DEFAULT_USERNAME: &str = "root";

/// Default password accepted by the mock service.
pub const DEFAULT_PASSWORD: &str = "nebula";

/// Builder for [`MockGraphServer`].
#[derive(Debug, Clone)]
pub struct MockServerBuilder {
    username: String,
    password: String,
    reject_version: bool,
    execute_latency: Duration,
}

impl Default for MockServerBuilder {
    fn default() -> Self {
        Self {
            username: DEFAULT_USERNAME.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            reject_version: false,
            execute_latency: Duration::ZERO,
        }
    }
}

impl MockServerBuilder {
    /// Set the accepted credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Refuse every version handshake.
    #[must_use]
    pub fn reject_version(mut self, reject: bool) -> Self {
        self.reject_version = reject;
        self
    }

    /// Delay every statement execution, pings included.
    #[must_use]
    pub fn execute_latency(mut self, latency: Duration) -> Self {
        self.execute_latency = latency;
        self
    }

    /// Bind to an ephemeral loopback port and start serving.
    pub fn start(self) -> Result<MockGraphServer, MockError> {
        let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).map_err(MockError::Bind)?;
        listener.set_nonblocking(true).map_err(MockError::Bind)?;
        let addr = listener.local_addr().map_err(MockError::Bind)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(MockError::Runtime)?;

        let state = Arc::new(ServerState {
            username: self.username,
            password: Mutex::new(self.password),
            reject_version: self.reject_version,
            execute_latency: self.execute_latency,
            sessions: Mutex::new(HashSet::new()),
            next_session: AtomicI64::new(1),
            accepted: AtomicUsize::new(0),
            generation: Mutex::new(CancellationToken::new()),
        });

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let loop_state = Arc::clone(&state);
        let thread = thread::Builder::new()
            .name("graph-mock-server".to_string())
            .spawn(move || runtime.block_on(accept_loop(listener, loop_state, shutdown_rx)))
            .map_err(MockError::Runtime)?;

        tracing::debug!(%addr, "mock graph server started");
        Ok(MockGraphServer {
            addr,
            state,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }
}

/// A graph service speaking JSON over the frame codec, on its own thread.
///
/// Dropping the server stops it and closes every connection.
pub struct MockGraphServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl MockGraphServer {
    /// Start a server with default settings.
    pub fn start() -> Result<Self, MockError> {
        Self::builder().start()
    }

    /// Configure a server.
    #[must_use]
    pub fn builder() -> MockServerBuilder {
        MockServerBuilder::default()
    }

    /// Bound socket address.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Bound address as a client [`HostAddr`].
    #[must_use]
    pub fn host_addr(&self) -> HostAddr {
        HostAddr::new(self.addr.ip().to_string(), self.addr.port())
    }

    /// Bound address as `host:port` text.
    #[must_use]
    pub fn address_string(&self) -> String {
        self.addr.to_string()
    }

    /// Close every open connection. The listener keeps accepting.
    pub fn drop_connections(&self) {
        let mut generation = self.state.generation.lock();
        generation.cancel();
        *generation = CancellationToken::new();
        tracing::debug!(addr = %self.addr, "mock server dropped all connections");
    }

    /// Accept a different password from now on. Existing sessions stay.
    pub fn change_password(&self, password: impl Into<String>) {
        *self.state.password.lock() = password.into();
    }

    /// Number of connections accepted so far.
    #[must_use]
    pub fn connections_accepted(&self) -> usize {
        self.state.accepted.load(Ordering::SeqCst)
    }

    /// Number of sessions currently signed in.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.state.sessions.lock().len()
    }
}

impl Drop for MockGraphServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl std::fmt::Debug for MockGraphServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockGraphServer")
            .field("addr", &self.addr)
            .finish()
    }
}

struct ServerState {
    username: String,
    password: Mutex<String>,
    reject_version: bool,
    execute_latency: Duration,
    sessions: Mutex<HashSet<i64>>,
    next_session: AtomicI64,
    accepted: AtomicUsize,
    // Cancelled and replaced by drop_connections.
    generation: Mutex<CancellationToken>,
}

fn encode<T: Serialize>(reply: &Reply<T>) -> Bytes {
    serde_json::to_vec(reply).map(Bytes::from).unwrap_or_default()
}

fn latency_since(started: Instant) -> i64 {
    i64::try_from(started.elapsed().as_micros()).unwrap_or(i64::MAX)
}

impl ServerState {
    async fn handle(&self, payload: &[u8]) -> Bytes {
        let req = match serde_json::from_slice::<Request>(payload) {
            Ok(req) => req,
            Err(e) => return encode(&Reply::<()>::Err(format!("malformed request: {e}"))),
        };
        tracing::trace!(method = req.method(), "mock request");

        match req {
            Request::Authenticate { username, password } => {
                encode(&Reply::Ok(self.authenticate(&username, &password)))
            }
            Request::Signout { session_id } => {
                self.sessions.lock().remove(&session_id);
                encode(&Reply::Ok(()))
            }
            Request::Execute {
                session_id,
                stmt,
                params,
            } => {
                let resp = self
                    .execute(session_id, &stmt, &params.unwrap_or_default())
                    .await;
                encode(&Reply::Ok(resp))
            }
            Request::ExecuteJson {
                session_id,
                stmt,
                params,
            } => {
                let resp = self
                    .execute(session_id, &stmt, &params.unwrap_or_default())
                    .await;
                encode(&Reply::Ok(to_json(&resp)))
            }
            Request::VerifyClientVersion { version } => {
                let resp = if self.reject_version {
                    VerifyClientVersionResponse::error(
                        ErrorCode::ClientServerIncompatible,
                        format!("client version {version} is not accepted"),
                    )
                } else {
                    VerifyClientVersionResponse::succeeded()
                };
                encode(&Reply::Ok(resp))
            }
        }
    }

    fn authenticate(&self, username: &str, password: &str) -> AuthResponse {
        if username != self.username || password != *self.password.lock() {
            return AuthResponse::error(
                ErrorCode::BadUsernamePassword,
                "invalid username or password",
            );
        }
        let session_id = self.next_session.fetch_add(1, Ordering::SeqCst);
        self.sessions.lock().insert(session_id);
        AuthResponse::succeeded(session_id)
    }

    async fn execute(&self, session_id: i64, stmt: &str, params: &ParameterMap) -> ExecutionResponse {
        let started = Instant::now();
        if !self.execute_latency.is_zero() {
            tokio::time::sleep(self.execute_latency).await;
        }
        if !self.sessions.lock().contains(&session_id) {
            return ExecutionResponse::error(
                ErrorCode::SessionInvalid,
                format!("session {session_id} not found"),
            );
        }
        let statement = Statement::parse(stmt);
        if let Statement::Sleep(delay) = statement {
            tokio::time::sleep(delay).await;
        }
        statement::run(&statement, params, latency_since(started))
    }
}

/// Render a response in the service's JSON result format.
fn to_json(resp: &ExecutionResponse) -> String {
    let mut result = serde_json::json!({ "latencyInUs": resp.latency_us });
    if let Some(data) = &resp.data {
        result["columns"] = serde_json::json!(data.column_names());
        result["data"] = data
            .rows()
            .iter()
            .map(|row| serde_json::json!({ "row": row.values() }))
            .collect();
    }
    if let Some(plan) = &resp.plan_desc {
        result["planDesc"] = serde_json::json!(plan);
    }
    let mut error = serde_json::json!({ "code": resp.error_code.code() });
    if let Some(msg) = &resp.error_msg {
        error["message"] = serde_json::json!(msg);
    }
    serde_json::json!({ "errors": [error], "results": [result] }).to_string()
}

async fn accept_loop(
    listener: std::net::TcpListener,
    state: Arc<ServerState>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let listener = match TcpListener::from_std(listener) {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "mock server listener unusable");
            return;
        }
    };
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    state.accepted.fetch_add(1, Ordering::SeqCst);
                    let cancel = state.generation.lock().clone();
                    tracing::trace!(%peer, "mock server accepted connection");
                    tokio::spawn(serve(stream, Arc::clone(&state), cancel));
                }
                Err(e) => tracing::debug!(error = %e, "mock server accept failed"),
            },
        }
    }
}

async fn serve(stream: TcpStream, state: Arc<ServerState>, cancel: CancellationToken) {
    let _ = stream.set_nodelay(true);
    let mut frames = FrameStream::new(stream);
    loop {
        let frame = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            next = frames.next() => match next {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "mock server read failed");
                    break;
                }
                None => break,
            },
        };
        let payload = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            payload = state.handle(&frame.payload) => payload,
        };
        if frame.header.is_oneway() {
            continue;
        }
        if let Err(e) = frames.send(frame.reply(payload)).await {
            tracing::debug!(error = %e, "mock server write failed");
            break;
        }
    }
}
