//! Connection to a single graph server.
//!
//! Every request, blocking or not, is issued as an async RPC on the
//! connection's event loop. Blocking methods then wait for that future;
//! callback methods attach the callback as its continuation. Request building
//! therefore exists once, in the closures passed to `call`/`dispatch`.

use std::future::Future;
use std::sync::Arc;

use graph_codec::Channel;
use graph_protocol::{
    AuthResponse, CLIENT_VERSION, ExecutionResponse, ParameterMap, VerifyClientVersionRequest,
    VerifyClientVersionResponse,
};
use graph_tls::TransportError;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::address::HostAddr;
use crate::config::ConnectOptions;
use crate::error::{ClientError, ConnectError, RpcError};
use crate::event_loop::{EventLoop, LoopError};
use crate::handler::{ErrorHandler, LogErrorHandler};
use crate::rpc::{CLIENT_VERSION_HEADER, GraphClient, GraphClientFactory};

/// Statement executed by [`Connection::ping`].
pub const PING_STATEMENT: &str = "YIELD 1";

/// Session id used by [`Connection::ping`]; it only exercises the link.
const PING_SESSION_ID: i64 = 0;

/// The live half of a connection: RPC client plus pending-work tracking.
struct Link {
    client: Arc<dyn GraphClient>,
    cancel: CancellationToken,
    tasks: TaskTracker,
}

impl Link {
    fn new(client: Arc<dyn GraphClient>) -> Self {
        Self {
            client,
            cancel: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }
}

async fn guarded<T>(
    cancel: CancellationToken,
    fut: impl Future<Output = Result<T, RpcError>>,
) -> Result<T, RpcError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(RpcError::Cancelled),
        result = fut => result,
    }
}

/// Converts RPC results into responses, reporting transport failures.
#[derive(Clone)]
struct Reporter {
    handler: Arc<dyn ErrorHandler>,
    addr: Option<HostAddr>,
    operation: &'static str,
}

impl Reporter {
    fn failure(&self, err: &RpcError) {
        if !matches!(err, RpcError::NotConnected) {
            self.handler
                .on_rpc_error(self.addr.as_ref(), self.operation, err);
        }
    }

    fn auth(&self, result: Result<AuthResponse, RpcError>) -> AuthResponse {
        result.unwrap_or_else(|err| {
            self.failure(&err);
            match err {
                RpcError::NotConnected => AuthResponse::disconnected(),
                err => AuthResponse::rpc_failure(err.to_string()),
            }
        })
    }

    fn execution(&self, result: Result<ExecutionResponse, RpcError>) -> ExecutionResponse {
        result.unwrap_or_else(|err| {
            self.failure(&err);
            match err {
                RpcError::NotConnected => ExecutionResponse::disconnected(),
                err => ExecutionResponse::rpc_failure(err.to_string()),
            }
        })
    }

    fn version(
        &self,
        result: Result<VerifyClientVersionResponse, RpcError>,
    ) -> VerifyClientVersionResponse {
        result.unwrap_or_else(|err| {
            self.failure(&err);
            match err {
                RpcError::NotConnected => VerifyClientVersionResponse::disconnected(),
                err => VerifyClientVersionResponse::error(err.error_code(), err.to_string()),
            }
        })
    }

    fn json(&self, result: Result<String, RpcError>) -> String {
        result.unwrap_or_else(|err| {
            self.failure(&err);
            String::new()
        })
    }

    fn try_json(&self, result: Result<String, RpcError>) -> Result<String, ClientError> {
        result.map_err(|err| {
            self.failure(&err);
            ClientError::from(err)
        })
    }
}

/// A connection to one graph server.
///
/// A fresh connection is empty: every request answers
/// [`ErrorCode::Disconnected`](graph_protocol::ErrorCode::Disconnected)
/// without blocking. [`open`](Connection::open) starts the private event loop
/// (once), connects, and performs the version handshake.
///
/// Connections are not `Clone`. Ownership moves with [`take`](Connection::take)
/// and [`assign`](Connection::assign), which leave the source empty.
pub struct Connection {
    factory: Arc<dyn GraphClientFactory>,
    error_handler: Arc<dyn ErrorHandler>,
    event_loop: Option<EventLoop>,
    link: Option<Link>,
    address: Option<HostAddr>,
}

impl Connection {
    /// Create an empty connection that will build RPC clients with `factory`.
    #[must_use]
    pub fn new(factory: Arc<dyn GraphClientFactory>) -> Self {
        Self {
            factory,
            error_handler: Arc::new(LogErrorHandler),
            event_loop: None,
            link: None,
            address: None,
        }
    }

    /// Replace the error handler.
    #[must_use]
    pub fn with_error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = handler;
        self
    }

    /// Address of the last successful open, until the connection is closed.
    #[must_use]
    pub fn address(&self) -> Option<&HostAddr> {
        self.address.as_ref()
    }

    /// Whether an RPC client is installed.
    ///
    /// This says nothing about the server; use [`ping`](Connection::ping) for
    /// liveness.
    #[must_use]
    pub fn has_client(&self) -> bool {
        self.link.is_some()
    }

    /// Connect to `addr` and perform the version handshake.
    ///
    /// An already open connection is closed first. On any failure the
    /// connection is left empty.
    pub fn open(&mut self, addr: &HostAddr, options: &ConnectOptions) -> Result<(), ConnectError> {
        if addr.host().is_empty() {
            return Err(ConnectError::EmptyAddress);
        }
        self.close();

        tracing::debug!(
            host = addr.host(),
            port = addr.port(),
            ssl = options.enable_ssl,
            "opening connection"
        );

        let client = match self.establish(addr, options) {
            Ok(client) => client,
            Err(err) => {
                self.error_handler.on_connect_error(addr, &err);
                return Err(err);
            }
        };
        self.link = Some(Link::new(client));
        self.address = Some(addr.clone());

        let resp = self.verify_client_version(&VerifyClientVersionRequest::default());
        if !resp.error_code.is_succeeded() {
            let err = ConnectError::Handshake {
                code: resp.error_code,
                message: resp.error_msg.unwrap_or_default(),
            };
            self.close();
            self.error_handler.on_connect_error(addr, &err);
            return Err(err);
        }

        tracing::debug!(host = addr.host(), port = addr.port(), "connection open");
        Ok(())
    }

    fn establish(
        &mut self,
        addr: &HostAddr,
        options: &ConnectOptions,
    ) -> Result<Arc<dyn GraphClient>, ConnectError> {
        let socket_addr = addr.resolve().map_err(|source| ConnectError::Resolve {
            addr: addr.to_string(),
            source,
        })?;
        let tls = if options.enable_ssl {
            Some(
                options
                    .tls_config()
                    .connector()
                    .map_err(TransportError::from)?,
            )
        } else {
            None
        };

        if self.event_loop.is_none() {
            self.event_loop = Some(EventLoop::spawn()?);
        }
        let event_loop = self.event_loop.as_ref().ok_or(LoopError::Stopped)?;

        let host = addr.host().to_string();
        let timeout = options.timeout_limit();
        let factory = Arc::clone(&self.factory);
        let client = event_loop.run_and_wait(async move {
            let stream = graph_tls::connect(socket_addr, &host, timeout, tls.as_ref()).await?;
            let mut channel = Channel::new(stream);
            channel.set_timeout(timeout);
            channel.set_header(CLIENT_VERSION_HEADER, CLIENT_VERSION);
            Ok::<_, TransportError>(factory.new_client(channel))
        })??;
        Ok(client)
    }

    fn active(&self) -> Option<(&Link, &EventLoop)> {
        Some((self.link.as_ref()?, self.event_loop.as_ref()?))
    }

    fn reporter(&self, operation: &'static str) -> Reporter {
        Reporter {
            handler: Arc::clone(&self.error_handler),
            addr: self.address.clone(),
            operation,
        }
    }

    /// Run a request on the loop and block until it completes.
    fn call<T, F, Fut>(&self, request: F) -> Result<T, RpcError>
    where
        F: FnOnce(Arc<dyn GraphClient>) -> Fut,
        Fut: Future<Output = Result<T, RpcError>> + Send + 'static,
        T: Send + 'static,
    {
        let (link, event_loop) = self.active().ok_or(RpcError::NotConnected)?;
        let fut = guarded(link.cancel.clone(), request(Arc::clone(&link.client)));
        event_loop.run_and_wait(fut)?
    }

    /// Run a request on the loop and hand its result to `complete` there.
    ///
    /// Without a link `complete` runs immediately on the caller's thread.
    fn dispatch<T, F, Fut, C>(&self, request: F, complete: C)
    where
        F: FnOnce(Arc<dyn GraphClient>) -> Fut,
        Fut: Future<Output = Result<T, RpcError>> + Send + 'static,
        T: Send + 'static,
        C: FnOnce(Result<T, RpcError>) + Send + 'static,
    {
        match self.active() {
            None => complete(Err(RpcError::NotConnected)),
            Some((link, event_loop)) => {
                let fut = guarded(link.cancel.clone(), request(Arc::clone(&link.client)));
                link.tasks
                    .spawn_on(async move { complete(fut.await) }, event_loop.handle());
            }
        }
    }

    /// Authenticate and obtain a server session id.
    pub fn authenticate(&self, username: &str, password: &str) -> AuthResponse {
        let username = username.to_string();
        let password = password.to_string();
        let result =
            self.call(move |client| async move { client.authenticate(&username, &password).await });
        self.reporter("authenticate").auth(result)
    }

    /// Execute a statement, blocking until the response arrives.
    pub fn execute(&self, session_id: i64, stmt: &str) -> ExecutionResponse {
        tracing::debug!(session_id, stmt, "executing statement");
        let stmt = stmt.to_string();
        let result = self.call(move |client| async move { client.execute(session_id, &stmt).await });
        self.reporter("execute").execution(result)
    }

    /// Execute a parameterized statement, blocking until the response arrives.
    pub fn execute_with_parameter(
        &self,
        session_id: i64,
        stmt: &str,
        params: &ParameterMap,
    ) -> ExecutionResponse {
        tracing::debug!(
            session_id,
            stmt,
            params_count = params.len(),
            "executing statement"
        );
        let stmt = stmt.to_string();
        let params = params.clone();
        let result = self.call(move |client| async move {
            client
                .execute_with_parameter(session_id, &stmt, &params)
                .await
        });
        self.reporter("execute_with_parameter").execution(result)
    }

    /// Execute a statement; `callback` runs on the event loop with the result.
    ///
    /// The callback must not block: it shares the loop with every other
    /// pending request on this connection.
    pub fn async_execute<C>(&self, session_id: i64, stmt: &str, callback: C)
    where
        C: FnOnce(ExecutionResponse) + Send + 'static,
    {
        let stmt = stmt.to_string();
        let reporter = self.reporter("execute");
        self.dispatch(
            move |client| async move { client.execute(session_id, &stmt).await },
            move |result| callback(reporter.execution(result)),
        );
    }

    /// Parameterized variant of [`async_execute`](Connection::async_execute).
    pub fn async_execute_with_parameter<C>(
        &self,
        session_id: i64,
        stmt: &str,
        params: &ParameterMap,
        callback: C,
    ) where
        C: FnOnce(ExecutionResponse) + Send + 'static,
    {
        let stmt = stmt.to_string();
        let params = params.clone();
        let reporter = self.reporter("execute_with_parameter");
        self.dispatch(
            move |client| async move {
                client
                    .execute_with_parameter(session_id, &stmt, &params)
                    .await
            },
            move |result| callback(reporter.execution(result)),
        );
    }

    /// Execute a statement and return the JSON result.
    ///
    /// Any failure yields an empty string; use
    /// [`try_execute_json`](Connection::try_execute_json) to tell them apart.
    pub fn execute_json(&self, session_id: i64, stmt: &str) -> String {
        let stmt = stmt.to_string();
        let result =
            self.call(move |client| async move { client.execute_json(session_id, &stmt).await });
        self.reporter("execute_json").json(result)
    }

    /// Parameterized variant of [`execute_json`](Connection::execute_json).
    pub fn execute_json_with_parameter(
        &self,
        session_id: i64,
        stmt: &str,
        params: &ParameterMap,
    ) -> String {
        let result = self.call_json_with_parameter(session_id, stmt, params);
        self.reporter("execute_json_with_parameter").json(result)
    }

    fn call_json_with_parameter(
        &self,
        session_id: i64,
        stmt: &str,
        params: &ParameterMap,
    ) -> Result<String, RpcError> {
        let stmt = stmt.to_string();
        let params = params.clone();
        self.call(move |client| async move {
            client
                .execute_json_with_parameter(session_id, &stmt, &params)
                .await
        })
    }

    /// Execute a statement and return the JSON result or the failure.
    pub fn try_execute_json(&self, session_id: i64, stmt: &str) -> Result<String, ClientError> {
        let stmt = stmt.to_string();
        let result =
            self.call(move |client| async move { client.execute_json(session_id, &stmt).await });
        self.reporter("execute_json").try_json(result)
    }

    /// Parameterized variant of [`try_execute_json`](Connection::try_execute_json).
    pub fn try_execute_json_with_parameter(
        &self,
        session_id: i64,
        stmt: &str,
        params: &ParameterMap,
    ) -> Result<String, ClientError> {
        let result = self.call_json_with_parameter(session_id, stmt, params);
        self.reporter("execute_json_with_parameter").try_json(result)
    }

    /// Callback variant of [`execute_json`](Connection::execute_json).
    pub fn async_execute_json<C>(&self, session_id: i64, stmt: &str, callback: C)
    where
        C: FnOnce(String) + Send + 'static,
    {
        let stmt = stmt.to_string();
        let reporter = self.reporter("execute_json");
        self.dispatch(
            move |client| async move { client.execute_json(session_id, &stmt).await },
            move |result| callback(reporter.json(result)),
        );
    }

    /// Callback variant of
    /// [`execute_json_with_parameter`](Connection::execute_json_with_parameter).
    pub fn async_execute_json_with_parameter<C>(
        &self,
        session_id: i64,
        stmt: &str,
        params: &ParameterMap,
        callback: C,
    ) where
        C: FnOnce(String) + Send + 'static,
    {
        let stmt = stmt.to_string();
        let params = params.clone();
        let reporter = self.reporter("execute_json_with_parameter");
        self.dispatch(
            move |client| async move {
                client
                    .execute_json_with_parameter(session_id, &stmt, &params)
                    .await
            },
            move |result| callback(reporter.json(result)),
        );
    }

    /// Perform the version handshake.
    pub fn verify_client_version(
        &self,
        req: &VerifyClientVersionRequest,
    ) -> VerifyClientVersionResponse {
        let req = req.clone();
        let result =
            self.call(move |client| async move { client.verify_client_version(&req).await });
        self.reporter("verify_client_version").version(result)
    }

    /// Check the link with a trivial statement.
    ///
    /// Server-side errors (such as the ping's session id being unknown) mean
    /// the server answered, so only transport failures count as dead.
    pub fn ping(&self) -> bool {
        let resp = self.execute(PING_SESSION_ID, PING_STATEMENT);
        if resp.error_code.is_transport_failure() {
            tracing::debug!(
                code = %resp.error_code,
                error = resp.error_msg.as_deref().unwrap_or_default(),
                "ping failed"
            );
            return false;
        }
        true
    }

    /// Liveness check; same as [`ping`](Connection::ping).
    pub fn is_open(&self) -> bool {
        self.ping()
    }

    /// Close a server session. Waits for the reply but ignores failures.
    pub fn signout(&self, session_id: i64) {
        if let Err(err) = self.call(move |client| async move { client.signout(session_id).await })
        {
            tracing::debug!(session_id, error = %err, "signout failed");
        }
    }

    /// Drop the RPC client, channel and socket.
    ///
    /// Pending requests complete with an RPC failure before this returns.
    /// Idempotent. The event loop stays up for a later [`open`](Connection::open).
    pub fn close(&mut self) {
        let Some(link) = self.link.take() else {
            return;
        };
        self.address = None;
        link.cancel.cancel();
        link.tasks.close();

        match &self.event_loop {
            Some(event_loop) if !event_loop.is_current() => {
                let Link { client, tasks, .. } = link;
                let drained = event_loop.run_and_wait(async move {
                    tasks.wait().await;
                    drop(client);
                });
                if let Err(err) = drained {
                    tracing::debug!(error = %err, "event loop gone during close");
                }
            }
            // On the loop thread (closed from a callback) or without a loop:
            // cancelled tasks finish on their own.
            _ => drop(link),
        }
        tracing::debug!("connection closed");
    }

    /// Move this connection's state into a new value, leaving `self` empty.
    #[must_use]
    pub fn take(&mut self) -> Connection {
        Connection {
            factory: Arc::clone(&self.factory),
            error_handler: Arc::clone(&self.error_handler),
            event_loop: self.event_loop.take(),
            link: self.link.take(),
            address: self.address.take(),
        }
    }

    /// Close `self`, then take over `other`'s state.
    pub fn assign(&mut self, mut other: Connection) {
        self.close();
        self.factory = Arc::clone(&other.factory);
        self.error_handler = Arc::clone(&other.error_handler);
        self.event_loop = other.event_loop.take();
        self.link = other.link.take();
        self.address = other.address.take();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.address)
            .field("has_client", &self.link.is_some())
            .field("event_loop", &self.event_loop)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::LinkChannel;
    use async_trait::async_trait;
    use graph_protocol::{DataSet, ErrorCode, Value};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::time::Duration;

    struct StubClient {
        accept_version: bool,
    }

    #[async_trait]
    impl GraphClient for StubClient {
        async fn authenticate(&self, username: &str, _: &str) -> Result<AuthResponse, RpcError> {
            if username == "root" {
                Ok(AuthResponse::succeeded(42))
            } else {
                Ok(AuthResponse::error(
                    ErrorCode::BadUsernamePassword,
                    "bad credentials",
                ))
            }
        }

        async fn signout(&self, _: i64) -> Result<(), RpcError> {
            Ok(())
        }

        async fn execute(&self, _: i64, stmt: &str) -> Result<ExecutionResponse, RpcError> {
            match stmt {
                "HANG" => std::future::pending().await,
                "BROKEN" => Err(RpcError::Remote("socket reset".into())),
                _ => {
                    let mut data = DataSet::new(["1"]);
                    data.push_row(vec![Value::Int(1)])
                        .map_err(|e| RpcError::Decode(e.to_string()))?;
                    Ok(ExecutionResponse::succeeded(10, Some(data), None))
                }
            }
        }

        async fn execute_with_parameter(
            &self,
            session_id: i64,
            stmt: &str,
            _: &ParameterMap,
        ) -> Result<ExecutionResponse, RpcError> {
            self.execute(session_id, stmt).await
        }

        async fn execute_json(&self, _: i64, _: &str) -> Result<String, RpcError> {
            Ok("{}".to_string())
        }

        async fn execute_json_with_parameter(
            &self,
            _: i64,
            _: &str,
            _: &ParameterMap,
        ) -> Result<String, RpcError> {
            Err(RpcError::Remote("unsupported".into()))
        }

        async fn verify_client_version(
            &self,
            _: &VerifyClientVersionRequest,
        ) -> Result<VerifyClientVersionResponse, RpcError> {
            if self.accept_version {
                Ok(VerifyClientVersionResponse::succeeded())
            } else {
                Ok(VerifyClientVersionResponse::error(
                    ErrorCode::ClientServerIncompatible,
                    "version rejected",
                ))
            }
        }
    }

    fn factory(accept_version: bool) -> Arc<dyn GraphClientFactory> {
        Arc::new(move |_: LinkChannel| {
            Arc::new(StubClient { accept_version }) as Arc<dyn GraphClient>
        })
    }

    fn listener() -> (TcpListener, HostAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, HostAddr::new("127.0.0.1", port))
    }

    fn options() -> ConnectOptions {
        ConnectOptions::new().timeout(Duration::from_secs(2))
    }

    #[test]
    fn test_requests_before_open_are_disconnected() {
        let conn = Connection::new(factory(true));
        assert_eq!(conn.execute(1, "YIELD 1").error_code, ErrorCode::Disconnected);
        assert_eq!(
            conn.authenticate("root", "x").error_code,
            ErrorCode::Disconnected
        );
        assert_eq!(conn.execute_json(1, "YIELD 1"), "");
        assert!(matches!(
            conn.try_execute_json(1, "YIELD 1"),
            Err(ClientError::Disconnected)
        ));
        assert!(!conn.ping());
        conn.signout(1);
    }

    #[test]
    fn test_async_without_link_runs_inline() {
        let conn = Connection::new(factory(true));
        let caller = std::thread::current().id();
        let (tx, rx) = mpsc::channel();
        conn.async_execute(1, "YIELD 1", move |resp| {
            let _ = tx.send((resp.error_code, std::thread::current().id()));
        });
        let (code, thread) = rx.try_recv().unwrap();
        assert_eq!(code, ErrorCode::Disconnected);
        assert_eq!(thread, caller);
    }

    #[test]
    fn test_open_rejects_empty_host() {
        let mut conn = Connection::new(factory(true));
        let result = conn.open(&HostAddr::new("", 9669), &options());
        assert!(matches!(result, Err(ConnectError::EmptyAddress)));
    }

    #[test]
    fn test_open_refused() {
        let addr = {
            let (_listener, addr) = listener();
            addr
        };
        let mut conn = Connection::new(factory(true));
        assert!(matches!(
            conn.open(&addr, &options()),
            Err(ConnectError::Transport(_))
        ));
        assert!(!conn.has_client());
    }

    #[test]
    fn test_open_execute_close() {
        let (_listener, addr) = listener();
        let mut conn = Connection::new(factory(true));
        conn.open(&addr, &options()).unwrap();
        assert_eq!(conn.address(), Some(&addr));

        let auth = conn.authenticate("root", "nebula");
        assert_eq!(auth.session_id, Some(42));

        let resp = conn.execute(42, "YIELD 1");
        assert!(resp.is_succeeded());
        assert_eq!(resp.data.unwrap().rows()[0].values(), &[Value::Int(1)]);
        assert!(conn.ping());

        conn.close();
        conn.close();
        assert!(!conn.ping());
        assert_eq!(conn.execute(42, "YIELD 1").error_code, ErrorCode::Disconnected);
    }

    #[test]
    fn test_rpc_error_becomes_rpc_failure() {
        let (_listener, addr) = listener();
        let mut conn = Connection::new(factory(true));
        conn.open(&addr, &options()).unwrap();

        let resp = conn.execute(42, "BROKEN");
        assert_eq!(resp.error_code, ErrorCode::RpcFailure);
        assert_eq!(resp.error_msg.as_deref(), Some("remote error: socket reset"));

        assert_eq!(conn.execute_json_with_parameter(42, "x", &ParameterMap::new()), "");
        assert!(matches!(
            conn.try_execute_json_with_parameter(42, "x", &ParameterMap::new()),
            Err(ClientError::Rpc(RpcError::Remote(_)))
        ));
    }

    #[test]
    fn test_handshake_rejection_leaves_connection_empty() {
        let (_listener, addr) = listener();
        let mut conn = Connection::new(factory(false));
        let err = conn.open(&addr, &options()).unwrap_err();
        assert!(matches!(
            err,
            ConnectError::Handshake {
                code: ErrorCode::ClientServerIncompatible,
                ..
            }
        ));
        assert!(!conn.has_client());
        assert_eq!(conn.execute(1, "YIELD 1").error_code, ErrorCode::Disconnected);
    }

    #[test]
    fn test_async_callback_runs_on_loop() {
        let (_listener, addr) = listener();
        let mut conn = Connection::new(factory(true));
        conn.open(&addr, &options()).unwrap();

        let (tx, rx) = mpsc::channel();
        conn.async_execute(42, "YIELD 1", move |resp| {
            let name = std::thread::current().name().map(str::to_string);
            let _ = tx.send((resp.error_code, name));
        });
        let (code, name) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(code, ErrorCode::Succeeded);
        assert_eq!(name.as_deref(), Some(crate::event_loop::LOOP_THREAD_NAME));
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn test_close_fails_pending_callbacks() {
        let (_listener, addr) = listener();
        let mut conn = Connection::new(factory(true));
        conn.open(&addr, &options()).unwrap();

        let (tx, rx) = mpsc::channel();
        conn.async_execute(42, "HANG", move |resp| {
            let _ = tx.send(resp.error_code);
        });
        conn.close();
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            ErrorCode::RpcFailure
        );
    }

    #[test]
    fn test_blocking_call_from_callback_does_not_deadlock() {
        let (_listener, addr) = listener();
        let mut conn = Connection::new(factory(true));
        conn.open(&addr, &options()).unwrap();
        let conn = Arc::new(conn);

        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&conn);
        conn.async_execute(42, "YIELD 1", move |_| {
            let _ = tx.send(inner.execute(42, "YIELD 1").error_code);
            drop(inner);
        });
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            ErrorCode::RpcFailure
        );
    }

    #[test]
    fn test_take_and_assign() {
        let (_listener, addr) = listener();
        let mut source = Connection::new(factory(true));
        source.open(&addr, &options()).unwrap();

        let moved = source.take();
        assert!(!source.has_client());
        assert_eq!(source.execute(1, "YIELD 1").error_code, ErrorCode::Disconnected);
        assert!(moved.ping());

        let mut target = Connection::new(factory(true));
        target.open(&addr, &options()).unwrap();
        target.assign(moved);
        assert!(target.ping());
        assert_eq!(target.address(), Some(&addr));
    }
}
