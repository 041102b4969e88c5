//! Connection tests against the in-process mock service.

use std::io::Write;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use graph_client::{
    ConnectError, ConnectOptions, Connection, ErrorCode, ErrorHandler, HostAddr, ParameterMap,
    RpcError, Value,
};
use graph_testing::{DEFAULT_PASSWORD, DEFAULT_USERNAME, JsonGraphClient, MockGraphServer};
use parking_lot::Mutex;

fn options() -> ConnectOptions {
    ConnectOptions::new().timeout(Duration::from_secs(3))
}

fn open(server: &MockGraphServer) -> (Connection, i64) {
    graph_testing::init_tracing();
    let mut conn = Connection::new(JsonGraphClient::factory());
    conn.open(&server.host_addr(), &options()).unwrap();
    let auth = conn.authenticate(DEFAULT_USERNAME, DEFAULT_PASSWORD);
    assert_eq!(auth.error_code, ErrorCode::Succeeded);
    (conn, auth.session_id.unwrap())
}

#[derive(Default)]
struct Recorder {
    operations: Mutex<Vec<&'static str>>,
    connect_failures: Mutex<usize>,
}

impl ErrorHandler for Recorder {
    fn on_connect_error(&self, _: &HostAddr, _: &ConnectError) {
        *self.connect_failures.lock() += 1;
    }

    fn on_rpc_error(&self, _: Option<&HostAddr>, operation: &'static str, _: &RpcError) {
        self.operations.lock().push(operation);
    }
}

#[test]
fn test_execute_before_open_is_disconnected() {
    let conn = Connection::new(JsonGraphClient::factory());
    let resp = conn.execute(0, "YIELD 1");
    assert_eq!(resp.error_code, ErrorCode::Disconnected);
    assert_eq!(resp.error_msg.as_deref(), Some("Not open connection."));
    assert!(!conn.ping());
}

#[test]
fn test_yield_one_round_trip() {
    let server = MockGraphServer::start().unwrap();
    let (conn, session_id) = open(&server);

    let resp = conn.execute(session_id, "YIELD 1");
    assert!(resp.is_succeeded());
    let data = resp.data.unwrap();
    assert_eq!(data.column_names(), ["1".to_string()]);
    assert_eq!(data.len(), 1);
    assert_eq!(data.rows()[0].values(), &[Value::Int(1)]);
    assert!(conn.ping());
    assert!(conn.is_open());
}

#[test]
fn test_bad_credentials() {
    let server = MockGraphServer::start().unwrap();
    let mut conn = Connection::new(JsonGraphClient::factory());
    conn.open(&server.host_addr(), &options()).unwrap();

    let auth = conn.authenticate("root", "wrong");
    assert_eq!(auth.error_code, ErrorCode::BadUsernamePassword);
    assert!(auth.session_id.is_none());
    assert!(auth.error_msg.is_some());
}

#[test]
fn test_unknown_session_is_server_error() {
    let server = MockGraphServer::start().unwrap();
    let (conn, _) = open(&server);
    let resp = conn.execute(9999, "YIELD 1");
    assert_eq!(resp.error_code, ErrorCode::SessionInvalid);
}

#[test]
fn test_async_execute_delivers_once() {
    let server = MockGraphServer::start().unwrap();
    let (conn, session_id) = open(&server);

    let (tx, rx) = mpsc::channel();
    conn.async_execute(session_id, "YIELD 1", move |resp| {
        let _ = tx.send(resp);
    });

    let resp = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(resp.is_succeeded());
    assert_eq!(resp.data.unwrap().rows()[0].values(), &[Value::Int(1)]);
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
}

#[test]
fn test_close_is_idempotent() {
    let server = MockGraphServer::start().unwrap();
    let (mut conn, session_id) = open(&server);

    conn.close();
    conn.close();
    assert_eq!(
        conn.execute(session_id, "YIELD 1").error_code,
        ErrorCode::Disconnected
    );
    assert!(!conn.ping());

    let (tx, rx) = mpsc::channel();
    conn.async_execute(session_id, "YIELD 1", move |resp| {
        let _ = tx.send(resp.error_code);
    });
    assert_eq!(rx.try_recv().unwrap(), ErrorCode::Disconnected);
}

#[test]
fn test_reopen_after_close() {
    let server = MockGraphServer::start().unwrap();
    let (mut conn, _) = open(&server);
    conn.close();

    conn.open(&server.host_addr(), &options()).unwrap();
    let auth = conn.authenticate(DEFAULT_USERNAME, DEFAULT_PASSWORD);
    let resp = conn.execute(auth.session_id.unwrap(), "YIELD 1");
    assert!(resp.is_succeeded());
    assert_eq!(server.connections_accepted(), 2);
}

#[test]
fn test_version_rejected() {
    let server = MockGraphServer::builder()
        .reject_version(true)
        .start()
        .unwrap();
    let recorder = Arc::new(Recorder::default());
    let mut conn =
        Connection::new(JsonGraphClient::factory()).with_error_handler(recorder.clone());

    let err = conn.open(&server.host_addr(), &options()).unwrap_err();
    assert!(matches!(
        err,
        ConnectError::Handshake {
            code: ErrorCode::ClientServerIncompatible,
            ..
        }
    ));
    assert!(!conn.has_client());
    assert_eq!(*recorder.connect_failures.lock(), 1);
}

#[test]
fn test_request_timeout_is_rpc_failure() {
    let server = MockGraphServer::start().unwrap();
    let mut conn = Connection::new(JsonGraphClient::factory());
    conn.open(
        &server.host_addr(),
        &ConnectOptions::new().timeout(Duration::from_millis(200)),
    )
    .unwrap();
    let auth = conn.authenticate(DEFAULT_USERNAME, DEFAULT_PASSWORD);

    let resp = conn.execute(auth.session_id.unwrap(), "SLEEP 1000");
    assert_eq!(resp.error_code, ErrorCode::RpcFailure);
    assert!(resp.error_msg.unwrap().contains("timed out"));
}

#[test]
fn test_dropped_link_reports_rpc_failure() {
    let server = MockGraphServer::start().unwrap();
    let recorder = Arc::new(Recorder::default());
    let mut conn =
        Connection::new(JsonGraphClient::factory()).with_error_handler(recorder.clone());
    conn.open(&server.host_addr(), &options()).unwrap();
    let session_id = conn
        .authenticate(DEFAULT_USERNAME, DEFAULT_PASSWORD)
        .session_id
        .unwrap();

    server.drop_connections();
    let resp = conn.execute(session_id, "YIELD 1");
    assert_eq!(resp.error_code, ErrorCode::RpcFailure);
    assert!(!conn.ping());
    assert!(recorder.operations.lock().contains(&"execute"));
}

#[test]
fn test_json_result_parses() {
    let server = MockGraphServer::start().unwrap();
    let (conn, session_id) = open(&server);

    let text = conn.execute_json(session_id, "YIELD 1");
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["errors"][0]["code"], 0);
    assert_eq!(json["results"][0]["data"][0]["row"][0], 1);

    let text = conn.try_execute_json(session_id, "YIELD 1").unwrap();
    assert!(serde_json::from_str::<serde_json::Value>(&text).is_ok());

    let (tx, rx) = mpsc::channel();
    conn.async_execute_json(session_id, "YIELD 1", move |text| {
        let _ = tx.send(text);
    });
    let text = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(serde_json::from_str::<serde_json::Value>(&text).is_ok());
}

#[test]
fn test_json_failure_is_empty_string() {
    let server = MockGraphServer::start().unwrap();
    let (conn, session_id) = open(&server);
    server.drop_connections();

    assert_eq!(conn.execute_json(session_id, "YIELD 1"), "");
    assert!(conn.try_execute_json(session_id, "YIELD 1").is_err());
}

#[test]
fn test_parameters() {
    let server = MockGraphServer::start().unwrap();
    let (conn, session_id) = open(&server);

    let mut params = ParameterMap::new();
    params.insert("var".to_string(), Value::Int(42));

    let resp = conn.execute_with_parameter(session_id, "YIELD $var AS var", &params);
    assert!(resp.is_succeeded());
    let data = resp.data.unwrap();
    assert_eq!(data.column_index("var"), Some(0));
    assert_eq!(data.rows()[0].values(), &[Value::Int(42)]);

    let missing = conn.execute(session_id, "YIELD $var AS var");
    assert_eq!(missing.error_code, ErrorCode::SemanticError);

    let text = conn.execute_json_with_parameter(session_id, "YIELD $var AS var", &params);
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["results"][0]["data"][0]["row"][0], 42);

    let (tx, rx) = mpsc::channel();
    conn.async_execute_with_parameter(session_id, "YIELD $var AS var", &params, move |resp| {
        let _ = tx.send(resp);
    });
    let resp = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(resp.data.unwrap().rows()[0].values(), &[Value::Int(42)]);
}

#[test]
fn test_explain_returns_plan() {
    let server = MockGraphServer::start().unwrap();
    let (conn, session_id) = open(&server);

    let resp = conn.execute(session_id, "EXPLAIN YIELD 1");
    assert!(resp.is_succeeded());
    assert!(resp.data.is_none());
    assert!(resp.plan_desc.is_some());
}

#[test]
fn test_signout_ends_session() {
    let server = MockGraphServer::start().unwrap();
    let (conn, session_id) = open(&server);
    assert_eq!(server.active_sessions(), 1);

    conn.signout(session_id);
    assert_eq!(server.active_sessions(), 0);
    assert_eq!(
        conn.execute(session_id, "YIELD 1").error_code,
        ErrorCode::SessionInvalid
    );
}

#[test]
fn test_unreachable_address() {
    let addr = {
        let server = MockGraphServer::start().unwrap();
        server.host_addr()
    };
    let mut conn = Connection::new(JsonGraphClient::factory());
    assert!(matches!(
        conn.open(&addr, &options()),
        Err(ConnectError::Transport(_))
    ));
    assert_eq!(conn.execute(0, "YIELD 1").error_code, ErrorCode::Disconnected);
}

const TEST_CA: &str = include_str!("../../graph-tls/testdata/ca.pem");

fn ca_bundle() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(TEST_CA.as_bytes()).unwrap();
    file
}

#[test]
fn test_tls_handshake_against_plain_server_fails() {
    let server = MockGraphServer::start().unwrap();
    let bundle = ca_bundle();
    let tls_options = options().enable_ssl(true).ca_path(bundle.path());

    let mut conn = Connection::new(JsonGraphClient::factory());
    let started = Instant::now();
    let err = conn.open(&server.host_addr(), &tls_options).unwrap_err();
    assert!(matches!(err, ConnectError::Transport(_)), "{err:?}");
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(!conn.has_client());
    assert_eq!(conn.execute(0, "YIELD 1").error_code, ErrorCode::Disconnected);

    // The failed handshake leaves the connection reusable over plain TCP.
    conn.open(&server.host_addr(), &options()).unwrap();
    assert!(conn.ping());
}

#[test]
fn test_tls_with_missing_bundle_fails_before_connecting() {
    let server = MockGraphServer::start().unwrap();
    let tls_options = options()
        .enable_ssl(true)
        .ca_path("/nonexistent/graph-ca.pem");

    let mut conn = Connection::new(JsonGraphClient::factory());
    let err = conn.open(&server.host_addr(), &tls_options).unwrap_err();
    assert!(matches!(err, ConnectError::Transport(_)), "{err:?}");
    assert_eq!(server.connections_accepted(), 0);
}
