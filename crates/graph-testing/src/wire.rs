//! JSON message shapes exchanged between the mock server and client.
//!
//! Each request frame carries one [`Request`]; the response frame carries a
//! [`Reply`] wrapping the operation's typed response.

use graph_protocol::ParameterMap;
use serde::{Deserialize, Serialize};

/// A request to the mock service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Request {
    /// Open a session.
    Authenticate {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
    /// Close a session.
    Signout {
        /// Session to close.
        session_id: i64,
    },
    /// Run a statement, replying with an `ExecutionResponse`.
    Execute {
        /// Owning session.
        session_id: i64,
        /// Statement text.
        stmt: String,
        /// Named parameters.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        params: Option<ParameterMap>,
    },
    /// Run a statement, replying with JSON text.
    ExecuteJson {
        /// Owning session.
        session_id: i64,
        /// Statement text.
        stmt: String,
        /// Named parameters.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        params: Option<ParameterMap>,
    },
    /// Version handshake.
    VerifyClientVersion {
        /// Client protocol version.
        version: String,
    },
}

impl Request {
    /// Operation name, for logs.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::Authenticate { .. } => "authenticate",
            Self::Signout { .. } => "signout",
            Self::Execute { .. } => "execute",
            Self::ExecuteJson { .. } => "execute_json",
            Self::VerifyClientVersion { .. } => "verify_client_version",
        }
    }
}

/// Reply envelope: the typed response, or a service-level failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reply<T> {
    /// The operation produced a response.
    Ok(T),
    /// The request could not be served.
    Err(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_protocol::Value;

    #[test]
    fn test_request_is_tagged_by_method() {
        let req = Request::Execute {
            session_id: 3,
            stmt: "YIELD 1".into(),
            params: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "method": "execute", "session_id": 3, "stmt": "YIELD 1" })
        );
    }

    #[test]
    fn test_request_with_params_decodes() {
        let raw = r#"{"method":"execute_json","session_id":1,"stmt":"YIELD $p AS p","params":{"p":5}}"#;
        let req: Request = serde_json::from_str(raw).unwrap();
        let Request::ExecuteJson { params, .. } = req else {
            panic!("wrong variant");
        };
        assert_eq!(params.unwrap().get("p"), Some(&Value::Int(5)));
    }

    #[test]
    fn test_reply_envelope() {
        let ok: Reply<i64> = serde_json::from_str(r#"{"ok":7}"#).unwrap();
        assert_eq!(ok, Reply::Ok(7));
        let err: Reply<i64> = serde_json::from_str(r#"{"err":"bad"}"#).unwrap();
        assert_eq!(err, Reply::Err("bad".into()));
    }
}
