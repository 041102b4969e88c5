//! Error codes returned by every client operation.
//!
//! Negative codes in the `-1..=-3` range are produced by the client itself;
//! codes at or below `-1000` come from the server and are forwarded verbatim.

use serde::{Deserialize, Serialize};

/// Outcome of a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
#[non_exhaustive]
pub enum ErrorCode {
    /// The request succeeded.
    #[default]
    Succeeded,
    /// No live connection or session is bound.
    Disconnected,
    /// The transport could not be established.
    FailToConnect,
    /// The RPC layer failed (I/O error, timeout, protocol violation).
    RpcFailure,
    /// Authentication was rejected.
    BadUsernamePassword,
    /// The session id is unknown to the server.
    SessionInvalid,
    /// The server-side session expired.
    SessionTimeout,
    /// The statement could not be parsed.
    SyntaxError,
    /// The statement failed during execution.
    ExecutionError,
    /// The statement was empty.
    StatementEmpty,
    /// The user lacks permission for the statement.
    BadPermission,
    /// The statement failed semantic validation.
    SemanticError,
    /// The server rejected the client protocol version.
    ClientServerIncompatible,
    /// Any other server code, forwarded untouched.
    Other(i32),
}

impl ErrorCode {
    /// Convert a raw wire code.
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Succeeded,
            -1 => Self::Disconnected,
            -2 => Self::FailToConnect,
            -3 => Self::RpcFailure,
            -1001 => Self::BadUsernamePassword,
            -1002 => Self::SessionInvalid,
            -1003 => Self::SessionTimeout,
            -1004 => Self::SyntaxError,
            -1005 => Self::ExecutionError,
            -1006 => Self::StatementEmpty,
            -1008 => Self::BadPermission,
            -1009 => Self::SemanticError,
            -1010 => Self::ClientServerIncompatible,
            other => Self::Other(other),
        }
    }

    /// Get the raw wire code.
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Succeeded => 0,
            Self::Disconnected => -1,
            Self::FailToConnect => -2,
            Self::RpcFailure => -3,
            Self::BadUsernamePassword => -1001,
            Self::SessionInvalid => -1002,
            Self::SessionTimeout => -1003,
            Self::SyntaxError => -1004,
            Self::ExecutionError => -1005,
            Self::StatementEmpty => -1006,
            Self::BadPermission => -1008,
            Self::SemanticError => -1009,
            Self::ClientServerIncompatible => -1010,
            Self::Other(code) => code,
        }
    }

    /// Whether this code means success.
    #[must_use]
    pub fn is_succeeded(self) -> bool {
        self == Self::Succeeded
    }

    /// Whether this code means the link itself is unusable.
    ///
    /// Only client-side transport codes qualify; server errors imply the
    /// server answered, so the connection is alive.
    #[must_use]
    pub fn is_transport_failure(self) -> bool {
        matches!(self, Self::RpcFailure | Self::Disconnected)
    }
}

impl From<i32> for ErrorCode {
    fn from(code: i32) -> Self {
        Self::from_code(code)
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Succeeded => "SUCCEEDED",
            Self::Disconnected => "E_DISCONNECTED",
            Self::FailToConnect => "E_FAIL_TO_CONNECT",
            Self::RpcFailure => "E_RPC_FAILURE",
            Self::BadUsernamePassword => "E_BAD_USERNAME_PASSWORD",
            Self::SessionInvalid => "E_SESSION_INVALID",
            Self::SessionTimeout => "E_SESSION_TIMEOUT",
            Self::SyntaxError => "E_SYNTAX_ERROR",
            Self::ExecutionError => "E_EXECUTION_ERROR",
            Self::StatementEmpty => "E_STATEMENT_EMPTY",
            Self::BadPermission => "E_BAD_PERMISSION",
            Self::SemanticError => "E_SEMANTIC_ERROR",
            Self::ClientServerIncompatible => "E_CLIENT_SERVER_INCOMPATIBLE",
            Self::Other(code) => return write!(f, "E_UNKNOWN({code})"),
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(ErrorCode::from_code(0), ErrorCode::Succeeded);
        assert_eq!(ErrorCode::from_code(-1), ErrorCode::Disconnected);
        assert_eq!(ErrorCode::from_code(-3), ErrorCode::RpcFailure);
        assert_eq!(ErrorCode::from_code(-1004), ErrorCode::SyntaxError);
        assert_eq!(ErrorCode::from_code(-4242), ErrorCode::Other(-4242));
    }

    #[test]
    fn test_transport_failure_classification() {
        assert!(ErrorCode::RpcFailure.is_transport_failure());
        assert!(ErrorCode::Disconnected.is_transport_failure());
        assert!(!ErrorCode::SessionInvalid.is_transport_failure());
        assert!(!ErrorCode::Succeeded.is_transport_failure());
    }

    #[test]
    fn test_serde_as_integer() {
        let json = serde_json::to_string(&ErrorCode::BadUsernamePassword).unwrap();
        assert_eq!(json, "-1001");
        let code: ErrorCode = serde_json::from_str("-1002").unwrap();
        assert_eq!(code, ErrorCode::SessionInvalid);
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorCode::Disconnected.to_string(), "E_DISCONNECTED");
        assert_eq!(ErrorCode::Other(-7).to_string(), "E_UNKNOWN(-7)");
    }

    proptest! {
        #[test]
        fn code_conversion_is_lossless(code in any::<i32>()) {
            prop_assert_eq!(ErrorCode::from_code(code).code(), code);
        }
    }
}
