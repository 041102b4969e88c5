//! Request and response envelopes.
//!
//! Fields are public so callers can inspect results directly, but responses
//! should be built through the constructors, which keep `error_msg` present
//! exactly when `error_code` is not [`ErrorCode::Succeeded`].

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::error_code::ErrorCode;
use crate::value::DataSet;
use crate::{CLIENT_VERSION, NOT_OPEN_MESSAGE};

fn check_invariant(code: ErrorCode, msg: &Option<String>) -> Result<(), ProtocolError> {
    if code.is_succeeded() == msg.is_none() {
        Ok(())
    } else {
        Err(ProtocolError::InconsistentResponse {
            code: code.code(),
            has_message: msg.is_some(),
        })
    }
}

/// Description of the execution plan, returned for `EXPLAIN`/`PROFILE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDescription {
    /// Rendering format (e.g. `row`, `dot`).
    pub format: String,
    /// Rendered plan.
    pub description: String,
}

/// Result of an authentication request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Outcome.
    pub error_code: ErrorCode,
    /// Server-assigned session id, present on success.
    pub session_id: Option<i64>,
    /// Failure description.
    pub error_msg: Option<String>,
}

impl AuthResponse {
    /// Successful authentication.
    #[must_use]
    pub fn succeeded(session_id: i64) -> Self {
        Self {
            error_code: ErrorCode::Succeeded,
            session_id: Some(session_id),
            error_msg: None,
        }
    }

    /// Failed authentication.
    #[must_use]
    pub fn error(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self {
            error_code: code,
            session_id: None,
            error_msg: Some(msg.into()),
        }
    }

    /// Response used when no connection is open.
    #[must_use]
    pub fn disconnected() -> Self {
        Self::error(ErrorCode::Disconnected, NOT_OPEN_MESSAGE)
    }

    /// Response wrapping an RPC failure.
    #[must_use]
    pub fn rpc_failure(msg: impl Into<String>) -> Self {
        Self::error(ErrorCode::RpcFailure, msg)
    }

    /// Check the message/code invariant.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        check_invariant(self.error_code, &self.error_msg)
    }
}

/// Result of a statement execution.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionResponse {
    /// Outcome.
    pub error_code: ErrorCode,
    /// Server-side latency in microseconds.
    pub latency_us: i64,
    /// Tabular result, if the statement produced one.
    pub data: Option<DataSet>,
    /// Execution plan, for `EXPLAIN`/`PROFILE`.
    pub plan_desc: Option<PlanDescription>,
    /// Failure description.
    pub error_msg: Option<String>,
}

impl ExecutionResponse {
    /// Successful execution.
    #[must_use]
    pub fn succeeded(
        latency_us: i64,
        data: Option<DataSet>,
        plan_desc: Option<PlanDescription>,
    ) -> Self {
        Self {
            error_code: ErrorCode::Succeeded,
            latency_us,
            data,
            plan_desc,
            error_msg: None,
        }
    }

    /// Failed execution.
    #[must_use]
    pub fn error(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self {
            error_code: code,
            latency_us: 0,
            data: None,
            plan_desc: None,
            error_msg: Some(msg.into()),
        }
    }

    /// Response used when no connection is open.
    #[must_use]
    pub fn disconnected() -> Self {
        Self::error(ErrorCode::Disconnected, NOT_OPEN_MESSAGE)
    }

    /// Response wrapping an RPC failure.
    #[must_use]
    pub fn rpc_failure(msg: impl Into<String>) -> Self {
        Self::error(ErrorCode::RpcFailure, msg)
    }

    /// Whether the execution succeeded.
    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        self.error_code.is_succeeded()
    }

    /// Check the message/code invariant.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        check_invariant(self.error_code, &self.error_msg)
    }
}

/// Version handshake request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyClientVersionRequest {
    /// Client protocol version.
    pub version: String,
}

impl Default for VerifyClientVersionRequest {
    fn default() -> Self {
        Self {
            version: CLIENT_VERSION.to_string(),
        }
    }
}

/// Version handshake response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VerifyClientVersionResponse {
    /// Outcome.
    pub error_code: ErrorCode,
    /// Failure description.
    pub error_msg: Option<String>,
}

impl VerifyClientVersionResponse {
    /// Accepted handshake.
    #[must_use]
    pub fn succeeded() -> Self {
        Self::default()
    }

    /// Rejected handshake.
    #[must_use]
    pub fn error(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self {
            error_code: code,
            error_msg: Some(msg.into()),
        }
    }

    /// Response used when no connection is open.
    #[must_use]
    pub fn disconnected() -> Self {
        Self::error(ErrorCode::Disconnected, NOT_OPEN_MESSAGE)
    }

    /// Check the message/code invariant.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        check_invariant(self.error_code, &self.error_msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_uphold_invariant() {
        assert!(AuthResponse::succeeded(7).validate().is_ok());
        assert!(AuthResponse::disconnected().validate().is_ok());
        assert!(ExecutionResponse::succeeded(0, None, None).validate().is_ok());
        assert!(ExecutionResponse::rpc_failure("boom").validate().is_ok());
        assert!(VerifyClientVersionResponse::succeeded().validate().is_ok());
    }

    #[test]
    fn test_invariant_violation_detected() {
        let resp = ExecutionResponse {
            error_code: ErrorCode::SyntaxError,
            ..Default::default()
        };
        assert_eq!(
            resp.validate(),
            Err(ProtocolError::InconsistentResponse {
                code: -1004,
                has_message: false
            })
        );
    }

    #[test]
    fn test_disconnected_message() {
        let resp = ExecutionResponse::disconnected();
        assert_eq!(resp.error_code, ErrorCode::Disconnected);
        assert_eq!(resp.error_msg.as_deref(), Some(NOT_OPEN_MESSAGE));
        assert!(resp.data.is_none());
    }

    #[test]
    fn test_default_version_request() {
        assert_eq!(VerifyClientVersionRequest::default().version, CLIENT_VERSION);
    }
}
