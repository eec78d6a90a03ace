//! Response construction and the JSON error envelope.
//!
//! # Responsibilities
//! - Map every per-request failure onto a consistent envelope:
//!   `{"error": <kind>, "message": <string>, "details": <optional>}`
//! - Map error kinds onto HTTP status codes
//!
//! # Design Decisions
//! - Per-request failures never leak stack traces or internal state; the
//!   envelope carries at most the offending JSON fragment
//! - Startup-time failures do not pass through here; they abort before the
//!   listener binds

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::catalog::node::NodeError;
use crate::codec::serializer::CodecError;

/// A per-request failure rendered as the JSON error envelope.
#[derive(Debug)]
pub enum ApiError {
    /// Inbound body or fragment did not match the expected shape.
    Deserialization { message: String, details: Option<Value> },
    /// Credentials missing.
    Unauthenticated(String),
    /// Credentials present but not acceptable.
    Forbidden(String),
    /// A named thing (type, record, operation) does not exist.
    NotFound(String),
    /// No descriptor matched the request path.
    RouteNotFound(String),
    /// The path matched but the handler does not serve this method.
    MethodNotAllowed(String),
    /// A type with neither a custom serializer nor structural description.
    UnsupportedType(String),
    /// Anything else; reported without internal detail.
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Deserialization { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) | ApiError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::UnsupportedType(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable kind used in the envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Deserialization { .. } => "deserialization",
            ApiError::Unauthenticated(_) => "unauthenticated",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::RouteNotFound(_) => "route_not_found",
            ApiError::MethodNotAllowed(_) => "method_not_allowed",
            ApiError::UnsupportedType(_) => "unsupported_type",
            ApiError::Internal(_) => "internal",
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::Deserialization { message, .. } => message,
            ApiError::Unauthenticated(message)
            | ApiError::Forbidden(message)
            | ApiError::NotFound(message)
            | ApiError::RouteNotFound(message)
            | ApiError::MethodNotAllowed(message)
            | ApiError::UnsupportedType(message)
            | ApiError::Internal(message) => message,
        }
    }

    fn details(&self) -> Option<&Value> {
        match self {
            ApiError::Deserialization { details, .. } => details.as_ref(),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = ErrorEnvelope {
            error: self.kind(),
            message: self.message(),
            details: self.details(),
        };
        (self.status(), Json(&envelope)).into_response()
    }
}

impl From<CodecError> for ApiError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Deserialization { expected, fragment } => ApiError::Deserialization {
                message: format!("cannot deserialize {expected}"),
                details: Some(fragment),
            },
            CodecError::UnsupportedType(name) => {
                ApiError::UnsupportedType(format!("no serializer available for type '{name}'"))
            }
            CodecError::Encoding { type_name, .. } => {
                ApiError::Internal(format!("failed to encode response value as '{type_name}'"))
            }
            CodecError::RegistryUnavailable => {
                ApiError::Internal("serializer registry is no longer available".into())
            }
        }
    }
}

impl From<NodeError> for ApiError {
    fn from(err: NodeError) -> Self {
        match err {
            NodeError::UnknownRecordType(_) | NodeError::UnknownOperation { .. } => {
                ApiError::NotFound(err.to_string())
            }
            NodeError::Operation(message) => {
                ApiError::Internal(format!("node operation failed: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_mapping_follows_the_error_kind() {
        assert_eq!(
            ApiError::Deserialization { message: "x".into(), details: None }.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Unauthenticated("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::RouteNotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::UnsupportedType("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn deserialization_errors_keep_the_offending_fragment() {
        let err: ApiError = CodecError::deserialization("party name", &json!("bogus")).into();
        match &err {
            ApiError::Deserialization { details, .. } => {
                assert_eq!(details.as_ref().unwrap(), &json!("bogus"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
