//! Security subsystem: pluggable authentication schemes.
//!
//! # Data Flow
//! ```text
//! configured scheme name ("api-key", ... or "none")
//!     → scheme registry (factories contributed at startup)
//!     → SecurityHandlerFactory.create_security_handler(scheme config)
//!     → SecurityHandler evaluated per request, before routing
//! ```
//!
//! # Design Decisions
//! - The gateway knows nothing scheme-specific; factories own credential
//!   formats and the handler owns the accept/reject decision
//! - No configured scheme is a valid deployment, logged loudly, never an
//!   error
//! - Rejections are ordinary per-request outcomes: missing credentials map
//!   to 401, refused credentials to 403

pub mod api_key;
pub mod scheme;

pub use api_key::ApiKeyFactory;
pub use scheme::{SecurityHandlerFactory, SecuritySchemeRegistry, SecuritySetupError};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use thiserror::Error;

use crate::http::response::ApiError;

/// Authenticated principal attached to requests that passed security.
#[derive(Debug, Clone)]
pub struct Identity {
    pub subject: String,
    pub scheme: String,
}

/// Ordinary per-request security outcome.
#[derive(Debug, Error)]
pub enum SecurityRejection {
    /// No usable credentials were presented.
    #[error("authentication required: {0}")]
    Unauthenticated(String),
    /// Credentials were presented and refused.
    #[error("access denied: {0}")]
    Forbidden(String),
}

impl From<SecurityRejection> for ApiError {
    fn from(rejection: SecurityRejection) -> Self {
        match rejection {
            SecurityRejection::Unauthenticated(message) => ApiError::Unauthenticated(message),
            SecurityRejection::Forbidden(message) => ApiError::Forbidden(message),
        }
    }
}

/// Evaluates authentication and authorization ahead of routing.
#[async_trait]
pub trait SecurityHandler: Send + Sync {
    async fn authorize(&self, request: &Request<Body>) -> Result<Identity, SecurityRejection>;
}
