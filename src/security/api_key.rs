//! Built-in shared-key security scheme.
//!
//! # Responsibilities
//! - Load the expected key by reference from a configured file
//! - Check `Authorization: Bearer <key>` on every request
//!
//! # Design Decisions
//! - Missing header is 401, wrong key is 403; the distinction matters for
//!   clients deciding whether to attach credentials or give up
//! - The expected key lives in an erased-on-drop buffer for the process
//!   lifetime; comparison never copies it out

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};

use crate::config::node::ConfigNode;
use crate::config::path::ConfigPath;
use crate::secret::Secret;
use crate::security::scheme::{SecurityHandlerFactory, SecuritySetupError};
use crate::security::{Identity, SecurityHandler, SecurityRejection};

/// Scheme name for `security.handler`.
pub const API_KEY_SCHEME: &str = "api-key";

/// Factory for the shared-key scheme.
///
/// Reads `security.key_file` (resolved against the scheme's config
/// subtree) and matches its content against bearer tokens.
pub struct ApiKeyFactory;

impl SecurityHandlerFactory for ApiKeyFactory {
    fn scheme_name(&self) -> &'static str {
        API_KEY_SCHEME
    }

    fn create_security_handler(
        &self,
        config: &dyn ConfigNode,
    ) -> Result<Arc<dyn SecurityHandler>, SecuritySetupError> {
        let path = PathBuf::from(config.get_string(&ConfigPath::new("security.key_file"))?);
        let expected = Secret::from_file(&path)
            .map_err(|source| SecuritySetupError::KeyMaterial { path, source })?;
        Ok(Arc::new(ApiKeyHandler { expected }))
    }
}

struct ApiKeyHandler {
    expected: Secret,
}

// `SecurityHandler::authorize` is an `#[async_trait]` method, so its returned
// future must be `Send`. The body here performs no `.await`, but holding
// `&Request<Body>` inside the generated async block would make the future
// non-`Send` (`Request<Body>` is not `Sync`). We therefore desugar the method
// by hand: the synchronous header check runs before the future is created, and
// only the owned `Result` (which is `Send`) is moved into the boxed future.
// Behaviour is identical to the equivalent `async fn`.
impl SecurityHandler for ApiKeyHandler {
    fn authorize<'life0, 'life1, 'async_trait>(
        &'life0 self,
        request: &'life1 Request<Body>,
    ) -> Pin<
        Box<dyn Future<Output = Result<Identity, SecurityRejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        let result = (|| {
            let header = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(|| {
                    SecurityRejection::Unauthenticated("missing Authorization header".into())
                })?;

            let token = header.strip_prefix("Bearer ").ok_or_else(|| {
                SecurityRejection::Unauthenticated(
                    "Authorization header is not a bearer token".into(),
                )
            })?;

            if self.expected.matches(token.as_bytes()) {
                Ok(Identity {
                    subject: API_KEY_SCHEME.into(),
                    scheme: API_KEY_SCHEME.into(),
                })
            } else {
                Err(SecurityRejection::Forbidden("API key not recognised".into()))
            }
        })();
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> ApiKeyHandler {
        ApiKeyHandler {
            expected: Secret::new(b"valid-key".to_vec()),
        }
    }

    fn request(auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/node/info");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn accepts_the_configured_key() {
        let identity = handler()
            .authorize(&request(Some("Bearer valid-key")))
            .await
            .unwrap();
        assert_eq!(identity.scheme, API_KEY_SCHEME);
    }

    #[tokio::test]
    async fn missing_credentials_are_unauthenticated() {
        assert!(matches!(
            handler().authorize(&request(None)).await,
            Err(SecurityRejection::Unauthenticated(_))
        ));
    }

    #[tokio::test]
    async fn wrong_key_is_forbidden() {
        assert!(matches!(
            handler().authorize(&request(Some("Bearer stolen"))).await,
            Err(SecurityRejection::Forbidden(_))
        ));
    }
}
