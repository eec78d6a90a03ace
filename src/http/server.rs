//! HTTP server setup and the request pipeline.
//!
//! # Responsibilities
//! - Hold the frozen pipeline: optional TLS transport, optional security
//!   stage, router
//! - Wire up middleware (timeout, body limit, access tracing)
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - The pipeline order is structural and identical for every request:
//!   TLS termination, then security evaluation, then routing; no request
//!   can reach the router without passing the stages outside it
//! - One catch-all axum route funnels everything into the gateway's own
//!   dispatch table
//! - Binding happens last, after assembly froze every contribution

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::http::response::ApiError;
use crate::http::router::{ApiRequest, RequestRouter};
use crate::observability::metrics;
use crate::security::SecurityHandler;

/// The fixed three-slot request pipeline, assembled once at startup.
///
/// Transport is always outermost when present, security always directly
/// inside it, the router always innermost.
pub struct Pipeline {
    pub transport: Option<rustls::ServerConfig>,
    pub security: Option<Arc<dyn SecurityHandler>>,
    pub router: Arc<RequestRouter>,
}

/// State injected into the dispatch handler.
#[derive(Clone)]
struct GatewayState {
    router: Arc<RequestRouter>,
    security: Option<Arc<dyn SecurityHandler>>,
    max_body_bytes: u64,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    bind_address: SocketAddr,
    pipeline: Pipeline,
    request_timeout: Duration,
    max_body_bytes: u64,
}

impl HttpServer {
    pub fn new(
        bind_address: SocketAddr,
        pipeline: Pipeline,
        request_timeout: Duration,
        max_body_bytes: u64,
    ) -> Self {
        Self {
            bind_address,
            pipeline,
            request_timeout,
            max_body_bytes,
        }
    }

    /// The dispatch table behind this server.
    pub fn router(&self) -> Arc<RequestRouter> {
        Arc::clone(&self.pipeline.router)
    }

    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    fn build_app(&self) -> Router {
        let state = GatewayState {
            router: Arc::clone(&self.pipeline.router),
            security: self.pipeline.security.clone(),
            max_body_bytes: self.max_body_bytes,
        };
        Router::new()
            .route("/", any(dispatch))
            .route("/{*path}", any(dispatch))
            .with_state(state)
            .layer(TimeoutLayer::new(self.request_timeout))
            .layer(RequestBodyLimitLayer::new(self.max_body_bytes as usize))
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the listener and serve until the shutdown signal fires.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let app = self.build_app();

        match self.pipeline.transport {
            Some(tls) => {
                let config = RustlsConfig::from_config(Arc::new(tls));
                let handle = axum_server::Handle::new();
                let drain_handle = handle.clone();
                tokio::spawn(async move {
                    let _ = shutdown.recv().await;
                    drain_handle.graceful_shutdown(Some(Duration::from_secs(10)));
                });

                tracing::info!(address = %self.bind_address, "HTTPS server starting");
                axum_server::bind_rustls(self.bind_address, config)
                    .handle(handle)
                    .serve(app.into_make_service())
                    .await?;
            }
            None => {
                let listener = TcpListener::bind(self.bind_address).await?;
                tracing::info!(address = %self.bind_address, "HTTP server starting");
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown.recv().await;
                    })
                    .await?;
            }
        }

        tracing::info!("server stopped");
        Ok(())
    }
}

/// Pipeline entry point behind the catch-all route: security first, then
/// the dispatch table.
async fn dispatch(State(state): State<GatewayState>, request: Request<Body>) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let identity = match &state.security {
        Some(security) => match security.authorize(&request).await {
            Ok(identity) => Some(identity),
            Err(rejection) => {
                tracing::debug!(
                    request_id = %request_id,
                    path = %path,
                    reason = %rejection,
                    "request rejected by security"
                );
                metrics::record_security_rejection();
                let response = ApiError::from(rejection).into_response();
                metrics::record_request(method.as_str(), response.status().as_u16());
                return response;
            }
        },
        None => None,
    };

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_body_bytes as usize).await {
        Ok(bytes) => bytes,
        Err(err) => {
            let response = ApiError::Deserialization {
                message: format!("failed to read request body: {err}"),
                details: None,
            }
            .into_response();
            metrics::record_request(method.as_str(), response.status().as_u16());
            return response;
        }
    };

    let api_request = ApiRequest {
        request_id,
        method: parts.method.clone(),
        path,
        remainder: String::new(),
        query: parts.uri.query().map(ToString::to_string),
        body,
        identity,
    };

    let response = state.router.dispatch(api_request).await;
    metrics::record_request(parts.method.as_str(), response.status().as_u16());
    response
}
