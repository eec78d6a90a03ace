//! Route aggregation and dispatch.
//!
//! # Responsibilities
//! - Aggregate endpoint descriptors from independent contributors into one
//!   dispatch table
//! - Dispatch requests: exact match over prefix match, longest prefix wins
//! - Reject ambiguous registrations at build time
//!
//! # Design Decisions
//! - Immutable after construction; concurrent dispatch needs no locking
//! - Precedence rules, not registration order, govern every tie, so the
//!   non-deterministic order of contributors cannot change dispatch
//! - A prefix matches whole path segments: `/a` covers `/a` and `/a/b`,
//!   never `/ab`
//! - The router counts dispatches; stages outside it can verify that a
//!   rejected request never reached routing

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::http::response::ApiError;
use crate::security::Identity;

/// How a descriptor's path is matched against request paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Exact,
    Prefix,
}

/// Declarative binding of a path and match mode to a request handler.
#[derive(Clone)]
pub struct EndpointDescriptor {
    pub path: String,
    pub match_mode: MatchMode,
    /// Documented method; handlers enforce it and the API definition
    /// document lists it.
    pub method: Method,
    pub handler: Arc<dyn RequestHandler>,
}

impl EndpointDescriptor {
    pub fn exact(
        path: impl Into<String>,
        method: Method,
        handler: Arc<dyn RequestHandler>,
    ) -> Self {
        Self {
            path: path.into(),
            match_mode: MatchMode::Exact,
            method,
            handler,
        }
    }

    pub fn prefix(
        path: impl Into<String>,
        method: Method,
        handler: Arc<dyn RequestHandler>,
    ) -> Self {
        Self {
            path: path.into(),
            match_mode: MatchMode::Prefix,
            method,
            handler,
        }
    }
}

/// A matched request, decoded as far as the router takes it.
#[derive(Debug)]
pub struct ApiRequest {
    pub request_id: String,
    pub method: Method,
    pub path: String,
    /// Path remainder after a prefix match, without the leading slash;
    /// empty for exact matches.
    pub remainder: String,
    pub query: Option<String>,
    pub body: Bytes,
    pub identity: Option<Identity>,
}

/// One request handler behind a routed path.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, request: ApiRequest) -> Result<Response, ApiError>;
}

/// Error raised while building the dispatch table.
#[derive(Debug, Error)]
pub enum RouteError {
    /// Two descriptors claim the same path with the same match mode.
    /// Never resolved silently by registration order.
    #[error("ambiguous routing: multiple handlers claim {mode} path '{path}'")]
    Ambiguous { path: String, mode: &'static str },
}

/// Immutable dispatch table over contributed endpoint descriptors.
pub struct RequestRouter {
    exact: HashMap<String, Arc<dyn RequestHandler>>,
    /// Prefix entries sorted by descending path length, so the first match
    /// is the longest.
    prefixes: Vec<(String, Arc<dyn RequestHandler>)>,
    descriptors: Vec<(String, MatchMode, Method)>,
    dispatches: AtomicU64,
}

impl RequestRouter {
    /// Build the dispatch table, validating against ambiguous claims.
    pub fn build(descriptors: Vec<EndpointDescriptor>) -> Result<Self, RouteError> {
        let mut exact = HashMap::new();
        let mut prefixes: Vec<(String, Arc<dyn RequestHandler>)> = Vec::new();
        let mut summary = Vec::new();

        for descriptor in descriptors {
            summary.push((
                descriptor.path.clone(),
                descriptor.match_mode,
                descriptor.method.clone(),
            ));
            match descriptor.match_mode {
                MatchMode::Exact => {
                    if exact.insert(descriptor.path.clone(), descriptor.handler).is_some() {
                        return Err(RouteError::Ambiguous {
                            path: descriptor.path,
                            mode: "exact",
                        });
                    }
                }
                MatchMode::Prefix => {
                    if prefixes.iter().any(|(path, _)| *path == descriptor.path) {
                        return Err(RouteError::Ambiguous {
                            path: descriptor.path,
                            mode: "prefix",
                        });
                    }
                    prefixes.push((descriptor.path, descriptor.handler));
                }
            }
        }

        prefixes.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        summary.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(Self {
            exact,
            prefixes,
            descriptors: summary,
            dispatches: AtomicU64::new(0),
        })
    }

    /// Find the handler for a path. Exact matches win over any prefix;
    /// among prefixes the longest wins. Returns the handler and the path
    /// remainder after the matched prefix.
    fn match_path(&self, path: &str) -> Option<(&Arc<dyn RequestHandler>, String)> {
        if let Some(handler) = self.exact.get(path) {
            return Some((handler, String::new()));
        }
        for (prefix, handler) in &self.prefixes {
            if let Some(remainder) = prefix_remainder(prefix, path) {
                return Some((handler, remainder.to_string()));
            }
        }
        None
    }

    /// Dispatch a request to its matched handler.
    pub async fn dispatch(&self, mut request: ApiRequest) -> Response {
        self.dispatches.fetch_add(1, Ordering::Relaxed);

        let (handler, remainder) = match self.match_path(&request.path) {
            Some(found) => found,
            None => {
                tracing::debug!(
                    request_id = %request.request_id,
                    path = %request.path,
                    "no route matched"
                );
                return ApiError::RouteNotFound(format!("no API endpoint at '{}'", request.path))
                    .into_response();
            }
        };

        request.remainder = remainder;
        match handler.handle(request).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    }

    /// Number of requests that reached routing, matched or not.
    pub fn dispatch_count(&self) -> u64 {
        self.dispatches.load(Ordering::Relaxed)
    }

    /// Declared routes, sorted by path, for the API definition document.
    pub fn routes(&self) -> &[(String, MatchMode, Method)] {
        &self.descriptors
    }
}

/// Remainder of `path` after `prefix`, if the prefix matches on a whole
/// segment boundary. The remainder has no leading slash.
fn prefix_remainder<'a>(prefix: &str, path: &'a str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/') {
        Some(rest.trim_start_matches('/'))
    } else {
        None
    }
}
