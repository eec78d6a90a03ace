//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection (net layer terminates TLS when configured)
//!     → server.rs (axum setup, timeout/limit/trace layers)
//!     → security evaluation (when a scheme is configured)
//!     → router.rs (exact-over-prefix dispatch table)
//!     → handlers.rs (node records, operations, schemas)
//!     → response.rs (JSON bodies, error envelope)
//! ```
//!
//! # Design Decisions
//! - One catch-all axum route feeds the gateway's own dispatch table, so
//!   route precedence is owned by router.rs, not the framework
//! - Pipeline order is structural: transport wraps security wraps routing,
//!   identically for every request
//! - Handlers are contributed declaratively; the dispatch table is built
//!   once at startup and immutable afterwards

pub mod handlers;
pub mod response;
pub mod router;
pub mod server;

pub use response::ApiError;
pub use router::{
    ApiRequest, EndpointDescriptor, MatchMode, RequestHandler, RequestRouter, RouteError,
};
pub use server::HttpServer;
