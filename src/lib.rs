//! REST/JSON gateway for a data-bearing backend node.

// Core subsystems
pub mod catalog;
pub mod codec;
pub mod config;
pub mod http;

// Transport and protection
pub mod net;
pub mod security;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod secret;

pub use config::GatewaySettings;
pub use http::HttpServer;
pub use lifecycle::{Gateway, Shutdown};
