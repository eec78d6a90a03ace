//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! configured key store + trust store (PEM, referenced by path)
//!     → tls.rs (load at startup, build rustls ServerConfig)
//!     → axum-server terminates TLS in front of the request pipeline
//! ```
//!
//! # Design Decisions
//! - All store loading happens at startup; a broken store prevents the
//!   listener from binding rather than serving plaintext
//! - Raw key material passes through the scoped-secret helper and is
//!   erased once the TLS context holds its own copy

pub mod tls;

pub use tls::{SecureTransport, TransportError};
