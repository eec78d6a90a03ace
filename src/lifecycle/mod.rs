//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → resolve settings → run every config contributor
//!     → freeze dispatch table + pipeline → bind listener
//!
//! Shutdown (shutdown.rs):
//!     SIGINT/SIGTERM → broadcast → stop accepting → drain → exit
//! ```
//!
//! # Design Decisions
//! - Contributors all run to completion before the listener binds; no
//!   inbound connection can observe partial configuration
//! - Any contributor error is fatal and names the failing component
//! - Shutdown is coordinated through one broadcast channel

pub mod shutdown;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{Gateway, GatewayBuilder, ServerConfigContributor, StartupError};
