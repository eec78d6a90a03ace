//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (structured fields, request ids)
//!     → metrics.rs (counters)
//!
//! Consumers:
//!     → log output via tracing-subscriber (configured in the binary)
//!     → Prometheus scrape endpoint (optional, off by default)
//! ```
//!
//! # Design Decisions
//! - Metric updates are cheap atomic increments; no per-request allocation
//!   beyond label strings
//! - The scrape endpoint is a deployment decision, not wired into the
//!   request pipeline

pub mod metrics;
