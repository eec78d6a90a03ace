//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)                 embedded defaults (defaults.toml)
//!     → loader.rs (parse)                → loader.rs (parse)
//!     → TomlConfigNode (primary)         → TomlConfigNode (fallback)
//!             └──────────┬───────────────────────┘
//!                        ▼
//!              fallback.rs (layered resolver)
//!                        ▼
//!              schema.rs (typed GatewaySettings)
//!                        ▼
//!              shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is read-only once loaded; there is no reload path
//! - Lookups are pull-based: subsystems query at construction time
//! - The layered resolver is override-first: the file wins wherever it has
//!   a value, the embedded defaults answer everything else
//! - Scalar accessors are typed; malformed values fail with the offending
//!   path and raw string

pub mod fallback;
pub mod loader;
pub mod node;
pub mod path;
pub mod schema;
pub mod tree;

pub use fallback::FallbackConfigNode;
pub use node::{ConfigError, ConfigNode, EmptyConfigNode};
pub use path::ConfigPath;
pub use schema::GatewaySettings;
pub use tree::TomlConfigNode;
