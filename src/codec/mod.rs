//! Type-directed JSON serialization subsystem.
//!
//! # Data Flow
//! ```text
//! DomainType (registry key)
//!     → registry.rs (custom match → structural fallback → memoized)
//!     → serializer.rs (TypeSerializer: to_json / from_json / schema)
//!
//! Custom serializers registered at startup
//!     → exact-match by type token, own their canonical form
//! Catalog type descriptors
//!     → structural serializer walking declared fields recursively
//! ```
//!
//! # Design Decisions
//! - Resolution order is fixed: explicit custom serializer first, generic
//!   structural serializer second, failure only when neither applies
//! - Serializers are built lazily on first request, memoized for the
//!   process lifetime, never evicted
//! - Schema synthesis threads a visited-type trace so recursive types
//!   resolve to `$ref` stubs instead of recursing forever

pub mod registry;
pub mod serializer;

pub use registry::{SerializerRegistry, SerializerRegistryBuilder};
pub use serializer::{CodecError, PartyNameSerializer, SchemaTrace, TypeSerializer, PARTY_NAME_TYPE};
