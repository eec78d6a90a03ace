//! Backend node boundary: type catalog and node client.
//!
//! # Data Flow
//! ```text
//! backend node
//!     → node.rs (NodeCatalog: modules, operations, type descriptors)
//!     → codec registry (structural serializers from descriptors)
//!     → http handlers (endpoints derived per record type / operation)
//!
//! per request:
//!     handler → node.rs (NodeClient: query records, execute operation)
//!             → value.rs (DomainValue crossing the boundary)
//! ```
//!
//! # Design Decisions
//! - The gateway never discovers types itself; the catalog supplies
//!   everything, as statically-known field descriptors
//! - Descriptors are plain data, so catalogs can be assembled from any
//!   source (an embedded node, a remote handshake, test fixtures)
//! - Domain values are an explicit enum, not reflection over host types

pub mod node;
pub mod party;
pub mod types;
pub mod value;

pub use node::{ModuleInfo, NodeCatalog, NodeClient, NodeError, OperationInfo, RecordInfo, StaticCatalog};
pub use party::PartyName;
pub use types::{DomainType, FieldDescriptor, TypeDescriptor, TypeRef};
pub use value::DomainValue;
