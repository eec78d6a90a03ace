//! Catalog and client contracts for the backend node.
//!
//! # Responsibilities
//! - Describe what the node offers: modules, record types, operations
//! - Supply structural type descriptors for the serializer registry
//! - Define the per-request client seam the HTTP handlers call
//!
//! # Design Decisions
//! - Both contracts are traits so the gateway core never depends on how the
//!   node is reached; deployments plug in their own implementations
//! - `StaticCatalog` assembles a catalog from plain descriptor data, which
//!   is also how tests build fixtures

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::catalog::types::{DomainType, TypeDescriptor};
use crate::catalog::value::DomainValue;

/// Error raised by the backend node while serving a request.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("record type '{0}' is not served by this node")]
    UnknownRecordType(DomainType),
    #[error("operation '{module}/{name}' is not served by this node")]
    UnknownOperation { module: String, name: String },
    #[error("node operation failed: {0}")]
    Operation(String),
}

/// Metadata for one module deployed on the node.
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    /// Short name used to construct API endpoint paths.
    pub short_name: String,
    pub records: Vec<RecordInfo>,
    pub operations: Vec<OperationInfo>,
}

/// One record type a module holds.
#[derive(Debug, Clone)]
pub struct RecordInfo {
    pub record_type: DomainType,
}

/// One operation a module exposes.
#[derive(Debug, Clone)]
pub struct OperationInfo {
    pub name: String,
    pub input_type: DomainType,
    pub output_type: DomainType,
}

/// Single access point for descriptive information about the backend node.
///
/// The gateway derives its endpoints and serializers from this; it never
/// inspects the node directly.
pub trait NodeCatalog: Send + Sync {
    /// All modules deployed on the node.
    fn modules(&self) -> Vec<ModuleInfo>;

    /// Structural descriptor for a named type, if the node declares one.
    fn type_descriptor(&self, name: &DomainType) -> Option<TypeDescriptor>;

    /// All named types the catalog can describe.
    fn type_names(&self) -> Vec<DomainType>;
}

/// Per-request access to the node's data and operations.
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Identity document describing the node itself.
    async fn node_info(&self) -> Result<DomainValue, NodeError>;

    /// Fetch records of a type, optionally narrowed by an opaque key.
    async fn query_records(
        &self,
        record_type: &DomainType,
        key: Option<&str>,
    ) -> Result<Vec<DomainValue>, NodeError>;

    /// Execute a named operation with a decoded input value.
    async fn execute_operation(
        &self,
        module: &str,
        operation: &str,
        input: DomainValue,
    ) -> Result<DomainValue, NodeError>;
}

/// A catalog assembled from statically-known descriptor data.
pub struct StaticCatalog {
    modules: Vec<ModuleInfo>,
    types: HashMap<DomainType, TypeDescriptor>,
}

impl StaticCatalog {
    pub fn new(modules: Vec<ModuleInfo>, descriptors: Vec<TypeDescriptor>) -> Self {
        let types = descriptors
            .into_iter()
            .map(|descriptor| (descriptor.name.clone(), descriptor))
            .collect();
        Self { modules, types }
    }
}

impl NodeCatalog for StaticCatalog {
    fn modules(&self) -> Vec<ModuleInfo> {
        self.modules.clone()
    }

    fn type_descriptor(&self, name: &DomainType) -> Option<TypeDescriptor> {
        self.types.get(name).cloned()
    }

    fn type_names(&self) -> Vec<DomainType> {
        let mut names: Vec<_> = self.types.keys().cloned().collect();
        names.sort();
        names
    }
}
