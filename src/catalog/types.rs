//! Type tokens and structural descriptors for backend-defined types.

use std::fmt;

/// Opaque identifier for a backend value type.
///
/// Two tokens are equal exactly when they denote the same concrete type.
/// Used as the serializer registry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomainType(String);

impl DomainType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DomainType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for DomainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to a field's type inside a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Boolean,
    Int,
    Long,
    Double,
    Text,
    List(Box<TypeRef>),
    /// A named type resolved through the serializer registry.
    Object(DomainType),
}

/// One declared field of a structured type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: TypeRef,
    pub mandatory: bool,
}

impl FieldDescriptor {
    pub fn mandatory(name: impl Into<String>, field_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            field_type,
            mandatory: true,
        }
    }

    pub fn optional(name: impl Into<String>, field_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            field_type,
            mandatory: false,
        }
    }
}

/// Structural description of a named type: one entry per declared field.
///
/// Supplied by the catalog; the registry's generic serializer walks these
/// instead of reflecting over host types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub name: DomainType,
    pub fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<DomainType>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }
}

impl From<String> for DomainType {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}
