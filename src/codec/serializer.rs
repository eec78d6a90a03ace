//! Bidirectional JSON codecs for backend value types.
//!
//! # Responsibilities
//! - Define the serializer contract: value → JSON, JSON → value, schema
//! - Custom serializer for the structured party-name identity
//!
//! # Design Decisions
//! - Custom serializers own canonicalization: the party name renders to a
//!   single normalized string and parses that string back to an equal value
//! - Schemas are JSON-Schema-shaped fragments, fixed per serializer and
//!   independent of instance data

use std::collections::HashSet;

use serde_json::{json, Value};
use thiserror::Error;

use crate::catalog::party::PartyName;
use crate::catalog::types::DomainType;
use crate::catalog::value::DomainValue;

/// Registry key of the built-in party-name serializer.
pub const PARTY_NAME_TYPE: &str = "PartyName";

/// Error raised while converting between domain values and JSON.
#[derive(Debug, Error)]
pub enum CodecError {
    /// No custom serializer is registered and the catalog cannot describe
    /// the type structurally.
    #[error("no serializer available for type '{0}'")]
    UnsupportedType(DomainType),

    /// Inbound JSON does not match the expected shape.
    #[error("cannot deserialize {expected} from JSON fragment {fragment}")]
    Deserialization { expected: String, fragment: Value },

    /// An outbound value does not match the type it is encoded as.
    #[error("cannot encode value as '{type_name}': {reason}")]
    Encoding { type_name: String, reason: String },

    /// The owning registry was dropped while a serializer was still in use.
    #[error("serializer registry is no longer available")]
    RegistryUnavailable,
}

impl CodecError {
    pub fn deserialization(expected: impl Into<String>, fragment: &Value) -> Self {
        CodecError::Deserialization {
            expected: expected.into(),
            fragment: fragment.clone(),
        }
    }

    pub fn encoding(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        CodecError::Encoding {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }
}

/// Tracks which types are currently being expanded during schema synthesis.
///
/// A type that recurses into itself resolves to a `$ref` stub instead of
/// expanding again.
#[derive(Debug, Default)]
pub struct SchemaTrace {
    in_progress: HashSet<DomainType>,
}

impl SchemaTrace {
    /// Mark a type as being expanded. Returns false when it already is,
    /// meaning the caller must emit a reference stub.
    pub fn enter(&mut self, name: &DomainType) -> bool {
        self.in_progress.insert(name.clone())
    }

    pub fn exit(&mut self, name: &DomainType) {
        self.in_progress.remove(name);
    }

    /// The reference stub emitted for a type already being expanded.
    pub fn reference(name: &DomainType) -> Value {
        json!({ "$ref": format!("#/definitions/{name}") })
    }
}

/// Bidirectional JSON codec plus schema producer for one domain type.
pub trait TypeSerializer: Send + Sync {
    fn to_json(&self, value: &DomainValue) -> Result<Value, CodecError>;

    fn from_json(&self, json: &Value) -> Result<DomainValue, CodecError>;

    /// JSON-Schema-shaped description of the wire form. Stable across calls.
    fn schema(&self) -> Value {
        self.schema_traced(&mut SchemaTrace::default())
    }

    /// Schema synthesis entry point threading the recursion trace.
    fn schema_traced(&self, trace: &mut SchemaTrace) -> Value;
}

/// Custom serializer rendering party names as their canonical string.
#[derive(Debug, Default)]
pub struct PartyNameSerializer;

impl PartyNameSerializer {
    pub fn value_type() -> DomainType {
        DomainType::new(PARTY_NAME_TYPE)
    }
}

impl TypeSerializer for PartyNameSerializer {
    fn to_json(&self, value: &DomainValue) -> Result<Value, CodecError> {
        match value {
            DomainValue::Party(name) => Ok(Value::String(name.to_string())),
            other => Err(CodecError::encoding(
                PARTY_NAME_TYPE,
                format!("expected a party name, got {}", other.kind()),
            )),
        }
    }

    fn from_json(&self, json: &Value) -> Result<DomainValue, CodecError> {
        match json {
            Value::String(text) => PartyName::parse(text)
                .map(DomainValue::Party)
                .map_err(|_| CodecError::deserialization("party name", json)),
            other => Err(CodecError::deserialization("party name string", other)),
        }
    }

    fn schema_traced(&self, _trace: &mut SchemaTrace) -> Value {
        json!({ "type": "string" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn party_name_round_trip_uses_canonical_form() {
        let serializer = PartyNameSerializer;
        let parsed = PartyName::parse("O=Bank,L=London,C=GB").unwrap();

        let encoded = serializer.to_json(&DomainValue::Party(parsed.clone())).unwrap();
        assert_eq!(encoded, Value::String("O=Bank, L=London, C=GB".into()));

        let decoded = serializer
            .from_json(&Value::String("O=Bank, L=London, C=GB".into()))
            .unwrap();
        assert_eq!(decoded, DomainValue::Party(parsed));
    }

    #[test]
    fn party_name_schema_is_a_plain_string() {
        assert_eq!(PartyNameSerializer.schema(), json!({ "type": "string" }));
    }

    #[test]
    fn malformed_party_name_carries_the_fragment() {
        let err = PartyNameSerializer
            .from_json(&Value::String("not a name".into()))
            .unwrap_err();
        match err {
            CodecError::Deserialization { fragment, .. } => {
                assert_eq!(fragment, Value::String("not a name".into()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn wrong_json_shape_is_rejected() {
        assert!(matches!(
            PartyNameSerializer.from_json(&json!(42)),
            Err(CodecError::Deserialization { .. })
        ));
    }
}
