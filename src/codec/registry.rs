//! Serializer resolution and memoization.
//!
//! # Responsibilities
//! - Select a serializer for a type: custom first, structural fallback next
//! - Synthesize structural serializers from catalog descriptors
//! - Memoize every resolution for the process lifetime
//!
//! # Design Decisions
//! - Custom serializers are collected into an immutable map before the
//!   server starts; nothing registers after that
//! - The cache populates lazily under the map's shard lock, so concurrent
//!   first use neither duplicates work nor observes a half-built entry
//! - Structural serializers resolve their field serializers per call
//!   through the registry, which is what makes recursive types work

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use serde_json::{json, Map, Value};

use crate::catalog::node::NodeCatalog;
use crate::catalog::types::{DomainType, TypeDescriptor, TypeRef};
use crate::catalog::value::DomainValue;
use crate::codec::serializer::{CodecError, SchemaTrace, TypeSerializer};

/// Collects custom serializer contributions before the registry is built.
#[derive(Default)]
pub struct SerializerRegistryBuilder {
    custom: HashMap<DomainType, Arc<dyn TypeSerializer>>,
}

impl SerializerRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom serializer for an exact type token.
    pub fn with_custom(
        mut self,
        type_name: impl Into<DomainType>,
        serializer: impl TypeSerializer + 'static,
    ) -> Self {
        self.custom.insert(type_name.into(), Arc::new(serializer));
        self
    }

    /// Freeze the contributions against a catalog.
    pub fn build(self, catalog: Arc<dyn NodeCatalog>) -> SerializerRegistry {
        SerializerRegistry {
            inner: Arc::new(RegistryInner {
                custom: self.custom,
                catalog,
                cache: DashMap::new(),
            }),
        }
    }
}

/// Selects, synthesizes and memoizes [`TypeSerializer`]s by type token.
#[derive(Clone)]
pub struct SerializerRegistry {
    inner: Arc<RegistryInner>,
}

pub(crate) struct RegistryInner {
    custom: HashMap<DomainType, Arc<dyn TypeSerializer>>,
    catalog: Arc<dyn NodeCatalog>,
    cache: DashMap<DomainType, Arc<dyn TypeSerializer>>,
}

impl SerializerRegistry {
    /// Resolve the serializer for a type.
    ///
    /// Fails with [`CodecError::UnsupportedType`] only when no custom
    /// serializer matches and the catalog has no structural description.
    pub fn get_serializer(
        &self,
        type_name: &DomainType,
    ) -> Result<Arc<dyn TypeSerializer>, CodecError> {
        self.inner.resolve(type_name)
    }

    /// Every type this registry can serialize: custom registrations plus
    /// catalog-described types, sorted by name.
    pub fn known_types(&self) -> Vec<DomainType> {
        let mut names: Vec<_> = self.inner.custom.keys().cloned().collect();
        names.extend(self.inner.catalog.type_names());
        names.sort();
        names.dedup();
        names
    }
}

impl RegistryInner {
    fn resolve(self: &Arc<Self>, type_name: &DomainType) -> Result<Arc<dyn TypeSerializer>, CodecError> {
        // Resolution order: exact custom match wins over the structural
        // fallback, regardless of what the catalog declares.
        if let Some(serializer) = self.custom.get(type_name) {
            return Ok(Arc::clone(serializer));
        }
        if let Some(cached) = self.cache.get(type_name) {
            return Ok(Arc::clone(cached.value()));
        }

        let descriptor = self
            .catalog
            .type_descriptor(type_name)
            .ok_or_else(|| CodecError::UnsupportedType(type_name.clone()))?;

        // entry() holds the shard lock while the serializer is built, so a
        // concurrent first request for the same type waits instead of
        // building a duplicate.
        let entry = self
            .cache
            .entry(type_name.clone())
            .or_insert_with(|| {
                Arc::new(StructuralSerializer {
                    descriptor,
                    registry: Arc::downgrade(self),
                })
            });
        Ok(Arc::clone(entry.value()))
    }
}

/// Generic fallback serializer walking a type's declared fields.
struct StructuralSerializer {
    descriptor: TypeDescriptor,
    registry: Weak<RegistryInner>,
}

impl StructuralSerializer {
    fn registry(&self) -> Result<Arc<RegistryInner>, CodecError> {
        self.registry.upgrade().ok_or(CodecError::RegistryUnavailable)
    }

    fn encode_field(
        &self,
        registry: &Arc<RegistryInner>,
        field_type: &TypeRef,
        value: &DomainValue,
    ) -> Result<Value, CodecError> {
        match (field_type, value) {
            (TypeRef::Boolean, DomainValue::Bool(b)) => Ok(json!(b)),
            (TypeRef::Int, DomainValue::Int(n)) => Ok(json!(n)),
            (TypeRef::Long, DomainValue::Long(n)) => Ok(json!(n)),
            (TypeRef::Double, DomainValue::Double(x)) => Ok(json!(x)),
            (TypeRef::Text, DomainValue::Text(s)) => Ok(json!(s)),
            (TypeRef::List(inner), DomainValue::List(items)) => items
                .iter()
                .map(|item| self.encode_field(registry, inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            (TypeRef::Object(name), value) => registry.resolve(name)?.to_json(value),
            (expected, actual) => Err(CodecError::encoding(
                self.descriptor.name.name(),
                format!("expected {}, got {}", type_ref_label(expected), actual.kind()),
            )),
        }
    }

    fn decode_field(
        &self,
        registry: &Arc<RegistryInner>,
        field_type: &TypeRef,
        json: &Value,
    ) -> Result<DomainValue, CodecError> {
        match (field_type, json) {
            (TypeRef::Boolean, Value::Bool(b)) => Ok(DomainValue::Bool(*b)),
            (TypeRef::Int, Value::Number(n)) => n
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(DomainValue::Int)
                .ok_or_else(|| CodecError::deserialization("32-bit integer", json)),
            (TypeRef::Long, Value::Number(n)) => n
                .as_i64()
                .map(DomainValue::Long)
                .ok_or_else(|| CodecError::deserialization("64-bit integer", json)),
            (TypeRef::Double, Value::Number(n)) => n
                .as_f64()
                .map(DomainValue::Double)
                .ok_or_else(|| CodecError::deserialization("number", json)),
            (TypeRef::Text, Value::String(s)) => Ok(DomainValue::Text(s.clone())),
            (TypeRef::List(inner), Value::Array(items)) => items
                .iter()
                .map(|item| self.decode_field(registry, inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(DomainValue::List),
            (TypeRef::Object(name), value) => registry.resolve(name)?.from_json(value),
            (expected, fragment) => {
                Err(CodecError::deserialization(type_ref_label(expected), fragment))
            }
        }
    }

    fn field_schema(&self, registry: &Arc<RegistryInner>, field_type: &TypeRef, trace: &mut SchemaTrace) -> Value {
        match field_type {
            TypeRef::Boolean => json!({ "type": "boolean" }),
            TypeRef::Int | TypeRef::Long => json!({ "type": "integer" }),
            TypeRef::Double => json!({ "type": "number" }),
            TypeRef::Text => json!({ "type": "string" }),
            TypeRef::List(inner) => {
                json!({ "type": "array", "items": self.field_schema(registry, inner, trace) })
            }
            TypeRef::Object(name) => match registry.resolve(name) {
                Ok(serializer) => serializer.schema_traced(trace),
                // A field type neither registered nor described; encoding
                // would fail at runtime, the schema stays permissive.
                Err(_) => json!({}),
            },
        }
    }
}

impl TypeSerializer for StructuralSerializer {
    fn to_json(&self, value: &DomainValue) -> Result<Value, CodecError> {
        let registry = self.registry()?;
        let type_name = &self.descriptor.name;

        let fields = match value {
            DomainValue::Record { type_name: actual, fields } if actual == type_name => fields,
            DomainValue::Record { type_name: actual, .. } => {
                return Err(CodecError::encoding(
                    type_name.name(),
                    format!("value is a record of type '{actual}'"),
                ));
            }
            other => {
                return Err(CodecError::encoding(
                    type_name.name(),
                    format!("expected a record, got {}", other.kind()),
                ));
            }
        };

        let mut object = Map::new();
        for field in &self.descriptor.fields {
            match fields.get(&field.name) {
                Some(value) => {
                    let encoded = self.encode_field(&registry, &field.field_type, value)?;
                    object.insert(field.name.clone(), encoded);
                }
                None if field.mandatory => {
                    return Err(CodecError::encoding(
                        type_name.name(),
                        format!("missing mandatory field '{}'", field.name),
                    ));
                }
                None => {}
            }
        }
        Ok(Value::Object(object))
    }

    fn from_json(&self, json: &Value) -> Result<DomainValue, CodecError> {
        let registry = self.registry()?;
        let type_name = &self.descriptor.name;

        let object = json
            .as_object()
            .ok_or_else(|| CodecError::deserialization(format!("'{type_name}' object"), json))?;

        let mut fields = std::collections::BTreeMap::new();
        for field in &self.descriptor.fields {
            match object.get(&field.name) {
                Some(value) => {
                    let decoded = self.decode_field(&registry, &field.field_type, value)?;
                    fields.insert(field.name.clone(), decoded);
                }
                None if field.mandatory => {
                    return Err(CodecError::deserialization(
                        format!("mandatory field '{}' of '{type_name}'", field.name),
                        json,
                    ));
                }
                None => {}
            }
        }

        Ok(DomainValue::Record {
            type_name: type_name.clone(),
            fields,
        })
    }

    fn schema_traced(&self, trace: &mut SchemaTrace) -> Value {
        let type_name = &self.descriptor.name;
        if !trace.enter(type_name) {
            return SchemaTrace::reference(type_name);
        }

        let registry = match self.registry() {
            Ok(registry) => registry,
            Err(_) => {
                trace.exit(type_name);
                return json!({});
            }
        };

        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &self.descriptor.fields {
            properties.insert(
                field.name.clone(),
                self.field_schema(&registry, &field.field_type, trace),
            );
            if field.mandatory {
                required.push(json!(field.name));
            }
        }
        trace.exit(type_name);

        let mut schema = Map::new();
        schema.insert("type".into(), json!("object"));
        schema.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".into(), Value::Array(required));
        }
        Value::Object(schema)
    }
}

fn type_ref_label(field_type: &TypeRef) -> String {
    match field_type {
        TypeRef::Boolean => "boolean".into(),
        TypeRef::Int => "32-bit integer".into(),
        TypeRef::Long => "64-bit integer".into(),
        TypeRef::Double => "number".into(),
        TypeRef::Text => "string".into(),
        TypeRef::List(inner) => format!("list of {}", type_ref_label(inner)),
        TypeRef::Object(name) => format!("'{name}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::node::StaticCatalog;
    use crate::catalog::party::PartyName;
    use crate::catalog::types::FieldDescriptor;
    use crate::codec::serializer::{PartyNameSerializer, PARTY_NAME_TYPE};

    fn test_registry() -> SerializerRegistry {
        let descriptors = vec![
            TypeDescriptor::new(
                "Holding",
                vec![
                    FieldDescriptor::mandatory("owner", TypeRef::Object(DomainType::new(PARTY_NAME_TYPE))),
                    FieldDescriptor::mandatory("quantity", TypeRef::Long),
                    FieldDescriptor::optional("memo", TypeRef::Text),
                ],
            ),
            // a self-referential type: each entry links to its predecessor
            TypeDescriptor::new(
                "ChainEntry",
                vec![
                    FieldDescriptor::mandatory("label", TypeRef::Text),
                    FieldDescriptor::optional(
                        "previous",
                        TypeRef::Object(DomainType::new("ChainEntry")),
                    ),
                ],
            ),
        ];
        let catalog = Arc::new(StaticCatalog::new(Vec::new(), descriptors));
        SerializerRegistryBuilder::new()
            .with_custom(PARTY_NAME_TYPE, PartyNameSerializer)
            .build(catalog)
    }

    fn holding() -> DomainValue {
        DomainValue::record(
            "Holding",
            [
                (
                    "owner",
                    DomainValue::Party(PartyName::parse("O=Bank,L=London,C=GB").unwrap()),
                ),
                ("quantity", DomainValue::Long(1200)),
                ("memo", DomainValue::text("settles T+2")),
            ],
        )
    }

    #[test]
    fn custom_serializer_wins_over_structural_fallback() {
        let registry = test_registry();
        let serializer = registry
            .get_serializer(&DomainType::new(PARTY_NAME_TYPE))
            .unwrap();
        assert_eq!(serializer.schema(), json!({ "type": "string" }));
    }

    #[test]
    fn structural_round_trip() {
        let registry = test_registry();
        let serializer = registry.get_serializer(&DomainType::new("Holding")).unwrap();

        let value = holding();
        let encoded = serializer.to_json(&value).unwrap();
        assert_eq!(
            encoded,
            json!({
                "owner": "O=Bank, L=London, C=GB",
                "quantity": 1200,
                "memo": "settles T+2"
            })
        );
        assert_eq!(serializer.from_json(&encoded).unwrap(), value);
    }

    #[test]
    fn structural_schema_lists_fields_and_required() {
        let registry = test_registry();
        let schema = registry
            .get_serializer(&DomainType::new("Holding"))
            .unwrap()
            .schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["owner"], json!({ "type": "string" }));
        assert_eq!(schema["properties"]["quantity"], json!({ "type": "integer" }));
        assert_eq!(schema["required"], json!(["owner", "quantity"]));
    }

    #[test]
    fn schema_is_stable_across_calls() {
        let registry = test_registry();
        let serializer = registry.get_serializer(&DomainType::new("Holding")).unwrap();
        assert_eq!(serializer.schema(), serializer.schema());
    }

    #[test]
    fn recursive_type_resolves_to_a_reference_stub() {
        let registry = test_registry();
        let schema = registry
            .get_serializer(&DomainType::new("ChainEntry"))
            .unwrap()
            .schema();
        assert_eq!(
            schema["properties"]["previous"],
            json!({ "$ref": "#/definitions/ChainEntry" })
        );
    }

    #[test]
    fn recursive_value_round_trip() {
        let registry = test_registry();
        let serializer = registry.get_serializer(&DomainType::new("ChainEntry")).unwrap();

        let value = DomainValue::record(
            "ChainEntry",
            [
                ("label", DomainValue::text("head")),
                (
                    "previous",
                    DomainValue::record("ChainEntry", [("label", DomainValue::text("tail"))]),
                ),
            ],
        );
        let encoded = serializer.to_json(&value).unwrap();
        assert_eq!(
            encoded,
            json!({ "label": "head", "previous": { "label": "tail" } })
        );
        assert_eq!(serializer.from_json(&encoded).unwrap(), value);
    }

    #[test]
    fn unknown_type_is_unsupported() {
        let registry = test_registry();
        assert!(matches!(
            registry.get_serializer(&DomainType::new("Mystery")),
            Err(CodecError::UnsupportedType(_))
        ));
    }

    #[test]
    fn missing_mandatory_field_fails_deserialization() {
        let registry = test_registry();
        let serializer = registry.get_serializer(&DomainType::new("Holding")).unwrap();
        let err = serializer
            .from_json(&json!({ "owner": "O=Bank, L=London, C=GB" }))
            .unwrap_err();
        assert!(matches!(err, CodecError::Deserialization { .. }));
    }

    #[test]
    fn repeated_resolution_returns_the_memoized_serializer() {
        let registry = test_registry();
        let first = registry.get_serializer(&DomainType::new("Holding")).unwrap();
        let second = registry.get_serializer(&DomainType::new("Holding")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
