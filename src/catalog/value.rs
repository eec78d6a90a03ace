//! Runtime representation of backend domain values.

use std::collections::BTreeMap;

use crate::catalog::party::PartyName;
use crate::catalog::types::DomainType;

/// A value crossing the node boundary, tagged with enough structure for the
/// serializer registry to encode it without host-language reflection.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainValue {
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Text(String),
    Party(PartyName),
    List(Vec<DomainValue>),
    Record {
        type_name: DomainType,
        fields: BTreeMap<String, DomainValue>,
    },
}

impl DomainValue {
    /// Build a record value from field pairs.
    pub fn record(
        type_name: impl Into<DomainType>,
        fields: impl IntoIterator<Item = (&'static str, DomainValue)>,
    ) -> Self {
        DomainValue::Record {
            type_name: type_name.into(),
            fields: fields
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        DomainValue::Text(value.into())
    }

    /// Short label of the value's shape, used in codec error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainValue::Bool(_) => "boolean",
            DomainValue::Int(_) => "int",
            DomainValue::Long(_) => "long",
            DomainValue::Double(_) => "double",
            DomainValue::Text(_) => "text",
            DomainValue::Party(_) => "party name",
            DomainValue::List(_) => "list",
            DomainValue::Record { .. } => "record",
        }
    }
}
