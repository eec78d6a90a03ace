//! API endpoint handlers and their contributors.
//!
//! # Responsibilities
//! - Derive endpoints per discovered record type and operation
//! - Serve node info, per-type schemas and the API definition document
//! - Decode request bodies and encode responses through the registry
//!
//! # Design Decisions
//! - Contributors are declarative: each supplies descriptors, the server
//!   aggregates them; nothing registers a route after startup
//! - Handlers enforce their own method, the router only matches paths
//! - Every failure surfaces as the JSON error envelope, never a bare body

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::catalog::node::{NodeCatalog, NodeClient, OperationInfo};
use crate::catalog::types::DomainType;
use crate::catalog::value::DomainValue;
use crate::codec::registry::SerializerRegistry;
use crate::codec::serializer::{CodecError, PARTY_NAME_TYPE};
use crate::http::response::ApiError;
use crate::http::router::{ApiRequest, EndpointDescriptor, MatchMode, RequestHandler};

/// Contributes endpoint descriptors to the dispatch table.
///
/// Contributors are independent; registration order is irrelevant to
/// dispatch. Implementations range from fixed single handlers to factories
/// expanding one descriptor per discovered backend operation.
pub trait ApiContributor: Send + Sync {
    fn endpoints(&self) -> Vec<EndpointDescriptor>;
}

/// Encode a domain value by its own shape: records resolve through the
/// registry by type token, scalars encode directly.
pub fn encode_value(registry: &SerializerRegistry, value: &DomainValue) -> Result<Value, CodecError> {
    match value {
        DomainValue::Record { type_name, .. } => {
            registry.get_serializer(type_name)?.to_json(value)
        }
        DomainValue::Party(_) => registry
            .get_serializer(&DomainType::new(PARTY_NAME_TYPE))?
            .to_json(value),
        DomainValue::Bool(b) => Ok(json!(b)),
        DomainValue::Int(n) => Ok(json!(n)),
        DomainValue::Long(n) => Ok(json!(n)),
        DomainValue::Double(x) => Ok(json!(x)),
        DomainValue::Text(s) => Ok(json!(s)),
        DomainValue::List(items) => items
            .iter()
            .map(|item| encode_value(registry, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
    }
}

fn require_method(request: &ApiRequest, expected: Method) -> Result<(), ApiError> {
    if request.method == expected {
        Ok(())
    } else {
        Err(ApiError::MethodNotAllowed(format!(
            "'{}' does not serve {}",
            request.path, request.method
        )))
    }
}

/// Expansion factory deriving endpoints from the node catalog: one record
/// query endpoint per record type, one operation endpoint per operation,
/// plus the node info document.
pub struct NodeApiProvider {
    catalog: Arc<dyn NodeCatalog>,
    node: Arc<dyn NodeClient>,
    registry: SerializerRegistry,
}

impl NodeApiProvider {
    pub fn new(
        catalog: Arc<dyn NodeCatalog>,
        node: Arc<dyn NodeClient>,
        registry: SerializerRegistry,
    ) -> Self {
        Self {
            catalog,
            node,
            registry,
        }
    }
}

impl ApiContributor for NodeApiProvider {
    fn endpoints(&self) -> Vec<EndpointDescriptor> {
        let mut descriptors = vec![EndpointDescriptor::exact(
            "/node/info",
            Method::GET,
            Arc::new(NodeInfoHandler {
                node: Arc::clone(&self.node),
                registry: self.registry.clone(),
            }),
        )];

        for module in self.catalog.modules() {
            for record in &module.records {
                descriptors.push(EndpointDescriptor::prefix(
                    format!("/node/{}/records/{}", module.short_name, record.record_type),
                    Method::GET,
                    Arc::new(RecordQueryHandler {
                        node: Arc::clone(&self.node),
                        registry: self.registry.clone(),
                        record_type: record.record_type.clone(),
                    }),
                ));
            }
            for operation in &module.operations {
                descriptors.push(EndpointDescriptor::exact(
                    format!("/node/{}/operations/{}", module.short_name, operation.name),
                    Method::POST,
                    Arc::new(OperationHandler {
                        node: Arc::clone(&self.node),
                        registry: self.registry.clone(),
                        module: module.short_name.clone(),
                        operation: operation.clone(),
                    }),
                ));
            }
        }
        descriptors
    }
}

/// GET `/node/info`: identity document of the backend node.
struct NodeInfoHandler {
    node: Arc<dyn NodeClient>,
    registry: SerializerRegistry,
}

#[async_trait]
impl RequestHandler for NodeInfoHandler {
    async fn handle(&self, request: ApiRequest) -> Result<Response, ApiError> {
        require_method(&request, Method::GET)?;
        let info = self.node.node_info().await?;
        let encoded = encode_value(&self.registry, &info)?;
        Ok(Json(encoded).into_response())
    }
}

/// GET `/node/{module}/records/{Type}[/key]`: records of one type, with an
/// optional opaque key filter from the path remainder.
struct RecordQueryHandler {
    node: Arc<dyn NodeClient>,
    registry: SerializerRegistry,
    record_type: DomainType,
}

#[async_trait]
impl RequestHandler for RecordQueryHandler {
    async fn handle(&self, request: ApiRequest) -> Result<Response, ApiError> {
        require_method(&request, Method::GET)?;
        let key = (!request.remainder.is_empty()).then_some(request.remainder.as_str());
        let records = self.node.query_records(&self.record_type, key).await?;
        let serializer = self.registry.get_serializer(&self.record_type)?;
        let items = records
            .iter()
            .map(|record| serializer.to_json(record))
            .collect::<Result<Vec<_>, CodecError>>()?;
        Ok(Json(Value::Array(items)).into_response())
    }
}

/// POST `/node/{module}/operations/{name}`: decode the input, execute on
/// the node, encode the result.
struct OperationHandler {
    node: Arc<dyn NodeClient>,
    registry: SerializerRegistry,
    module: String,
    operation: OperationInfo,
}

#[async_trait]
impl RequestHandler for OperationHandler {
    async fn handle(&self, request: ApiRequest) -> Result<Response, ApiError> {
        require_method(&request, Method::POST)?;

        let body: Value = serde_json::from_slice(&request.body).map_err(|err| {
            ApiError::Deserialization {
                message: format!("request body is not valid JSON: {err}"),
                details: None,
            }
        })?;

        let input = self
            .registry
            .get_serializer(&self.operation.input_type)?
            .from_json(&body)?;

        tracing::debug!(
            request_id = %request.request_id,
            module = %self.module,
            operation = %self.operation.name,
            "executing node operation"
        );
        let output = self
            .node
            .execute_operation(&self.module, &self.operation.name, input)
            .await?;

        let encoded = self
            .registry
            .get_serializer(&self.operation.output_type)?
            .to_json(&output)?;
        Ok(Json(encoded).into_response())
    }
}

/// GET `/api/schema/{Type}`: JSON-Schema-shaped document for one type;
/// GET `/api/schema/` with no remainder lists every known type.
pub struct TypeSchemaHandler {
    registry: SerializerRegistry,
}

impl TypeSchemaHandler {
    pub fn new(registry: SerializerRegistry) -> Self {
        Self { registry }
    }
}

impl ApiContributor for TypeSchemaHandler {
    fn endpoints(&self) -> Vec<EndpointDescriptor> {
        vec![EndpointDescriptor::prefix(
            "/api/schema/",
            Method::GET,
            Arc::new(TypeSchemaEndpoint {
                registry: self.registry.clone(),
            }),
        )]
    }
}

struct TypeSchemaEndpoint {
    registry: SerializerRegistry,
}

#[async_trait]
impl RequestHandler for TypeSchemaEndpoint {
    async fn handle(&self, request: ApiRequest) -> Result<Response, ApiError> {
        require_method(&request, Method::GET)?;

        if request.remainder.is_empty() {
            let names: Vec<_> = self
                .registry
                .known_types()
                .into_iter()
                .map(|name| json!(name.name()))
                .collect();
            return Ok(Json(Value::Array(names)).into_response());
        }

        let type_name = DomainType::new(request.remainder.as_str());
        let serializer = self.registry.get_serializer(&type_name).map_err(|err| {
            match err {
                CodecError::UnsupportedType(name) => {
                    ApiError::NotFound(format!("no schema for type '{name}'"))
                }
                other => other.into(),
            }
        })?;
        Ok(Json(serializer.schema()).into_response())
    }
}

/// GET `/api/definition`: listing of every routed endpoint.
pub struct ApiDefinitionHandler {
    document: Value,
}

impl ApiDefinitionHandler {
    /// Build the definition document from the final route table.
    pub fn from_routes(routes: &[(String, MatchMode, Method)]) -> Self {
        let endpoints: Vec<_> = routes
            .iter()
            .map(|(path, mode, method)| {
                json!({
                    "path": path,
                    "match": match mode {
                        MatchMode::Exact => "exact",
                        MatchMode::Prefix => "prefix",
                    },
                    "method": method.as_str(),
                })
            })
            .collect();
        Self {
            document: json!({ "endpoints": endpoints }),
        }
    }

    pub fn descriptor(self) -> EndpointDescriptor {
        EndpointDescriptor::exact("/api/definition", Method::GET, Arc::new(self))
    }
}

#[async_trait]
impl RequestHandler for ApiDefinitionHandler {
    async fn handle(&self, request: ApiRequest) -> Result<Response, ApiError> {
        require_method(&request, Method::GET)?;
        Ok(Json(self.document.clone()).into_response())
    }
}
