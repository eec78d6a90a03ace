//! Startup orchestration: contributor-driven server assembly.
//!
//! # Responsibilities
//! - Collect configuration contributions from independent parts of the
//!   gateway into one builder
//! - Freeze the dispatch table and pipeline before anything binds
//! - Surface every startup failure with the failing component named
//!
//! # Design Decisions
//! - The pipeline is a fixed three-slot descriptor (transport, security,
//!   router) assembled exactly once; request-time code never wraps handlers
//! - Contributors run sequentially; their relative order carries no
//!   semantics, every tie is resolved by explicit precedence rules

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::catalog::node::{NodeCatalog, NodeClient};
use crate::codec::registry::{SerializerRegistry, SerializerRegistryBuilder};
use crate::codec::serializer::{PartyNameSerializer, PARTY_NAME_TYPE};
use crate::config::loader::LoadError;
use crate::config::node::{ConfigError, ConfigNode};
use crate::config::schema::{
    GatewaySettings, ListenerSettings, SecureTransportSettings, SecuritySettings,
};
use crate::http::handlers::{ApiContributor, ApiDefinitionHandler, NodeApiProvider, TypeSchemaHandler};
use crate::http::router::{EndpointDescriptor, MatchMode, RequestRouter, RouteError};
use crate::http::server::{HttpServer, Pipeline};
use crate::net::tls::{SecureTransport, TransportError};
use crate::security::scheme::{SecuritySchemeRegistry, SecuritySetupError};
use crate::security::SecurityHandler;

use axum::http::Method;

/// A fatal error during gateway assembly, raised before the listener binds.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to load configuration: {0}")]
    Load(#[from] LoadError),
    #[error("invalid listener address '{address}': {message}")]
    BadAddress { address: String, message: String },
    #[error("route table construction failed: {0}")]
    Route(#[from] RouteError),
    #[error("transport initialization failed: {0}")]
    Transport(#[from] TransportError),
    #[error("security setup failed: {0}")]
    Security(#[from] SecuritySetupError),
    #[error("incomplete server configuration: {0}")]
    Incomplete(&'static str),
}

/// Implementations contribute some aspect of configuration to the server.
pub trait ServerConfigContributor: Send + Sync {
    fn contribute(&self, builder: &mut GatewayBuilder) -> Result<(), StartupError>;
}

/// Mutable assembly state for the server; alive only during startup.
#[derive(Default)]
pub struct GatewayBuilder {
    bind_address: Option<SocketAddr>,
    request_timeout: Option<Duration>,
    max_body_bytes: Option<u64>,
    endpoints: Vec<EndpointDescriptor>,
    security: Option<Arc<dyn SecurityHandler>>,
    tls: Option<rustls::ServerConfig>,
}

impl GatewayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_listener(&mut self, address: SocketAddr, timeout: Duration, max_body_bytes: u64) {
        self.bind_address = Some(address);
        self.request_timeout = Some(timeout);
        self.max_body_bytes = Some(max_body_bytes);
    }

    pub fn add_endpoints(&mut self, endpoints: Vec<EndpointDescriptor>) {
        self.endpoints.extend(endpoints);
    }

    pub fn set_security(&mut self, handler: Arc<dyn SecurityHandler>) {
        self.security = Some(handler);
    }

    pub fn set_tls(&mut self, config: rustls::ServerConfig) {
        self.tls = Some(config);
    }

    /// Run every contributor to completion.
    pub fn apply(
        &mut self,
        contributors: &[Arc<dyn ServerConfigContributor>],
    ) -> Result<(), StartupError> {
        for contributor in contributors {
            contributor.contribute(self)?;
        }
        Ok(())
    }

    /// Freeze the collected contributions into a runnable server.
    pub fn build(self) -> Result<HttpServer, StartupError> {
        let bind_address = self
            .bind_address
            .ok_or(StartupError::Incomplete("no listener address contributed"))?;
        let request_timeout = self
            .request_timeout
            .ok_or(StartupError::Incomplete("no request timeout contributed"))?;
        let max_body_bytes = self
            .max_body_bytes
            .ok_or(StartupError::Incomplete("no body limit contributed"))?;

        // The API definition document must list the final route table,
        // including its own endpoint, so it is derived from descriptor
        // metadata before the table is frozen.
        let mut summary: Vec<(String, MatchMode, Method)> = self
            .endpoints
            .iter()
            .map(|descriptor| {
                (
                    descriptor.path.clone(),
                    descriptor.match_mode,
                    descriptor.method.clone(),
                )
            })
            .collect();
        summary.push(("/api/definition".to_string(), MatchMode::Exact, Method::GET));
        summary.sort_by(|a, b| a.0.cmp(&b.0));

        let mut endpoints = self.endpoints;
        endpoints.push(ApiDefinitionHandler::from_routes(&summary).descriptor());

        let router = Arc::new(RequestRouter::build(endpoints)?);
        Ok(HttpServer::new(
            bind_address,
            Pipeline {
                transport: self.tls,
                security: self.security,
                router,
            },
            request_timeout,
            max_body_bytes,
        ))
    }
}

/// Contributes listener basics: bind address, timeout, body limit.
pub struct SettingsContributor {
    pub listener: ListenerSettings,
}

impl ServerConfigContributor for SettingsContributor {
    fn contribute(&self, builder: &mut GatewayBuilder) -> Result<(), StartupError> {
        let address: SocketAddr =
            self.listener
                .bind_address
                .parse()
                .map_err(|err: std::net::AddrParseError| StartupError::BadAddress {
                    address: self.listener.bind_address.clone(),
                    message: err.to_string(),
                })?;
        builder.set_listener(
            address,
            self.listener.request_timeout,
            self.listener.max_body_bytes,
        );
        Ok(())
    }
}

/// Contributes the dispatch table and the security stage.
pub struct HandlerContributor {
    pub contributors: Vec<Arc<dyn ApiContributor>>,
    pub security: SecuritySettings,
    pub schemes: Arc<SecuritySchemeRegistry>,
    pub config: Arc<dyn ConfigNode>,
}

impl ServerConfigContributor for HandlerContributor {
    fn contribute(&self, builder: &mut GatewayBuilder) -> Result<(), StartupError> {
        for contributor in &self.contributors {
            builder.add_endpoints(contributor.endpoints());
        }

        match &self.security.handler_name {
            Some(name) => {
                tracing::debug!(scheme = %name, "using security configuration");
                let handler = self.schemes.resolve(name, self.config.as_ref())?;
                builder.set_security(handler);
            }
            None => {
                tracing::warn!("API endpoints are not protected by any security configuration");
            }
        }
        Ok(())
    }
}

/// Contributes the TLS context when encrypted transport is configured.
pub struct ListenerContributor {
    pub transport: Option<SecureTransportSettings>,
}

impl ServerConfigContributor for ListenerContributor {
    fn contribute(&self, builder: &mut GatewayBuilder) -> Result<(), StartupError> {
        match &self.transport {
            Some(settings) => {
                let tls = SecureTransport::new(settings.clone()).build_server_config()?;
                builder.set_tls(tls);
                tracing::info!("listener will terminate TLS");
            }
            None => {
                tracing::info!("listener will serve plaintext HTTP");
            }
        }
        Ok(())
    }
}

/// Assembles a complete gateway from a config tree and the two node-side
/// collaborators.
pub struct Gateway;

impl Gateway {
    /// Build the serializer registry used by a gateway over this catalog.
    pub fn build_registry(catalog: Arc<dyn NodeCatalog>) -> SerializerRegistry {
        SerializerRegistryBuilder::new()
            .with_custom(PARTY_NAME_TYPE, PartyNameSerializer)
            .build(catalog)
    }

    /// Resolve settings, run all contributors, and return the assembled
    /// server, ready to bind.
    pub fn from_config(
        config: Arc<dyn ConfigNode>,
        catalog: Arc<dyn NodeCatalog>,
        node: Arc<dyn NodeClient>,
    ) -> Result<HttpServer, StartupError> {
        let settings = GatewaySettings::from_config(config.as_ref())?;
        let registry = Self::build_registry(Arc::clone(&catalog));

        let api_contributors: Vec<Arc<dyn ApiContributor>> = vec![
            Arc::new(NodeApiProvider::new(catalog, node, registry.clone())),
            Arc::new(TypeSchemaHandler::new(registry)),
        ];

        let contributors: Vec<Arc<dyn ServerConfigContributor>> = vec![
            Arc::new(SettingsContributor {
                listener: settings.listener,
            }),
            Arc::new(HandlerContributor {
                contributors: api_contributors,
                security: settings.security,
                schemes: Arc::new(SecuritySchemeRegistry::with_builtin_schemes()),
                config,
            }),
            Arc::new(ListenerContributor {
                transport: settings.transport,
            }),
        ];

        let mut builder = GatewayBuilder::new();
        builder.apply(&contributors)?;
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::node::StaticCatalog;
    use crate::config::loader;

    struct NullNode;

    #[async_trait::async_trait]
    impl NodeClient for NullNode {
        async fn node_info(
            &self,
        ) -> Result<crate::catalog::value::DomainValue, crate::catalog::node::NodeError> {
            Ok(crate::catalog::value::DomainValue::text("test node"))
        }

        async fn query_records(
            &self,
            record_type: &crate::catalog::types::DomainType,
            _key: Option<&str>,
        ) -> Result<Vec<crate::catalog::value::DomainValue>, crate::catalog::node::NodeError>
        {
            Err(crate::catalog::node::NodeError::UnknownRecordType(
                record_type.clone(),
            ))
        }

        async fn execute_operation(
            &self,
            module: &str,
            operation: &str,
            _input: crate::catalog::value::DomainValue,
        ) -> Result<crate::catalog::value::DomainValue, crate::catalog::node::NodeError> {
            Err(crate::catalog::node::NodeError::UnknownOperation {
                module: module.to_string(),
                name: operation.to_string(),
            })
        }
    }

    fn empty_catalog() -> Arc<StaticCatalog> {
        Arc::new(StaticCatalog::new(Vec::new(), Vec::new()))
    }

    #[test]
    fn assembles_from_defaults() {
        let config = loader::defaults_only().unwrap();
        let server = Gateway::from_config(config, empty_catalog(), Arc::new(NullNode)).unwrap();
        let routes = server.router().routes().to_vec();
        assert!(routes.iter().any(|(path, _, _)| path == "/node/info"));
        assert!(routes.iter().any(|(path, _, _)| path == "/api/definition"));
    }

    #[test]
    fn unknown_security_scheme_aborts_startup() {
        let config =
            loader::layered_over_defaults("[security]\nhandler = \"kerberos\"").unwrap();
        let result = Gateway::from_config(config, empty_catalog(), Arc::new(NullNode));
        assert!(matches!(
            result,
            Err(StartupError::Security(SecuritySetupError::UnknownScheme(_)))
        ));
    }

    #[test]
    fn broken_key_store_aborts_startup() {
        let config = loader::layered_over_defaults(
            "[transport]\nenabled = true\n[transport.key_store]\ntype = \"pem\"\nlocation = \"/nonexistent/keys.pem\"",
        )
        .unwrap();
        let result = Gateway::from_config(config, empty_catalog(), Arc::new(NullNode));
        assert!(matches!(result, Err(StartupError::Transport(_))));
    }

    #[test]
    fn bad_bind_address_aborts_startup() {
        let config =
            loader::layered_over_defaults("[listener]\nbind_address = \"not-an-address\"").unwrap();
        let result = Gateway::from_config(config, empty_catalog(), Arc::new(NullNode));
        assert!(matches!(result, Err(StartupError::BadAddress { .. })));
    }

    #[test]
    fn builder_without_listener_is_incomplete() {
        let builder = GatewayBuilder::new();
        assert!(matches!(
            builder.build(),
            Err(StartupError::Incomplete(_))
        ));
    }
}
