//! Node REST gateway (standalone binary)
//!
//! Exposes a backend node's records, operations and type schemas as a
//! REST/JSON API behind a composable request pipeline:
//!
//! ```text
//!     Client ──▶ [ TLS termination? ] ──▶ [ security? ] ──▶ router
//!                                                             │
//!                         node catalog ──▶ endpoints ◀────────┘
//!                         node client  ──▶ records / operations
//!                         serializer registry ◀─▶ JSON bodies
//! ```
//!
//! The standalone binary serves the gateway's own identity document plus
//! the schema and definition endpoints; deployments embed the library and
//! plug in their node catalog and client.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use node_gateway::catalog::{
    DomainValue, DomainType, FieldDescriptor, NodeCatalog, NodeClient, NodeError, PartyName,
    StaticCatalog, TypeDescriptor, TypeRef,
};
use node_gateway::codec::PARTY_NAME_TYPE;
use node_gateway::config::{loader, ConfigNode, ConfigPath, GatewaySettings};
use node_gateway::lifecycle::{Gateway, Shutdown};
use node_gateway::observability::metrics;

/// Node identity served by the standalone binary, read from `node.identity`.
struct StandaloneNode {
    identity: PartyName,
}

#[async_trait]
impl NodeClient for StandaloneNode {
    async fn node_info(&self) -> Result<DomainValue, NodeError> {
        Ok(DomainValue::record(
            "NodeInfo",
            [("identity", DomainValue::Party(self.identity.clone()))],
        ))
    }

    async fn query_records(
        &self,
        record_type: &DomainType,
        _key: Option<&str>,
    ) -> Result<Vec<DomainValue>, NodeError> {
        Err(NodeError::UnknownRecordType(record_type.clone()))
    }

    async fn execute_operation(
        &self,
        module: &str,
        operation: &str,
        _input: DomainValue,
    ) -> Result<DomainValue, NodeError> {
        Err(NodeError::UnknownOperation {
            module: module.to_string(),
            name: operation.to_string(),
        })
    }
}

fn standalone_catalog() -> Arc<dyn NodeCatalog> {
    Arc::new(StaticCatalog::new(
        Vec::new(),
        vec![TypeDescriptor::new(
            "NodeInfo",
            vec![FieldDescriptor::mandatory(
                "identity",
                TypeRef::Object(DomainType::new(PARTY_NAME_TYPE)),
            )],
        )],
    ))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "node_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("node-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    let config = match std::env::args().nth(1) {
        Some(path) => loader::load(Path::new(&path))?,
        None => loader::defaults_only()?,
    };
    let settings = GatewaySettings::from_config(config.as_ref())?;

    tracing::info!(
        bind_address = %settings.listener.bind_address,
        workers = settings.workers.count,
        secure_transport = settings.transport.is_some(),
        "configuration loaded"
    );

    // Pool sizing is config-driven, so the runtime is built by hand.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(settings.workers.count)
        .max_blocking_threads(settings.workers.io_threads)
        .enable_all()
        .build()?;

    runtime.block_on(serve(config, settings))
}

async fn serve(
    config: Arc<dyn ConfigNode>,
    settings: GatewaySettings,
) -> Result<(), Box<dyn std::error::Error>> {
    if settings.observability.metrics_enabled {
        match settings.observability.metrics_address.parse() {
            Ok(address) => metrics::init_metrics(address),
            Err(err) => tracing::error!(
                metrics_address = %settings.observability.metrics_address,
                error = %err,
                "failed to parse metrics address"
            ),
        }
    }

    let identity_text = config.get_string(&ConfigPath::new("node.identity"))?;
    let identity = PartyName::parse(&identity_text)
        .map_err(|err| format!("invalid node.identity '{identity_text}': {err}"))?;
    let node = Arc::new(StandaloneNode { identity });

    let server = Gateway::from_config(config, standalone_catalog(), node)?;

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signals();
    server.run(shutdown.subscribe()).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
