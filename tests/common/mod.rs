//! Shared fixtures for integration tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use node_gateway::catalog::{
    DomainType, DomainValue, FieldDescriptor, ModuleInfo, NodeCatalog, NodeClient, NodeError,
    OperationInfo, PartyName, RecordInfo, StaticCatalog, TypeDescriptor, TypeRef,
};
use node_gateway::codec::PARTY_NAME_TYPE;
use node_gateway::config::loader;
use node_gateway::http::router::RequestRouter;
use node_gateway::lifecycle::{Gateway, Shutdown};

/// A node with one module ("ledger"), one record type and one echoing
/// operation.
pub struct TestNode {
    records: HashMap<DomainType, Vec<DomainValue>>,
}

impl Default for TestNode {
    fn default() -> Self {
        let holding = DomainValue::record(
            "Holding",
            [
                (
                    "owner",
                    DomainValue::Party(PartyName::parse("O=Bank,L=London,C=GB").unwrap()),
                ),
                ("quantity", DomainValue::Long(1200)),
            ],
        );
        Self {
            records: HashMap::from([(DomainType::new("Holding"), vec![holding])]),
        }
    }
}

#[async_trait]
impl NodeClient for TestNode {
    async fn node_info(&self) -> Result<DomainValue, NodeError> {
        Ok(DomainValue::record(
            "NodeInfo",
            [(
                "identity",
                DomainValue::Party(PartyName::parse("O=Bank,L=London,C=GB").unwrap()),
            )],
        ))
    }

    async fn query_records(
        &self,
        record_type: &DomainType,
        _key: Option<&str>,
    ) -> Result<Vec<DomainValue>, NodeError> {
        self.records
            .get(record_type)
            .cloned()
            .ok_or_else(|| NodeError::UnknownRecordType(record_type.clone()))
    }

    async fn execute_operation(
        &self,
        _module: &str,
        _operation: &str,
        input: DomainValue,
    ) -> Result<DomainValue, NodeError> {
        Ok(input)
    }
}

pub fn test_catalog() -> Arc<dyn NodeCatalog> {
    Arc::new(StaticCatalog::new(
        vec![ModuleInfo {
            short_name: "ledger".into(),
            records: vec![RecordInfo {
                record_type: DomainType::new("Holding"),
            }],
            operations: vec![OperationInfo {
                name: "issue".into(),
                input_type: DomainType::new("Holding"),
                output_type: DomainType::new("Holding"),
            }],
        }],
        vec![
            TypeDescriptor::new(
                "Holding",
                vec![
                    FieldDescriptor::mandatory(
                        "owner",
                        TypeRef::Object(DomainType::new(PARTY_NAME_TYPE)),
                    ),
                    FieldDescriptor::mandatory("quantity", TypeRef::Long),
                ],
            ),
            TypeDescriptor::new(
                "NodeInfo",
                vec![FieldDescriptor::mandatory(
                    "identity",
                    TypeRef::Object(DomainType::new(PARTY_NAME_TYPE)),
                )],
            ),
        ],
    ))
}

/// Assemble and spawn a gateway on `addr`, returning a handle to the live
/// dispatch table and the shutdown coordinator keeping the server alive.
pub async fn start_gateway(addr: SocketAddr, extra_config: &str) -> (Arc<RequestRouter>, Shutdown) {
    let config_text = format!("[listener]\nbind_address = \"{addr}\"\n{extra_config}");
    let config = loader::layered_over_defaults(&config_text).expect("test config must parse");

    let server = Gateway::from_config(config, test_catalog(), Arc::new(TestNode::default()))
        .expect("gateway must assemble");
    let router = server.router();

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(receiver).await;
    });

    // wait until the listener answers
    let client = reqwest::Client::new();
    for _ in 0..50 {
        if client
            .get(format!("http://{addr}/api/definition"))
            .send()
            .await
            .is_ok()
        {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    (router, shutdown)
}
