//! End-to-end tests driving the composed pipeline over real sockets.

use std::net::SocketAddr;

use serde_json::{json, Value};

mod common;

#[tokio::test]
async fn routing_precedence_and_envelopes() {
    let addr: SocketAddr = "127.0.0.1:28511".parse().unwrap();
    let (_router, _shutdown) = common::start_gateway(addr, "").await;
    let client = reqwest::Client::new();

    // exact endpoint
    let info: Value = client
        .get(format!("http://{addr}/node/info"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(info["identity"], "O=Bank, L=London, C=GB");

    // prefix endpoint with a trailing record key
    let records = client
        .get(format!("http://{addr}/node/ledger/records/Holding/any-key"))
        .send()
        .await
        .unwrap();
    assert_eq!(records.status(), 200);
    let records: Value = records.json().await.unwrap();
    assert_eq!(records[0]["quantity"], 1200);

    // unmatched path yields the 404 envelope
    let missing = client
        .get(format!("http://{addr}/z"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
    let envelope: Value = missing.json().await.unwrap();
    assert_eq!(envelope["error"], "route_not_found");
    assert!(envelope["message"].as_str().unwrap().contains("/z"));
}

#[tokio::test]
async fn schema_and_definition_documents() {
    let addr: SocketAddr = "127.0.0.1:28512".parse().unwrap();
    let (_router, _shutdown) = common::start_gateway(addr, "").await;
    let client = reqwest::Client::new();

    let schema: Value = client
        .get(format!("http://{addr}/api/schema/PartyName"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(schema, json!({ "type": "string" }));

    let holding: Value = client
        .get(format!("http://{addr}/api/schema/Holding"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(holding["type"], "object");
    assert_eq!(holding["properties"]["owner"], json!({ "type": "string" }));

    let definition: Value = client
        .get(format!("http://{addr}/api/definition"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let paths: Vec<_> = definition["endpoints"]
        .as_array()
        .unwrap()
        .iter()
        .map(|endpoint| endpoint["path"].as_str().unwrap().to_string())
        .collect();
    assert!(paths.contains(&"/node/info".to_string()));
    assert!(paths.contains(&"/api/definition".to_string()));
    assert!(paths.contains(&"/node/ledger/operations/issue".to_string()));
}

#[tokio::test]
async fn operation_round_trip_and_bad_body() {
    let addr: SocketAddr = "127.0.0.1:28513".parse().unwrap();
    let (_router, _shutdown) = common::start_gateway(addr, "").await;
    let client = reqwest::Client::new();

    let issued: Value = client
        .post(format!("http://{addr}/node/ledger/operations/issue"))
        .json(&json!({ "owner": "O=Bank, L=London, C=GB", "quantity": 7 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(issued["quantity"], 7);
    assert_eq!(issued["owner"], "O=Bank, L=London, C=GB");

    // missing mandatory field: 400 with the deserialization envelope
    let rejected = client
        .post(format!("http://{addr}/node/ledger/operations/issue"))
        .json(&json!({ "owner": "O=Bank, L=London, C=GB" }))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), 400);
    let envelope: Value = rejected.json().await.unwrap();
    assert_eq!(envelope["error"], "deserialization");

    // wrong method on an exact path
    let wrong_method = client
        .get(format!("http://{addr}/node/ledger/operations/issue"))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_method.status(), 405);
}

#[tokio::test]
async fn security_rejections_never_reach_the_router() {
    let addr: SocketAddr = "127.0.0.1:28514".parse().unwrap();

    let key_dir = std::env::temp_dir().join("node-gateway-it");
    std::fs::create_dir_all(&key_dir).unwrap();
    let key_file = key_dir.join("api.key");
    std::fs::write(&key_file, "it-secret\n").unwrap();

    let security_config = format!(
        "[security]\nhandler = \"api-key\"\nkey_file = \"{}\"",
        key_file.display()
    );
    let (router, _shutdown) = common::start_gateway(addr, &security_config).await;
    let client = reqwest::Client::new();

    // no credentials
    let anonymous = client
        .get(format!("http://{addr}/node/info"))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), 401);
    let envelope: Value = anonymous.json().await.unwrap();
    assert_eq!(envelope["error"], "unauthenticated");

    // wrong credentials
    let wrong = client
        .get(format!("http://{addr}/node/info"))
        .bearer_auth("stolen")
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), 403);

    // neither rejected request reached routing
    assert_eq!(router.dispatch_count(), 0);

    // correct credentials flow through the full pipeline
    let accepted = client
        .get(format!("http://{addr}/node/info"))
        .bearer_auth("it-secret")
        .send()
        .await
        .unwrap();
    assert_eq!(accepted.status(), 200);
    assert_eq!(router.dispatch_count(), 1);
}

#[tokio::test]
async fn graceful_shutdown_stops_the_listener() {
    let addr: SocketAddr = "127.0.0.1:28515".parse().unwrap();
    let (_router, shutdown) = common::start_gateway(addr, "").await;
    let client = reqwest::Client::new();

    assert!(client
        .get(format!("http://{addr}/node/info"))
        .send()
        .await
        .is_ok());

    shutdown.trigger();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let after = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
        .get(format!("http://{addr}/node/info"))
        .send()
        .await;
    assert!(after.is_err());
}
