use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use revload::index::{CreateIndexRequest, IndexClient, IndexConfig};
use revload::retry::RetryConfig;
use revload::{IngestError, Stage};

fn client(controller: &MockServer) -> IndexClient {
    IndexClient::new(IndexConfig {
        api_key: "pinecone-test-key".into(),
        controller_url: controller.uri(),
        host: None,
        dimension: 768,
        timeout: Duration::from_secs(5),
        retry: RetryConfig::default()
            .with_max_retries(1)
            .with_base_delay(Duration::from_millis(1))
            .with_jitter(false),
    })
    .unwrap()
}

fn request() -> CreateIndexRequest {
    CreateIndexRequest::serverless("rag", 768, "cosine", "aws", "us-east-1")
}

#[tokio::test]
async fn create_index_posts_serverless_spec() {
    let controller = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/indexes"))
        .and(header("Api-Key", "pinecone-test-key"))
        .and(header("X-Pinecone-API-Version", "2024-07"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "name": "rag",
            "dimension": 768,
            "metric": "cosine",
            "host": "rag-abc123.svc.aped-4627-b74a.pinecone.io",
            "status": { "ready": false, "state": "Initializing" }
        })))
        .expect(1)
        .mount(&controller)
        .await;

    let description = client(&controller).create_index(&request()).await.unwrap();
    assert_eq!(description.name, "rag");
    assert_eq!(description.dimension, 768);
    assert_eq!(description.metric, "cosine");
    assert_eq!(description.host, "rag-abc123.svc.aped-4627-b74a.pinecone.io");
    assert!(!description.status.ready);

    let received = controller.received_requests().await.unwrap();
    let body: Value = received[0].body_json().unwrap();
    assert_eq!(
        body,
        json!({
            "name": "rag",
            "dimension": 768,
            "metric": "cosine",
            "spec": { "serverless": { "cloud": "aws", "region": "us-east-1" } }
        })
    );
}

#[tokio::test]
async fn create_index_conflict_is_reported_once() {
    let controller = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/indexes"))
        .respond_with(ResponseTemplate::new(409).set_body_string("index already exists"))
        .expect(1)
        .mount(&controller)
        .await;

    let err = client(&controller).create_index(&request()).await.unwrap_err();
    match err {
        IngestError::ExternalService { stage, record, message } => {
            assert_eq!(stage, Stage::CreateIndex);
            assert_eq!(record, None);
            assert!(message.contains("`rag`"));
            assert!(message.contains("409"));
            assert!(message.contains("index already exists"));
        }
        other => panic!("expected create-index failure, got {other:?}"),
    }
}
