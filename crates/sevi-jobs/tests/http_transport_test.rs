//! Integration tests for the HTTP indexing transport.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde_json::json;
use sevi_jobs::{
    Concept, Error, HttpIndexingTransport, IndexQueue, IndexingDispatcher, IndexingTransport,
};
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_send_posts_document_envelope() {
    let server = MockServer::start().await;
    let indexed_at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();

    Mock::given(method("POST"))
        .and(path("/queues/ontology-changed"))
        .and(body_json(json!({
            "indexedAt": indexed_at.timestamp_millis(),
            "document": { "id": "http://www.yso.fi/onto/yso/p1" }
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpIndexingTransport::new(server.uri());
    transport
        .send(
            json!({ "id": "http://www.yso.fi/onto/yso/p1" }),
            indexed_at,
            IndexQueue::ConceptChanged,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_send_batch_posts_documents_array() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/queues/ontology-toplevels-changed"))
        .and(body_partial_json(json!({ "documents": [{ "id": "a" }, { "id": "b" }] })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpIndexingTransport::new(server.uri());
    transport
        .send_batch(
            vec![json!({ "id": "a" }), json!({ "id": "b" })],
            Utc::now(),
            IndexQueue::TopLevelsChanged,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_error_status_is_indexing_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let transport = HttpIndexingTransport::new(server.uri());
    let err = transport
        .send(json!({}), Utc::now(), IndexQueue::UpdateMappings)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Indexing(ref msg) if msg.contains("unavailable")));
}

#[tokio::test]
async fn test_timeout_is_indexing_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let transport =
        HttpIndexingTransport::new(server.uri()).with_timeout(Duration::from_millis(100));
    let err = transport
        .send(json!({}), Utc::now(), IndexQueue::ConceptChanged)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Indexing(_)));
}

#[tokio::test]
async fn test_dispatcher_over_http_reports_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/queues/ontology-changed"))
        .and(body_partial_json(
            json!({ "document": { "id": "http://www.yso.fi/onto/tero/bad" } }),
        ))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/queues/ontology-changed"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let scheme = "http://www.yso.fi/onto/tero/";
    let concepts = vec![
        Concept::new("http://www.yso.fi/onto/tero/good1", "hyvä", "", scheme),
        Concept::new("http://www.yso.fi/onto/tero/bad", "huono", "", scheme),
        Concept::new("http://www.yso.fi/onto/tero/good2", "hyvä", "", scheme),
    ];
    let dispatcher =
        IndexingDispatcher::new(Arc::new(HttpIndexingTransport::new(server.uri())), 2);

    let report = dispatcher.reindex_concepts(concepts).await;
    assert_eq!(report.sent, 2);
    assert_eq!(report.failed, 1);
}
