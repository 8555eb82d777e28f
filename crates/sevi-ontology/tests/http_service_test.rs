//! End-to-end tests of the service wired from configuration against mock
//! Fuseki and indexer servers.

use std::time::Duration;

use serde_json::json;
use sevi_ontology::{ConceptType, Error, OntologyConfig, OntologyService, UpdateResponse};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(fuseki: &MockServer, indexer: &MockServer) -> OntologyConfig {
    let addr = fuseki.address();
    OntologyConfig {
        fuseki_host: addr.ip().to_string(),
        fuseki_port: addr.port(),
        indexer_url: indexer.uri(),
        index_parallelism: 2,
        update_response_timeout: Duration::from_secs(5),
        ..OntologyConfig::default()
    }
}

fn bindings(rows: serde_json::Value) -> serde_json::Value {
    json!({ "head": { "vars": ["uri", "label", "scheme", "notation"] }, "results": { "bindings": rows } })
}

#[tokio::test]
async fn test_get_concept_over_http() {
    let fuseki = MockServer::start().await;
    let indexer = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/all/sparql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bindings(json!([{
            "uri": { "type": "literal", "value": "http://www.yso.fi/onto/tero/p2" },
            "label": { "type": "literal", "value": "terveys" },
            "scheme": { "type": "uri", "value": "http://www.yso.fi/onto/tero/" }
        }]))))
        .expect(1)
        .mount(&fuseki)
        .await;

    let service = OntologyService::from_config(config_for(&fuseki, &indexer)).unwrap();
    let concept = service
        .get_concept("http://www.yso.fi/onto/tero/p2")
        .await
        .unwrap();
    assert_eq!(concept.concept_type, ConceptType::Tero);

    // Second read is a cache hit; the mock expects exactly one request
    service
        .get_concept("http://www.yso.fi/onto/tero/p2")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_missing_concept_over_http_is_not_found() {
    let fuseki = MockServer::start().await;
    let indexer = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/all/sparql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bindings(json!([{}]))))
        .mount(&fuseki)
        .await;

    let service = OntologyService::from_config(config_for(&fuseki, &indexer)).unwrap();
    let err = service.get_concept("http://nowhere/x").await.unwrap_err();
    assert!(matches!(err, Error::ConceptNotFound(_)));
}

#[tokio::test]
async fn test_delete_clears_both_datasets() {
    let fuseki = MockServer::start().await;
    let indexer = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("update=CLEAR+DEFAULT"))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&fuseki)
        .await;

    let service = OntologyService::from_config(config_for(&fuseki, &indexer)).unwrap();
    let response = service.delete().await.unwrap();
    assert!(matches!(response, UpdateResponse::Completed(_)));
}

#[tokio::test]
async fn test_index_type_posts_to_concept_queue() {
    let fuseki = MockServer::start().await;
    let indexer = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/all_no_inference/sparql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bindings(json!([
            {
                "uri": { "type": "uri", "value": "http://www.yso.fi/onto/tsr/p1" },
                "label": { "type": "literal", "value": "palkka" },
                "scheme": { "type": "uri", "value": "http://www.yso.fi/onto/tsr/" }
            },
            {
                "uri": { "type": "uri", "value": "http://www.yso.fi/onto/tsr/p2" },
                "label": { "type": "literal", "value": "loma" },
                "scheme": { "type": "uri", "value": "http://www.yso.fi/onto/tsr/" }
            }
        ]))))
        .mount(&fuseki)
        .await;
    Mock::given(method("POST"))
        .and(path("/queues/ontology-changed"))
        .and(body_string_contains("\"conceptType\":\"TSR\""))
        .respond_with(ResponseTemplate::new(202))
        .expect(2)
        .mount(&indexer)
        .await;

    let service = OntologyService::from_config(config_for(&fuseki, &indexer)).unwrap();
    let response = service.index_type(ConceptType::Tsr).await.unwrap();
    assert!(matches!(response, UpdateResponse::Completed(_)));
}
