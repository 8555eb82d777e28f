//! Integration tests for the Fuseki client against a mock HTTP server.

use std::io::Write;
use std::time::Duration;

use sevi_core::{
    DatasetStore, Error, ExecutionProfile, OntologyConfig, QueryEndpoint, QueryExecutor,
};
use sevi_sparql::FusekiClient;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer, sources: Vec<String>) -> OntologyConfig {
    let addr = server.address();
    OntologyConfig {
        fuseki_host: addr.ip().to_string(),
        fuseki_port: addr.port(),
        ontology_urls: sources,
        ..OntologyConfig::default()
    }
}

fn turtle_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".ttl").tempfile().unwrap();
    writeln!(
        file,
        "<http://localhost/dummy/1> a <http://www.w3.org/2004/02/skos/core#Concept> ."
    )
    .unwrap();
    file
}

#[tokio::test]
async fn test_select_parses_json_results() {
    let server = MockServer::start().await;
    let results = serde_json::json!({
        "head": { "vars": ["uri", "label", "scheme", "notation"] },
        "results": { "bindings": [
            {
                "uri": { "type": "uri", "value": "http://urn.fi/URN:NBN:fi:au:ptvl:KE4" },
                "label": { "type": "literal", "value": "Asuminen" },
                "scheme": { "type": "uri", "value": "http://urn.fi/URN:NBN:fi:au:ptvl:KE" },
                "notation": { "type": "literal", "value": "KE4" }
            }
        ]}
    });

    Mock::given(method("POST"))
        .and(path("/all/sparql"))
        .and(header("Accept", "application/sparql-results+json"))
        .and(body_string_contains("query="))
        .respond_with(ResponseTemplate::new(200).set_body_json(&results))
        .expect(1)
        .mount(&server)
        .await;

    let client = FusekiClient::new(config_for(&server, vec![])).unwrap();
    let rows: Vec<_> = client
        .select(
            "SELECT ?uri WHERE { ?uri ?p ?o . }",
            ExecutionProfile::standard(QueryEndpoint::Inference),
        )
        .await
        .unwrap()
        .collect();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("notation"), Some("KE4"));
}

#[tokio::test]
async fn test_select_routes_plain_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/all_no_inference/sparql"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "results": { "bindings": [] } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = FusekiClient::new(config_for(&server, vec![])).unwrap();
    let rows = client
        .select("SELECT ?x", ExecutionProfile::bulk(QueryEndpoint::Plain))
        .await
        .unwrap();
    assert_eq!(rows.count(), 0);
}

#[tokio::test]
async fn test_select_error_status_is_query_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/all/sparql"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Parse error"))
        .mount(&server)
        .await;

    let client = FusekiClient::new(config_for(&server, vec![])).unwrap();
    let err = client
        .select("SELEC", ExecutionProfile::standard(QueryEndpoint::Inference))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Query(ref msg) if msg.contains("Parse error")));
}

#[tokio::test]
async fn test_select_honours_profile_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/all/sparql"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(2))
                .set_body_json(serde_json::json!({ "results": { "bindings": [] } })),
        )
        .mount(&server)
        .await;

    let client = FusekiClient::new(config_for(&server, vec![])).unwrap();
    let profile = ExecutionProfile::standard(QueryEndpoint::Inference)
        .with_timeout(Duration::from_millis(100));
    let err = client.select("SELECT ?x", profile).await.unwrap_err();
    assert!(matches!(err, Error::Query(_)));
}

#[tokio::test]
async fn test_delete_all_clears_both_services() {
    let server = MockServer::start().await;
    for dataset in ["/all/update", "/all_no_inference/update"] {
        Mock::given(method("POST"))
            .and(path(dataset))
            .and(body_string_contains("update=CLEAR+DEFAULT"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = FusekiClient::new(config_for(&server, vec![])).unwrap();
    client.delete_all().await.unwrap();
}

#[tokio::test]
async fn test_delete_all_skips_missing_dataset() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/all/update"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/all_no_inference/update"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = FusekiClient::new(config_for(&server, vec![])).unwrap();
    client.delete_all().await.unwrap();
}

#[tokio::test]
async fn test_delete_all_server_error_is_delete_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/all/update"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = FusekiClient::new(config_for(&server, vec![])).unwrap();
    let err = client.delete_all().await.unwrap_err();
    assert!(matches!(err, Error::DatasetDelete(_)));
}

#[tokio::test]
async fn test_create_all_uploads_to_both_services() {
    let server = MockServer::start().await;
    for dataset in ["/all/upload", "/all_no_inference/upload"] {
        Mock::given(method("POST"))
            .and(path(dataset))
            .and(body_string_contains("filename=\"file.ttl\""))
            .and(body_string_contains("http://localhost/dummy/1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
    }

    let file = turtle_file();
    let source = file.path().to_string_lossy().to_string();
    let client = FusekiClient::new(config_for(&server, vec![source])).unwrap();
    client.create_all().await.unwrap();
}

#[tokio::test]
async fn test_create_all_downloads_http_sources_as_rdf_xml() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sources/ptvl.rdf"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<rdf:RDF/>"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("filename=\"file.rdf\""))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let source = format!("{}/sources/ptvl.rdf", server.uri());
    let client = FusekiClient::new(config_for(&server, vec![source])).unwrap();
    client.create_all().await.unwrap();
}

#[tokio::test]
async fn test_create_all_continues_after_failed_source() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let file = turtle_file();
    let sources = vec![
        "/nonexistent/ontology.ttl".to_string(),
        file.path().to_string_lossy().to_string(),
    ];
    let client = FusekiClient::new(config_for(&server, sources)).unwrap();
    client.create_all().await.unwrap();
}

#[tokio::test]
async fn test_create_all_fails_when_nothing_loads() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;

    let file = turtle_file();
    let source = file.path().to_string_lossy().to_string();
    let client = FusekiClient::new(config_for(&server, vec![source])).unwrap();
    let err = client.create_all().await.unwrap_err();
    assert!(matches!(err, Error::DatasetCreate(_)));
}
