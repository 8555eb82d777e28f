//! Fuseki triple store client.
//!
//! Implements [`QueryExecutor`] over the SPARQL protocol (JSON results) and
//! [`DatasetStore`] over the Fuseki upload and update endpoints. Every
//! maintenance call targets both services, inference first.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Proxy, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use sevi_core::defaults;
use sevi_core::{
    DatasetStore, Error, ExecutionProfile, OntologyConfig, QueryExecutor, Result, Solution,
    Solutions,
};

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// Queries slower than this are logged at WARN.
const SLOW_QUERY_MS: u64 = 60_000;

/// Serialization of a source document, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfFormat {
    Turtle,
    RdfXml,
}

impl RdfFormat {
    /// `.rdf` sources are RDF/XML; everything else is Turtle.
    pub fn of_source(source: &str) -> Self {
        if source.ends_with(".rdf") {
            RdfFormat::RdfXml
        } else {
            RdfFormat::Turtle
        }
    }

    /// File name of the upload part; Fuseki picks the parser from it.
    pub fn upload_file_name(&self) -> &'static str {
        match self {
            RdfFormat::Turtle => "file.ttl",
            RdfFormat::RdfXml => "file.rdf",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            RdfFormat::Turtle => "text/turtle",
            RdfFormat::RdfXml => "application/rdf+xml",
        }
    }
}

#[derive(Deserialize)]
struct SparqlResults {
    results: SparqlBindings,
}

#[derive(Deserialize)]
struct SparqlBindings {
    #[serde(default)]
    bindings: Vec<HashMap<String, SparqlTerm>>,
}

#[derive(Deserialize)]
struct SparqlTerm {
    value: String,
}

/// Parse a SPARQL 1.1 JSON results document into rows.
pub fn parse_results(body: &str) -> Result<Vec<Solution>> {
    let parsed: SparqlResults = serde_json::from_str(body)
        .map_err(|e| Error::Query(format!("Malformed SPARQL results: {}", e)))?;
    Ok(parsed
        .results
        .bindings
        .into_iter()
        .map(|binding| {
            binding
                .into_iter()
                .fold(Solution::new(), |row, (var, term)| row.with(var, term.value))
        })
        .collect())
}

/// HTTP client for the Fuseki services.
pub struct FusekiClient {
    client: Client,
    download: Client,
    config: OntologyConfig,
}

impl FusekiClient {
    /// Create a client for the services described by `config`.
    pub fn new(config: OntologyConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        let mut download = Client::builder();
        if let Some(proxy) = &config.proxy {
            let proxy_url = format!("http://{}:{}", proxy.host, proxy.port);
            info!(proxy = %proxy_url, "Downloading source documents through proxy");
            download = download.proxy(
                Proxy::all(&proxy_url)
                    .map_err(|e| Error::Config(format!("Invalid proxy {}: {}", proxy_url, e)))?,
            );
        }
        let download = download
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Initializing Fuseki client: url={}, datasets={}/{}",
            config.fuseki_base_url(),
            config.inference_dataset,
            config.plain_dataset
        );

        Ok(Self {
            client,
            download,
            config,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(OntologyConfig::from_env())
    }

    pub fn config(&self) -> &OntologyConfig {
        &self.config
    }

    async fn read_source(&self, source: &str) -> Result<Vec<u8>> {
        if source.starts_with("http://") || source.starts_with("https://") {
            info!(source, proxy = self.config.proxy.is_some(), "Downloading source document");
            let response = self.download.get(source).send().await?;
            if !response.status().is_success() {
                return Err(Error::DatasetCreate(format!(
                    "Download of {} returned {}",
                    source,
                    response.status()
                )));
            }
            Ok(response.bytes().await?.to_vec())
        } else {
            let path = source.strip_prefix("file:").unwrap_or(source);
            info!(source, "Reading source document");
            Ok(tokio::fs::read(path).await?)
        }
    }

    async fn upload(&self, service_uri: &str, data: Vec<u8>, format: RdfFormat) -> Result<()> {
        let part = Part::bytes(data)
            .file_name(format.upload_file_name())
            .mime_str(format.mime_type())?;
        let form = Form::new().part("file", part);

        info!(endpoint = service_uri, "Creating Fuseki dataset");
        let response = self
            .client
            .post(format!("{}/upload", service_uri))
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::DatasetCreate(format!("Upload to {} failed: {}", service_uri, e)))?;

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::METHOD_NOT_ALLOWED {
                warn!(endpoint = service_uri, "Dataset does not exist on the server");
            }
            let body = response.text().await.unwrap_or_default();
            return Err(Error::DatasetCreate(format!(
                "Upload to {} returned {}: {}",
                service_uri, status, body
            )));
        }
        Ok(())
    }

    async fn load_source(&self, source: &str) -> Result<()> {
        let format = RdfFormat::of_source(source);
        let data = self.read_source(source).await?;
        for service_uri in self.config.service_uris() {
            self.upload(&service_uri, data.clone(), format).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl QueryExecutor for FusekiClient {
    #[instrument(skip(self, query), fields(endpoint = ?profile.endpoint))]
    async fn select(&self, query: &str, profile: ExecutionProfile) -> Result<Solutions> {
        let start = Instant::now();
        let url = format!("{}/sparql", self.config.service_uri(profile.endpoint));

        let response = self
            .client
            .post(&url)
            .timeout(profile.timeout)
            .header(reqwest::header::ACCEPT, SPARQL_RESULTS_JSON)
            .form(&[("query", query)])
            .send()
            .await
            .map_err(|e| Error::Query(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Query(format!("{} returned {}: {}", url, status, body)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Query(format!("Failed to read response: {}", e)))?;
        let rows = parse_results(&body)?;

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            result_count = rows.len(),
            duration_ms = elapsed,
            "Query executed"
        );
        if elapsed > SLOW_QUERY_MS {
            warn!(duration_ms = elapsed, slow = true, "Slow query");
        }

        Ok(Solutions::new(rows).on_release(move || {
            tracing::trace!(duration_ms = start.elapsed().as_millis() as u64, "Query execution released");
        }))
    }
}

#[async_trait]
impl DatasetStore for FusekiClient {
    /// Load every source document into both services.
    ///
    /// A failing document is logged and skipped. Fails only when there were
    /// documents and none of them loaded.
    #[instrument(skip(self), fields(op = "create_all"))]
    async fn create_all(&self) -> Result<()> {
        let sources = &self.config.ontology_urls;
        let mut loaded = 0usize;

        for source in sources {
            match self.load_source(source).await {
                Ok(()) => {
                    loaded += 1;
                    info!(source = %source, "Dataset created successfully");
                }
                Err(e) => {
                    error!(source = %source, error = %e, "Loading source document failed");
                }
            }
        }

        if !sources.is_empty() && loaded == 0 {
            return Err(Error::DatasetCreate(format!(
                "None of {} source documents could be loaded",
                sources.len()
            )));
        }
        info!(result_count = loaded, "Source documents loaded");
        Ok(())
    }

    /// Clear the default graph of both services. A missing dataset is skipped.
    #[instrument(skip(self), fields(op = "delete_all"))]
    async fn delete_all(&self) -> Result<()> {
        for service_uri in self.config.service_uris() {
            info!(endpoint = %service_uri, "Deleting Fuseki dataset");
            let response = self
                .client
                .post(format!("{}/update", service_uri))
                .form(&[("update", defaults::CLEAR_DEFAULT_UPDATE)])
                .send()
                .await
                .map_err(|e| {
                    Error::DatasetDelete(format!("Update to {} failed: {}", service_uri, e))
                })?;

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                warn!(endpoint = %service_uri, "Dataset was not found, continuing");
                continue;
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Error::DatasetDelete(format!(
                    "{} returned {}: {}",
                    service_uri, status, body
                )));
            }
            info!(endpoint = %service_uri, "Dataset deleted successfully");
        }
        Ok(())
    }
}
