//! Service configuration read from the environment.

use std::time::Duration;

use crate::defaults;
use crate::traits::QueryEndpoint;

/// Outbound proxy used when downloading http source documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
}

/// Configuration consumed by the query, maintenance and indexing layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OntologyConfig {
    pub fuseki_host: String,
    pub fuseki_port: u16,
    pub inference_dataset: String,
    pub plain_dataset: String,
    pub language: String,
    pub query_timeout: Duration,
    pub bulk_query_timeout: Duration,
    /// Source documents, http(s) URLs or local paths.
    pub ontology_urls: Vec<String>,
    pub proxy: Option<ProxyConfig>,
    pub indexer_url: String,
    pub index_parallelism: usize,
    pub update_response_timeout: Duration,
}

impl Default for OntologyConfig {
    fn default() -> Self {
        Self {
            fuseki_host: defaults::FUSEKI_HOST.to_string(),
            fuseki_port: defaults::FUSEKI_PORT,
            inference_dataset: defaults::FUSEKI_INFERENCE_DATASET.to_string(),
            plain_dataset: defaults::FUSEKI_PLAIN_DATASET.to_string(),
            language: defaults::LANGUAGE.to_string(),
            query_timeout: Duration::from_secs(defaults::QUERY_TIMEOUT_SECS),
            bulk_query_timeout: Duration::from_secs(defaults::BULK_QUERY_TIMEOUT_SECS),
            ontology_urls: Vec::new(),
            proxy: None,
            indexer_url: defaults::INDEXER_URL.to_string(),
            index_parallelism: available_parallelism(),
            update_response_timeout: Duration::from_secs(defaults::UPDATE_RESPONSE_TIMEOUT_SECS),
        }
    }
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl OntologyConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `FUSEKI_HOST` | `localhost` | Triple store host |
    /// | `FUSEKI_PORT` | `3030` | Triple store port |
    /// | `FUSEKI_INFERENCE_DATASET` | `all` | Inference-enabled dataset |
    /// | `FUSEKI_PLAIN_DATASET` | `all_no_inference` | Dataset without inference |
    /// | `ONTOLOGY_LANG` | `fi` | Label language |
    /// | `QUERY_TIMEOUT_SECS` | `600` | Standard query timeout |
    /// | `BULK_QUERY_TIMEOUT_SECS` | `7200` | Bulk listing timeout |
    /// | `ONTOLOGY_URLS` | (none) | Comma-separated source documents |
    /// | `HTTP_PROXY_ENABLED` | `false` | Download sources through a proxy |
    /// | `HTTP_PROXY_HOST` | `localhost` | Proxy host |
    /// | `HTTP_PROXY_PORT` | `8080` | Proxy port |
    /// | `INDEXER_URL` | `http://localhost:8090` | Indexing transport |
    /// | `INDEX_PARALLELISM` | CPU count | Indexing fan-out bound |
    /// | `UPDATE_RESPONSE_TIMEOUT_SECS` | `5` | Wait before answering "accepted" |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        let proxy_enabled = lookup("HTTP_PROXY_ENABLED")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let proxy = proxy_enabled.then(|| ProxyConfig {
            host: lookup("HTTP_PROXY_HOST").unwrap_or_else(|| defaults::HTTP_PROXY_HOST.to_string()),
            port: parsed("HTTP_PROXY_PORT")
                .and_then(|p| u16::try_from(p).ok())
                .unwrap_or(defaults::HTTP_PROXY_PORT),
        });

        let ontology_urls = lookup("ONTOLOGY_URLS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            fuseki_host: lookup("FUSEKI_HOST").unwrap_or(base.fuseki_host),
            fuseki_port: parsed("FUSEKI_PORT")
                .and_then(|p| u16::try_from(p).ok())
                .unwrap_or(base.fuseki_port),
            inference_dataset: lookup("FUSEKI_INFERENCE_DATASET").unwrap_or(base.inference_dataset),
            plain_dataset: lookup("FUSEKI_PLAIN_DATASET").unwrap_or(base.plain_dataset),
            language: lookup("ONTOLOGY_LANG").unwrap_or(base.language),
            query_timeout: parsed("QUERY_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(base.query_timeout),
            bulk_query_timeout: parsed("BULK_QUERY_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(base.bulk_query_timeout),
            ontology_urls,
            proxy,
            indexer_url: lookup("INDEXER_URL").unwrap_or(base.indexer_url),
            index_parallelism: parsed("INDEX_PARALLELISM")
                .map(|n| n as usize)
                .unwrap_or(base.index_parallelism)
                .max(1),
            update_response_timeout: parsed("UPDATE_RESPONSE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(base.update_response_timeout),
        }
    }

    /// Base URL of the triple store, e.g. `http://localhost:3030`.
    pub fn fuseki_base_url(&self) -> String {
        format!("http://{}:{}", self.fuseki_host, self.fuseki_port)
    }

    /// Service URI of a logical endpoint, e.g. `http://localhost:3030/all`.
    pub fn service_uri(&self, endpoint: QueryEndpoint) -> String {
        let dataset = match endpoint {
            QueryEndpoint::Inference => &self.inference_dataset,
            QueryEndpoint::Plain => &self.plain_dataset,
        };
        format!("{}/{}", self.fuseki_base_url(), dataset)
    }

    /// Both service URIs, inference first.
    pub fn service_uris(&self) -> [String; 2] {
        [
            self.service_uri(QueryEndpoint::Inference),
            self.service_uri(QueryEndpoint::Plain),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = OntologyConfig::from_lookup(|_| None);
        assert_eq!(config.fuseki_host, "localhost");
        assert_eq!(config.fuseki_port, 3030);
        assert_eq!(config.language, "fi");
        assert_eq!(config.query_timeout, Duration::from_secs(600));
        assert_eq!(config.bulk_query_timeout, Duration::from_secs(7200));
        assert!(config.ontology_urls.is_empty());
        assert!(config.proxy.is_none());
        assert!(config.index_parallelism >= 1);
    }

    #[test]
    fn test_service_uris() {
        let config = OntologyConfig::from_lookup(lookup_from(&[
            ("FUSEKI_HOST", "testing.test"),
            ("FUSEKI_PORT", "1111"),
        ]));
        assert_eq!(
            config.service_uris(),
            [
                "http://testing.test:1111/all".to_string(),
                "http://testing.test:1111/all_no_inference".to_string()
            ]
        );
    }

    #[test]
    fn test_ontology_urls_are_split_and_trimmed() {
        let config = OntologyConfig::from_lookup(lookup_from(&[(
            "ONTOLOGY_URLS",
            "http://finto.fi/rest/v1/jupo/data, classpath/ptvl.rdf,,",
        )]));
        assert_eq!(
            config.ontology_urls,
            vec![
                "http://finto.fi/rest/v1/jupo/data".to_string(),
                "classpath/ptvl.rdf".to_string()
            ]
        );
    }

    #[test]
    fn test_proxy_only_when_enabled() {
        let disabled = OntologyConfig::from_lookup(lookup_from(&[("HTTP_PROXY_HOST", "proxy")]));
        assert!(disabled.proxy.is_none());

        let enabled = OntologyConfig::from_lookup(lookup_from(&[
            ("HTTP_PROXY_ENABLED", "true"),
            ("HTTP_PROXY_HOST", "proxy.local"),
        ]));
        assert_eq!(
            enabled.proxy,
            Some(ProxyConfig {
                host: "proxy.local".to_string(),
                port: 8080
            })
        );
    }

    #[test]
    fn test_invalid_numbers_fall_back_to_defaults() {
        let config = OntologyConfig::from_lookup(lookup_from(&[
            ("FUSEKI_PORT", "not-a-port"),
            ("INDEX_PARALLELISM", "0"),
        ]));
        assert_eq!(config.fuseki_port, 3030);
        assert_eq!(config.index_parallelism, 1);
    }
}
