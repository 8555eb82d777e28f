//! Centralized default constants for the ontology service.
//!
//! Every crate references these instead of defining its own magic numbers.
//! Environment overrides are read in [`crate::config`].

// =============================================================================
// TRIPLE STORE
// =============================================================================

/// Default triple store host.
pub const FUSEKI_HOST: &str = "localhost";

/// Default triple store port.
pub const FUSEKI_PORT: u16 = 3030;

/// Dataset path of the inference-enabled service.
pub const FUSEKI_INFERENCE_DATASET: &str = "all";

/// Dataset path of the service without inference.
pub const FUSEKI_PLAIN_DATASET: &str = "all_no_inference";

/// SPARQL update that wipes the default graph.
pub const CLEAR_DEFAULT_UPDATE: &str = "CLEAR DEFAULT";

// =============================================================================
// QUERY
// =============================================================================

/// Default label language tag.
pub const LANGUAGE: &str = "fi";

/// Timeout for single-uri lookups and broader/narrower traversal (10 minutes).
pub const QUERY_TIMEOUT_SECS: u64 = 10 * 60;

/// Timeout for bulk listing queries (120 minutes).
pub const BULK_QUERY_TIMEOUT_SECS: u64 = 120 * 60;

// =============================================================================
// VOCABULARY
// =============================================================================

/// SKOS core namespace (without the trailing `#`, the query builder appends it).
pub const SKOS_NAMESPACE: &str = "http://www.w3.org/2004/02/skos/core";

/// Finnish ontology SKOS extension namespace.
pub const SKOSEXT_NAMESPACE: &str = "http://purl.org/finnonto/schema/skosext";

/// Scheme suffix of the aggregate scheme that must never be surfaced.
pub const AGGREGATE_SCHEME_SUFFIX: &str = "/aggregateconceptscheme";

/// Scheme suffix of the deprecated scheme that must never be surfaced.
pub const DEPRECATED_SCHEME_SUFFIX: &str = "/deprecatedconceptscheme";

// =============================================================================
// OUTBOUND PROXY
// =============================================================================

/// Default proxy host for downloading source documents.
pub const HTTP_PROXY_HOST: &str = "localhost";

/// Default proxy port for downloading source documents.
pub const HTTP_PROXY_PORT: u16 = 8080;

// =============================================================================
// INDEXING
// =============================================================================

/// Default base URL of the indexing transport.
pub const INDEXER_URL: &str = "http://localhost:8090";

/// Timeout for a single indexing request (seconds).
pub const INDEXER_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// MAINTENANCE
// =============================================================================

/// How long a maintenance caller waits before it is told the work was accepted.
pub const UPDATE_RESPONSE_TIMEOUT_SECS: u64 = 5;

/// Capacity of the maintenance event broadcast channel.
pub const EVENT_BUS_CAPACITY: usize = 64;
