//! Error types for the sevi ontology service.

use thiserror::Error;

use crate::models::ConceptType;

/// Result type alias using the service's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for ontology operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A uri or label lookup matched no concept
    #[error("Concept not found: {0}")]
    ConceptNotFound(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unknown or unsupported concept type name
    #[error("Invalid concept type: {0}")]
    InvalidConceptType(String),

    /// No query strategy is registered for the concept type
    #[error("No query strategy for concept type {0}")]
    StrategyNotFound(ConceptType),

    /// Loading a source document into the triple store failed
    #[error("Dataset create error: {0}")]
    DatasetCreate(String),

    /// Clearing the triple store failed
    #[error("Dataset delete error: {0}")]
    DatasetDelete(String),

    /// A maintenance operation is already running
    #[error("An update is already ongoing")]
    UpdateOngoing,

    /// The query endpoint rejected the query or returned a malformed result
    #[error("Query error: {0}")]
    Query(String),

    /// Sending documents to the indexing transport failed
    #[error("Indexing error: {0}")]
    Indexing(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Client-visible classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 404-equivalent.
    NotFound,
    /// 400-equivalent.
    BadRequest,
    /// 409-equivalent; the request was rejected without scheduling work.
    Conflict,
    /// Everything else.
    Internal,
}

impl Error {
    /// Map the error onto the category a caller should surface.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::ConceptNotFound(_) | Error::NotFound(_) => ErrorCategory::NotFound,
            Error::InvalidConceptType(_) | Error::StrategyNotFound(_) => ErrorCategory::BadRequest,
            Error::UpdateOngoing => ErrorCategory::Conflict,
            _ => ErrorCategory::Internal,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
