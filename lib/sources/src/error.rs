use deref_model::{GraphMergeError, SourceKind};
use sparesults::QueryResultsParseError;
use std::error::Error;
use thiserror::Error;

/// An error raised by the [HttpClient](crate::HttpClient) port.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The request did not complete within its timeout.
    #[error("Request to '{url}' timed out")]
    Timeout { url: String },
    /// The request could not be sent or the response could not be read.
    #[error("Request to '{url}' failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn Error + Send + Sync + 'static>,
    },
}

/// An error raised by the [LocalTripleStore](crate::LocalTripleStore) port.
#[derive(Debug, Error)]
pub enum LocalStoreError {
    /// There is no local store or no `local` source configuration.
    #[error("No local triple store is configured")]
    NotConfigured,
    /// The store could not be reached or failed internally.
    #[error("The local triple store is unavailable: {0}")]
    Unavailable(#[source] Box<dyn Error + Send + Sync + 'static>),
    /// The store rejected the query.
    #[error("The local triple store rejected the query: {0}")]
    Query(#[source] Box<dyn Error + Send + Sync + 'static>),
    /// Data that should be loaded into the store is not valid RDF.
    #[error("Invalid data for the local triple store: {0}")]
    InvalidData(#[from] GraphMergeError),
}

/// An error raised by a [SemanticHandler](crate::SemanticHandler).
///
/// Remote backends never produce this error. Their failures are logged and count as an empty
/// contribution.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The local store is missing, not configured, or broken.
    #[error("The local triple store is misconfigured: {0}")]
    LocalStoreMisconfigured(#[source] LocalStoreError),
}

/// A response of a remote backend that could not be interpreted.
#[derive(Debug, Error)]
pub enum RemoteResponseError {
    /// The SPARQL results could not be parsed.
    #[error(transparent)]
    Results(#[from] QueryResultsParseError),
    /// The response is a boolean result instead of solutions.
    #[error("Expected solutions but got a boolean result")]
    NotSolutions,
    /// The `count` binding is missing or not a non-negative integer.
    #[error("The response does not contain a valid count")]
    InvalidCount,
}

/// An error raised while copying a document into the local store.
#[derive(Debug, Error)]
pub enum CacheSourceError {
    /// Only `turtle` and `rdf` sources can be cached.
    #[error("Sources of kind {0} cannot be cached")]
    NotCacheable(SourceKind),
    /// The document could not be downloaded.
    #[error(transparent)]
    Http(#[from] HttpError),
    /// The server answered with an error status.
    #[error("Downloading '{url}' failed with status {status}")]
    Status { url: String, status: u16 },
    /// The document could not be stored.
    #[error(transparent)]
    Store(#[from] LocalStoreError),
}
