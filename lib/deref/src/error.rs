use deref_model::IriParseError;
use deref_sources::{HandlerError, LocalStoreError};
use thiserror::Error;

/// An error raised while resolving a resource.
///
/// Failures of remote backends never surface here. They are logged and the backend contributes
/// no triples.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The local store is missing, not configured or failing.
    #[error("The local store is misconfigured: {0}")]
    LocalStoreMisconfigured(#[source] LocalStoreError),
    /// No backend holds a triple for the subject.
    #[error("No triples found for '{subject}'")]
    NotFound { subject: String },
    /// The request URI or the root URI is not an absolute IRI.
    #[error("Invalid request URI '{uri}': {error}")]
    InvalidRequestUri {
        uri: String,
        #[source]
        error: IriParseError,
    },
}

impl From<HandlerError> for ResolveError {
    fn from(error: HandlerError) -> Self {
        match error {
            HandlerError::LocalStoreMisconfigured(error) => Self::LocalStoreMisconfigured(error),
        }
    }
}
