use crate::SourceKind;
use oxiri::IriParseError;
use oxrdfio::RdfParseError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// An error raised while reading or validating the source configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Could not read the source configuration '{}': {error}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
    /// The configuration is not valid JSON or does not have the expected shape.
    #[error("Invalid source configuration: {0}")]
    Syntax(#[from] serde_json::Error),
    /// A source entry names a kind that is not known.
    #[error("Unknown source type '{0}', expected one of local, sparql, ldf, turtle, rdf")]
    UnknownKind(String),
    /// A traversal depth outside of the supported range.
    #[error("Traversal depth {0} is out of range, expected a value between 1 and 5")]
    DepthOutOfRange(u8),
    /// A source points to something that is not an absolute HTTP(S) URL.
    #[error("Invalid URL '{url}' for {kind} source {id}: {reason}")]
    InvalidUrl {
        kind: SourceKind,
        id: u64,
        url: String,
        reason: String,
    },
    /// Two sources of the same kind share an id.
    #[error("Duplicate id {id} for {kind} sources")]
    DuplicateId { kind: SourceKind, id: u64 },
    /// More than one local store is configured.
    #[error("Only a single local store can be configured")]
    DuplicateLocalStore,
}

/// An error raised while merging a serialized RDF document into a graph.
#[derive(Debug, Error)]
pub enum GraphMergeError {
    /// The document could not be parsed.
    #[error(transparent)]
    Parse(#[from] RdfParseError),
    /// The base IRI used to resolve relative IRIs is not valid.
    #[error("Invalid base IRI '{iri}': {error}")]
    InvalidBaseIri {
        iri: String,
        #[source]
        error: IriParseError,
    },
}
