use crate::{CacheSourceError, HttpClient, HttpRequest, LocalStoreError, LocalTripleStore};
use deref_model::{CachedSource, NamedNode, RdfFormat, SourceKind};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// The prefix of the named graphs that hold cached documents. The source id is appended.
pub const CACHED_GRAPH_PREFIX: &str = "http://cachedtriples.foo/";

/// The named graph that holds the cached copy of a source.
pub fn cached_graph_name(source_id: u64) -> NamedNode {
    NamedNode::new_unchecked(format!("{CACHED_GRAPH_PREFIX}{source_id}"))
}

/// Copies remote Turtle and RDF/XML documents into the local store, so that the local backend
/// serves their triples.
#[derive(Clone)]
pub struct SourceCacher {
    store: Arc<dyn LocalTripleStore>,
    http: Arc<dyn HttpClient>,
    timeout: Duration,
}

impl SourceCacher {
    pub fn new(
        store: Arc<dyn LocalTripleStore>,
        http: Arc<dyn HttpClient>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            http,
            timeout,
        }
    }

    /// Downloads the document of a source and replaces its cached copy. Returns the number of
    /// cached triples.
    pub async fn cache(
        &self,
        kind: SourceKind,
        source: &CachedSource,
    ) -> Result<usize, CacheSourceError> {
        let (format, accept) = match kind {
            SourceKind::Turtle => (RdfFormat::Turtle, "text/turtle"),
            SourceKind::Rdf => (RdfFormat::RdfXml, "application/rdf+xml"),
            SourceKind::LocalStore | SourceKind::Sparql | SourceKind::Ldf => {
                return Err(CacheSourceError::NotCacheable(kind))
            }
        };

        let request = HttpRequest::get(&source.uri)
            .with_accept(accept)
            .with_timeout(self.timeout);
        let response = self.http.get(request).await?;
        if !response.is_success() {
            return Err(CacheSourceError::Status {
                url: source.uri.clone(),
                status: response.status,
            });
        }

        let graph_name = cached_graph_name(source.id);
        let count = self
            .store
            .load_graph(
                graph_name.as_ref(),
                format,
                Some(source.uri.as_str()),
                response.body.as_bytes(),
            )
            .await?;
        info!(source = source.id, uri = %source.uri, count, "Cached source into the local store");
        Ok(count)
    }

    /// Drops the cached copy of a source. Returns `true` if there was one.
    pub async fn remove(&self, source_id: u64) -> Result<bool, LocalStoreError> {
        self.store
            .remove_graph(cached_graph_name(source_id).as_ref())
            .await
    }
}
