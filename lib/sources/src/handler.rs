use crate::{HandlerError, DEFAULT_CACHE_TTL, DEFAULT_HTTP_TIMEOUT};
use async_trait::async_trait;
use dashmap::DashSet;
use deref_model::{Depth, Graph, PagingWindow, SourceKind};
use deref_sparql::QueryContext;
use std::time::Duration;

/// Everything a backend needs to know about the resource being resolved.
#[derive(Clone, Copy, Debug)]
pub struct HandlerRequest<'a> {
    /// The URI of the requested resource.
    pub subject: &'a str,
    /// The root URI of the dataset. Resolving the root resolves everything.
    pub root: &'a str,
    pub query: &'a QueryContext,
    /// The traversal depth. `None` lets every backend use its configured depth.
    pub depth: Option<Depth>,
    /// The raw query string of the request, forwarded to Linked Data Fragments servers.
    pub forwarded_query: &'a str,
    /// Remote sources that could not be reached earlier in the same resolution.
    pub unreachable: &'a UnreachableSources,
}

/// Remote sources that could not be reached while serving one resolution.
///
/// A source that timed out while counting is not asked again for its triples.
#[derive(Debug, Default)]
pub struct UnreachableSources {
    sources: DashSet<(SourceKind, u64)>,
}

impl UnreachableSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, kind: SourceKind, source_id: u64) {
        self.sources.insert((kind, source_id));
    }

    pub fn contains(&self, kind: SourceKind, source_id: u64) -> bool {
        self.sources.contains(&(kind, source_id))
    }
}

/// A backend that can count and contribute the triples of a resource.
///
/// Handlers never propagate remote failures. A backend that cannot be reached or returns garbage
/// contributes nothing. The only error is a misconfigured local store.
#[async_trait]
pub trait SemanticHandler: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// The number of triples this backend holds for the request.
    async fn count(&self, request: &HandlerRequest<'_>) -> Result<usize, HandlerError>;

    /// Merges at most `window.limit` triples into `graph`, skipping the first `window.offset`
    /// triples of this backend. Returns how many triples were new to the graph.
    async fn add_triples(
        &self,
        request: &HandlerRequest<'_>,
        graph: &mut Graph,
        window: PagingWindow,
    ) -> Result<usize, HandlerError>;
}

/// Settings shared by the remote backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RemoteOptions {
    pub timeout: Duration,
    pub cache_ttl: Duration,
}

impl Default for RemoteOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_HTTP_TIMEOUT,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}
