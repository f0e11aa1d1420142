//! Resolves a resource by paging a single window over all backends.
//!
//! The backends are asked in a fixed order: the local store, the SPARQL endpoints and the Linked
//! Data Fragments servers. Every backend first reports how many triples it holds for the request.
//! The requested `(limit, offset)` window is then laid over the concatenation of the backends:
//! a backend whose triples all lie before the offset is skipped, and the offset handed to the next
//! backend is reduced by the triples that were skipped.

use crate::error::ResolveError;
use crate::paging::attach_paging_metadata;
use crate::request::ResolveRequest;
use deref_model::{Graph, PagingWindow, SourceKind};
use deref_sources::{
    HttpClient, LdfHandler, LocalStoreHandler, LocalTripleStore, RemoteOptions, ResponseCache,
    HandlerRequest, SemanticHandler, SourceRepository, SparqlHandler, UnreachableSources,
};
use std::sync::Arc;
use tracing::{debug, info};

/// The outcome of a resolution.
#[derive(Clone, Debug)]
pub struct AggregationResult {
    /// The merged triples of all backends, including the paging metadata.
    pub graph: Graph,
    /// The number of triples all backends hold for the request.
    pub total: usize,
    /// The window that was requested.
    pub window: PagingWindow,
}

/// The number of triples one backend holds for a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackendCount {
    pub kind: SourceKind,
    pub count: usize,
}

/// Resolves resources against the local store, the SPARQL endpoints and the Linked Data Fragments
/// servers.
#[derive(Clone)]
pub struct Resolver {
    local: LocalStoreHandler,
    sparql: SparqlHandler,
    ldf: LdfHandler,
}

impl Resolver {
    pub fn new(
        sources: Arc<dyn SourceRepository>,
        local_store: Option<Arc<dyn LocalTripleStore>>,
        http: Arc<dyn HttpClient>,
        cache: Arc<dyn ResponseCache>,
        options: RemoteOptions,
    ) -> Self {
        Self {
            local: LocalStoreHandler::new(local_store, Arc::clone(&sources)),
            sparql: SparqlHandler::new(
                Arc::clone(&sources),
                Arc::clone(&http),
                Arc::clone(&cache),
                options,
            ),
            ldf: LdfHandler::new(sources, http, cache, options),
        }
    }

    fn handlers(&self) -> [&dyn SemanticHandler; 3] {
        [&self.local, &self.sparql, &self.ldf]
    }

    /// Asks every backend how many triples it holds for the request. The backends are asked
    /// concurrently and reported in resolution order.
    pub async fn counts(&self, request: &ResolveRequest) -> Result<[BackendCount; 3], ResolveError> {
        let unreachable = UnreachableSources::new();
        self.backend_counts(&request.handler_request(&unreachable))
            .await
    }

    async fn backend_counts(
        &self,
        handler_request: &HandlerRequest<'_>,
    ) -> Result<[BackendCount; 3], ResolveError> {
        let (local, sparql, ldf) = futures::join!(
            self.local.count(handler_request),
            self.sparql.count(handler_request),
            self.ldf.count(handler_request),
        );
        Ok([
            BackendCount {
                kind: self.local.kind(),
                count: local?,
            },
            BackendCount {
                kind: self.sparql.kind(),
                count: sparql?,
            },
            BackendCount {
                kind: self.ldf.kind(),
                count: ldf?,
            },
        ])
    }

    /// The number of triples all backends hold for the request.
    pub async fn count(&self, request: &ResolveRequest) -> Result<usize, ResolveError> {
        Ok(self
            .counts(request)
            .await?
            .iter()
            .map(|backend| backend.count)
            .sum())
    }

    /// Resolves the requested window and attaches the paging metadata.
    ///
    /// Fails with [ResolveError::NotFound] if no backend contributed a triple. A remote source
    /// that could not be reached while counting is not asked again.
    pub async fn resolve(
        &self,
        request: &ResolveRequest,
    ) -> Result<AggregationResult, ResolveError> {
        let unreachable = UnreachableSources::new();
        let handler_request = request.handler_request(&unreachable);
        let counts = self.backend_counts(&handler_request).await?;
        let total = counts.iter().map(|backend| backend.count).sum();
        let window = request.window;

        let mut graph = Graph::new();
        let mut offset = window.offset;
        for (handler, BackendCount { kind, count }) in self.handlers().into_iter().zip(counts) {
            if graph.len() >= window.limit {
                break;
            }
            if count > offset {
                let budget = PagingWindow::new(window.limit - graph.len(), offset);
                let inserted = handler
                    .add_triples(&handler_request, &mut graph, budget)
                    .await?;
                debug!(%kind, count, offset, inserted, "Merged triples of backend");
            } else {
                debug!(%kind, count, offset, "Skipping backend before the offset");
            }
            offset = offset.saturating_sub(count);
        }

        if graph.is_empty() {
            return Err(ResolveError::NotFound {
                subject: request.subject.clone(),
            });
        }
        let triples = graph.len();
        attach_paging_metadata(
            &mut graph,
            &request.context,
            &request.query.pattern,
            window,
            total,
        );
        info!(
            subject = %request.subject,
            total,
            triples,
            limit = window.limit,
            offset = window.offset,
            "Resolved resource"
        );
        Ok(AggregationResult {
            graph,
            total,
            window,
        })
    }
}
