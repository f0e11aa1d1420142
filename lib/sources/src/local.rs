use crate::{
    count_from_solutions, HandlerError, HandlerRequest, LocalStoreError, LocalTripleStore,
    SemanticHandler, SourceRepository,
};
use async_trait::async_trait;
use deref_model::{merge_triples, Depth, Graph, PagingWindow, SourceKind};
use deref_sparql::QueryBuilder;
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves resources from the local triple store.
///
/// The local store is mandatory. A missing store, a missing `local` configuration or a failing
/// store aborts the resolution, while a query the store rejects only contributes nothing.
#[derive(Clone)]
pub struct LocalStoreHandler {
    store: Option<Arc<dyn LocalTripleStore>>,
    sources: Arc<dyn SourceRepository>,
}

impl LocalStoreHandler {
    pub fn new(
        store: Option<Arc<dyn LocalTripleStore>>,
        sources: Arc<dyn SourceRepository>,
    ) -> Self {
        Self { store, sources }
    }

    fn connection(
        &self,
        request: &HandlerRequest<'_>,
    ) -> Result<(&dyn LocalTripleStore, Depth), HandlerError> {
        let config = self
            .sources
            .local_store()
            .ok_or(HandlerError::LocalStoreMisconfigured(
                LocalStoreError::NotConfigured,
            ))?;
        let store = self
            .store
            .as_deref()
            .ok_or(HandlerError::LocalStoreMisconfigured(
                LocalStoreError::NotConfigured,
            ))?;
        Ok((store, request.depth.unwrap_or(config.depth)))
    }
}

#[async_trait]
impl SemanticHandler for LocalStoreHandler {
    fn kind(&self) -> SourceKind {
        SourceKind::LocalStore
    }

    async fn count(&self, request: &HandlerRequest<'_>) -> Result<usize, HandlerError> {
        let (store, depth) = self.connection(request)?;
        let query = QueryBuilder::new(request.query).count_query(
            request.subject,
            request.root,
            None,
            depth,
        );
        debug!(%query, "Counting triples in the local store");

        let solutions = match store.execute_raw(&query).await {
            Ok(solutions) => solutions,
            Err(LocalStoreError::Query(error)) => {
                warn!(%query, %error, "The local store rejected the count query");
                return Ok(0);
            }
            Err(error) => return Err(HandlerError::LocalStoreMisconfigured(error)),
        };
        Ok(count_from_solutions(&solutions).unwrap_or_else(|error| {
            warn!(%error, "The local store returned an invalid count");
            0
        }))
    }

    async fn add_triples(
        &self,
        request: &HandlerRequest<'_>,
        graph: &mut Graph,
        window: PagingWindow,
    ) -> Result<usize, HandlerError> {
        let (store, depth) = self.connection(request)?;
        if window.limit == 0 {
            return Ok(0);
        }
        let query = QueryBuilder::new(request.query).fetch_query(
            request.subject,
            request.root,
            None,
            window,
            depth,
        );
        debug!(%query, "Fetching triples from the local store");

        match store.execute_construct(&query).await {
            Ok(triples) => Ok(merge_triples(graph, triples, window.limit)),
            Err(LocalStoreError::Query(error)) => {
                warn!(%query, %error, "The local store rejected the construct query");
                Ok(0)
            }
            Err(error) => Err(HandlerError::LocalStoreMisconfigured(error)),
        }
    }
}
