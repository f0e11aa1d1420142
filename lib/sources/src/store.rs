use crate::LocalStoreError;
use async_trait::async_trait;
use deref_model::{parse_triples, NamedNodeRef, RdfFormat, Triple};
use oxigraph::model::GraphName;
use oxigraph::sparql::{EvaluationError, Query, QueryResults};
use oxigraph::store::Store;
use sparesults::QuerySolution;
use std::fmt::{Debug, Formatter};

/// The query capability of the local triple store.
///
/// Queries without a dataset clause are evaluated against the union of all graphs, so documents
/// cached into named graphs are visible to the local backend.
#[async_trait]
pub trait LocalTripleStore: Send + Sync {
    /// Evaluates a `SELECT` query and returns its solutions.
    async fn execute_raw(&self, query: &str) -> Result<Vec<QuerySolution>, LocalStoreError>;

    /// Evaluates a `CONSTRUCT` query and returns the constructed triples.
    async fn execute_construct(&self, query: &str) -> Result<Vec<Triple>, LocalStoreError>;

    /// Replaces the content of a named graph with the parsed document. Returns the number of
    /// triples loaded.
    async fn load_graph(
        &self,
        graph_name: NamedNodeRef<'_>,
        format: RdfFormat,
        base_iri: Option<&str>,
        body: &[u8],
    ) -> Result<usize, LocalStoreError>;

    /// Drops a named graph. Returns `true` if the graph existed.
    async fn remove_graph(&self, graph_name: NamedNodeRef<'_>) -> Result<bool, LocalStoreError>;
}

/// A [LocalTripleStore] backed by an in-memory Oxigraph [Store].
#[derive(Clone)]
pub struct OxigraphStore {
    store: Store,
}

impl OxigraphStore {
    pub fn new() -> Result<Self, LocalStoreError> {
        let store = Store::new().map_err(|e| LocalStoreError::Unavailable(Box::new(e)))?;
        Ok(Self { store })
    }

    pub fn from_store(store: Store) -> Self {
        Self { store }
    }

    /// Adds the triples of a document to the default graph.
    pub async fn load_default_graph(
        &self,
        format: RdfFormat,
        base_iri: Option<&str>,
        body: &[u8],
    ) -> Result<usize, LocalStoreError> {
        self.load(GraphName::DefaultGraph, format, base_iri, body)
            .await
    }

    /// The number of quads in the store.
    pub fn len(&self) -> Result<usize, LocalStoreError> {
        self.store
            .len()
            .map_err(|e| LocalStoreError::Unavailable(Box::new(e)))
    }

    pub fn is_empty(&self) -> Result<bool, LocalStoreError> {
        Ok(self.len()? == 0)
    }

    async fn load(
        &self,
        graph_name: GraphName,
        format: RdfFormat,
        base_iri: Option<&str>,
        body: &[u8],
    ) -> Result<usize, LocalStoreError> {
        let triples = parse_triples(format, body, base_iri)?;
        self.blocking(move |store| {
            let count = triples.len();
            if let GraphName::NamedNode(name) = &graph_name {
                store.remove_named_graph(name.as_ref()).map_err(unavailable)?;
            }
            store
                .extend(
                    triples
                        .into_iter()
                        .map(|triple| triple.in_graph(graph_name.clone())),
                )
                .map_err(unavailable)?;
            Ok(count)
        })
        .await
    }

    async fn blocking<T: Send + 'static>(
        &self,
        task: impl FnOnce(Store) -> Result<T, LocalStoreError> + Send + 'static,
    ) -> Result<T, LocalStoreError> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || task(store))
            .await
            .map_err(|e| LocalStoreError::Unavailable(Box::new(e)))?
    }
}

impl Debug for OxigraphStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OxigraphStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl LocalTripleStore for OxigraphStore {
    async fn execute_raw(&self, query: &str) -> Result<Vec<QuerySolution>, LocalStoreError> {
        let query = prepare_query(query)?;
        self.blocking(move |store| match store.query(query).map_err(evaluation_error)? {
            QueryResults::Solutions(solutions) => solutions
                .map(|solution| {
                    let solution = solution.map_err(evaluation_error)?;
                    Ok(QuerySolution::from((
                        solution.variables().to_vec(),
                        solution.values().to_vec(),
                    )))
                })
                .collect(),
            QueryResults::Boolean(_) | QueryResults::Graph(_) => Err(LocalStoreError::Query(
                "Expected a SELECT query".into(),
            )),
        })
        .await
    }

    async fn execute_construct(&self, query: &str) -> Result<Vec<Triple>, LocalStoreError> {
        let query = prepare_query(query)?;
        self.blocking(move |store| match store.query(query).map_err(evaluation_error)? {
            QueryResults::Graph(triples) => triples
                .map(|triple| triple.map_err(evaluation_error))
                .collect(),
            QueryResults::Boolean(_) | QueryResults::Solutions(_) => Err(
                LocalStoreError::Query("Expected a CONSTRUCT query".into()),
            ),
        })
        .await
    }

    async fn load_graph(
        &self,
        graph_name: NamedNodeRef<'_>,
        format: RdfFormat,
        base_iri: Option<&str>,
        body: &[u8],
    ) -> Result<usize, LocalStoreError> {
        self.load(graph_name.into_owned().into(), format, base_iri, body)
            .await
    }

    async fn remove_graph(&self, graph_name: NamedNodeRef<'_>) -> Result<bool, LocalStoreError> {
        let graph_name = graph_name.into_owned();
        self.blocking(move |store| store.remove_named_graph(graph_name.as_ref()).map_err(unavailable))
            .await
    }
}

fn prepare_query(query: &str) -> Result<Query, LocalStoreError> {
    let mut query =
        Query::parse(query, None).map_err(|e| LocalStoreError::Query(Box::new(e)))?;
    if query.dataset().is_default_dataset() {
        query.dataset_mut().set_default_graph_as_union();
    }
    Ok(query)
}

fn evaluation_error(error: EvaluationError) -> LocalStoreError {
    match error {
        EvaluationError::Storage(e) => LocalStoreError::Unavailable(Box::new(e)),
        e => LocalStoreError::Query(Box::new(e)),
    }
}

fn unavailable(error: oxigraph::store::StorageError) -> LocalStoreError {
    LocalStoreError::Unavailable(Box::new(error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use deref_model::NamedNode;

    const DATA: &str = r#"
        @prefix ex: <http://example.com/> .
        ex:alice ex:knows ex:bob .
        ex:bob ex:name "Bob" .
    "#;

    #[tokio::test]
    async fn default_graph_is_the_union_of_all_graphs() {
        let store = OxigraphStore::new().unwrap();
        let graph = NamedNode::new("http://cachedtriples.foo/1").unwrap();
        let loaded = store
            .load_graph(graph.as_ref(), RdfFormat::Turtle, None, DATA.as_bytes())
            .await
            .unwrap();
        assert_eq!(loaded, 2);

        let solutions = store
            .execute_raw("SELECT (COUNT(*) AS ?count) { ?s ?p ?o }")
            .await
            .unwrap();
        assert_eq!(
            solutions[0].get("count").map(ToString::to_string).as_deref(),
            Some("\"2\"^^<http://www.w3.org/2001/XMLSchema#integer>")
        );

        let triples = store
            .execute_construct("CONSTRUCT { ?s ?p ?o } { ?s ?p ?o }")
            .await
            .unwrap();
        assert_eq!(triples.len(), 2);
    }

    #[tokio::test]
    async fn loading_a_graph_replaces_its_content() {
        let store = OxigraphStore::new().unwrap();
        let graph = NamedNode::new("http://cachedtriples.foo/1").unwrap();
        store
            .load_graph(graph.as_ref(), RdfFormat::Turtle, None, DATA.as_bytes())
            .await
            .unwrap();
        store
            .load_graph(
                graph.as_ref(),
                RdfFormat::NTriples,
                None,
                b"<http://example.com/a> <http://example.com/b> <http://example.com/c> .\n",
            )
            .await
            .unwrap();
        assert_eq!(store.len().unwrap(), 1);

        assert!(store.remove_graph(graph.as_ref()).await.unwrap());
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn rejected_queries_are_query_errors() {
        let store = OxigraphStore::new().unwrap();
        let result = store.execute_raw("SELECT WHERE").await;
        assert!(matches!(result, Err(LocalStoreError::Query(_))));
    }

    #[tokio::test]
    async fn invalid_data_is_rejected() {
        let store = OxigraphStore::new().unwrap();
        let result = store
            .load_default_graph(RdfFormat::Turtle, None, b"<broken")
            .await;
        assert!(matches!(result, Err(LocalStoreError::InvalidData(_))));
    }
}
