use crate::{
    cache_key, count_from_json, HandlerError, HandlerRequest, HttpClient, HttpRequest,
    RemoteOptions, ResponseCache, SemanticHandler, SourceRepository, UnreachableSources,
};
use async_trait::async_trait;
use deref_model::{
    merge_triples, parse_triples, Graph, PagingWindow, RdfFormat, SourceKind, SparqlSource,
};
use deref_sparql::QueryBuilder;
use std::sync::Arc;
use tracing::{debug, error, warn};
use url::form_urlencoded;

/// The namespace of the cache keys of SPARQL responses.
pub const SPARQL_CACHE_NAMESPACE: &str = "sparql";

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";
const RDF_XML: &str = "application/rdf+xml";

/// Resolves resources from remote SPARQL endpoints.
///
/// Endpoints are asked in configuration order. Every response body is cached, and a failing
/// endpoint contributes nothing.
#[derive(Clone)]
pub struct SparqlHandler {
    sources: Arc<dyn SourceRepository>,
    http: Arc<dyn HttpClient>,
    cache: Arc<dyn ResponseCache>,
    options: RemoteOptions,
}

impl SparqlHandler {
    pub fn new(
        sources: Arc<dyn SourceRepository>,
        http: Arc<dyn HttpClient>,
        cache: Arc<dyn ResponseCache>,
        options: RemoteOptions,
    ) -> Self {
        Self {
            sources,
            http,
            cache,
            options,
        }
    }

    async fn source_count(&self, source: &SparqlSource, request: &HandlerRequest<'_>) -> usize {
        let depth = request.depth.unwrap_or(source.depth);
        let query = QueryBuilder::new(request.query).count_query(
            request.subject,
            request.root,
            source.graph(),
            depth,
        );
        let Some(body) = self
            .execute(source, &query, SPARQL_RESULTS_JSON, request.unreachable)
            .await
        else {
            return 0;
        };
        count_from_json(&body).unwrap_or_else(|error| {
            error!(source = source.id, %error, "Could not read the count of a SPARQL endpoint");
            0
        })
    }

    /// Sends a query to an endpoint, answering from the cache if possible. Returns `None` if the
    /// endpoint did not answer successfully.
    async fn execute(
        &self,
        source: &SparqlSource,
        query: &str,
        format: &str,
        unreachable: &UnreachableSources,
    ) -> Option<String> {
        let key = cache_key(SPARQL_CACHE_NAMESPACE, source.id, query);
        if let Some(body) = self.cache.get(&key) {
            debug!(source = source.id, %query, "Answering SPARQL query from the cache");
            return Some(body);
        }
        if unreachable.contains(SourceKind::Sparql, source.id) {
            debug!(source = source.id, "Skipping unreachable SPARQL endpoint");
            return None;
        }

        debug!(source = source.id, %query, "Sending SPARQL query");
        let mut request = HttpRequest::get(query_url(source.endpoint_url(), query, format))
            .with_accept(format)
            .with_timeout(self.options.timeout);
        if let Some((user, password)) = source.credentials() {
            request = request.with_basic_auth(user, password);
        }

        match self.http.get(request).await {
            Ok(response) if response.is_success() => {
                self.cache
                    .put(&key, response.body.clone(), self.options.cache_ttl);
                Some(response.body)
            }
            Ok(response) => {
                error!(
                    source = source.id,
                    status = response.status,
                    body = %excerpt(&response.body),
                    "SPARQL endpoint answered with an error"
                );
                None
            }
            Err(error) => {
                warn!(source = source.id, %error, "SPARQL endpoint is unavailable");
                unreachable.insert(SourceKind::Sparql, source.id);
                None
            }
        }
    }
}

#[async_trait]
impl SemanticHandler for SparqlHandler {
    fn kind(&self) -> SourceKind {
        SourceKind::Sparql
    }

    async fn count(&self, request: &HandlerRequest<'_>) -> Result<usize, HandlerError> {
        let mut total = 0;
        for source in self.sources.sparql_sources() {
            total += self.source_count(&source, request).await;
        }
        Ok(total)
    }

    async fn add_triples(
        &self,
        request: &HandlerRequest<'_>,
        graph: &mut Graph,
        window: PagingWindow,
    ) -> Result<usize, HandlerError> {
        let mut offset = window.offset;
        let mut inserted = 0;
        for source in self.sources.sparql_sources() {
            if inserted >= window.limit {
                break;
            }
            let count = self.source_count(&source, request).await;
            if count > offset {
                let budget = window.limit - inserted;
                let query = QueryBuilder::new(request.query).fetch_query(
                    request.subject,
                    request.root,
                    source.graph(),
                    PagingWindow::new(budget, offset),
                    request.depth.unwrap_or(source.depth),
                );
                if let Some(body) = self
                    .execute(&source, &query, RDF_XML, request.unreachable)
                    .await
                {
                    match parse_triples(RdfFormat::RdfXml, body.as_bytes(), None) {
                        Ok(triples) => inserted += merge_triples(graph, triples, budget),
                        Err(error) => {
                            error!(source = source.id, %error, "Could not parse the triples of a SPARQL endpoint");
                        }
                    }
                }
            }
            offset = offset.saturating_sub(count);
        }
        Ok(inserted)
    }
}

/// `endpoint?query=...&format=...`, encoding spaces as `%20`.
fn query_url(endpoint: &str, query: &str, format: &str) -> String {
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    format!(
        "{endpoint}{separator}query={}&format={}",
        encode_component(query),
        encode_component(format)
    )
}

fn encode_component(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// The start of a response body, for log messages.
pub(crate) fn excerpt(body: &str) -> &str {
    const MAX_LEN: usize = 200;
    if body.len() <= MAX_LEN {
        return body;
    }
    let mut end = MAX_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_is_percent_encoded() {
        assert_eq!(
            query_url(
                "http://example.com/sparql",
                "SELECT * { ?s ?p \"a+b\" }",
                SPARQL_RESULTS_JSON
            ),
            "http://example.com/sparql?query=SELECT%20*%20%7B%20%3Fs%20%3Fp%20%22a%2Bb%22%20%7D&format=application%2Fsparql-results%2Bjson"
        );
    }

    #[test]
    fn endpoints_with_query_strings_are_extended() {
        assert_eq!(
            query_url("http://example.com/sparql?key=1", "ASK {}", RDF_XML),
            "http://example.com/sparql?key=1&query=ASK%20%7B%7D&format=application%2Frdf%2Bxml"
        );
    }

    #[test]
    fn excerpts_respect_char_boundaries() {
        let body = "é".repeat(150);
        assert_eq!(excerpt(&body).len(), 200);
        assert_eq!(excerpt("short"), "short");
    }
}
