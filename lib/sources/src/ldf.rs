use crate::sparql::excerpt;
use crate::{
    cache_key, HandlerError, HandlerRequest, HttpClient, HttpRequest, RemoteOptions,
    ResponseCache, SemanticHandler, SourceRepository, UnreachableSources,
};
use async_trait::async_trait;
use deref_model::vocab::{hydra, rdf, void};
use deref_model::{
    merge_serialized, merge_triples, Graph, LdfSource, NamedNodeRef, PagingWindow, RdfFormat,
    SourceKind, Subject, SubjectRef, Term, TermRef, Triple, TripleRef,
};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// The namespace of the cache keys of Linked Data Fragments responses.
pub const LDF_CACHE_NAMESPACE: &str = "ldf";

const FRAGMENT_ACCEPT: &str = "text/turtle,*/*;q=0.0";

/// Request parameters that are controlled by the resolver and never forwarded to a fragment.
const PAGING_PARAMETERS: [&str; 3] = ["page", "limit", "offset"];

/// Resolves resources from Linked Data Fragments servers.
///
/// The request's query string is forwarded to the start fragment of every server. The paging
/// metadata of the first fragment tells how many triples the server holds and how many it returns
/// per page.
#[derive(Clone)]
pub struct LdfHandler {
    sources: Arc<dyn SourceRepository>,
    http: Arc<dyn HttpClient>,
    cache: Arc<dyn ResponseCache>,
    options: RemoteOptions,
}

/// The paging metadata of a fragment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FragmentMetadata {
    pub total_items: usize,
    pub items_per_page: Option<usize>,
}

impl LdfHandler {
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

    /// Downloads and parses a fragment. Returns `None` if the server failed or the body is not
    /// valid Turtle.
    async fn fetch_fragment(
        &self,
        source: &LdfSource,
        url: &str,
        unreachable: &UnreachableSources,
    ) -> Option<Graph> {
        let key = cache_key(LDF_CACHE_NAMESPACE, source.id, url);
        let body = if let Some(body) = self.cache.get(&key) {
            debug!(source = source.id, %url, "Answering fragment from the cache");
            body
        } else if unreachable.contains(SourceKind::Ldf, source.id) {
            debug!(source = source.id, %url, "Skipping unreachable fragment server");
            return None;
        } else {
            debug!(source = source.id, %url, "Requesting fragment");
            let request = HttpRequest::get(url)
                .with_accept(FRAGMENT_ACCEPT)
                .with_timeout(self.options.timeout);
            match self.http.get(request).await {
                Ok(response) if response.is_success() => {
                    self.cache
                        .put(&key, response.body.clone(), self.options.cache_ttl);
                    response.body
                }
                Ok(response) => {
                    error!(
                        source = source.id,
                        %url,
                        status = response.status,
                        body = %excerpt(&response.body),
                        "Fragment server answered with an error"
                    );
                    return None;
                }
                Err(error) => {
                    warn!(source = source.id, %error, "Fragment server is unavailable");
                    unreachable.insert(SourceKind::Ldf, source.id);
                    return None;
                }
            }
        };

        let mut graph = Graph::new();
        match merge_serialized(
            &mut graph,
            RdfFormat::Turtle,
            body.as_bytes(),
            Some(source.startfragment.as_str()),
        ) {
            Ok(_) => Some(graph),
            Err(error) => {
                error!(source = source.id, %url, %error, "Could not parse fragment");
                None
            }
        }
    }

    async fn source_metadata(
        &self,
        source: &LdfSource,
        request: &HandlerRequest<'_>,
    ) -> Option<FragmentMetadata> {
        let url = fragment_url(&source.startfragment, request.forwarded_query);
        let fragment = self
            .fetch_fragment(source, &url, request.unreachable)
            .await?;
        let metadata = read_metadata(&fragment, &url);
        if metadata.is_none() {
            warn!(source = source.id, %url, "Fragment does not announce its number of triples");
        }
        metadata
    }
}

#[async_trait]
impl SemanticHandler for LdfHandler {
    fn kind(&self) -> SourceKind {
        SourceKind::Ldf
    }

    async fn count(&self, request: &HandlerRequest<'_>) -> Result<usize, HandlerError> {
        let mut total = 0;
        for source in self.sources.ldf_sources() {
            if let Some(metadata) = self.source_metadata(&source, request).await {
                total += metadata.total_items;
            }
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
        for source in self.sources.ldf_sources() {
            if inserted >= window.limit {
                break;
            }
            let Some(metadata) = self.source_metadata(&source, request).await else {
                continue;
            };
            let total_items = metadata.total_items;
            let page_size = match metadata.items_per_page {
                Some(page_size) if page_size > 0 => page_size,
                _ => {
                    warn!(source = source.id, "Fragment does not announce its page size");
                    offset = offset.saturating_sub(total_items);
                    continue;
                }
            };

            if total_items > offset {
                let fragment = fragment_url(&source.startfragment, request.forwarded_query);
                let first_page = offset.div_ceil(page_size);
                let page_count = (window.limit - inserted).div_ceil(page_size);
                for page in first_page..first_page.saturating_add(page_count) {
                    if inserted >= window.limit || page.saturating_mul(page_size) >= total_items {
                        break;
                    }
                    let url = page_url(&fragment, page);
                    let Some(mut page_graph) = self
                        .fetch_fragment(&source, &url, request.unreachable)
                        .await
                    else {
                        continue;
                    };
                    if read_metadata(&page_graph, &url).is_none() {
                        warn!(source = source.id, %url, "Skipping fragment page without metadata");
                        continue;
                    }
                    strip_hypermedia_controls(
                        &mut page_graph,
                        &source.startfragment,
                        &[&fragment, &url],
                    );
                    inserted += merge_triples(
                        graph,
                        page_graph.iter().map(TripleRef::into_owned),
                        window.limit - inserted,
                    );
                }
            }
            offset = offset.saturating_sub(total_items);
        }
        Ok(inserted)
    }
}

/// The start fragment, extended with the forwarded query parameters except the paging ones.
///
/// Parameter order and encoding are kept as sent by the client.
pub fn fragment_url(start_fragment: &str, forwarded_query: &str) -> String {
    let parameters = forwarded_query
        .trim_start_matches('?')
        .split('&')
        .filter(|parameter| !parameter.is_empty())
        .filter(|parameter| {
            let name = parameter.split('=').next().unwrap_or(parameter);
            !PAGING_PARAMETERS.contains(&name)
        })
        .collect::<Vec<_>>();
    if parameters.is_empty() {
        return start_fragment.to_owned();
    }
    let separator = if start_fragment.contains('?') { '&' } else { '?' };
    format!("{start_fragment}{separator}{}", parameters.join("&"))
}

fn page_url(fragment: &str, page: usize) -> String {
    let separator = if fragment.contains('?') { '&' } else { '?' };
    format!("{fragment}{separator}page={page}")
}

/// Reads `hydra:totalItems` (or `void:triples`) and `hydra:itemsPerPage`, preferring the statements
/// about the fragment itself.
pub fn read_metadata(fragment: &Graph, url: &str) -> Option<FragmentMetadata> {
    let subject = NamedNodeRef::new(url).ok();
    let total_items = integer_property(fragment, subject, hydra::TOTAL_ITEMS)
        .or_else(|| integer_property(fragment, subject, void::TRIPLES))?;
    Some(FragmentMetadata {
        total_items,
        items_per_page: integer_property(fragment, subject, hydra::ITEMS_PER_PAGE),
    })
}

fn integer_property(
    graph: &Graph,
    subject: Option<NamedNodeRef<'_>>,
    predicate: NamedNodeRef<'_>,
) -> Option<usize> {
    let own = subject.and_then(|subject| graph.object_for_subject_predicate(subject, predicate));
    let object = own.or_else(|| {
        graph
            .triples_for_predicate(predicate)
            .next()
            .map(|triple| triple.object)
    })?;
    match object {
        TermRef::Literal(literal) => literal.value().trim().parse().ok(),
        _ => None,
    }
}

/// Removes the server's description of its own fragments so that only data triples remain.
///
/// This drops the statements about the given fragment URLs, the `#dataset` of the start fragment,
/// every hydra collection or view, and the search template with its variable mappings.
pub fn strip_hypermedia_controls(graph: &mut Graph, start_fragment: &str, urls: &[&str]) {
    let dataset = format!("{start_fragment}#dataset");
    let mut controls: Vec<Subject> = urls
        .iter()
        .copied()
        .chain([dataset.as_str()])
        .filter_map(|iri| NamedNodeRef::new(iri).ok())
        .map(|iri| iri.into_owned().into())
        .collect();
    for class in [
        hydra::COLLECTION,
        hydra::PAGED_COLLECTION,
        hydra::PARTIAL_COLLECTION_VIEW,
    ] {
        controls.extend(
            graph
                .subjects_for_predicate_object(rdf::TYPE, class)
                .map(SubjectRef::into_owned),
        );
    }

    let mut searches = Vec::new();
    for control in &controls {
        searches.extend(
            graph
                .objects_for_subject_predicate(control, hydra::SEARCH)
                .filter_map(as_subject),
        );
    }
    let mut mappings = Vec::new();
    for search in &searches {
        mappings.extend(
            graph
                .objects_for_subject_predicate(search, hydra::MAPPING)
                .filter_map(as_subject),
        );
    }
    controls.extend(searches);
    controls.extend(mappings);

    let doomed = controls
        .iter()
        .flat_map(|subject| graph.triples_for_subject(subject))
        .map(TripleRef::into_owned)
        .collect::<Vec<Triple>>();
    for triple in &doomed {
        graph.remove(triple);
    }
}

fn as_subject(term: TermRef<'_>) -> Option<Subject> {
    match term.into_owned() {
        Term::NamedNode(node) => Some(node.into()),
        Term::BlankNode(node) => Some(node.into()),
        _ => None,
    }
}
