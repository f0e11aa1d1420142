use deref_model::vocab::hydra;
use deref_model::{Graph, LdfSource, PagingWindow, SourceConfig, SourcesConfig};
use deref_sources::{
    HandlerRequest, LdfHandler, MemoryCache, RemoteOptions, SemanticHandler,
    StaticSourceRepository, UnreachableSources,
};
use deref_sources::testing::FakeHttpClient;
use deref_sparql::QueryContext;
use std::error::Error;
use std::sync::Arc;

const START: &str = "http://ldf.example/data";
const FRAGMENT: &str = "http://ldf.example/data?subject=http%3A%2F%2Fexample.com%2Fr";
const FORWARDED: &str = "subject=http%3A%2F%2Fexample.com%2Fr&limit=200&offset=60";

fn handler(http: &Arc<FakeHttpClient>) -> LdfHandler {
    let repository = StaticSourceRepository::new(SourcesConfig {
        sources: vec![SourceConfig::Ldf(LdfSource {
            id: 7,
            startfragment: START.to_owned(),
        })],
    });
    LdfHandler::new(
        Arc::new(repository),
        Arc::clone(http) as _,
        Arc::new(MemoryCache::new()),
        RemoteOptions::default(),
    )
}

fn request<'a>(
    context: &'a QueryContext,
    unreachable: &'a UnreachableSources,
) -> HandlerRequest<'a> {
    HandlerRequest {
        subject: "http://example.com/r",
        root: "http://example.com",
        query: context,
        depth: None,
        forwarded_query: FORWARDED,
        unreachable,
    }
}

fn fragment_page(url: &str, data: &str) -> String {
    sized_fragment_page(url, 120, 50, data)
}

fn sized_fragment_page(url: &str, total_items: usize, page_size: usize, data: &str) -> String {
    format!(
        r#"
        @prefix hydra: <http://www.w3.org/ns/hydra/core#> .
        @prefix void: <http://rdfs.org/ns/void#> .

        <{START}#dataset> a void:Dataset, hydra:Collection ;
            hydra:search [
                hydra:template "{START}{{?subject,predicate,object}}" ;
                hydra:mapping [ hydra:variable "subject" ; hydra:property <http://www.w3.org/1999/02/22-rdf-syntax-ns#subject> ]
            ] .
        <{url}> a hydra:PartialCollectionView ;
            void:triples {total_items} ;
            hydra:totalItems {total_items} ;
            hydra:itemsPerPage {page_size} .
        {data}
        "#
    )
}

#[tokio::test]
async fn count_is_read_from_the_fragment() -> Result<(), Box<dyn Error>> {
    let http = Arc::new(FakeHttpClient::new().route(START, 200, &fragment_page(FRAGMENT, "")));
    let handler = handler(&http);
    let context = QueryContext::default();
    let unreachable = UnreachableSources::new();

    assert_eq!(handler.count(&request(&context, &unreachable)).await?, 120);
    assert_eq!(http.requested_urls(), [FRAGMENT]);
    assert_eq!(
        http.requests()[0].accept.as_deref(),
        Some("text/turtle,*/*;q=0.0")
    );
    Ok(())
}

#[tokio::test]
async fn pages_are_fetched_from_the_offset_until_the_count_is_exhausted(
) -> Result<(), Box<dyn Error>> {
    let page_two = format!("{FRAGMENT}&page=2");
    let page_three = format!("{FRAGMENT}&page=3");
    let http = Arc::new(
        FakeHttpClient::new()
            .route_containing(
                START,
                "page=2",
                200,
                &fragment_page(
                    &page_two,
                    "<http://example.com/r> <http://example.com/p> <http://example.com/a>, <http://example.com/b> .",
                ),
            )
            .route_containing(START, "page=3", 200, &fragment_page(&page_three, ""))
            .route(START, 200, &fragment_page(FRAGMENT, "")),
    );
    let handler = handler(&http);
    let context = QueryContext::default();
    let unreachable = UnreachableSources::new();
    let mut graph = Graph::new();

    let inserted = handler
        .add_triples(&request(&context, &unreachable), &mut graph, PagingWindow::new(200, 60))
        .await?;

    assert_eq!(inserted, 2);
    assert_eq!(graph.len(), 2);
    assert_eq!(graph.triples_for_predicate(hydra::TOTAL_ITEMS).count(), 0);
    assert_eq!(http.requested_urls(), [FRAGMENT.to_owned(), page_two]);
    Ok(())
}

#[tokio::test]
async fn fragments_without_count_are_skipped() -> Result<(), Box<dyn Error>> {
    let http = Arc::new(FakeHttpClient::new().route(
        START,
        200,
        "<http://example.com/r> <http://example.com/p> <http://example.com/a> .",
    ));
    let handler = handler(&http);
    let context = QueryContext::default();
    let unreachable = UnreachableSources::new();
    let mut graph = Graph::new();

    assert_eq!(handler.count(&request(&context, &unreachable)).await?, 0);
    let inserted = handler
        .add_triples(&request(&context, &unreachable), &mut graph, PagingWindow::default())
        .await?;
    assert_eq!(inserted, 0);
    assert!(graph.is_empty());
    Ok(())
}

#[tokio::test]
async fn broken_fragments_contribute_nothing() -> Result<(), Box<dyn Error>> {
    let http = Arc::new(FakeHttpClient::new().route(START, 200, "this is not turtle <"));
    let handler = handler(&http);
    let context = QueryContext::default();
    let unreachable = UnreachableSources::new();

    assert_eq!(handler.count(&request(&context, &unreachable)).await?, 0);
    Ok(())
}

#[tokio::test]
async fn offsets_past_the_fragment_fetch_no_pages() -> Result<(), Box<dyn Error>> {
    let http = Arc::new(
        FakeHttpClient::new()
            .route_containing(START, "page=", 200, &fragment_page(FRAGMENT, ""))
            .route(START, 200, &fragment_page(FRAGMENT, "")),
    );
    let handler = handler(&http);
    let context = QueryContext::default();
    let unreachable = UnreachableSources::new();
    let mut graph = Graph::new();

    let inserted = handler
        .add_triples(&request(&context, &unreachable), &mut graph, PagingWindow::new(10, 120))
        .await?;

    assert_eq!(inserted, 0);
    assert!(graph.is_empty());
    assert_eq!(http.requested_urls(), [FRAGMENT]);
    Ok(())
}

#[tokio::test]
async fn unbounded_limits_stop_at_the_last_page() -> Result<(), Box<dyn Error>> {
    let page = |number: usize, object: &str| {
        sized_fragment_page(
            &format!("{FRAGMENT}&page={number}"),
            3,
            1,
            &format!("<http://example.com/r> <http://example.com/p> <{object}> ."),
        )
    };
    let http = Arc::new(
        FakeHttpClient::new()
            .route_containing(START, "page=1", 200, &page(1, "http://example.com/b"))
            .route_containing(START, "page=2", 200, &page(2, "http://example.com/c"))
            .route(START, 200, &sized_fragment_page(FRAGMENT, 3, 1, "")),
    );
    let handler = handler(&http);
    let context = QueryContext::default();
    let unreachable = UnreachableSources::new();
    let mut graph = Graph::new();

    let inserted = handler
        .add_triples(
            &request(&context, &unreachable),
            &mut graph,
            PagingWindow::new(usize::MAX, 1),
        )
        .await?;

    assert_eq!(inserted, 2);
    assert_eq!(
        http.requested_urls(),
        [
            FRAGMENT.to_owned(),
            format!("{FRAGMENT}&page=1"),
            format!("{FRAGMENT}&page=2"),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn unreachable_servers_are_asked_once() -> Result<(), Box<dyn Error>> {
    let http = Arc::new(FakeHttpClient::new().timeout(START));
    let handler = handler(&http);
    let context = QueryContext::default();
    let unreachable = UnreachableSources::new();
    let mut graph = Graph::new();

    assert_eq!(handler.count(&request(&context, &unreachable)).await?, 0);
    let inserted = handler
        .add_triples(&request(&context, &unreachable), &mut graph, PagingWindow::default())
        .await?;

    assert_eq!(inserted, 0);
    assert_eq!(http.requests().len(), 1);
    Ok(())
}
