use deref::error::ResolveError;
use deref::model::vocab::hydra;
use deref::model::{
    Depth, Graph, LdfSource, LocalStoreConfig, NamedNodeRef, PagingWindow, RdfFormat,
    SourceConfig, SourceKind, SourcesConfig, SparqlSource,
};
use deref::request::{RequestContext, ResolveRequest};
use deref::resolver::{AggregationResult, BackendCount, Resolver};
use deref::sources::{
    LocalStoreError, LocalTripleStore, MemoryCache, OxigraphStore, RemoteOptions,
    StaticSourceRepository,
};
use deref::sources::testing::{count_json, rdf_xml, FakeHttpClient};
use std::error::Error;
use std::sync::Arc;

const ROOT: &str = "http://x";
const SPARQL: &str = "http://sparql.example/sparql";
const JSON: &str = "format=application%2Fsparql-results%2Bjson";
const RDF_XML: &str = "format=application%2Frdf%2Bxml";

fn local(depth: u8) -> Result<SourceConfig, Box<dyn Error>> {
    Ok(SourceConfig::Local(LocalStoreConfig {
        depth: Depth::new(depth)?,
    }))
}

fn sparql(id: u64) -> SourceConfig {
    SourceConfig::Sparql(SparqlSource {
        id,
        endpoint: SPARQL.to_owned(),
        endpoint_user: None,
        endpoint_password: None,
        named_graph: None,
        depth: Depth::default(),
    })
}

async fn store(turtle: &str) -> Result<Arc<OxigraphStore>, Box<dyn Error>> {
    let store = OxigraphStore::new()?;
    store
        .load_default_graph(RdfFormat::Turtle, None, turtle.as_bytes())
        .await?;
    Ok(Arc::new(store))
}

fn resolver(
    sources: Vec<SourceConfig>,
    store: Option<Arc<OxigraphStore>>,
    http: &Arc<FakeHttpClient>,
) -> Resolver {
    Resolver::new(
        Arc::new(StaticSourceRepository::new(SourcesConfig { sources })),
        store.map(|store| store as Arc<dyn LocalTripleStore>),
        Arc::clone(http) as _,
        Arc::new(MemoryCache::new()),
        RemoteOptions::default(),
    )
}

fn request(request_uri: &str, window: PagingWindow) -> Result<ResolveRequest, Box<dyn Error>> {
    let context = RequestContext::from_request_uri(ROOT, request_uri)?;
    Ok(ResolveRequest::new(context).with_window(window))
}

/// The triples that are not paging metadata, sorted.
fn data_triples(graph: &Graph) -> Vec<String> {
    let mut triples = graph
        .iter()
        .filter(|triple| triple.predicate.as_str().starts_with("http://example.com/"))
        .map(|triple| triple.to_string())
        .collect::<Vec<_>>();
    triples.sort();
    triples
}

fn metadata(
    result: &AggregationResult,
    request: &ResolveRequest,
    predicate: NamedNodeRef<'_>,
) -> Option<String> {
    result
        .graph
        .object_for_subject_predicate(&request.context.dataset_iri(), predicate)
        .map(|term| term.to_string())
}

fn objects(count: usize) -> Vec<String> {
    (1..=count)
        .map(|i| format!("http://example.com/o{i}"))
        .collect()
}

fn rdf_xml_with(count: usize) -> String {
    let objects = objects(count);
    rdf_xml(
        "http://x/r",
        &objects.iter().map(String::as_str).collect::<Vec<_>>(),
    )
}

#[tokio::test]
async fn local_triples_fit_on_a_single_page() -> Result<(), Box<dyn Error>> {
    let store = store(
        r#"
        @prefix ex: <http://example.com/> .
        <http://x/r> ex:p ex:a, ex:b, ex:c ; ex:q "one", "two" .
        <http://x/other> ex:p ex:a .
        "#,
    )
    .await?;
    let http = Arc::new(FakeHttpClient::new());
    let resolver = resolver(vec![local(1)?], Some(store), &http);
    let request = request("http://x/r", PagingWindow::default())?;

    let result = resolver.resolve(&request).await?;

    assert_eq!(result.total, 5);
    assert_eq!(data_triples(&result.graph).len(), 5);
    assert_eq!(
        metadata(&result, &request, hydra::TOTAL_ITEMS).as_deref(),
        Some("\"5\"^^<http://www.w3.org/2001/XMLSchema#integer>")
    );
    assert_eq!(
        metadata(&result, &request, hydra::FIRST_PAGE).as_deref(),
        Some("<http://x/r?limit=100&offset=0>")
    );
    assert_eq!(metadata(&result, &request, hydra::NEXT_PAGE), None);
    assert_eq!(metadata(&result, &request, hydra::PREVIOUS_PAGE), None);
    assert!(http.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn remote_triples_are_paged() -> Result<(), Box<dyn Error>> {
    let store = store("").await?;
    let http = Arc::new(
        FakeHttpClient::new()
            .route_containing(SPARQL, JSON, 200, &count_json(12))
            .route_containing(SPARQL, RDF_XML, 200, &rdf_xml_with(12)),
    );
    let resolver = resolver(vec![local(1)?, sparql(1)], Some(store), &http);
    let request = request("http://x/r?limit=10", PagingWindow::new(10, 0))?;

    let result = resolver.resolve(&request).await?;

    assert_eq!(result.total, 12);
    assert_eq!(result.window, PagingWindow::new(10, 0));
    assert_eq!(data_triples(&result.graph).len(), 10);
    assert_eq!(
        metadata(&result, &request, hydra::NEXT_PAGE).as_deref(),
        Some("<http://x/r?limit=10&offset=10>")
    );
    assert_eq!(
        metadata(&result, &request, hydra::LAST_PAGE).as_deref(),
        Some("<http://x/r?limit=10&offset=10>")
    );
    assert_eq!(
        metadata(&result, &request, hydra::ITEMS_PER_PAGE).as_deref(),
        Some("\"10\"^^<http://www.w3.org/2001/XMLSchema#integer>")
    );
    Ok(())
}

#[tokio::test]
async fn offset_is_conserved_across_backends() -> Result<(), Box<dyn Error>> {
    let store = store(
        r#"
        @prefix ex: <http://example.com/> .
        <http://x/r> ex:local ex:a, ex:b, ex:c .
        "#,
    )
    .await?;
    let http = Arc::new(
        FakeHttpClient::new()
            .route_containing(SPARQL, JSON, 200, &count_json(5))
            .route_containing(SPARQL, RDF_XML, 200, &rdf_xml_with(4)),
    );
    let resolver = resolver(vec![local(1)?, sparql(1)], Some(store), &http);
    let request = request("http://x/r?offset=4", PagingWindow::new(10, 4))?;

    let result = resolver.resolve(&request).await?;

    assert_eq!(result.total, 8);
    let triples = data_triples(&result.graph);
    assert_eq!(triples.len(), 4);
    assert!(triples
        .iter()
        .all(|triple| !triple.contains("http://example.com/local")));
    let fetch = http
        .requested_urls()
        .into_iter()
        .find(|url| url.ends_with(RDF_XML))
        .ok_or("no CONSTRUCT query was sent")?;
    assert!(fetch.contains("OFFSET%201%20LIMIT%2010"));
    assert_eq!(
        metadata(&result, &request, hydra::PREVIOUS_PAGE).as_deref(),
        Some("<http://x/r?offset=0&limit=10>")
    );
    Ok(())
}

#[tokio::test]
async fn duplicate_triples_are_merged() -> Result<(), Box<dyn Error>> {
    let store = store(
        r#"
        @prefix ex: <http://example.com/> .
        <http://x/r> ex:p ex:o1 .
        "#,
    )
    .await?;
    let http = Arc::new(
        FakeHttpClient::new()
            .route_containing(SPARQL, JSON, 200, &count_json(2))
            .route_containing(SPARQL, RDF_XML, 200, &rdf_xml_with(2)),
    );
    let resolver = resolver(vec![local(1)?, sparql(1)], Some(store), &http);
    let request = request("http://x/r", PagingWindow::default())?;

    let first = resolver.resolve(&request).await?;
    let second = resolver.resolve(&request).await?;

    assert_eq!(first.total, 3);
    insta::assert_debug_snapshot!(data_triples(&first.graph), @r#"
    [
        "<http://x/r> <http://example.com/p> <http://example.com/o1>",
        "<http://x/r> <http://example.com/p> <http://example.com/o2>",
    ]
    "#);
    assert_eq!(data_triples(&first.graph), data_triples(&second.graph));
    Ok(())
}

#[tokio::test]
async fn shallow_requests_ignore_the_configured_depth() -> Result<(), Box<dyn Error>> {
    let store = store(
        r#"
        @prefix ex: <http://example.com/> .
        <http://x/alice> ex:knows <http://x/bob> ; ex:name "Alice" .
        <http://x/bob> ex:knows <http://x/carol> ; ex:name "Bob" .
        "#,
    )
    .await?;
    let http = Arc::new(FakeHttpClient::new());
    let resolver = resolver(vec![local(2)?], Some(store), &http);
    let request = request("http://x/alice", PagingWindow::default())?;

    let deep = resolver.resolve(&request).await?;
    let shallow = resolver
        .resolve(&request.clone().with_dereference(false))
        .await?;

    assert_eq!(data_triples(&deep.graph).len(), 4);
    assert_eq!(data_triples(&shallow.graph).len(), 2);
    assert!(deep.total >= shallow.total);
    Ok(())
}

#[tokio::test]
async fn counts_are_reported_per_backend() -> Result<(), Box<dyn Error>> {
    let store = store(
        r#"
        @prefix ex: <http://example.com/> .
        <http://x/r> ex:p ex:o1 .
        "#,
    )
    .await?;
    let http =
        Arc::new(FakeHttpClient::new().route_containing(SPARQL, JSON, 200, &count_json(7)));
    let resolver = resolver(vec![local(1)?, sparql(1)], Some(store), &http);
    let request = request("http://x/r", PagingWindow::default())?;

    assert_eq!(
        resolver.counts(&request).await?,
        [
            BackendCount {
                kind: SourceKind::LocalStore,
                count: 1
            },
            BackendCount {
                kind: SourceKind::Sparql,
                count: 7
            },
            BackendCount {
                kind: SourceKind::Ldf,
                count: 0
            },
        ]
    );
    assert_eq!(resolver.count(&request).await?, 8);
    Ok(())
}

#[tokio::test]
async fn fragments_follow_the_local_store() -> Result<(), Box<dyn Error>> {
    let fragment = |url: &str, data: &str| {
        format!(
            r#"
            @prefix hydra: <http://www.w3.org/ns/hydra/core#> .
            <{url}> hydra:totalItems 120 ; hydra:itemsPerPage 50 .
            {data}
            "#
        )
    };
    let start = "http://ldf.example/data";
    let page_two = format!("{start}?page=2");
    let http = Arc::new(
        FakeHttpClient::new()
            .route_containing(
                start,
                "page=2",
                200,
                &fragment(
                    &page_two,
                    "<http://x/all> <http://example.com/p> <http://example.com/o> .",
                ),
            )
            .route(start, 200, &fragment(start, "")),
    );
    let resolver = resolver(
        vec![
            local(1)?,
            SourceConfig::Ldf(LdfSource {
                id: 2,
                startfragment: start.to_owned(),
            }),
        ],
        Some(store("").await?),
        &http,
    );
    let request = request("http://x/all?limit=200&offset=60", PagingWindow::new(200, 60))?;

    let result = resolver.resolve(&request).await?;

    assert_eq!(result.total, 120);
    assert_eq!(data_triples(&result.graph).len(), 1);
    assert_eq!(http.requested_urls(), [start.to_owned(), page_two]);
    Ok(())
}

#[tokio::test]
async fn hash_variants_include_fragment_subjects() -> Result<(), Box<dyn Error>> {
    let store = store(
        r#"
        @prefix ex: <http://example.com/> .
        <http://x/r> ex:p ex:a .
        <http://x/r#me> ex:p ex:b .
        <http://x/r#you> ex:p ex:c .
        <http://x/rr> ex:p ex:d .
        <http://x/other#r> ex:p ex:e .
        "#,
    )
    .await?;
    let http = Arc::new(FakeHttpClient::new());
    let resolver = resolver(vec![local(1)?], Some(store), &http);
    let mut request = request("http://x/r", PagingWindow::default())?;
    request.query.hash_variant = true;

    let result = resolver.resolve(&request).await?;

    assert_eq!(result.total, 3);
    insta::assert_debug_snapshot!(data_triples(&result.graph), @r#"
    [
        "<http://x/r#me> <http://example.com/p> <http://example.com/b>",
        "<http://x/r#you> <http://example.com/p> <http://example.com/c>",
        "<http://x/r> <http://example.com/p> <http://example.com/a>",
    ]
    "#);
    Ok(())
}

#[tokio::test]
async fn offsets_past_every_backend_are_not_found() -> Result<(), Box<dyn Error>> {
    let store = store(
        r#"
        @prefix ex: <http://example.com/> .
        <http://x/r> ex:p ex:a .
        "#,
    )
    .await?;
    let start = "http://ldf.example/data";
    let http = Arc::new(
        FakeHttpClient::new()
            .route_containing(SPARQL, JSON, 200, &count_json(0))
            .route(
                start,
                200,
                &format!(
                    r#"
                    @prefix hydra: <http://www.w3.org/ns/hydra/core#> .
                    <{start}> hydra:totalItems 2 ; hydra:itemsPerPage 50 .
                    "#
                ),
            ),
    );
    let resolver = resolver(
        vec![
            local(1)?,
            sparql(1),
            SourceConfig::Ldf(LdfSource {
                id: 2,
                startfragment: start.to_owned(),
            }),
        ],
        Some(store),
        &http,
    );
    let request = request("http://x/r?offset=3", PagingWindow::new(10, 3))?;

    assert!(matches!(
        resolver.resolve(&request).await,
        Err(ResolveError::NotFound { .. })
    ));
    assert!(http
        .requested_urls()
        .iter()
        .all(|url| !url.contains("page=")));
    Ok(())
}

#[tokio::test]
async fn empty_results_are_not_found() -> Result<(), Box<dyn Error>> {
    let http = Arc::new(FakeHttpClient::new());
    let resolver = resolver(vec![local(1)?], Some(store("").await?), &http);
    let request = request("http://x/missing", PagingWindow::default())?;

    let error = resolver.resolve(&request).await.err().ok_or("resolved")?;
    assert!(matches!(
        &error,
        ResolveError::NotFound { subject } if subject == "http://x/missing"
    ));
    insta::assert_snapshot!(error, @"No triples found for 'http://x/missing'");
    Ok(())
}

#[tokio::test]
async fn missing_local_store_is_fatal() -> Result<(), Box<dyn Error>> {
    let http =
        Arc::new(FakeHttpClient::new().route_containing(SPARQL, JSON, 200, &count_json(3)));
    let request = request("http://x/r", PagingWindow::default())?;

    let without_store = resolver(vec![local(1)?, sparql(1)], None, &http);
    assert!(matches!(
        without_store.resolve(&request).await,
        Err(ResolveError::LocalStoreMisconfigured(
            LocalStoreError::NotConfigured
        ))
    ));

    let without_config = resolver(vec![sparql(1)], Some(store("").await?), &http);
    assert!(matches!(
        without_config.count(&request).await,
        Err(ResolveError::LocalStoreMisconfigured(
            LocalStoreError::NotConfigured
        ))
    ));
    Ok(())
}

#[tokio::test]
async fn failing_remote_backends_are_absorbed() -> Result<(), Box<dyn Error>> {
    let store = store(
        r#"
        @prefix ex: <http://example.com/> .
        <http://x/r> ex:p ex:a, ex:b .
        "#,
    )
    .await?;
    let http = Arc::new(
        FakeHttpClient::new()
            .route(SPARQL, 500, "Internal Server Error")
            .timeout("http://ldf.example/"),
    );
    let resolver = resolver(
        vec![
            local(1)?,
            sparql(1),
            SourceConfig::Ldf(LdfSource {
                id: 2,
                startfragment: "http://ldf.example/data".to_owned(),
            }),
        ],
        Some(store),
        &http,
    );
    let request = request("http://x/r", PagingWindow::default())?;

    let result = resolver.resolve(&request).await?;

    assert_eq!(result.total, 2);
    assert_eq!(data_triples(&result.graph).len(), 2);
    Ok(())
}

#[tokio::test]
async fn unreachable_sources_are_not_asked_twice() -> Result<(), Box<dyn Error>> {
    let reachable = "http://ldf.example/data";
    let unreachable = "http://slow.example/data";
    let fragment = |url: &str| {
        format!(
            r#"
            @prefix hydra: <http://www.w3.org/ns/hydra/core#> .
            <{url}> hydra:totalItems 1 ; hydra:itemsPerPage 50 .
            <http://x/r> <http://example.com/p> <http://example.com/o> .
            "#
        )
    };
    let first_page = format!("{reachable}?page=0");
    let http = Arc::new(
        FakeHttpClient::new()
            .timeout(unreachable)
            .route_containing(reachable, "page=0", 200, &fragment(&first_page))
            .route(reachable, 200, &fragment(reachable)),
    );
    let resolver = resolver(
        vec![
            local(1)?,
            SourceConfig::Ldf(LdfSource {
                id: 2,
                startfragment: unreachable.to_owned(),
            }),
            SourceConfig::Ldf(LdfSource {
                id: 3,
                startfragment: reachable.to_owned(),
            }),
        ],
        Some(store("").await?),
        &http,
    );
    let request = request("http://x/r", PagingWindow::default())?;

    let result = resolver.resolve(&request).await?;

    assert_eq!(result.total, 1);
    assert_eq!(data_triples(&result.graph).len(), 1);
    let timed_out = http
        .requested_urls()
        .into_iter()
        .filter(|url| url.starts_with(unreachable))
        .count();
    assert_eq!(timed_out, 1);
    Ok(())
}

#[test]
fn invalid_request_uris_are_rejected() {
    assert!(matches!(
        RequestContext::from_request_uri(ROOT, "/relative?limit=1"),
        Err(ResolveError::InvalidRequestUri { .. })
    ));
}
