//! VoID and Hydra metadata that describe a resolved page and link to its neighbours.

use crate::request::RequestContext;
use deref_model::vocab::{dcterms, hydra, rdf, void, xsd};
use deref_model::{
    BlankNode, Graph, Literal, NamedNode, NamedNodeRef, PagingWindow, SubjectRef, TermRef,
    TriplePattern, TripleRef,
};

/// The title of every resolved dataset.
pub const DATASET_TITLE: &str = "A linked dataset";

/// The windows of the pages around a resolved page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PagingLinks {
    pub first: PagingWindow,
    pub next: Option<PagingWindow>,
    pub previous: Option<PagingWindow>,
    pub last: Option<PagingWindow>,
}

impl PagingLinks {
    /// Computes the links of the page `window` out of `total` triples.
    ///
    /// `next` and `last` only exist if triples remain after this page, `previous` only if this
    /// page does not start at the beginning. A window with a limit of zero has no next page.
    pub fn new(window: PagingWindow, total: usize) -> Self {
        let PagingWindow { limit, offset } = window;
        let has_more = limit > 0 && window.end() < total;
        Self {
            first: PagingWindow::new(limit, 0),
            next: has_more.then(|| PagingWindow::new(limit, window.end())),
            previous: (offset > 0 && total > 0)
                .then(|| PagingWindow::new(limit, offset.saturating_sub(limit))),
            last: has_more.then(|| PagingWindow::new(limit, (total.div_ceil(limit) - 1) * limit)),
        }
    }
}

/// Describes the resolved page as a `void:Dataset` and `hydra:Collection` on the requested URI.
///
/// Adds the paging links, the triple counts, a title and description, the entry point of the
/// dataset and a `hydra:search` template for triple pattern queries.
pub fn attach_paging_metadata(
    graph: &mut Graph,
    context: &RequestContext,
    pattern: &TriplePattern,
    window: PagingWindow,
    total: usize,
) {
    let dataset = context.dataset_iri();
    let dataset = dataset.as_ref();

    add(graph, dataset, rdf::TYPE, void::DATASET);
    add(graph, dataset, rdf::TYPE, hydra::COLLECTION);
    add(graph, dataset, dcterms::TITLE, &Literal::from(DATASET_TITLE));
    let description =
        format!("Linked dataset containing the triples that match the pattern {pattern} .");
    add(graph, dataset, dcterms::DESCRIPTION, &Literal::from(description));
    add(
        graph,
        dataset,
        hydra::ENTRYPOINT,
        &NamedNode::new_unchecked(context.root()),
    );

    let total_items = integer(total);
    add(graph, dataset, hydra::TOTAL_ITEMS, &total_items);
    add(graph, dataset, void::TRIPLES, &total_items);
    add(graph, dataset, hydra::ITEMS_PER_PAGE, &integer(window.limit));

    let links = PagingLinks::new(window, total);
    let pages = [
        (hydra::FIRST_PAGE, Some(links.first)),
        (hydra::NEXT_PAGE, links.next),
        (hydra::PREVIOUS_PAGE, links.previous),
        (hydra::LAST_PAGE, links.last),
    ];
    for (predicate, page) in pages {
        if let Some(page) = page {
            add(graph, dataset, predicate, &context.page_iri(page));
        }
    }

    let search = BlankNode::default();
    add(graph, dataset, hydra::SEARCH, &search);
    add_search_template(graph, &search, context.url());
}

fn add<'a>(
    graph: &mut Graph,
    subject: impl Into<SubjectRef<'a>>,
    predicate: NamedNodeRef<'a>,
    object: impl Into<TermRef<'a>>,
) {
    graph.insert(TripleRef::new(subject, predicate, object));
}

fn integer(value: usize) -> Literal {
    Literal::new_typed_literal(value.to_string(), xsd::INTEGER)
}

/// `search a hydra:IriTemplate` with a `{url}{?subject,predicate,object}` template and one
/// mapping per variable.
fn add_search_template(graph: &mut Graph, search: &BlankNode, url: &str) {
    graph.insert(TripleRef::new(search, rdf::TYPE, hydra::IRI_TEMPLATE));
    graph.insert(TripleRef::new(
        search,
        hydra::TEMPLATE,
        &Literal::from(format!("{url}{{?subject,predicate,object}}")),
    ));
    for (variable, property) in [
        ("subject", rdf::SUBJECT),
        ("predicate", rdf::PREDICATE),
        ("object", rdf::OBJECT),
    ] {
        let mapping = BlankNode::default();
        graph.insert(TripleRef::new(search, hydra::MAPPING, &mapping));
        graph.insert(TripleRef::new(
            &mapping,
            rdf::TYPE,
            hydra::IRI_TEMPLATE_MAPPING,
        ));
        graph.insert(TripleRef::new(
            &mapping,
            hydra::VARIABLE,
            &Literal::from(variable),
        ));
        graph.insert(TripleRef::new(&mapping, hydra::PROPERTY, property));
    }
}
