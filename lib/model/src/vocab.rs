//! Vocabularies used for the paging metadata of resolved graphs and for reading Linked Data
//! Fragments responses.

pub use oxrdf::vocab::{rdf, xsd};

pub mod hydra {
    //! [Hydra](https://www.hydra-cg.com/spec/latest/core/) vocabulary.
    use oxrdf::NamedNodeRef;

    pub const COLLECTION: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/hydra/core#Collection");
    pub const PAGED_COLLECTION: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/hydra/core#PagedCollection");
    pub const PARTIAL_COLLECTION_VIEW: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/hydra/core#PartialCollectionView");
    pub const IRI_TEMPLATE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/hydra/core#IriTemplate");
    pub const IRI_TEMPLATE_MAPPING: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/hydra/core#IriTemplateMapping");

    pub const TOTAL_ITEMS: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/hydra/core#totalItems");
    pub const ITEMS_PER_PAGE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/hydra/core#itemsPerPage");
    pub const FIRST_PAGE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/hydra/core#firstPage");
    pub const NEXT_PAGE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/hydra/core#nextPage");
    pub const PREVIOUS_PAGE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/hydra/core#previousPage");
    pub const LAST_PAGE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/hydra/core#lastPage");
    pub const ENTRYPOINT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/hydra/core#entrypoint");
    pub const SEARCH: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/hydra/core#search");
    pub const TEMPLATE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/hydra/core#template");
    pub const MAPPING: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/hydra/core#mapping");
    pub const VARIABLE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/hydra/core#variable");
    pub const PROPERTY: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/hydra/core#property");
}

pub mod void {
    //! [VoID](https://www.w3.org/TR/void/) vocabulary.
    use oxrdf::NamedNodeRef;

    pub const DATASET: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://rdfs.org/ns/void#Dataset");
    pub const TRIPLES: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://rdfs.org/ns/void#triples");
}

pub mod dcterms {
    use oxrdf::NamedNodeRef;

    pub const TITLE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/dc/terms/title");
    pub const DESCRIPTION: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/dc/terms/description");
}
