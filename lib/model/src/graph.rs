use crate::GraphMergeError;
use oxrdf::{Graph, Triple};
use oxrdfio::{RdfFormat, RdfParser, RdfSerializer};
use std::io;

/// The prefixes used when serializing a resolved graph.
pub const PREFIXES: [(&str, &str); 5] = [
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("hydra", "http://www.w3.org/ns/hydra/core#"),
    ("void", "http://rdfs.org/ns/void#"),
    ("dcterms", "http://purl.org/dc/terms/"),
];

/// Parses a serialized RDF document.
///
/// The whole document is parsed before anything is returned, so a syntax error anywhere in the body
/// yields no triples at all. Blank node labels are kept as they appear in the document.
pub fn parse_triples(
    format: RdfFormat,
    body: &[u8],
    base_iri: Option<&str>,
) -> Result<Vec<Triple>, GraphMergeError> {
    let mut parser = RdfParser::from_format(format);
    if let Some(base_iri) = base_iri {
        parser = parser
            .with_base_iri(base_iri)
            .map_err(|error| GraphMergeError::InvalidBaseIri {
                iri: base_iri.to_owned(),
                error,
            })?;
    }
    parser
        .for_reader(body)
        .map(|quad| -> Result<Triple, GraphMergeError> { Ok(quad?.into()) })
        .collect()
}

/// Inserts at most `max_new` triples that are not yet part of the graph. Returns how many were new.
pub fn merge_triples(
    graph: &mut Graph,
    triples: impl IntoIterator<Item = Triple>,
    max_new: usize,
) -> usize {
    let mut inserted = 0;
    for triple in triples {
        if inserted >= max_new {
            break;
        }
        if graph.insert(&triple) {
            inserted += 1;
        }
    }
    inserted
}

/// Parses a serialized RDF document and merges it into `graph`.
///
/// Returns the number of triples that were new to the graph. Merging the same document twice is a
/// no-op the second time.
pub fn merge_serialized(
    graph: &mut Graph,
    format: RdfFormat,
    body: &[u8],
    base_iri: Option<&str>,
) -> Result<usize, GraphMergeError> {
    let triples = parse_triples(format, body, base_iri)?;
    Ok(merge_triples(graph, triples, usize::MAX))
}

/// Serializes a graph, declaring the [PREFIXES] where the format supports them.
pub fn serialize_graph(graph: &Graph, format: RdfFormat) -> io::Result<Vec<u8>> {
    let mut serializer = RdfSerializer::from_format(format);
    for (prefix, iri) in PREFIXES {
        serializer = serializer
            .with_prefix(prefix, iri)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    }
    let mut writer = serializer.for_writer(Vec::new());
    for triple in graph {
        writer.serialize_triple(triple)?;
    }
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"
        @prefix ex: <http://example.com/> .
        ex:r ex:p ex:o ; ex:q _:b .
        _:b ex:v "1" .
    "#;

    #[test]
    fn merging_twice_is_a_no_op() {
        let mut graph = Graph::new();
        let first =
            merge_serialized(&mut graph, RdfFormat::Turtle, DOCUMENT.as_bytes(), None).unwrap();
        let second =
            merge_serialized(&mut graph, RdfFormat::Turtle, DOCUMENT.as_bytes(), None).unwrap();
        assert_eq!(first, 3);
        assert_eq!(second, 0);
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn invalid_documents_do_not_merge() {
        let mut graph = Graph::new();
        let body = "<http://example.com/a> <http://example.com/b> <http://example.com/c> .\n<broken";
        let result = merge_serialized(&mut graph, RdfFormat::Turtle, body.as_bytes(), None);
        assert!(matches!(result, Err(GraphMergeError::Parse(_))));
        assert!(graph.is_empty());
    }

    #[test]
    fn relative_iris_use_the_base() {
        let mut graph = Graph::new();
        merge_serialized(
            &mut graph,
            RdfFormat::Turtle,
            b"<r> <p> <o> .",
            Some("http://example.com/"),
        )
        .unwrap();
        let triple = graph.iter().next().unwrap();
        assert_eq!(triple.subject.to_string(), "<http://example.com/r>");
    }

    #[test]
    fn merge_respects_the_budget() {
        let mut graph = Graph::new();
        let triples = parse_triples(RdfFormat::Turtle, DOCUMENT.as_bytes(), None).unwrap();
        assert_eq!(merge_triples(&mut graph, triples, 2), 2);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn serializes_with_prefixes() {
        let mut graph = Graph::new();
        merge_serialized(
            &mut graph,
            RdfFormat::NTriples,
            b"<http://example.com/r> <http://rdfs.org/ns/void#triples> \"1\"^^<http://www.w3.org/2001/XMLSchema#integer> .\n",
            None,
        )
        .unwrap();
        let turtle = String::from_utf8(serialize_graph(&graph, RdfFormat::Turtle).unwrap()).unwrap();
        assert!(turtle.contains("@prefix void:"));
        assert!(turtle.contains("void:triples"));
    }
}
