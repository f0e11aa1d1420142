use crate::RemoteResponseError;
use deref_model::Term;
use deref_sparql::COUNT_VARIABLE;
use sparesults::{
    QueryResultsFormat, QueryResultsParser, QuerySolution, ReaderQueryResultsParserOutput,
};

/// Reads the `count` binding of the first solution.
pub fn count_from_solutions(solutions: &[QuerySolution]) -> Result<usize, RemoteResponseError> {
    let Some(first) = solutions.first() else {
        return Ok(0);
    };
    read_count(first)
}

/// Parses a `application/sparql-results+json` document and reads the `count` binding of its first
/// solution. A document without solutions counts as zero.
pub fn count_from_json(body: &str) -> Result<usize, RemoteResponseError> {
    let parser = QueryResultsParser::from_format(QueryResultsFormat::Json);
    match parser.for_reader(body.as_bytes())? {
        ReaderQueryResultsParserOutput::Solutions(mut solutions) => match solutions.next() {
            Some(solution) => read_count(&solution?),
            None => Ok(0),
        },
        ReaderQueryResultsParserOutput::Boolean(_) => Err(RemoteResponseError::NotSolutions),
    }
}

fn read_count(solution: &QuerySolution) -> Result<usize, RemoteResponseError> {
    match solution.get(COUNT_VARIABLE) {
        Some(Term::Literal(literal)) => literal
            .value()
            .trim()
            .parse()
            .map_err(|_| RemoteResponseError::InvalidCount),
        _ => Err(RemoteResponseError::InvalidCount),
    }
}
