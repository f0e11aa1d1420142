use crate::QueryContext;
use deref_model::{write_iri, write_string_literal, Depth, PagingWindow, PatternTerm};
use std::fmt::{Display, Formatter, Write};

/// The variable that holds the result of a count query.
pub const COUNT_VARIABLE: &str = "count";

/// Renders the COUNT and CONSTRUCT queries for a [QueryContext].
///
/// The subject is anchored as follows:
/// - If the subject is empty or equals the root URI, the pattern's subject slot is kept. This
///   resolves the whole dataset.
/// - Otherwise, the subject slot is bound to the subject URI. In hash-variant mode the slot stays
///   a variable and a `REGEX` filter matches the URI and all of its `#fragment` variants.
///
/// Anchored anchor patterns (free predicate and object) are extended with a chain of
/// `depth - 1` hops that starts at the pattern's object.
#[derive(Clone, Copy, Debug)]
pub struct QueryBuilder<'ctx> {
    context: &'ctx QueryContext,
}

impl<'ctx> QueryBuilder<'ctx> {
    pub fn new(context: &'ctx QueryContext) -> Self {
        Self { context }
    }

    /// `SELECT (COUNT(*) AS ?count) [FROM <graph> ]{ ... }`
    pub fn count_query(
        &self,
        subject: &str,
        root: &str,
        named_graph: Option<&str>,
        depth: Depth,
    ) -> String {
        RenderedQuery {
            form: QueryForm::Count,
            shape: self.shape(subject, root, depth),
            named_graph,
        }
        .to_string()
    }

    /// `CONSTRUCT { ... } [FROM <graph> ]{ ... } OFFSET <offset> LIMIT <limit>`
    pub fn fetch_query(
        &self,
        subject: &str,
        root: &str,
        named_graph: Option<&str>,
        window: PagingWindow,
        depth: Depth,
    ) -> String {
        RenderedQuery {
            form: QueryForm::Construct(window),
            shape: self.shape(subject, root, depth),
            named_graph,
        }
        .to_string()
    }

    fn shape<'a>(&'a self, subject: &'a str, root: &str, depth: Depth) -> QueryShape<'a> {
        let pattern = &self.context.pattern;
        if resolves_everything(subject, root) {
            return QueryShape {
                subject: SubjectSlot::Pattern(&pattern.subject),
                predicate: &pattern.predicate,
                object: &pattern.object,
                chain_depth: 1,
            };
        }

        let subject_slot = if self.context.hash_variant {
            SubjectSlot::HashFilter {
                variable: pattern.subject.as_variable().unwrap_or("s"),
                uri: subject,
            }
        } else {
            SubjectSlot::Bound(subject)
        };
        let chain_depth = if pattern.is_anchor_pattern() {
            depth.get()
        } else {
            1
        };
        QueryShape {
            subject: subject_slot,
            predicate: &pattern.predicate,
            object: &pattern.object,
            chain_depth,
        }
    }
}

fn resolves_everything(subject: &str, root: &str) -> bool {
    subject.is_empty() || subject.trim_end_matches('/') == root.trim_end_matches('/')
}

enum QueryForm {
    Count,
    Construct(PagingWindow),
}

enum SubjectSlot<'a> {
    Pattern(&'a PatternTerm),
    Bound(&'a str),
    HashFilter { variable: &'a str, uri: &'a str },
}

struct QueryShape<'a> {
    subject: SubjectSlot<'a>,
    predicate: &'a PatternTerm,
    object: &'a PatternTerm,
    chain_depth: u8,
}

impl QueryShape<'_> {
    fn write_triple(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.subject {
            SubjectSlot::Pattern(term) => write!(f, "{term}")?,
            SubjectSlot::Bound(iri) => write_iri(f, iri)?,
            SubjectSlot::HashFilter { variable, .. } => write!(f, "?{variable}")?,
        }
        write!(f, " {} {} .", self.predicate, self.object)
    }

    /// Writes ` o ?p2 ?o2 . ?o2 ?p3 ?o3 . ...`
    fn write_chain(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for level in 2..=self.chain_depth {
            if level == 2 {
                write!(f, " {}", self.object)?;
            } else {
                write!(f, " ?o{}", level - 1)?;
            }
            write!(f, " ?p{level} ?o{level} .")?;
        }
        Ok(())
    }

    fn write_filter(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let SubjectSlot::HashFilter { variable, uri } = &self.subject else {
            return Ok(());
        };
        let uri = escape_regex(uri);
        write!(f, " FILTER(REGEX(STR(?{variable}), ")?;
        write_string_literal(f, &format!("^{uri}#.*"))?;
        write!(f, ", \"i\") || REGEX(STR(?{variable}), ")?;
        write_string_literal(f, &format!("^{uri}$"))?;
        f.write_str(", \"i\"))")
    }

    fn write_template(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("{ ")?;
        self.write_triple(f)?;
        self.write_chain(f)?;
        f.write_str(" }")
    }

    fn write_body(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("{ ")?;
        self.write_triple(f)?;
        self.write_filter(f)?;
        if self.chain_depth > 1 {
            f.write_str(" OPTIONAL {")?;
            self.write_chain(f)?;
            f.write_str(" }")?;
        }
        f.write_str(" }")
    }
}

struct RenderedQuery<'a> {
    form: QueryForm,
    shape: QueryShape<'a>,
    named_graph: Option<&'a str>,
}

impl Display for RenderedQuery<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.form {
            QueryForm::Count => write!(f, "SELECT (COUNT(*) AS ?{COUNT_VARIABLE}) ")?,
            QueryForm::Construct(_) => {
                f.write_str("CONSTRUCT ")?;
                self.shape.write_template(f)?;
                f.write_char(' ')?;
            }
        }
        if let Some(graph) = self.named_graph {
            f.write_str("FROM ")?;
            write_iri(f, graph)?;
            f.write_char(' ')?;
        }
        self.shape.write_body(f)?;
        if let QueryForm::Construct(window) = self.form {
            write!(f, " OFFSET {} LIMIT {}", window.offset, window.limit)?;
        }
        Ok(())
    }
}

/// Escapes the regular expression meta characters of a URI.
fn escape_regex(uri: &str) -> String {
    let mut escaped = String::with_capacity(uri.len());
    for c in uri.chars() {
        if matches!(
            c,
            '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
