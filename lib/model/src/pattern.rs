use std::fmt::{Display, Formatter, Write};
use url::form_urlencoded;

/// Request parameter that binds the subject slot of a [TriplePattern].
pub const SUBJECT_PARAMETER: &str = "subject";
/// Request parameter that binds the predicate slot of a [TriplePattern].
pub const PREDICATE_PARAMETER: &str = "predicate";
/// Request parameter that binds the object slot of a [TriplePattern].
pub const OBJECT_PARAMETER: &str = "object";

/// One slot of a [TriplePattern].
///
/// Rendering a term (via [Display]) always yields a valid SPARQL token. Empty IRIs render as `<>`
/// and empty literals as `""`, which keeps malformed input syntactically valid.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PatternTerm {
    /// A free variable, stored without the leading `?`.
    Variable(String),
    /// An IRI, stored without angle brackets.
    Iri(String),
    /// A literal as provided by the caller.
    ///
    /// Values that already are SPARQL literal tokens (quoted strings with an optional language
    /// tag or datatype, numbers and booleans) are rendered verbatim. Anything else is quoted.
    Literal(String),
}

impl PatternTerm {
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    pub fn iri(iri: impl Into<String>) -> Self {
        Self::Iri(iri.into())
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Self::Variable(_))
    }

    /// Returns the name of the variable, if this term is one.
    pub fn as_variable(&self) -> Option<&str> {
        match self {
            Self::Variable(name) => Some(name),
            Self::Iri(_) | Self::Literal(_) => None,
        }
    }

    /// Reads a request value for a slot that can only hold resources (subject and predicate).
    ///
    /// `?name` is a variable, everything else is taken as an IRI (optionally wrapped in `<>`).
    pub fn resource_from_request(value: &str) -> Self {
        if let Some(name) = parse_variable(value) {
            return Self::Variable(name.to_owned());
        }
        Self::Iri(strip_angle_brackets(value).to_owned())
    }

    /// Reads a request value for the object slot.
    ///
    /// `?name` is a variable, `<...>` and values starting with `http` are IRIs, and anything else
    /// is a literal.
    pub fn object_from_request(value: &str) -> Self {
        if let Some(name) = parse_variable(value) {
            return Self::Variable(name.to_owned());
        }
        if value.starts_with('<') && value.ends_with('>') && value.len() >= 2 {
            return Self::Iri(strip_angle_brackets(value).to_owned());
        }
        if value.starts_with("http") {
            return Self::Iri(value.to_owned());
        }
        Self::Literal(value.to_owned())
    }
}

impl Display for PatternTerm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Variable(name) => write!(f, "?{name}"),
            Self::Iri(iri) => write_iri(f, iri),
            Self::Literal(value) if is_literal_token(value) => f.write_str(value),
            Self::Literal(value) => write_string_literal(f, value),
        }
    }
}

/// A triple pattern `subject predicate object` that restricts what is resolved.
///
/// The default pattern `?s ?p ?o` matches everything.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TriplePattern {
    pub subject: PatternTerm,
    pub predicate: PatternTerm,
    pub object: PatternTerm,
}

impl TriplePattern {
    pub fn new(subject: PatternTerm, predicate: PatternTerm, object: PatternTerm) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    /// An anchor pattern leaves both the predicate and the object free. Only anchor patterns are
    /// extended with a traversal chain when resolving a concrete resource.
    pub fn is_anchor_pattern(&self) -> bool {
        self.predicate.is_variable() && self.object.is_variable()
    }

    /// Returns `true` if no slot of the pattern is bound.
    pub fn is_unbound(&self) -> bool {
        self.subject.is_variable() && self.predicate.is_variable() && self.object.is_variable()
    }

    /// Builds a pattern from the (optional) request values of the three slots. Missing slots fall
    /// back to the variables `?s`, `?p` and `?o`.
    pub fn from_request_values(
        subject: Option<&str>,
        predicate: Option<&str>,
        object: Option<&str>,
    ) -> Self {
        let default = Self::default();
        Self {
            subject: subject
                .map(PatternTerm::resource_from_request)
                .unwrap_or(default.subject),
            predicate: predicate
                .map(PatternTerm::resource_from_request)
                .unwrap_or(default.predicate),
            object: object
                .map(PatternTerm::object_from_request)
                .unwrap_or(default.object),
        }
    }

    /// Reads the `subject`, `predicate` and `object` parameters of a raw (url-encoded) query
    /// string. Other parameters are ignored, and the first occurrence of a parameter wins.
    pub fn from_query_string(raw_query: &str) -> Self {
        let mut subject = None;
        let mut predicate = None;
        let mut object = None;
        for (key, value) in form_urlencoded::parse(raw_query.trim_start_matches('?').as_bytes()) {
            let slot = match key.as_ref() {
                SUBJECT_PARAMETER => &mut subject,
                PREDICATE_PARAMETER => &mut predicate,
                OBJECT_PARAMETER => &mut object,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        Self::from_request_values(subject.as_deref(), predicate.as_deref(), object.as_deref())
    }
}

impl Default for TriplePattern {
    fn default() -> Self {
        Self {
            subject: PatternTerm::variable("s"),
            predicate: PatternTerm::variable("p"),
            object: PatternTerm::variable("o"),
        }
    }
}

impl Display for TriplePattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

fn parse_variable(value: &str) -> Option<&str> {
    let name = value.strip_prefix('?').or_else(|| value.strip_prefix('$'))?;
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '\u{B7}');
    valid.then_some(name)
}

fn strip_angle_brackets(value: &str) -> &str {
    value
        .strip_prefix('<')
        .and_then(|v| v.strip_suffix('>'))
        .unwrap_or(value)
}

/// Writes `<iri>`, percent-encoding the characters that may not appear in an IRIREF.
pub fn write_iri(f: &mut impl Write, iri: &str) -> std::fmt::Result {
    f.write_char('<')?;
    for c in iri.chars() {
        match c {
            '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\' => write!(f, "%{:02X}", u32::from(c))?,
            c if c <= ' ' => write!(f, "%{:02X}", u32::from(c))?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('>')
}

/// Writes `"value"`, escaping the characters that may not appear in a SPARQL string literal.
pub fn write_string_literal(f: &mut impl Write, value: &str) -> std::fmt::Result {
    f.write_char('"')?;
    for c in value.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

fn is_literal_token(value: &str) -> bool {
    matches!(value, "true" | "false") || is_numeric_token(value) || is_quoted_token(value)
}

fn is_numeric_token(value: &str) -> bool {
    let unsigned = value.strip_prefix(['+', '-']).unwrap_or(value);
    let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => (mantissa, Some(exponent)),
        None => (unsigned, None),
    };
    let (integer, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    let mantissa_ok = digits(integer)
        && digits(fraction)
        && (!fraction.is_empty() || (!integer.is_empty() && !mantissa.ends_with('.')));
    let exponent_ok = exponent.map_or(true, |e| {
        let e = e.strip_prefix(['+', '-']).unwrap_or(e);
        !e.is_empty() && digits(e)
    });
    mantissa_ok && exponent_ok
}

/// Checks for `"..."`, optionally followed by `@lang` or `^^<datatype>`.
fn is_quoted_token(value: &str) -> bool {
    let Some(rest) = value.strip_prefix('"') else {
        return false;
    };
    let mut escaped = false;
    let mut end = None;
    for (i, c) in rest.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => {
                end = Some(i);
                break;
            }
            '\n' | '\r' => return false,
            _ => (),
        }
    }
    let Some(end) = end else {
        return false;
    };
    let suffix = &rest[end + 1..];
    if suffix.is_empty() {
        return true;
    }
    if let Some(language) = suffix.strip_prefix('@') {
        return !language.is_empty()
            && language.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    }
    if let Some(datatype) = suffix.strip_prefix("^^<").and_then(|d| d.strip_suffix('>')) {
        return !datatype.is_empty()
            && !datatype
                .chars()
                .any(|c| c <= ' ' || matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\'));
    }
    false
}
