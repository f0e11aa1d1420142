//! The request being resolved and the URLs derived from it.

use crate::error::ResolveError;
use deref_model::{Depth, Iri, NamedNode, PagingWindow, TriplePattern};
use deref_sources::{HandlerRequest, UnreachableSources};
use deref_sparql::QueryContext;

const LIMIT_PARAMETER: &str = "limit";
const OFFSET_PARAMETER: &str = "offset";
const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// The URL a request was made on, split into the parts the paging metadata is built from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext {
    root: String,
    url: String,
    raw_query: String,
}

impl RequestContext {
    /// Creates a context for a request on `url` without query string.
    ///
    /// Both `root` and `url` must be absolute IRIs.
    pub fn new(root: impl Into<String>, url: impl Into<String>) -> Result<Self, ResolveError> {
        let root = root.into();
        let url = url.into();
        validate_iri(&root)?;
        validate_iri(&url)?;
        Ok(Self {
            root,
            url,
            raw_query: String::new(),
        })
    }

    /// Creates a context from a full request URI, splitting off its query string.
    pub fn from_request_uri(
        root: impl Into<String>,
        request_uri: &str,
    ) -> Result<Self, ResolveError> {
        match request_uri.split_once('?') {
            Some((url, raw_query)) => Ok(Self::new(root, url)?.with_raw_query(raw_query)),
            None => Self::new(root, request_uri),
        }
    }

    /// Sets the raw, still percent-encoded query string of the request.
    #[must_use]
    pub fn with_raw_query(mut self, raw_query: impl Into<String>) -> Self {
        self.raw_query = raw_query.into();
        self
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// The request URL without query string.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn raw_query(&self) -> &str {
        &self.raw_query
    }

    /// The exact URI that was requested.
    pub fn raw_request_uri(&self) -> String {
        if self.raw_query.is_empty() {
            self.url.clone()
        } else {
            format!("{}?{}", self.url, self.raw_query)
        }
    }

    /// The IRI the paging metadata is attached to: the requested URI.
    pub fn dataset_iri(&self) -> NamedNode {
        NamedNode::new_unchecked(encode_unsafe(&self.raw_request_uri()))
    }

    /// The URL of another page of the same request.
    ///
    /// The client's parameters keep their order. `limit` and `offset` are replaced in place, or
    /// appended if the client did not send them.
    pub fn page_url(&self, window: PagingWindow) -> String {
        let mut has_limit = false;
        let mut has_offset = false;
        let mut parameters = Vec::new();
        for parameter in self.raw_query.split('&').filter(|p| !p.is_empty()) {
            let name = parameter.split('=').next().unwrap_or(parameter);
            if name == LIMIT_PARAMETER {
                if !has_limit {
                    parameters.push(format!("{LIMIT_PARAMETER}={}", window.limit));
                }
                has_limit = true;
            } else if name == OFFSET_PARAMETER {
                if !has_offset {
                    parameters.push(format!("{OFFSET_PARAMETER}={}", window.offset));
                }
                has_offset = true;
            } else {
                parameters.push(parameter.to_owned());
            }
        }
        if !has_limit {
            parameters.push(format!("{LIMIT_PARAMETER}={}", window.limit));
        }
        if !has_offset {
            parameters.push(format!("{OFFSET_PARAMETER}={}", window.offset));
        }
        encode_unsafe(&format!("{}?{}", self.url, parameters.join("&")))
    }

    /// [Self::page_url] as a named node.
    pub fn page_iri(&self, window: PagingWindow) -> NamedNode {
        NamedNode::new_unchecked(self.page_url(window))
    }
}

fn validate_iri(iri: &str) -> Result<(), ResolveError> {
    Iri::parse(iri)
        .map(|_| ())
        .map_err(|error| ResolveError::InvalidRequestUri {
            uri: iri.to_owned(),
            error,
        })
}

/// Percent-encodes the characters a client may send unencoded but that are not allowed in an IRI,
/// including `#` and malformed `%` escapes.
fn encode_unsafe(url: &str) -> String {
    let bytes = url.as_bytes();
    let mut encoded = String::with_capacity(url.len());
    for (i, c) in url.char_indices() {
        let is_escape = c == '%'
            && bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
            && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit);
        let is_unsafe = matches!(
            c,
            '#' | '<' | '>' | '"' | '{' | '}' | '|' | '\\' | '^' | '`' | ' '
        ) || c.is_control()
            || (c == '%' && !is_escape);
        if is_unsafe {
            let mut buffer = [0; 4];
            for byte in c.encode_utf8(&mut buffer).bytes() {
                encoded.push('%');
                encoded.push(char::from(HEX_DIGITS[usize::from(byte >> 4)]));
                encoded.push(char::from(HEX_DIGITS[usize::from(byte & 0xF)]));
            }
        } else {
            encoded.push(c);
        }
    }
    encoded
}

/// A request to resolve a resource.
#[derive(Clone, Debug)]
pub struct ResolveRequest {
    /// The URI of the resource. Resolving the root URI resolves the whole dataset.
    pub subject: String,
    pub window: PagingWindow,
    /// Follow the objects of the resource up to each backend's configured depth. If `false`, only
    /// the triples of the resource itself are returned.
    pub dereference: bool,
    pub query: QueryContext,
    pub context: RequestContext,
}

impl ResolveRequest {
    /// Resolves the request URL with the triple pattern of its query string, the default window
    /// and dereferencing enabled.
    pub fn new(context: RequestContext) -> Self {
        Self {
            subject: context.url().to_owned(),
            window: PagingWindow::default(),
            dereference: true,
            query: QueryContext::new(TriplePattern::from_query_string(context.raw_query())),
            context,
        }
    }

    #[must_use]
    pub fn with_window(mut self, window: PagingWindow) -> Self {
        self.window = window;
        self
    }

    #[must_use]
    pub fn with_dereference(mut self, dereference: bool) -> Self {
        self.dereference = dereference;
        self
    }

    #[must_use]
    pub fn with_query(mut self, query: QueryContext) -> Self {
        self.query = query;
        self
    }

    /// The depth forced on every backend.
    pub fn depth(&self) -> Option<Depth> {
        (!self.dereference).then_some(Depth::MIN)
    }

    pub(crate) fn handler_request<'a>(
        &'a self,
        unreachable: &'a UnreachableSources,
    ) -> HandlerRequest<'a> {
        HandlerRequest {
            subject: &self.subject,
            root: self.context.root(),
            query: &self.query,
            depth: self.depth(),
            forwarded_query: self.context.raw_query(),
            unreachable,
        }
    }
}
