//! An in-memory [HttpClient] and response bodies for tests.

use crate::{HttpClient, HttpError, HttpRequest, HttpResponse};
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};

/// Answers requests from a list of canned responses and records every request.
#[derive(Default)]
pub struct FakeHttpClient {
    routes: Vec<Route>,
    requests: Mutex<Vec<HttpRequest>>,
}

struct Route {
    url_prefix: String,
    url_contains: Option<String>,
    response: Option<HttpResponse>,
}

impl FakeHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers requests whose URL starts with `url_prefix`.
    pub fn route(mut self, url_prefix: &str, status: u16, body: &str) -> Self {
        self.routes.push(Route {
            url_prefix: url_prefix.to_owned(),
            url_contains: None,
            response: Some(HttpResponse::new(status, body)),
        });
        self
    }

    /// Answers requests whose URL starts with `url_prefix` and contains `fragment`.
    pub fn route_containing(mut self, url_prefix: &str, fragment: &str, status: u16, body: &str) -> Self {
        self.routes.push(Route {
            url_prefix: url_prefix.to_owned(),
            url_contains: Some(fragment.to_owned()),
            response: Some(HttpResponse::new(status, body)),
        });
        self
    }

    /// Lets requests whose URL starts with `url_prefix` time out.
    pub fn timeout(mut self, url_prefix: &str) -> Self {
        self.routes.push(Route {
            url_prefix: url_prefix.to_owned(),
            url_contains: None,
            response: None,
        });
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|request| request.url).collect()
    }
}

#[async_trait]
impl HttpClient for FakeHttpClient {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        let route = self.routes.iter().find(|route| {
            request.url.starts_with(&route.url_prefix)
                && route
                    .url_contains
                    .as_ref()
                    .map_or(true, |fragment| request.url.contains(fragment.as_str()))
        });
        match route {
            Some(Route {
                response: Some(response),
                ..
            }) => Ok(response.clone()),
            Some(_) => Err(HttpError::Timeout { url: request.url }),
            None => Ok(HttpResponse::new(404, "Not Found")),
        }
    }
}

/// A SPARQL JSON result with a single `?count` binding.
pub fn count_json(count: usize) -> String {
    format!(
        r#"{{"head":{{"vars":["count"]}},"results":{{"bindings":[{{"count":{{"type":"literal","datatype":"http://www.w3.org/2001/XMLSchema#integer","value":"{count}"}}}}]}}}}"#
    )
}

/// An RDF/XML document with one triple per object.
pub fn rdf_xml(subject: &str, objects: &[&str]) -> String {
    let properties = objects
        .iter()
        .map(|object| format!(r#"<ex:p rdf:resource="{object}"/>"#))
        .collect::<String>();
    format!(
        r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns:ex="http://example.com/">
  <rdf:Description rdf:about="{subject}">{properties}</rdf:Description>
</rdf:RDF>"#
    )
}
