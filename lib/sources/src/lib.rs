//! The backends a resource is resolved from, and the ports they depend on.
//!
//! Three [SemanticHandler]s are provided:
//! - [LocalStoreHandler] queries the local triple store,
//! - [SparqlHandler] queries remote SPARQL endpoints,
//! - [LdfHandler] pages through Linked Data Fragments servers.
//!
//! Handlers reach the outside world only through the [LocalTripleStore], [HttpClient],
//! [ResponseCache] and [SourceRepository] ports.

mod cache;
mod cacher;
mod error;
mod handler;
mod http;
mod ldf;
mod local;
mod repository;
mod results;
mod sparql;
mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cache::*;
pub use cacher::*;
pub use error::*;
pub use handler::*;
pub use http::*;
pub use ldf::*;
pub use local::*;
pub use repository::*;
pub use results::*;
pub use sparql::{SparqlHandler, SPARQL_CACHE_NAMESPACE};
pub use store::*;
