//! Renders the SPARQL queries used to count and fetch the triples of a resource.
//!
//! Rendering is pure and deterministic: the same [QueryContext] and arguments always produce the
//! same query text, and every query is syntactically valid regardless of the caller's input.

mod builder;
mod context;

pub use builder::*;
pub use context::*;
