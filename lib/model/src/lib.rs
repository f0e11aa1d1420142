mod config;
mod error;
mod graph;
mod pattern;
pub mod vocab;
mod window;

pub use config::*;
pub use error::*;
pub use graph::*;
pub use pattern::*;
pub use window::*;

// Re-export some oxrdf types.
pub use oxiri::Iri;
pub use oxrdf::{
    BlankNode, BlankNodeRef, Graph, IriParseError, Literal, LiteralRef, NamedNode, NamedNodeRef,
    Subject, SubjectRef, Term, TermRef, Triple, TripleRef, Variable,
};
pub use oxrdfio::{RdfFormat, RdfParseError};
