#![doc = include_str!("../README.md")]

pub mod error;
pub mod paging;
pub mod request;
pub mod resolver;

pub mod model {
    pub use deref_model::*;
}

pub mod sparql {
    pub use deref_sparql::*;
}

pub mod sources {
    pub use deref_sources::*;
}
