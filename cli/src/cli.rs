use clap::{Args as ClapArgs, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Parser)]
#[command(about, version, name = "deref")]
/// Deref command line tool: resolves URIs against a local store, SPARQL endpoints and Linked Data
/// Fragments servers
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Resolve a URI and write its description, including paging metadata
    Resolve {
        #[command(flatten)]
        request: RequestArgs,
        /// Number of triples to return
        #[arg(long, default_value_t = 100)]
        limit: usize,
        /// Number of triples to skip
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// The format of the output
        ///
        /// It can be an extension like "ttl" or a MIME type like "text/turtle".
        #[arg(long, default_value = "ttl")]
        format: String,
    },
    /// Print how many triples every backend holds for a URI
    Count {
        #[command(flatten)]
        request: RequestArgs,
    },
}

/// Where to resolve from and what to resolve.
#[derive(ClapArgs)]
pub struct RequestArgs {
    /// The URI to resolve, optionally with a query string
    #[arg(value_hint = ValueHint::Url)]
    pub uri: String,
    /// The root URI of the dataset
    ///
    /// Resolving the root URI resolves everything. By default the origin of the URI is used.
    #[arg(long, value_hint = ValueHint::Url)]
    pub root: Option<String>,
    /// JSON file listing the sources to resolve from
    ///
    /// By default only the local store is used.
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// RDF files to load into the local store before resolving
    ///
    /// The format is guessed from the file extension.
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub load: Vec<PathBuf>,
    /// Only return the triples of the resource itself, without following its objects
    #[arg(long)]
    pub shallow: bool,
    /// Also match the `#fragment` variants of the URI
    #[arg(long)]
    pub hash_variant: bool,
    /// Subject of the triple pattern. Overrides the query string of the URI.
    #[arg(long)]
    pub subject: Option<String>,
    /// Predicate of the triple pattern. Overrides the query string of the URI.
    #[arg(long)]
    pub predicate: Option<String>,
    /// Object of the triple pattern. Overrides the query string of the URI.
    #[arg(long)]
    pub object: Option<String>,
    /// Timeout of every request to a remote source, in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,
    /// How long remote responses are cached, in seconds
    #[arg(long, default_value_t = 300)]
    pub cache_ttl: u64,
}
