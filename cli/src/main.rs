use crate::cli::{Args, Command, RequestArgs};
use anyhow::{bail, Context};
use clap::Parser;
use deref::model::{serialize_graph, PagingWindow, RdfFormat, SourcesConfig, TriplePattern};
use deref::request::{RequestContext, ResolveRequest};
use deref::resolver::Resolver;
use deref::sources::{
    LocalTripleStore, MemoryCache, OxigraphStore, RemoteOptions, ReqwestClient, SourceCacher,
    SourceRepository, StaticSourceRepository,
};
use std::ffi::OsStr;
use std::fs;
use std::io::{self, stdout, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

mod cli;

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    init_logging();
    let matches = Args::parse();
    match matches.command {
        Command::Resolve {
            request,
            limit,
            offset,
            format,
        } => {
            let format = rdf_format_from_name(&format)?;
            let (resolver, request) = prepare(&request).await?;
            let request = request.with_window(PagingWindow::new(limit, offset));
            let result = resolver.resolve(&request).await?;
            let body = serialize_graph(&result.graph, format)?;
            let mut stdout = stdout().lock();
            stdout.write_all(&body)?;
            stdout.flush()?;
            Ok(())
        }
        Command::Count { request } => {
            let (resolver, request) = prepare(&request).await?;
            let counts = resolver.counts(&request).await?;
            let mut stdout = stdout().lock();
            for backend in &counts {
                writeln!(stdout, "{}\t{}", backend.kind, backend.count)?;
            }
            let total = counts.iter().map(|backend| backend.count).sum::<usize>();
            writeln!(stdout, "total\t{total}")?;
            Ok(())
        }
    }
}

/// Logs to stderr, filtered by `RUST_LOG` (default `info`).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Sets up the local store and the sources, and builds the request from the arguments.
async fn prepare(args: &RequestArgs) -> anyhow::Result<(Resolver, ResolveRequest)> {
    let sources = match &args.config {
        Some(path) => SourcesConfig::from_path(path)
            .with_context(|| format!("Invalid source configuration {}", path.display()))?,
        None => SourcesConfig::local_only(),
    };
    let repository = Arc::new(StaticSourceRepository::new(sources));
    let options = RemoteOptions {
        timeout: Duration::from_secs(args.timeout),
        cache_ttl: Duration::from_secs(args.cache_ttl),
    };
    let root = match &args.root {
        Some(root) => root.clone(),
        None => origin(&args.uri)?,
    };

    let store = Arc::new(OxigraphStore::new()?);
    for path in &args.load {
        load_file(&store, path, &root).await?;
    }
    let http = Arc::new(ReqwestClient::new()?);
    let cacher = SourceCacher::new(store.clone(), http.clone(), options.timeout);
    for (kind, source) in repository.cached_sources() {
        if let Err(error) = cacher.cache(kind, &source).await {
            warn!(source = source.id, uri = %source.uri, %error, "Could not cache source");
        }
    }

    let context = RequestContext::from_request_uri(root, &args.uri)?;
    let mut request = ResolveRequest::new(context).with_dereference(!args.shallow);
    if args.subject.is_some() || args.predicate.is_some() || args.object.is_some() {
        request.query.pattern = TriplePattern::from_request_values(
            args.subject.as_deref(),
            args.predicate.as_deref(),
            args.object.as_deref(),
        );
    }
    request.query.hash_variant = args.hash_variant;

    let store: Arc<dyn LocalTripleStore> = store;
    let resolver = Resolver::new(
        repository,
        Some(store),
        http,
        Arc::new(MemoryCache::new()),
        options,
    );
    Ok((resolver, request))
}

async fn load_file(store: &OxigraphStore, path: &Path, base_iri: &str) -> anyhow::Result<()> {
    let format = rdf_format_from_path(path)?;
    let body = fs::read(path).with_context(|| format!("Could not read {}", path.display()))?;
    let count = store
        .load_default_graph(format, Some(base_iri), &body)
        .await
        .with_context(|| format!("Could not load {}", path.display()))?;
    info!(path = %path.display(), count, "Loaded file into the local store");
    Ok(())
}

/// `scheme://host[:port]` of a URI.
fn origin(uri: &str) -> anyhow::Result<String> {
    let url = Url::parse(uri).with_context(|| format!("Invalid URI {uri}"))?;
    if !url.has_host() {
        bail!("The URI {uri} has no host to derive a root URI from, use --root")
    }
    Ok(url.origin().ascii_serialization())
}

fn rdf_format_from_path(path: &Path) -> anyhow::Result<RdfFormat> {
    let Some(ext) = path.extension().and_then(OsStr::to_str) else {
        bail!(
            "The path {} has no extension to guess a file format from",
            path.display()
        )
    };
    RdfFormat::from_extension(ext).with_context(|| {
        format!("Not able to guess the file format from file name extension '{ext}'")
    })
}

fn rdf_format_from_name(name: &str) -> anyhow::Result<RdfFormat> {
    if let Some(t) = RdfFormat::from_extension(name) {
        return Ok(t);
    }
    if let Some(t) = RdfFormat::from_media_type(name) {
        return Ok(t);
    }
    bail!("The file format '{name}' is unknown")
}
