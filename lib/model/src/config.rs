use crate::{ConfigError, Depth};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::Path;
use url::Url;

/// The kinds of backends a resource can be resolved from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceKind {
    LocalStore,
    Sparql,
    Ldf,
    Turtle,
    Rdf,
}

impl SourceKind {
    /// The name used for the `type` field in the configuration.
    pub fn name(self) -> &'static str {
        match self {
            Self::LocalStore => "local",
            Self::Sparql => "sparql",
            Self::Ldf => "ldf",
            Self::Turtle => "turtle",
            Self::Rdf => "rdf",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        [
            Self::LocalStore,
            Self::Sparql,
            Self::Ldf,
            Self::Turtle,
            Self::Rdf,
        ]
        .into_iter()
        .find(|kind| kind.name() == name)
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Settings of the local triple store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalStoreConfig {
    #[serde(default)]
    pub depth: Depth,
}

/// A remote SPARQL endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparqlSource {
    pub id: u64,
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub named_graph: Option<String>,
    #[serde(default)]
    pub depth: Depth,
}

impl SparqlSource {
    /// The endpoint URL without a trailing `/`.
    pub fn endpoint_url(&self) -> &str {
        self.endpoint.strip_suffix('/').unwrap_or(&self.endpoint)
    }

    /// The basic authentication credentials, if a user is configured.
    pub fn credentials(&self) -> Option<(&str, Option<&str>)> {
        self.endpoint_user
            .as_deref()
            .filter(|user| !user.is_empty())
            .map(|user| (user, self.endpoint_password.as_deref()))
    }

    /// The named graph to query, if any.
    pub fn graph(&self) -> Option<&str> {
        self.named_graph.as_deref().filter(|graph| !graph.is_empty())
    }
}

/// A Linked Data Fragments server, addressed by its start fragment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LdfSource {
    pub id: u64,
    pub startfragment: String,
}

/// A remote RDF document that is copied into the local store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSource {
    pub id: u64,
    pub uri: String,
}

/// A single configured source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    Local(LocalStoreConfig),
    Sparql(SparqlSource),
    Ldf(LdfSource),
    Turtle(CachedSource),
    Rdf(CachedSource),
}

impl SourceConfig {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Local(_) => SourceKind::LocalStore,
            Self::Sparql(_) => SourceKind::Sparql,
            Self::Ldf(_) => SourceKind::Ldf,
            Self::Turtle(_) => SourceKind::Turtle,
            Self::Rdf(_) => SourceKind::Rdf,
        }
    }

    fn id(&self) -> Option<u64> {
        match self {
            Self::Local(_) => None,
            Self::Sparql(source) => Some(source.id),
            Self::Ldf(source) => Some(source.id),
            Self::Turtle(source) | Self::Rdf(source) => Some(source.id),
        }
    }

    fn url(&self) -> Option<&str> {
        match self {
            Self::Local(_) => None,
            Self::Sparql(source) => Some(&source.endpoint),
            Self::Ldf(source) => Some(&source.startfragment),
            Self::Turtle(source) | Self::Rdf(source) => Some(&source.uri),
        }
    }
}

/// The full list of sources, as stored in the JSON configuration file.
///
/// ```json
/// {"sources": [{"type": "local", "depth": 2}, {"type": "sparql", "id": 1, "endpoint": "http://example.com/sparql"}]}
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl SourcesConfig {
    pub fn new(sources: Vec<SourceConfig>) -> Result<Self, ConfigError> {
        let config = Self { sources };
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let entries = value
            .get("sources")
            .and_then(serde_json::Value::as_array)
            .into_iter()
            .flatten();
        for entry in entries {
            if let Some(kind) = entry.get("type").and_then(serde_json::Value::as_str) {
                if SourceKind::from_name(kind).is_none() {
                    return Err(ConfigError::UnknownKind(kind.to_owned()));
                }
            }
        }
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.to_owned(),
            error,
        })?;
        Self::from_json(&json)
    }

    /// A configuration with only a local store.
    pub fn local_only() -> Self {
        Self {
            sources: vec![SourceConfig::Local(LocalStoreConfig::default())],
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        let mut has_local = false;
        for source in &self.sources {
            let kind = source.kind();
            if kind == SourceKind::LocalStore {
                if has_local {
                    return Err(ConfigError::DuplicateLocalStore);
                }
                has_local = true;
            }
            if let Some(id) = source.id() {
                if !seen.insert((kind, id)) {
                    return Err(ConfigError::DuplicateId { kind, id });
                }
                if let Some(url) = source.url() {
                    validate_url(kind, id, url)?;
                }
            }
        }
        Ok(())
    }
}

fn validate_url(kind: SourceKind, id: u64, url: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        kind,
        id,
        url: url.to_owned(),
        reason,
    };
    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    Ok(())
}
