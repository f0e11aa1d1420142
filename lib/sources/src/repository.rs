use deref_model::{
    CachedSource, LdfSource, LocalStoreConfig, SourceConfig, SourceKind, SourcesConfig,
    SparqlSource,
};

/// Lists the configured sources of a kind, in configuration order.
pub trait SourceRepository: Send + Sync {
    fn list(&self, kind: SourceKind) -> Vec<SourceConfig>;

    /// The configuration of the local store, if there is one.
    fn local_store(&self) -> Option<LocalStoreConfig> {
        self.list(SourceKind::LocalStore)
            .into_iter()
            .find_map(|source| match source {
                SourceConfig::Local(config) => Some(config),
                _ => None,
            })
    }

    fn sparql_sources(&self) -> Vec<SparqlSource> {
        self.list(SourceKind::Sparql)
            .into_iter()
            .filter_map(|source| match source {
                SourceConfig::Sparql(source) => Some(source),
                _ => None,
            })
            .collect()
    }

    fn ldf_sources(&self) -> Vec<LdfSource> {
        self.list(SourceKind::Ldf)
            .into_iter()
            .filter_map(|source| match source {
                SourceConfig::Ldf(source) => Some(source),
                _ => None,
            })
            .collect()
    }

    /// The `turtle` and `rdf` sources that are copied into the local store.
    fn cached_sources(&self) -> Vec<(SourceKind, CachedSource)> {
        [SourceKind::Turtle, SourceKind::Rdf]
            .into_iter()
            .flat_map(|kind| self.list(kind))
            .filter_map(|source| match source {
                SourceConfig::Turtle(source) => Some((SourceKind::Turtle, source)),
                SourceConfig::Rdf(source) => Some((SourceKind::Rdf, source)),
                _ => None,
            })
            .collect()
    }
}

/// A [SourceRepository] over a fixed, already validated configuration.
#[derive(Clone, Debug, Default)]
pub struct StaticSourceRepository {
    sources: Vec<SourceConfig>,
}

impl StaticSourceRepository {
    pub fn new(config: SourcesConfig) -> Self {
        Self {
            sources: config.sources,
        }
    }
}

impl SourceRepository for StaticSourceRepository {
    fn list(&self, kind: SourceKind) -> Vec<SourceConfig> {
        self.sources
            .iter()
            .filter(|source| source.kind() == kind)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_sources_by_kind_in_order() {
        let config = SourcesConfig::from_json(
            r#"{"sources": [
                {"type": "sparql", "id": 2, "endpoint": "http://b.example/sparql"},
                {"type": "local"},
                {"type": "rdf", "id": 4, "uri": "http://example.com/data.rdf"},
                {"type": "sparql", "id": 1, "endpoint": "http://a.example/sparql"},
                {"type": "turtle", "id": 3, "uri": "http://example.com/data.ttl"}
            ]}"#,
        )
        .unwrap();
        let repository = StaticSourceRepository::new(config);

        let ids = repository
            .sparql_sources()
            .into_iter()
            .map(|source| source.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, [2, 1]);
        assert!(repository.local_store().is_some());
        assert!(repository.ldf_sources().is_empty());
        let cached = repository
            .cached_sources()
            .into_iter()
            .map(|(kind, source)| (kind, source.id))
            .collect::<Vec<_>>();
        assert_eq!(cached, [(SourceKind::Turtle, 3), (SourceKind::Rdf, 4)]);
    }

    #[test]
    fn empty_repository_has_no_local_store() {
        assert!(StaticSourceRepository::default().local_store().is_none());
    }
}
