use deref_model::TriplePattern;

/// The per-request settings that shape the rendered queries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryContext {
    /// The caller's triple pattern.
    pub pattern: TriplePattern,
    /// Instead of binding the subject, match every subject that equals the requested URI or starts
    /// with `{uri}#`.
    pub hash_variant: bool,
}

impl QueryContext {
    pub fn new(pattern: TriplePattern) -> Self {
        Self {
            pattern,
            hash_variant: false,
        }
    }

    #[must_use]
    pub fn with_hash_variant(mut self, hash_variant: bool) -> Self {
        self.hash_variant = hash_variant;
        self
    }
}
