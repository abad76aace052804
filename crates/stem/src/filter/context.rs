use crate::Db;
use indexmap::IndexSet;
use stem_core::schema::ModelSchema;

/// State shared by every leaf of one translation.
#[derive(Debug, Clone)]
pub struct FilterContext<'a> {
    pub db: &'a Db,

    /// Model the filtered collection holds
    pub model: &'a ModelSchema,

    /// Alias the model's table is selected under
    pub alias: String,

    /// Relationships a translated leaf reached through a dotted path. The
    /// repository joins each of them under the relationship name.
    pub relationships_to_auto_hydrate: IndexSet<String>,

    negations: usize,
}

impl<'a> FilterContext<'a> {
    pub fn new(db: &'a Db, model: &'a ModelSchema, alias: impl Into<String>) -> Self {
        Self {
            db,
            model,
            alias: alias.into(),
            relationships_to_auto_hydrate: IndexSet::new(),
            negations: 0,
        }
    }

    /// Returns `true` while translating beneath a `Not`.
    pub fn is_negated(&self) -> bool {
        self.negations > 0
    }

    pub(crate) fn enter_not(&mut self) {
        self.negations += 1;
    }

    pub(crate) fn exit_not(&mut self) {
        self.negations -= 1;
    }
}
