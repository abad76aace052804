/// A navigable link from one model to another.
///
/// `source_column` on the source model matches `target_column` on the target
/// model. Many-to-many relationships go through an intersection model whose
/// two columns hold the source and target values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Navigation name on the source model, e.g. `Users`
    pub name: String,

    pub kind: RelationshipKind,

    pub source_model: String,

    pub source_column: String,

    pub target_model: String,

    pub target_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationshipKind {
    OneToOne,
    OneToMany,
    ManyToMany {
        through_model: String,
        through_source_column: String,
        through_target_column: String,
    },
}

impl Relationship {
    /// Returns `true` if navigating yields at most one model.
    pub fn is_to_one(&self) -> bool {
        matches!(self.kind, RelationshipKind::OneToOne)
    }

    pub fn is_many_to_many(&self) -> bool {
        matches!(self.kind, RelationshipKind::ManyToMany { .. })
    }
}
