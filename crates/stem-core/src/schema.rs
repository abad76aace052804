mod builder;
pub use builder::Builder;

mod column;
pub use column::{Column, ColumnType};

mod model;
pub use model::ModelSchema;

mod relationship;
pub use relationship::{Relationship, RelationshipKind};

use crate::{Error, Result};
use indexmap::IndexMap;
use std::sync::Arc;

/// The model graph the engine works against.
#[derive(Debug, Default)]
pub struct Schema {
    pub models: IndexMap<String, Arc<ModelSchema>>,
}

impl Schema {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn model(&self, name: &str) -> Result<&Arc<ModelSchema>> {
        self.models
            .get(name)
            .ok_or_else(|| Error::invalid_schema(format!("unknown model `{name}`")))
    }

    pub fn models(&self) -> impl Iterator<Item = &Arc<ModelSchema>> {
        self.models.values()
    }
}
