mod builder;
mod connect;
mod pool;
mod settings;

pub use builder::Builder;
pub use connect::Connect;
pub use pool::{Pool, PoolConfig, PoolConnection, PoolRegistry};
pub use settings::ConnectionSettings;

use crate::{
    err,
    repository::{OfflineRepository, Repository, SqlRepository},
    Collection, Filter, Model, Result, Value,
};
use indexmap::IndexMap;
use std::{fmt, sync::Arc};
use stem_core::{
    schema::{Column, ModelSchema, RelationshipKind},
    Schema,
};

/// Shared state between all `Db` clones.
struct Shared {
    schema: Schema,

    /// `None` for an offline handle
    pool: Option<Arc<Pool>>,

    /// One repository per model, keyed by model name
    repositories: IndexMap<String, Arc<dyn Repository>>,
}

/// A database handle: the schema plus one repository per model.
///
/// Cloning is cheap; clones share the repositories and therefore their
/// object caches.
#[derive(Clone)]
pub struct Db {
    shared: Arc<Shared>,
}

impl Db {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub(crate) fn new(schema: Schema, pool: Option<Arc<Pool>>) -> Db {
        let repositories = schema
            .models()
            .map(|model| {
                let repository: Arc<dyn Repository> = match &pool {
                    Some(pool) => Arc::new(SqlRepository::new(model.clone(), pool.clone())),
                    None => Arc::new(OfflineRepository::new(model.clone())),
                };
                (model.name.clone(), repository)
            })
            .collect();

        Db {
            shared: Arc::new(Shared {
                schema,
                pool,
                repositories,
            }),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.shared.schema
    }

    pub fn pool(&self) -> Option<&Arc<Pool>> {
        self.shared.pool.as_ref()
    }

    /// Repository holding models named `model`.
    pub fn repository(&self, model: &str) -> Result<&Arc<dyn Repository>> {
        self.shared
            .repositories
            .get(model)
            .ok_or_else(|| err!("no repository for model `{model}`"))
    }

    /// Every model named `model`.
    pub fn collection(&self, model: &str) -> Result<Collection> {
        let schema = self.schema().model(model)?;
        Ok(Collection::new(self.clone(), schema.clone()))
    }

    /// Creates an unsaved model.
    pub fn create(&self, model: &str) -> Result<Model> {
        Ok(Model::new(self.schema().model(model)?.clone()))
    }

    /// Loads one model by unique identifier.
    pub fn find(&self, model: &str, id: impl Into<Value>) -> Result<Model> {
        let schema = self.schema().model(model)?;
        let Some(column) = schema.unique_identifier_column() else {
            return Err(err!("model `{model}` has no unique identifier"));
        };

        let id = column.coerce(id.into())?;
        self.hydrate(schema, &id)
    }

    /// Builds a model from the repository's row for `id`, served from the
    /// object cache when possible.
    pub(crate) fn hydrate(&self, schema: &Arc<ModelSchema>, id: &Value) -> Result<Model> {
        let row = self.repository(&schema.name)?.fetch_object_data(self, id)?;
        Model::from_storage(schema.clone(), &row)
    }

    /// Inserts or updates `model`.
    pub fn save(&self, model: &mut Model) -> Result<()> {
        let repository = self.repository(model.name())?;
        repository
            .on_object_saved(self, model)
            .map_err(|err| err.context(err!("saving `{}`", model.name())))
    }

    pub fn delete(&self, model: &Model) -> Result<()> {
        if model.is_new() {
            return Ok(());
        }

        self.repository(model.name())?.on_object_deleted(self, model)
    }

    /// The models `relationship` of `model` points at.
    pub fn related(&self, model: &Model, relationship: &str) -> Result<Collection> {
        let Some(definition) = model.schema().relationship(relationship) else {
            return Err(err!(
                "model `{}` has no relationship `{relationship}`",
                model.name()
            ));
        };

        let value = model.get(&definition.source_column).clone();
        let mut collection = self.collection(&definition.target_model)?;

        match &definition.kind {
            RelationshipKind::OneToOne | RelationshipKind::OneToMany => {
                collection.filter(matching(&definition.target_column, value));
            }
            RelationshipKind::ManyToMany {
                through_model,
                through_source_column,
                through_target_column,
            } => {
                let mut through = self.collection(through_model)?;
                through.filter(matching(through_source_column, value));
                collection.intersect_with(through, &definition.target_column, through_target_column);
            }
        }

        Ok(collection)
    }

    /// Values a column path holds for `model`. A dotted path navigates
    /// relationships and yields one value per related model.
    pub fn path_values(&self, model: &Model, path: &str) -> Result<Vec<Value>> {
        let Some((relationship, rest)) = path.split_once('.') else {
            return Ok(vec![model.get(path).clone()]);
        };

        let mut values = vec![];
        for related in self.related(model, relationship)?.models()? {
            values.extend(self.path_values(&related, rest)?);
        }
        Ok(values)
    }

    /// Column definition a path ends on.
    pub fn path_column<'a>(&'a self, model: &'a ModelSchema, path: &str) -> Option<&'a Column> {
        match model.split_path(path) {
            Some((relationship, rest)) => {
                let target = self.schema().model(&relationship.target_model).ok()?;
                self.path_column(target, rest)
            }
            None => model.get_column(path),
        }
    }

    /// Creates the tables of every model, dropping existing ones first. Does
    /// nothing offline.
    pub fn push_schema(&self) -> Result<()> {
        let Some(pool) = self.pool() else {
            return Ok(());
        };

        pool.get()?.push_schema(self.schema())
    }

    /// Empties every repository's object cache.
    pub fn clear_caches(&self) {
        for repository in self.shared.repositories.values() {
            repository.clear_object_cache();
        }
    }
}

/// `column == value`, or nothing at all when the source value is missing.
fn matching(column: &str, value: Value) -> Filter {
    if value.is_null() {
        Filter::one_of(column, Vec::<Value>::new())
    } else {
        Filter::equals(column, value)
    }
}

impl fmt::Debug for Db {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Db")
            .field("models", &self.shared.repositories.keys().collect::<Vec<_>>())
            .field("pool", &self.shared.pool)
            .finish()
    }
}
