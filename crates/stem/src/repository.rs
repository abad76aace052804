mod cache;
pub use cache::ObjectCache;
pub(crate) use cache::key;

mod offline;
pub use offline::OfflineRepository;

mod sql;
pub use sql::SqlRepository;

use crate::{
    db::Pool, filter::FilterVisitor, Aggregate, Collection, Cursor, Db, Model, Result, Row, Value,
};
use indexmap::IndexMap;
use std::{fmt::Debug, sync::Arc};
use stem_core::{
    schema::ModelSchema,
    stmt::{NamedParams, SqlStatement},
};

/// Unique identifiers a repository produced for a collection.
#[derive(Debug, Clone, Default)]
pub struct IdList {
    pub ids: Vec<Value>,

    /// Rows matched ignoring the collection's range, when the repository
    /// applied the range itself.
    pub unfetched_row_count: Option<usize>,

    /// `true` if the repository applied everything the collection asked
    /// for: the ids are filtered, intersected, sorted and ranged. Otherwise
    /// they are candidates still to be evaluated in memory.
    pub exclusive: bool,

    /// Aggregate and pulled-up values computed by the repository, keyed by
    /// the cache key of the unique identifier.
    pub extras: IndexMap<String, Row>,

    /// For each aggregate column of the collection, whether `extras` holds
    /// its value.
    pub pushed_aggregates: Vec<bool>,

    /// For each intersection of the collection, whether the repository
    /// applied it.
    pub pushed_intersections: Vec<bool>,
}

/// Backend adapter for one model.
///
/// A repository translates collections into native queries as far as its
/// backend allows, executes writes, and keeps the identity cache of its
/// model. Everything a repository cannot translate is reported through
/// `false` / `None` results so the collection can fall back to in-memory
/// evaluation; errors are reserved for real failures.
pub trait Repository: FilterVisitor + Debug + Send + Sync {
    fn model(&self) -> &Arc<ModelSchema>;

    fn cache(&self) -> &ObjectCache;

    /// Connection pool the repository executes on, if it has one.
    /// Intersections compile into one statement only between repositories
    /// sharing a pool.
    fn pool(&self) -> Option<&Arc<Pool>> {
        None
    }

    /// Reads the storage row of `id` from the backend.
    fn fetch_missing_object_data(&self, db: &Db, id: &Value) -> Result<Row>;

    /// Returns the storage row of `id`, from the cache when possible.
    fn fetch_object_data(&self, db: &Db, id: &Value) -> Result<Row> {
        if let Some(row) = self.cache().get(id) {
            tracing::trace!(model = %self.model().name, %id, "object cache hit");
            return Ok(row);
        }

        let row = self.fetch_missing_object_data(db, id)?;
        self.cache().insert(id, row.clone());
        Ok(row)
    }

    /// Writes a model: an insert for a new model, otherwise an update of its
    /// changed columns.
    fn on_object_saved(&self, db: &Db, model: &mut Model) -> Result<()>;

    fn on_object_deleted(&self, db: &Db, model: &Model) -> Result<()>;

    /// Applies `values` to every row of `collection` in one statement.
    ///
    /// Fails with a batch-update-not-possible error, without writing
    /// anything, unless the whole collection translates.
    fn batch_commit_updates_from_collection(
        &self,
        db: &Db,
        collection: &Collection,
        values: &Row,
    ) -> Result<()>;

    fn get_unique_identifiers_for_data_list(&self, db: &Db, collection: &Collection) -> Result<IdList>;

    /// Streams the collection straight from the backend, or returns `None`
    /// when the collection has to be materialized first.
    fn create_cursor_for_collection(&self, db: &Db, collection: &Collection) -> Result<Option<Cursor>>;

    /// Computes aggregates over the whole collection. A `None` entry is an
    /// aggregate the collection must compute by iteration.
    fn calculate_aggregates(
        &self,
        db: &Db,
        aggregates: &[Aggregate],
        collection: &Collection,
    ) -> Result<Vec<Option<Value>>>;

    /// Counts the rows of the collection ignoring its range, when the
    /// backend can do it without help.
    fn count_for_collection(&self, db: &Db, collection: &Collection) -> Result<Option<usize>> {
        let _ = (db, collection);
        Ok(None)
    }

    /// Builds the complete statement for a collection so that another
    /// repository can nest it. Returns `None` unless everything translates.
    fn statement_for_collection(
        &self,
        db: &Db,
        collection: &Collection,
        params: &mut NamedParams,
    ) -> Result<Option<SqlStatement>> {
        let _ = (db, collection, params);
        Ok(None)
    }

    /// Removes every stored row of the model.
    fn clear_repository_data(&self, db: &Db) -> Result<()>;

    fn clear_object_cache(&self) {
        self.cache().clear();
    }

    /// Text of the last statement the repository executed.
    fn previous_statement(&self) -> Option<String> {
        None
    }
}
