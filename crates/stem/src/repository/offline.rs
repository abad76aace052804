use super::{key, IdList, ObjectCache, Repository};
use crate::{
    err,
    filter::{FilterContext, FilterVisitor},
    Aggregate, Collection, Cursor, Db, Error, Model, Result, Row, Value,
};
use indexmap::IndexMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use stem_core::{
    schema::ModelSchema,
    stmt::{BooleanExpression, NamedParams},
};

/// Keeps a model's rows in memory.
///
/// The repository translates nothing, so every collection over it is
/// evaluated by the in-memory fallback: filters, intersections, sorts,
/// ranges and aggregates alike.
#[derive(Debug)]
pub struct OfflineRepository {
    model: Arc<ModelSchema>,
    cache: ObjectCache,
    storage: Mutex<Storage>,
}

#[derive(Debug, Default)]
struct Storage {
    rows: IndexMap<String, (Value, Row)>,

    /// Last identifier handed out to an auto-increment model
    last_id: i64,
}

impl OfflineRepository {
    pub fn new(model: Arc<ModelSchema>) -> OfflineRepository {
        OfflineRepository {
            model,
            cache: ObjectCache::new(),
            storage: Mutex::new(Storage::default()),
        }
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Storage> {
        self.storage.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FilterVisitor for OfflineRepository {}

impl Repository for OfflineRepository {
    fn model(&self) -> &Arc<ModelSchema> {
        &self.model
    }

    fn cache(&self) -> &ObjectCache {
        &self.cache
    }

    fn fetch_missing_object_data(&self, _db: &Db, id: &Value) -> Result<Row> {
        self.lock()
            .rows
            .get(&key(id))
            .map(|(_, row)| row.clone())
            .ok_or_else(|| Error::record_not_found(&self.model.name, id))
    }

    fn on_object_saved(&self, _db: &Db, model: &mut Model) -> Result<()> {
        let mut storage = self.lock();

        if model.is_new() {
            if model.unique_identifier().is_null() {
                let auto_increment = self
                    .model
                    .unique_identifier_column()
                    .is_some_and(|column| column.ty.is_auto_increment());

                if !auto_increment {
                    return Err(err!(
                        "cannot save `{}` without a unique identifier",
                        self.model.name
                    ));
                }

                storage.last_id += 1;
                model.assign_unique_identifier(Value::I64(storage.last_id))?;
            } else if let Some(id) = model.unique_identifier().to_i64() {
                storage.last_id = storage.last_id.max(id);
            }

            let row = model.storage_row(self.model.columns.keys().map(String::as_str))?;
            let id = model.unique_identifier().clone();

            storage.rows.insert(key(&id), (id.clone(), row.clone()));
            self.cache.insert(&id, row);
        } else if model.has_changes() {
            let changes = model.storage_row(model.changes())?;
            let id = model.unique_identifier();

            let Some((_, row)) = storage.rows.get_mut(&key(id)) else {
                return Err(Error::record_not_found(&self.model.name, id));
            };

            for (column, value) in &changes {
                row.insert(column.clone(), value.clone());
            }
            self.cache.patch(id, &changes);
        }

        model.mark_saved();
        Ok(())
    }

    fn on_object_deleted(&self, _db: &Db, model: &Model) -> Result<()> {
        let id = model.unique_identifier();
        self.lock().rows.shift_remove(&key(id));
        self.cache.remove(id);
        Ok(())
    }

    fn batch_commit_updates_from_collection(
        &self,
        _db: &Db,
        _collection: &Collection,
        _values: &Row,
    ) -> Result<()> {
        Err(Error::batch_update_not_possible())
    }

    fn get_unique_identifiers_for_data_list(&self, db: &Db, collection: &Collection) -> Result<IdList> {
        // Every leaf declines; running the translation records that.
        if let Some(filter) = collection.root_filter() {
            let mut cx = FilterContext::new(db, &self.model, &self.model.table);
            filter.filter_with_repository(
                &mut cx,
                self,
                &mut BooleanExpression::and(),
                &mut NamedParams::new(),
            );
        }

        let ids = self.lock().rows.values().map(|(id, _)| id.clone()).collect();

        Ok(IdList {
            ids,
            ..IdList::default()
        })
    }

    fn create_cursor_for_collection(&self, _db: &Db, _collection: &Collection) -> Result<Option<Cursor>> {
        Ok(None)
    }

    fn calculate_aggregates(
        &self,
        _db: &Db,
        aggregates: &[Aggregate],
        _collection: &Collection,
    ) -> Result<Vec<Option<Value>>> {
        Ok(vec![None; aggregates.len()])
    }

    fn clear_repository_data(&self, _db: &Db) -> Result<()> {
        let mut storage = self.lock();
        storage.rows.clear();
        storage.last_id = 0;
        self.cache.clear();
        Ok(())
    }
}
