use crate::{Row, Value};
use indexmap::IndexMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Identity cache of one repository: unique identifier to the last raw
/// storage row seen for it.
///
/// Entries are whole rows. Models hydrate their own copy of the values, so
/// nothing a caller does to a model reaches the cache until the model is
/// saved.
#[derive(Debug, Default)]
pub struct ObjectCache {
    rows: Mutex<IndexMap<String, Row>>,
}

impl ObjectCache {
    pub fn new() -> ObjectCache {
        ObjectCache::default()
    }

    pub fn get(&self, id: &Value) -> Option<Row> {
        self.lock().get(&key(id)).cloned()
    }

    pub fn contains(&self, id: &Value) -> bool {
        self.lock().contains_key(&key(id))
    }

    pub fn insert(&self, id: &Value, row: Row) {
        self.lock().insert(key(id), row);
    }

    /// Inserts `row` unless an entry for `id` exists already.
    pub fn insert_if_missing(&self, id: &Value, row: Row) -> bool {
        let mut rows = self.lock();
        let key = key(id);

        if rows.contains_key(&key) {
            return false;
        }

        rows.insert(key, row);
        true
    }

    /// Overwrites the given columns of a cached row. Rows not in the cache
    /// are left out, so a partial row never becomes an entry.
    pub fn patch(&self, id: &Value, columns: &Row) {
        if let Some(row) = self.lock().get_mut(&key(id)) {
            for (name, value) in columns {
                row.insert(name.clone(), value.clone());
            }
        }
    }

    pub fn remove(&self, id: &Value) {
        self.lock().shift_remove(&key(id));
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<String, Row>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cache and storage key of a unique identifier; `1` and `"1"` are the same
/// identifier.
pub(crate) fn key(id: &Value) -> String {
    id.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str) -> Row {
        Row::from_iter([("Name".to_string(), Value::from(name))])
    }

    #[test]
    fn identifiers_are_keyed_by_their_text() {
        let cache = ObjectCache::new();
        cache.insert(&Value::I64(1), row("C1"));

        assert_eq!(cache.get(&Value::from("1")), Some(row("C1")));
        assert!(!cache.insert_if_missing(&Value::I64(1), row("other")));
        assert_eq!(cache.get(&Value::I64(1)), Some(row("C1")));
    }

    #[test]
    fn patch_only_touches_cached_rows() {
        let cache = ObjectCache::new();
        cache.insert(&Value::I64(1), row("C1"));

        cache.patch(&Value::I64(1), &row("C1b"));
        cache.patch(&Value::I64(2), &row("C2"));

        assert_eq!(cache.get(&Value::I64(1)), Some(row("C1b")));
        assert!(!cache.contains(&Value::I64(2)));

        cache.remove(&Value::I64(1));
        assert!(cache.is_empty());
    }
}
