use crate::{Db, Filter, Model, Result, Row};
use std::{collections::VecDeque, sync::Arc};
use stem_core::schema::ModelSchema;

/// Forward-only reader over the models of a collection.
///
/// The rows are buffered when the cursor is created; no connection is held
/// while reading. When the backend could not apply the whole filter, the
/// remainder is evaluated as rows are read.
pub struct Cursor {
    db: Db,
    model: Arc<ModelSchema>,
    entries: VecDeque<Entry>,
    residual: Option<Filter>,
}

enum Entry {
    /// Storage row plus collection extras
    Row(Row, Row),
    Model(Model),
}

pub trait FromCursor<A>: Extend<A> + Default {}

impl<A, T: Extend<A> + Default> FromCursor<A> for T {}

impl Cursor {
    pub(crate) fn from_rows(
        db: Db,
        model: Arc<ModelSchema>,
        rows: Vec<(Row, Row)>,
        residual: Option<Filter>,
    ) -> Self {
        Self {
            db,
            model,
            entries: rows
                .into_iter()
                .map(|(row, extras)| Entry::Row(row, extras))
                .collect(),
            residual,
        }
    }

    pub(crate) fn from_models(db: Db, model: Arc<ModelSchema>, models: Vec<Model>) -> Self {
        Self {
            db,
            model,
            entries: models.into_iter().map(Entry::Model).collect(),
            residual: None,
        }
    }

    pub fn next(&mut self) -> Option<Result<Model>> {
        loop {
            let model = match self.entries.pop_front()? {
                Entry::Model(model) => model,
                Entry::Row(row, extras) => match Model::from_storage(self.model.clone(), &row) {
                    Ok(mut model) => {
                        model.set_extras(extras);
                        model
                    }
                    Err(err) => return Some(Err(err)),
                },
            };

            let Some(residual) = &self.residual else {
                return Some(Ok(model));
            };

            match residual.evaluate(&self.db, &model) {
                Ok(true) => return Some(Ok(model)),
                Ok(false) => continue,
                Err(err) => return Some(Err(err)),
            }
        }
    }

    /// Collect all values
    pub fn collect<B>(mut self) -> Result<B>
    where
        B: FromCursor<Model>,
    {
        let mut ret = B::default();

        while let Some(res) = self.next() {
            ret.extend(Some(res?));
        }

        Ok(ret)
    }
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("model", &self.model.name)
            .field("buffered", &self.entries.len())
            .field("residual", &self.residual.is_some())
            .finish()
    }
}
