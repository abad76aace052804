use crate::{
    err,
    repository::{key, IdList, Repository},
    Aggregate, AggregateState, Cursor, Db, Error, Filter, Model, Result, Row, Value,
};
use indexmap::{IndexMap, IndexSet};
use std::{cmp::Ordering, sync::Arc};
use stem_core::schema::ModelSchema;

/// A lazily materialized, ordered view over the models of one type.
///
/// Configuration calls (filters, sorts, aggregate columns, intersections,
/// ranges) only record what is wanted. The first read materializes the
/// collection: the repository translates as much as its backend can express,
/// and whatever it could not is evaluated in memory over the rows it
/// returned. Any configuration call on a materialized collection discards
/// the materialized ids; the next read materializes again.
#[derive(Debug, Clone)]
pub struct Collection {
    db: Db,
    model: Arc<ModelSchema>,
    filter: Option<Filter>,
    sorts: Vec<Sort>,
    aggregates: Vec<Aggregate>,
    intersections: Vec<Intersection>,
    auto_hydrate: IndexSet<String>,

    /// Offset and count
    range: Option<(usize, usize)>,

    state: State,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    /// Column, `Relationship.Column` path, aggregate alias or pulled-up
    /// column
    pub column: String,
    pub ascending: bool,
}

/// Restricts a collection to the models whose `parent_column` matches
/// `child_column` of some model in `collection`.
#[derive(Debug, Clone)]
pub struct Intersection {
    pub collection: Collection,
    pub parent_column: String,
    pub child_column: String,

    /// Columns of the inner collection exposed on the outer models
    pub pulled_up: Vec<String>,
}

#[derive(Debug, Clone)]
enum State {
    Configuring,
    Materialized(Materialized),
}

#[derive(Debug, Clone)]
struct Materialized {
    /// Unique identifiers in order, range applied
    ids: Vec<Value>,

    /// Matching rows ignoring the range
    total: usize,

    /// Aggregate and pulled-up values per model
    extras: IndexMap<String, Row>,
}

impl Collection {
    pub fn new(db: Db, model: Arc<ModelSchema>) -> Collection {
        Collection {
            db,
            model,
            filter: None,
            sorts: vec![],
            aggregates: vec![],
            intersections: vec![],
            auto_hydrate: IndexSet::new(),
            range: None,
            state: State::Configuring,
        }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn model(&self) -> &Arc<ModelSchema> {
        &self.model
    }

    pub fn root_filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    pub fn sorts(&self) -> &[Sort] {
        &self.sorts
    }

    pub fn aggregates(&self) -> &[Aggregate] {
        &self.aggregates
    }

    pub fn intersections(&self) -> &[Intersection] {
        &self.intersections
    }

    /// Relationships explicitly requested for auto-hydration.
    pub fn auto_hydrated(&self) -> impl Iterator<Item = &str> {
        self.auto_hydrate.iter().map(String::as_str)
    }

    pub fn range(&self) -> Option<(usize, usize)> {
        self.range
    }

    pub fn is_materialized(&self) -> bool {
        matches!(self.state, State::Materialized(_))
    }

    /// ANDs `filter` with the filters already applied.
    pub fn filter(&mut self, filter: Filter) -> &mut Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and_with(filter),
            None => filter,
        });
        self.reset()
    }

    /// Replaces every sort with one on `column`.
    pub fn replace_sort(&mut self, column: impl Into<String>, ascending: bool) -> &mut Self {
        self.sorts.clear();
        self.add_sort(column, ascending)
    }

    pub fn add_sort(&mut self, column: impl Into<String>, ascending: bool) -> &mut Self {
        self.sorts.push(Sort {
            column: column.into(),
            ascending,
        });
        self.reset()
    }

    /// Adds a per-model aggregate, exposed on every model under the
    /// aggregate's alias.
    pub fn add_aggregate_column(&mut self, aggregate: Aggregate) -> &mut Self {
        self.aggregates.push(aggregate);
        self.reset()
    }

    pub fn intersect_with(
        &mut self,
        collection: Collection,
        parent_column: impl Into<String>,
        child_column: impl Into<String>,
    ) -> &mut Self {
        self.intersect_with_pulling(collection, parent_column, child_column, Vec::<String>::new())
    }

    /// Intersects and exposes `columns` of the matching inner model on each
    /// outer model.
    pub fn intersect_with_pulling(
        &mut self,
        collection: Collection,
        parent_column: impl Into<String>,
        child_column: impl Into<String>,
        columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> &mut Self {
        self.intersections.push(Intersection {
            collection,
            parent_column: parent_column.into(),
            child_column: child_column.into(),
            pulled_up: columns.into_iter().map(Into::into).collect(),
        });
        self.reset()
    }

    /// Limits reads to `count` models starting at `offset`.
    pub fn set_range(&mut self, offset: usize, count: usize) -> &mut Self {
        self.range = Some((offset, count));
        self.reset()
    }

    /// Loads the one-to-one `relationship` in the same statement as the
    /// collection.
    pub fn auto_hydrate(&mut self, relationship: impl Into<String>) -> &mut Self {
        self.auto_hydrate.insert(relationship.into());
        self.reset()
    }

    pub fn unique_identifiers(&mut self) -> Result<Vec<Value>> {
        Ok(self.materialized()?.ids.clone())
    }

    /// Number of models in the collection, range applied.
    pub fn len(&mut self) -> Result<usize> {
        Ok(self.materialized()?.ids.len())
    }

    pub fn is_empty(&mut self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Number of matching models ignoring the range.
    pub fn count(&mut self) -> Result<usize> {
        if let State::Materialized(materialized) = &self.state {
            return Ok(materialized.total);
        }

        self.validate_sorts()?;

        let repository = self.repository()?;
        if let Some(count) = repository.count_for_collection(&self.db, self)? {
            tracing::debug!(model = %self.model.name, count, "counted by the repository");
            return Ok(count);
        }

        Ok(self.materialized()?.total)
    }

    pub fn get(&mut self, index: usize) -> Result<Option<Model>> {
        let materialized = self.materialized()?;

        let Some(id) = materialized.ids.get(index).cloned() else {
            return Ok(None);
        };
        let extras = materialized.extras.get(&key(&id)).cloned();

        let mut model = self.db.hydrate(&self.model, &id)?;
        if let Some(extras) = extras {
            model.set_extras(extras);
        }
        Ok(Some(model))
    }

    pub fn models(&mut self) -> Result<Vec<Model>> {
        let Materialized { ids, extras, .. } = self.materialized()?.clone();
        let mut models = Vec::with_capacity(ids.len());

        for id in &ids {
            let mut model = self.db.hydrate(&self.model, id)?;
            if let Some(extras) = extras.get(&key(id)) {
                model.set_extras(extras.clone());
            }
            models.push(model);
        }

        Ok(models)
    }

    /// Reads the collection forward once, straight from the backend when it
    /// can deliver the rows in order.
    pub fn cursor(&mut self) -> Result<Cursor> {
        if !self.is_materialized() {
            self.validate_sorts()?;

            let repository = self.repository()?;
            if let Some(cursor) = repository.create_cursor_for_collection(&self.db, self)? {
                return Ok(cursor);
            }
        }

        let models = self.models()?;
        Ok(Cursor::from_models(self.db.clone(), self.model.clone(), models))
    }

    /// Computes aggregates over the whole collection.
    ///
    /// The repository computes what it can; the rest is folded over the
    /// collection's models.
    pub fn calculate_aggregates(&mut self, aggregates: &[Aggregate]) -> Result<Vec<Value>> {
        let repository = self.repository()?;
        let pushed = repository.calculate_aggregates(&self.db, aggregates, self)?;

        let declined = pushed.iter().filter(|value| value.is_none()).count();
        if declined == 0 {
            return Ok(pushed.into_iter().map(Option::unwrap_or_default).collect());
        }

        tracing::debug!(
            model = %self.model.name,
            declined,
            "calculating aggregates by iteration"
        );

        let models = self.models()?;
        let mut values = Vec::with_capacity(aggregates.len());

        for (aggregate, value) in aggregates.iter().zip(pushed) {
            if let Some(value) = value {
                values.push(value);
                continue;
            }

            let mut state = AggregateState::new(aggregate.clone());
            for model in &models {
                state.calculate_by_iteration(&self.db, model, "")?;
            }
            values.push(state.current_value(""));
        }

        Ok(values)
    }

    /// Sets `values` on every model of the collection.
    ///
    /// The repository applies the update in one statement when the whole
    /// collection translates. Otherwise, with `fallback_to_iteration`, each
    /// model is updated and saved in turn; without it the
    /// batch-update-not-possible error is returned.
    pub fn batch_update(&mut self, values: &Row, fallback_to_iteration: bool) -> Result<()> {
        let repository = self.repository()?;

        match repository.batch_commit_updates_from_collection(&self.db, self, values) {
            Ok(()) => {}
            Err(err) if err.is_batch_update_not_possible() && fallback_to_iteration => {
                tracing::debug!(model = %self.model.name, "batch update falls back to iteration");

                for mut model in self.models()? {
                    for (column, value) in values {
                        model.set(column, value.clone())?;
                    }
                    self.db.save(&mut model)?;
                }
            }
            Err(err) => return Err(err.context(err!("Collection::batch_update"))),
        }

        self.reset();
        Ok(())
    }

    /// Deletes every model of the collection.
    pub fn delete_all(&mut self) -> Result<()> {
        for model in self.models()? {
            self.db.delete(&model)?;
        }

        self.reset();
        Ok(())
    }

    fn reset(&mut self) -> &mut Self {
        self.state = State::Configuring;
        self
    }

    fn repository(&self) -> Result<Arc<dyn Repository>> {
        self.db.repository(&self.model.name).cloned()
    }

    fn materialized(&mut self) -> Result<&Materialized> {
        if !self.is_materialized() {
            let materialized = self.materialize()?;
            self.state = State::Materialized(materialized);
        }

        match &self.state {
            State::Materialized(materialized) => Ok(materialized),
            State::Configuring => Err(err!("collection of `{}` is not materialized", self.model.name)),
        }
    }

    /// Every sort must name a column, a one-to-one path, an aggregate alias
    /// or a pulled-up column.
    fn validate_sorts(&self) -> Result<()> {
        for sort in &self.sorts {
            let valid = match self.model.split_path(&sort.column) {
                Some((relationship, column)) => {
                    relationship.is_to_one()
                        && self
                            .db
                            .schema()
                            .model(&relationship.target_model)?
                            .get_column(column)
                            .is_some()
                }
                None => {
                    self.model.get_column(&sort.column).is_some()
                        || self.aggregates.iter().any(|aggregate| aggregate.alias() == sort.column)
                        || self
                            .intersections
                            .iter()
                            .any(|intersection| intersection.pulled_up.contains(&sort.column))
                }
            };

            if !valid {
                return Err(Error::sort_not_valid(&sort.column));
            }
        }

        Ok(())
    }

    fn materialize(&self) -> Result<Materialized> {
        self.validate_sorts()?;

        let repository = self.repository()?;
        let list = repository.get_unique_identifiers_for_data_list(&self.db, self)?;

        if list.exclusive {
            tracing::debug!(
                model = %self.model.name,
                rows = list.ids.len(),
                "materialized by the repository"
            );

            return Ok(Materialized {
                total: list.unfetched_row_count.unwrap_or(list.ids.len()),
                ids: list.ids,
                extras: list.extras,
            });
        }

        tracing::debug!(
            model = %self.model.name,
            candidates = list.ids.len(),
            "materializing in memory"
        );

        let mut models = self.hydrate_candidates(&list)?;
        models = self.apply_intersections(models, &list)?;

        if let Some(filter) = &self.filter {
            if !filter.was_filtered_by_repository() {
                let mut matching = Vec::with_capacity(models.len());
                for model in models {
                    if filter.evaluate(&self.db, &model)? {
                        matching.push(model);
                    }
                }
                models = matching;
            }
        }

        for (index, aggregate) in self.aggregates.iter().enumerate() {
            if list.pushed_aggregates.get(index).copied().unwrap_or(false) {
                continue;
            }

            let mut state = AggregateState::new(aggregate.clone());
            for model in &mut models {
                let group = key(model.unique_identifier());
                let value = state.calculate_by_iteration(&self.db, model, &group)?;
                model.set_extra(aggregate.alias(), value);
            }
        }

        let models = self.sort(models)?;
        let total = models.len();

        let (offset, count) = self.range.unwrap_or((0, usize::MAX));
        let mut materialized = Materialized {
            ids: vec![],
            total,
            extras: IndexMap::new(),
        };

        for model in models.into_iter().skip(offset).take(count) {
            let id = model.unique_identifier().clone();
            if !model.extras().is_empty() {
                materialized.extras.insert(key(&id), model.extras().clone());
            }
            materialized.ids.push(id);
        }

        Ok(materialized)
    }

    fn hydrate_candidates(&self, list: &IdList) -> Result<Vec<Model>> {
        let mut models = Vec::with_capacity(list.ids.len());

        for id in &list.ids {
            let mut model = self.db.hydrate(&self.model, id)?;
            if let Some(extras) = list.extras.get(&key(id)) {
                model.set_extras(extras.clone());
            }
            models.push(model);
        }

        Ok(models)
    }

    /// Applies the intersections the repository did not. The first matching
    /// inner model supplies the pulled-up values.
    fn apply_intersections(&self, mut models: Vec<Model>, list: &IdList) -> Result<Vec<Model>> {
        for (index, intersection) in self.intersections.iter().enumerate() {
            if list.pushed_intersections.get(index).copied().unwrap_or(false) {
                continue;
            }

            let inner = intersection.collection.clone().models()?;

            models.retain_mut(|model| {
                let parent = model.get(&intersection.parent_column).clone();
                if parent.is_null() {
                    return false;
                }

                let Some(matching) = inner
                    .iter()
                    .find(|inner| inner.get(&intersection.child_column).loose_eq(&parent))
                else {
                    return false;
                };

                for column in &intersection.pulled_up {
                    model.set_extra(column, matching.get(column).clone());
                }
                true
            });
        }

        Ok(models)
    }

    /// Orders by the sorts, then by unique identifier.
    fn sort(&self, models: Vec<Model>) -> Result<Vec<Model>> {
        let mut keyed = Vec::with_capacity(models.len());

        for model in models {
            let mut keys = Vec::with_capacity(self.sorts.len());
            for sort in &self.sorts {
                keys.push(self.sort_value(&model, &sort.column)?);
            }
            keyed.push((keys, model));
        }

        keyed.sort_by(|(a_keys, a), (b_keys, b)| {
            for ((sort, a_key), b_key) in self.sorts.iter().zip(a_keys).zip(b_keys) {
                let ordering = a_key.loose_cmp(b_key);
                let ordering = if sort.ascending { ordering } else { ordering.reverse() };

                if ordering != Ordering::Equal {
                    return ordering;
                }
            }

            a.unique_identifier().loose_cmp(b.unique_identifier())
        });

        Ok(keyed.into_iter().map(|(_, model)| model).collect())
    }

    fn sort_value(&self, model: &Model, column: &str) -> Result<Value> {
        if column.contains('.') {
            let values = self.db.path_values(model, column)?;
            return Ok(values.into_iter().next().unwrap_or_default());
        }

        Ok(model.get(column).clone())
    }
}
