mod filters;

use super::{key, IdList, ObjectCache, Repository};
use crate::{
    collection::Intersection, db::Pool, err, filter::FilterContext, Aggregate, AggregateKind,
    Collection, Cursor, Db, Error, Model, Result, Row, Value,
};
use indexmap::{IndexMap, IndexSet};
use std::sync::{Arc, Mutex, PoisonError};
use stem_core::{
    driver::{Operation, Response},
    schema::{Column, ModelSchema, RelationshipKind},
    stmt::{
        AggregateFunction, Assignment, ColumnRef, CompareOp, Delete, Insert, Join, JoinKind,
        JoinSource, NamedParams, SelectExpression, SqlStatement, Statement, Truncate, Update,
        WhereExpression, WhereExpressionCollector,
    },
};
use stem_sql::Serializer;

/// Repository over any SQL backend reachable through a [`Pool`].
#[derive(Debug)]
pub struct SqlRepository {
    model: Arc<ModelSchema>,
    pool: Arc<Pool>,
    serializer: Serializer,
    cache: ObjectCache,
    previous_statement: Mutex<Option<String>>,
}

/// A select being assembled for a collection, and how much of the
/// collection it covers.
struct Query {
    stmt: SqlStatement,

    /// The whole filter tree translated
    filtered: bool,

    /// Relationships the filter reached through dotted paths
    filter_joins: IndexSet<String>,

    /// Auto-hydrated projections: alias to the relationship and column.
    hydrated: IndexMap<String, (String, String)>,

    /// Projected extras: alias to the name the collection knows the extra
    /// by.
    extras: IndexMap<String, String>,

    /// Per intersection, whether it was compiled into the statement
    intersections: Vec<bool>,

    /// Per aggregate column, whether it was computed by the statement
    aggregates: Vec<bool>,

    /// Projected aliases to bring back into their in-memory form
    conversions: IndexMap<String, Column>,

    /// The collection's sorts, and the unique identifier tie-breaker, were
    /// added
    sorted: bool,
}

impl Query {
    /// Returns `true` if the statement yields exactly the collection.
    fn is_exclusive(&self) -> bool {
        self.filtered
            && self.sorted
            && self.intersections.iter().all(|pushed| *pushed)
            && self.aggregates.iter().all(|pushed| *pushed)
    }

    fn has_intersection_joins(&self) -> bool {
        self.intersections.iter().any(|pushed| *pushed)
    }

    /// Returns `candidate`, suffixed if needed so that it names neither a
    /// column of `model` nor an earlier projection.
    fn free_alias(&self, model: &ModelSchema, candidate: String) -> String {
        let taken = |alias: &str| {
            model.columns.contains_key(alias)
                || self.hydrated.contains_key(alias)
                || self.extras.contains_key(alias)
        };

        let mut alias = candidate.clone();
        let mut suffix = 1;
        while taken(&alias) {
            alias = format!("{candidate}_{suffix}");
            suffix += 1;
        }
        alias
    }

    /// Projected alias of the extra named `name`.
    fn extra_alias(&self, name: &str) -> Option<&str> {
        self.extras
            .iter()
            .find(|(_, extra)| *extra == name)
            .map(|(alias, _)| alias.as_str())
    }
}

impl SqlRepository {
    pub fn new(model: Arc<ModelSchema>, pool: Arc<Pool>) -> SqlRepository {
        SqlRepository {
            serializer: Serializer::for_dialect(pool.dialect()),
            model,
            pool,
            cache: ObjectCache::new(),
            previous_statement: Mutex::new(None),
        }
    }

    fn exec(&self, stmt: impl Into<Statement>, params: NamedParams) -> Result<Response> {
        let stmt = stmt.into();
        let sql = self.serializer.serialize_core(&stmt);

        tracing::debug!(model = %self.model.name, params = params.len(), %sql, "executing statement");

        *self
            .previous_statement
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(sql);

        let mut connection = self.pool.get()?;
        connection.exec(Operation::new(stmt, params))
    }

    fn unique_identifier(&self) -> Result<&Column> {
        self.model
            .unique_identifier_column()
            .ok_or_else(|| err!("model `{}` has no unique identifier", self.model.name))
    }

    /// `alias.<unique identifier> = :id`
    fn where_unique_identifier(
        &self,
        table: Option<&str>,
        id: &Value,
        params: &mut NamedParams,
    ) -> Result<WhereExpression> {
        let column = self.unique_identifier()?;
        let param = params.add(&column.name, column.to_storage(id)?);
        let column_ref = match table {
            Some(table) => ColumnRef::new(table, &column.name),
            None => ColumnRef::bare(&column.name),
        };
        Ok(WhereExpression::compare(column_ref, CompareOp::Eq, param))
    }

    /// Builds the select for `collection`.
    ///
    /// With `extras` unset, only what decides which rows match is
    /// translated: the filter and the intersections.
    fn query(
        &self,
        db: &Db,
        collection: &Collection,
        params: &mut NamedParams,
        extras: bool,
    ) -> Result<Query> {
        let mut stmt = SqlStatement::new(&self.model.table);
        let alias = stmt.alias().to_string();
        stmt.add_column(SelectExpression::AllColumns {
            table: alias.clone(),
        });

        let mut cx = FilterContext::new(db, &self.model, &alias);
        let filtered = match collection.root_filter() {
            Some(filter) => filter.filter_with_repository(&mut cx, self, &mut stmt, params),
            None => true,
        };

        if !filtered {
            tracing::warn!(
                model = %self.model.name,
                "filter was not completely translated; the remainder is evaluated in memory"
            );
        }

        let mut query = Query {
            stmt,
            filtered,
            filter_joins: cx.relationships_to_auto_hydrate,
            hydrated: IndexMap::new(),
            extras: IndexMap::new(),
            intersections: vec![],
            aggregates: vec![],
            conversions: IndexMap::new(),
            sorted: false,
        };

        for name in query.filter_joins.clone() {
            self.join_relationship(db, &mut query, &name)?;
        }

        for intersection in collection.intersections() {
            let pushed = self.push_intersection(db, &mut query, intersection, params, extras)?;
            query.intersections.push(pushed);
        }

        if extras {
            for name in collection.auto_hydrated() {
                match self.model.relationship(name) {
                    Some(relationship) if relationship.is_to_one() => {
                        self.join_relationship(db, &mut query, name)?;
                    }
                    _ => tracing::warn!(
                        model = %self.model.name,
                        relationship = name,
                        "only one-to-one relationships are auto-hydrated"
                    ),
                }
            }

            self.push_aggregate_columns(db, &mut query, collection.aggregates())?;

            query.sorted = self.push_sorts(db, &mut query, collection)?;
        }

        if !query.stmt.joins.is_empty() || query.aggregates.iter().any(|pushed| *pushed) {
            let uid = query.stmt.column_ref(&self.unique_identifier()?.name);
            query.stmt.add_group(uid);
        }

        Ok(query)
    }

    /// LEFT JOINs a relationship's table under the relationship name,
    /// projecting its columns when it is one-to-one.
    fn join_relationship(&self, db: &Db, query: &mut Query, name: &str) -> Result<bool> {
        let Some(relationship) = self.model.relationship(name) else {
            return Ok(false);
        };

        if relationship.is_many_to_many() {
            return Ok(false);
        }

        let target = db.schema().model(&relationship.target_model)?;

        if !query.stmt.has_join(name) {
            let parent = query.stmt.column_ref(&relationship.source_column);
            query.stmt.add_join(Join {
                kind: JoinKind::Left,
                source: JoinSource::Table {
                    table: target.table.clone(),
                    alias: name.to_string(),
                },
                parent,
                child_column: relationship.target_column.clone(),
            });
        }

        if relationship.is_to_one() {
            for column in target.columns.keys() {
                let projected = query
                    .hydrated
                    .values()
                    .any(|(relationship, hydrated)| relationship == name && hydrated == column);

                if projected {
                    continue;
                }

                let alias = query.free_alias(&self.model, format!("{name}{column}"));
                query.stmt.add_column(SelectExpression::Column {
                    column: ColumnRef::new(name, column),
                    alias: Some(alias.clone()),
                });
                query
                    .hydrated
                    .insert(alias, (name.to_string(), column.clone()));
            }
        }

        Ok(true)
    }

    /// INNER JOINs the statement of an intersected collection, when it lives
    /// on the same pool and translates completely.
    fn push_intersection(
        &self,
        db: &Db,
        query: &mut Query,
        intersection: &Intersection,
        params: &mut NamedParams,
        extras: bool,
    ) -> Result<bool> {
        let inner = &intersection.collection;
        let repository = db.repository(&inner.model().name)?;

        if !repository
            .pool()
            .is_some_and(|pool| Arc::ptr_eq(pool, &self.pool))
        {
            return Ok(false);
        }

        let mark = params.len();
        let Some(nested) = repository.statement_for_collection(db, inner, params)? else {
            params.truncate(mark);
            return Ok(false);
        };

        let nested_alias = nested.alias().to_string();

        if extras {
            for column in &intersection.pulled_up {
                let alias = query.free_alias(&self.model, format!("{nested_alias}_{column}"));
                query.stmt.add_column(SelectExpression::Column {
                    column: ColumnRef::new(&nested_alias, column),
                    alias: Some(alias.clone()),
                });

                if let Some(definition) = inner.model().get_column(column) {
                    query.conversions.insert(alias.clone(), definition.clone());
                }
                query.extras.insert(alias, column.clone());
            }
        }

        let parent = query.stmt.column_ref(&intersection.parent_column);
        query.stmt.add_join(Join {
            kind: JoinKind::Inner,
            source: JoinSource::Statement(Box::new(nested)),
            parent,
            child_column: intersection.child_column.clone(),
        });

        Ok(true)
    }

    /// Decides which aggregates the statement can compute without the joins
    /// changing the rows they see, and projects those.
    ///
    /// An aggregate over a one-to-many relationship needs that relationship
    /// joined, which repeats every owning row once per related row; so only
    /// one such relationship may be aggregated, nothing else is aggregated
    /// alongside it, and the filter must not have joined any to-many
    /// relationship itself.
    fn push_aggregate_columns(&self, db: &Db, query: &mut Query, aggregates: &[Aggregate]) -> Result<()> {
        let filter_to_many = query.filter_joins.iter().any(|name| {
            self.model
                .relationship(name)
                .is_some_and(|relationship| !relationship.is_to_one())
        });

        let blocked = filter_to_many || query.has_intersection_joins();

        let to_many: IndexSet<&str> = aggregates
            .iter()
            .filter_map(|aggregate| aggregate.path().0)
            .filter(|name| {
                self.model
                    .relationship(name)
                    .is_some_and(|relationship| relationship.kind == RelationshipKind::OneToMany)
            })
            .collect();

        let single_to_many = (to_many.len() == 1).then(|| to_many[0]);

        for aggregate in aggregates {
            let (relationship, column) = aggregate.path();

            let column_ref = if blocked {
                None
            } else {
                match relationship {
                    None if single_to_many.is_none() => self
                        .model
                        .get_column(column)
                        .map(|definition| (query.stmt.column_ref(column), definition.clone())),
                    Some(name) if single_to_many.map_or(!to_many.contains(name), |only| only == name) => {
                        self.relationship_column(db, query, name, column)?
                    }
                    _ => None,
                }
            };

            let Some((column_ref, definition)) = column_ref else {
                query.aggregates.push(false);
                continue;
            };

            let alias = query.free_alias(&self.model, aggregate.alias().to_string());
            query.stmt.add_column(SelectExpression::Aggregate {
                function: aggregate.kind.function(),
                column: column_ref,
                distinct: false,
                alias: alias.clone(),
            });

            if matches!(aggregate.kind, AggregateKind::Min | AggregateKind::Max) {
                query.conversions.insert(alias.clone(), definition);
            }

            query.extras.insert(alias, aggregate.alias().to_string());
            query.aggregates.push(true);
        }

        Ok(())
    }

    /// Joins `relationship` and returns a reference to `column` of it.
    fn relationship_column(
        &self,
        db: &Db,
        query: &mut Query,
        relationship: &str,
        column: &str,
    ) -> Result<Option<(ColumnRef, Column)>> {
        let Some(definition) = self.model.relationship(relationship) else {
            return Ok(None);
        };

        let target = db.schema().model(&definition.target_model)?;
        let Some(column_definition) = target.get_column(column) else {
            return Ok(None);
        };

        if !self.join_relationship(db, query, relationship)? {
            return Ok(None);
        }

        Ok(Some((
            ColumnRef::new(relationship, column),
            column_definition.clone(),
        )))
    }

    /// Adds the collection's sorts and the unique identifier tie-breaker.
    /// Returns `false`, leaving no sorts behind, if any sort cannot be
    /// expressed.
    fn push_sorts(&self, db: &Db, query: &mut Query, collection: &Collection) -> Result<bool> {
        for sort in collection.sorts() {
            let column = match sort.column.split_once('.') {
                Some((relationship, column)) => {
                    match self.model.relationship(relationship) {
                        Some(definition) if definition.is_to_one() => {}
                        _ => return Err(Error::sort_not_valid(&sort.column)),
                    }

                    match self.relationship_column(db, query, relationship, column)? {
                        Some((column_ref, _)) => Some(column_ref),
                        None => return Err(Error::sort_not_valid(&sort.column)),
                    }
                }
                None if self.model.get_column(&sort.column).is_some() => {
                    Some(query.stmt.column_ref(&sort.column))
                }
                None => {
                    let aggregate = collection
                        .aggregates()
                        .iter()
                        .position(|aggregate| aggregate.alias() == sort.column);

                    let pulled_up = collection
                        .intersections()
                        .iter()
                        .position(|intersection| intersection.pulled_up.contains(&sort.column));

                    let pushed = match (aggregate, pulled_up) {
                        (Some(index), _) => query.aggregates[index],
                        (None, Some(index)) => query.intersections[index],
                        (None, None) => return Err(Error::sort_not_valid(&sort.column)),
                    };

                    pushed
                        .then(|| query.extra_alias(&sort.column))
                        .flatten()
                        .map(ColumnRef::bare)
                }
            };

            let Some(column) = column else {
                query.stmt.sorts.clear();
                return Ok(false);
            };

            query.stmt.add_sort(column, sort.ascending);
        }

        let uid = query.stmt.column_ref(&self.unique_identifier()?.name);
        query.stmt.add_sort(uid, true);
        Ok(true)
    }

    /// Splits a result row into the model's storage row and the collection
    /// extras, caching the storage row and any auto-hydrated related rows.
    fn absorb(&self, db: &Db, query: &Query, row: Row) -> Result<(Value, Row, Row)> {
        let mut own = Row::with_capacity(self.model.columns.len());
        let mut extras = Row::new();
        let mut related: IndexMap<&str, Row> = IndexMap::new();

        for (name, value) in row {
            if let Some((relationship, column)) = query.hydrated.get(&name) {
                related
                    .entry(relationship.as_str())
                    .or_default()
                    .insert(column.clone(), value);
            } else if self.model.columns.contains_key(&name) {
                own.insert(name, value);
            } else {
                let value = match query.conversions.get(&name) {
                    Some(column) => column.from_storage(&value)?,
                    None => value,
                };
                let name = query.extras.get(&name).cloned().unwrap_or(name);
                extras.insert(name, value);
            }
        }

        for (name, row) in related {
            let Some(relationship) = self.model.relationship(name) else {
                continue;
            };

            let repository = db.repository(&relationship.target_model)?;
            let target = repository.model();
            let id = row.get(&target.unique_identifier).cloned().unwrap_or_default();

            if !id.is_null() && repository.cache().insert_if_missing(&id, row) {
                tracing::trace!(model = %target.name, %id, "auto-hydrated related row");
            }
        }

        let id = own
            .get(&self.model.unique_identifier)
            .cloned()
            .unwrap_or_default();
        self.cache.insert(&id, own.clone());

        Ok((id, own, extras))
    }

    /// Aggregates over the whole collection that one statement can compute
    /// alongside each other.
    fn push_collection_aggregates(
        &self,
        db: &Db,
        query: &mut Query,
        aggregates: &[Aggregate],
    ) -> Result<Vec<bool>> {
        query.stmt.columns.clear();
        query.hydrated.clear();
        query.stmt.groups.clear();

        let mut pushed = vec![false; aggregates.len()];
        let mut to_many: Option<&str> = None;

        for (index, aggregate) in aggregates.iter().enumerate() {
            let (relationship, column) = aggregate.path();
            let mut joins_to_many = false;

            let column = match relationship {
                None if to_many.is_none() => self
                    .model
                    .get_column(column)
                    .map(|definition| (query.stmt.column_ref(column), definition.clone())),
                None => None,
                Some(name) => {
                    let Some(definition) = self.model.relationship(name) else {
                        continue;
                    };

                    if definition.is_many_to_many() || to_many.is_some() {
                        continue;
                    }

                    if !definition.is_to_one() {
                        if pushed.iter().any(|pushed| *pushed) {
                            continue;
                        }
                        joins_to_many = true;
                    }

                    self.relationship_column(db, query, name, column)?
                }
            };

            let Some((column_ref, definition)) = column else {
                continue;
            };

            query.stmt.add_column(SelectExpression::Aggregate {
                function: aggregate.kind.function(),
                column: column_ref,
                distinct: false,
                alias: aggregate.alias().to_string(),
            });

            if matches!(aggregate.kind, AggregateKind::Min | AggregateKind::Max) {
                query
                    .conversions
                    .insert(aggregate.alias().to_string(), definition);
            }

            if joins_to_many {
                to_many = relationship;
            }

            pushed[index] = true;
        }

        // The relationship joins added above project hydrated columns too.
        query
            .stmt
            .columns
            .retain(|column| matches!(column, SelectExpression::Aggregate { .. }));

        Ok(pushed)
    }
}

impl Repository for SqlRepository {
    fn model(&self) -> &Arc<ModelSchema> {
        &self.model
    }

    fn cache(&self) -> &ObjectCache {
        &self.cache
    }

    fn pool(&self) -> Option<&Arc<Pool>> {
        Some(&self.pool)
    }

    fn fetch_missing_object_data(&self, _db: &Db, id: &Value) -> Result<Row> {
        let mut params = NamedParams::new();
        let mut stmt = SqlStatement::new(&self.model.table);
        let alias = stmt.alias().to_string();

        stmt.add_column(SelectExpression::AllColumns {
            table: alias.clone(),
        });
        let condition = self.where_unique_identifier(Some(&alias), id, &mut params)?;
        stmt.add_where_expression(condition);

        self.exec(stmt, params)?
            .into_rows()
            .into_iter()
            .next()
            .ok_or_else(|| Error::record_not_found(&self.model.name, id))
    }

    fn on_object_saved(&self, _db: &Db, model: &mut Model) -> Result<()> {
        let mut params = NamedParams::new();

        if model.is_new() {
            let mut insert = Insert::new(&self.model.table);

            for column in self.model.columns.values() {
                let value = model.get(&column.name);

                if value.is_null() && column.ty.is_auto_increment() {
                    continue;
                }

                let value = if value.is_null() { &column.default } else { value };
                let param = params.add(&column.name, column.to_storage(value)?);
                insert.values.push(Assignment::new(&column.name, param));
            }

            let response = self.exec(insert, params)?;

            if model.unique_identifier().is_null() {
                let Some(id) = response.last_insert_id else {
                    return Err(err!(
                        "the backend assigned no identifier to the new `{}`",
                        self.model.name
                    ));
                };
                model.assign_unique_identifier(Value::I64(id))?;
            }

            let row = model.storage_row(self.model.columns.keys().map(String::as_str))?;
            self.cache.insert(model.unique_identifier(), row);
        } else if model.has_changes() {
            let changes = model.storage_row(model.changes())?;
            let mut update = Update::new(&self.model.table);

            for (column, value) in &changes {
                let param = params.add(column, value.clone());
                update.assignments.push(Assignment::new(column, param));
            }

            let condition = self.where_unique_identifier(None, model.unique_identifier(), &mut params)?;
            update.add_where_expression(condition);

            self.exec(update, params)?;
            self.cache.patch(model.unique_identifier(), &changes);
        }

        model.mark_saved();
        Ok(())
    }

    fn on_object_deleted(&self, _db: &Db, model: &Model) -> Result<()> {
        let mut params = NamedParams::new();
        let mut delete = Delete::new(&self.model.table);

        let condition = self.where_unique_identifier(None, model.unique_identifier(), &mut params)?;
        delete.add_where_expression(condition);

        self.exec(delete, params)?;
        self.cache.remove(model.unique_identifier());
        Ok(())
    }

    fn batch_commit_updates_from_collection(
        &self,
        db: &Db,
        collection: &Collection,
        values: &Row,
    ) -> Result<()> {
        if collection.range().is_some()
            || !collection.intersections().is_empty()
            || collection.auto_hydrated().next().is_some()
        {
            return Err(Error::batch_update_not_possible());
        }

        let mut params = NamedParams::new();
        let mut update = Update::new(&self.model.table);

        if let Some(filter) = collection.root_filter() {
            let mut cx = FilterContext::new(db, &self.model, &self.model.table);
            let complete = filter.filter_with_repository(&mut cx, self, &mut update, &mut params);

            if !complete || !cx.relationships_to_auto_hydrate.is_empty() {
                return Err(Error::batch_update_not_possible());
            }
        }

        for (name, value) in values {
            let Some(column) = self.model.get_column(name) else {
                return Err(err!("model `{}` has no column `{name}`", self.model.name));
            };

            if *name == self.model.unique_identifier {
                return Err(err!(
                    "the unique identifier of `{}` cannot be batch updated",
                    self.model.name
                ));
            }

            let param = params.add(name, column.to_storage(value)?);
            update.assignments.push(Assignment::new(name, param));
        }

        if update.assignments.is_empty() {
            return Ok(());
        }

        self.exec(update, params)?;

        // Rows changed behind the cache's back.
        self.cache.clear();
        Ok(())
    }

    fn get_unique_identifiers_for_data_list(&self, db: &Db, collection: &Collection) -> Result<IdList> {
        let mut params = NamedParams::new();
        let mut query = self.query(db, collection, &mut params, true)?;
        let exclusive = query.is_exclusive();

        if exclusive {
            if let Some((offset, count)) = collection.range() {
                query.stmt.set_limit(offset, count);
                query.stmt.calc_found_rows = true;
            }
        }

        tracing::debug!(model = %self.model.name, exclusive, "fetching unique identifiers");

        let stmt = query.stmt.clone();
        let response = self.exec(stmt, params)?;
        let found_rows = response.found_rows;

        let mut list = IdList {
            exclusive,
            pushed_aggregates: query.aggregates.clone(),
            pushed_intersections: query.intersections.clone(),
            ..IdList::default()
        };

        for row in response.into_rows() {
            let (id, _, extras) = self.absorb(db, &query, row)?;

            if !extras.is_empty() {
                list.extras.insert(key(&id), extras);
            }
            list.ids.push(id);
        }

        if exclusive {
            list.unfetched_row_count = Some(match found_rows {
                Some(found_rows) => found_rows as usize,
                None => list.ids.len(),
            });
        }

        Ok(list)
    }

    fn create_cursor_for_collection(&self, db: &Db, collection: &Collection) -> Result<Option<Cursor>> {
        if !collection.aggregates().is_empty() {
            return Ok(None);
        }

        let mut params = NamedParams::new();
        let mut query = self.query(db, collection, &mut params, true)?;

        if !query.sorted || !query.intersections.iter().all(|pushed| *pushed) {
            return Ok(None);
        }

        if let Some((offset, count)) = collection.range() {
            if !query.filtered {
                return Ok(None);
            }
            query.stmt.set_limit(offset, count);
        }

        let stmt = query.stmt.clone();
        let mut rows = vec![];

        for row in self.exec(stmt, params)?.into_rows() {
            let (_, own, extras) = self.absorb(db, &query, row)?;
            rows.push((own, extras));
        }

        let residual = match (query.filtered, collection.root_filter()) {
            (false, Some(filter)) => Some(filter.clone()),
            _ => None,
        };

        Ok(Some(Cursor::from_rows(
            db.clone(),
            self.model.clone(),
            rows,
            residual,
        )))
    }

    fn calculate_aggregates(
        &self,
        db: &Db,
        aggregates: &[Aggregate],
        collection: &Collection,
    ) -> Result<Vec<Option<Value>>> {
        let declined = vec![None; aggregates.len()];

        if aggregates.is_empty()
            || collection.range().is_some()
            || !collection.intersections().is_empty()
        {
            return Ok(declined);
        }

        let mut params = NamedParams::new();
        let mut query = self.query(db, collection, &mut params, false)?;

        let filter_to_many = query.filter_joins.iter().any(|name| {
            self.model
                .relationship(name)
                .is_some_and(|relationship| !relationship.is_to_one())
        });

        if !query.filtered || filter_to_many {
            return Ok(declined);
        }

        let pushed = self.push_collection_aggregates(db, &mut query, aggregates)?;

        if !pushed.iter().any(|pushed| *pushed) {
            return Ok(declined);
        }

        let stmt = query.stmt.clone();
        let row = self
            .exec(stmt, params)?
            .into_rows()
            .into_iter()
            .next()
            .unwrap_or_default();

        aggregates
            .iter()
            .zip(pushed)
            .map(|(aggregate, pushed)| {
                if !pushed {
                    return Ok(None);
                }

                let value = row.get(aggregate.alias()).cloned().unwrap_or_default();
                Ok(Some(match query.conversions.get(aggregate.alias()) {
                    Some(column) => column.from_storage(&value)?,
                    None => value,
                }))
            })
            .collect()
    }

    fn count_for_collection(&self, db: &Db, collection: &Collection) -> Result<Option<usize>> {
        let mut params = NamedParams::new();
        let mut query = self.query(db, collection, &mut params, false)?;

        if !query.filtered || !query.intersections.iter().all(|pushed| *pushed) {
            return Ok(None);
        }

        let uid = query.stmt.column_ref(&self.unique_identifier()?.name);
        query.stmt.columns = vec![SelectExpression::Aggregate {
            function: AggregateFunction::Count,
            column: uid,
            distinct: true,
            alias: "RowCount".to_string(),
        }];
        query.stmt.groups.clear();
        query.stmt.sorts.clear();

        let row = self
            .exec(query.stmt, params)?
            .into_rows()
            .into_iter()
            .next()
            .unwrap_or_default();

        Ok(Some(
            row.get("RowCount")
                .and_then(Value::to_i64)
                .unwrap_or_default() as usize,
        ))
    }

    fn statement_for_collection(
        &self,
        db: &Db,
        collection: &Collection,
        params: &mut NamedParams,
    ) -> Result<Option<SqlStatement>> {
        let mut query = self.query(db, collection, params, true)?;

        if !query.is_exclusive() {
            return Ok(None);
        }

        if let Some((offset, count)) = collection.range() {
            query.stmt.set_limit(offset, count);
        }

        Ok(Some(query.stmt))
    }

    fn clear_repository_data(&self, _db: &Db) -> Result<()> {
        self.exec(
            Truncate {
                table: self.model.table.clone(),
            },
            NamedParams::new(),
        )?;
        self.cache.clear();
        Ok(())
    }

    fn previous_statement(&self) -> Option<String> {
        self.previous_statement
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
