mod context;
pub use context::FilterContext;

mod visitor;
pub use visitor::FilterVisitor;

use crate::{Db, Model, Result, Value};
use std::{cell::Cell, fmt, sync::Arc};
use stem_core::{
    schema::Column,
    stmt::{BooleanExpression, NamedParams, WhereExpression, WhereExpressionCollector},
};

/// A node of a collection's predicate tree.
///
/// Leaves test one column path; composites combine other filters. A
/// repository translates whatever it can into its native query through
/// [`filter_with_repository`](Filter::filter_with_repository), and each leaf
/// remembers whether the repository handled it. The collection evaluates the
/// tree in memory over the rows the repository returned unless every leaf was
/// handled.
#[derive(Debug, Clone)]
pub enum Filter {
    Equals(Equals),
    Contains(Contains),
    OneOf(OneOf),
    GreaterThan(Compare),
    LessThan(Compare),
    StartsWith(Affix),
    EndsWith(Affix),

    /// Arbitrary in-memory test; never translated
    Predicate(Predicate),

    Not(Not),
    And(Group),
    Or(Group),
}

/// `column == value`. Equality with `Null` tests for a missing value.
#[derive(Debug, Clone)]
pub struct Equals {
    pub column: String,
    pub value: Value,
    filtered: Cell<bool>,
}

/// Substring test, case insensitive unless requested otherwise.
#[derive(Debug, Clone)]
pub struct Contains {
    pub column: String,
    pub needle: String,
    pub case_sensitive: bool,
    filtered: Cell<bool>,
}

#[derive(Debug, Clone)]
pub struct OneOf {
    pub column: String,
    pub values: Vec<Value>,
    filtered: Cell<bool>,
}

/// Ordered comparison against a value, used by `GreaterThan` and `LessThan`.
#[derive(Debug, Clone)]
pub struct Compare {
    pub column: String,
    pub value: Value,
    pub inclusive: bool,
    filtered: Cell<bool>,
}

/// Case insensitive prefix or suffix test.
#[derive(Debug, Clone)]
pub struct Affix {
    pub column: String,
    pub affix: String,
    filtered: Cell<bool>,
}

#[derive(Clone)]
pub struct Predicate {
    test: Arc<dyn Fn(&Model) -> bool + Send + Sync>,
    filtered: Cell<bool>,
}

#[derive(Debug, Clone)]
pub struct Not {
    pub filter: Box<Filter>,
}

#[derive(Debug, Clone, Default)]
pub struct Group {
    pub filters: Vec<Filter>,
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("filtered", &self.filtered)
            .finish_non_exhaustive()
    }
}

impl Filter {
    pub fn equals(column: impl Into<String>, value: impl Into<Value>) -> Filter {
        Filter::Equals(Equals {
            column: column.into(),
            value: value.into(),
            filtered: Cell::default(),
        })
    }

    pub fn contains(column: impl Into<String>, needle: impl Into<String>) -> Filter {
        Filter::Contains(Contains {
            column: column.into(),
            needle: needle.into(),
            case_sensitive: false,
            filtered: Cell::default(),
        })
    }

    pub fn contains_case_sensitive(column: impl Into<String>, needle: impl Into<String>) -> Filter {
        Filter::Contains(Contains {
            column: column.into(),
            needle: needle.into(),
            case_sensitive: true,
            filtered: Cell::default(),
        })
    }

    pub fn one_of<V: Into<Value>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Filter {
        Filter::OneOf(OneOf {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
            filtered: Cell::default(),
        })
    }

    pub fn greater_than(column: impl Into<String>, value: impl Into<Value>) -> Filter {
        Filter::GreaterThan(Compare::new(column, value, false))
    }

    pub fn greater_than_or_equal(column: impl Into<String>, value: impl Into<Value>) -> Filter {
        Filter::GreaterThan(Compare::new(column, value, true))
    }

    pub fn less_than(column: impl Into<String>, value: impl Into<Value>) -> Filter {
        Filter::LessThan(Compare::new(column, value, false))
    }

    pub fn less_than_or_equal(column: impl Into<String>, value: impl Into<Value>) -> Filter {
        Filter::LessThan(Compare::new(column, value, true))
    }

    pub fn starts_with(column: impl Into<String>, prefix: impl Into<String>) -> Filter {
        Filter::StartsWith(Affix::new(column, prefix))
    }

    pub fn ends_with(column: impl Into<String>, suffix: impl Into<String>) -> Filter {
        Filter::EndsWith(Affix::new(column, suffix))
    }

    pub fn predicate(test: impl Fn(&Model) -> bool + Send + Sync + 'static) -> Filter {
        Filter::Predicate(Predicate {
            test: Arc::new(test),
            filtered: Cell::default(),
        })
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: Filter) -> Filter {
        Filter::Not(Not {
            filter: Box::new(filter),
        })
    }

    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Filter {
        Filter::And(Group {
            filters: filters.into_iter().collect(),
        })
    }

    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Filter {
        Filter::Or(Group {
            filters: filters.into_iter().collect(),
        })
    }

    /// AND-s `filter` onto this one, flattening into an existing `And`.
    pub fn and_with(self, filter: Filter) -> Filter {
        match self {
            Filter::And(mut group) => {
                group.filters.push(filter);
                Filter::And(group)
            }
            other => Filter::and([other, filter]),
        }
    }

    pub fn is_leaf(&self) -> bool {
        !matches!(self, Filter::Not(_) | Filter::And(_) | Filter::Or(_))
    }

    /// Returns `true` if the last translation handled this filter entirely.
    ///
    /// A composite reports `true` only when every leaf beneath it does.
    pub fn was_filtered_by_repository(&self) -> bool {
        match self {
            Filter::Not(not) => not.filter.was_filtered_by_repository(),
            Filter::And(group) => group.filters.iter().all(Filter::was_filtered_by_repository),
            Filter::Or(group) => {
                !group.filters.is_empty()
                    && group.filters.iter().all(Filter::was_filtered_by_repository)
            }
            leaf => leaf.leaf_state().is_some_and(Cell::get),
        }
    }

    /// Returns `true` if `repository` can translate the whole tree.
    ///
    /// The probe runs against a copy; neither this filter's state nor the
    /// context's relationships are touched.
    pub fn can_filter_with_repository<V: FilterVisitor + ?Sized>(
        &self,
        cx: &FilterContext<'_>,
        repository: &V,
    ) -> bool {
        let probe = self.clone();
        let mut cx = cx.clone();
        let mut fragments = BooleanExpression::and();
        let mut params = NamedParams::new();

        probe.filter_with_repository(&mut cx, repository, &mut fragments, &mut params)
    }

    /// Translates the tree through `repository`, pushing the fragments into
    /// `collector`.
    ///
    /// Returns `true` if every leaf was translated. An `And` pushes the
    /// children that translate even when others do not; `Or` and `Not`
    /// contribute nothing unless their whole subtree translates.
    pub fn filter_with_repository<V: FilterVisitor + ?Sized>(
        &self,
        cx: &mut FilterContext<'_>,
        repository: &V,
        collector: &mut dyn WhereExpressionCollector,
        params: &mut NamedParams,
    ) -> bool {
        match self {
            Filter::Equals(filter) => {
                let expr = repository.visit_equals(cx, filter, params);
                record(&filter.filtered, expr, collector)
            }
            Filter::Contains(filter) => {
                let expr = repository.visit_contains(cx, filter, params);
                record(&filter.filtered, expr, collector)
            }
            Filter::OneOf(filter) => {
                let expr = repository.visit_one_of(cx, filter, params);
                record(&filter.filtered, expr, collector)
            }
            Filter::GreaterThan(filter) => {
                let expr = repository.visit_greater_than(cx, filter, params);
                record(&filter.filtered, expr, collector)
            }
            Filter::LessThan(filter) => {
                let expr = repository.visit_less_than(cx, filter, params);
                record(&filter.filtered, expr, collector)
            }
            Filter::StartsWith(filter) => {
                let expr = repository.visit_starts_with(cx, filter, params);
                record(&filter.filtered, expr, collector)
            }
            Filter::EndsWith(filter) => {
                let expr = repository.visit_ends_with(cx, filter, params);
                record(&filter.filtered, expr, collector)
            }
            Filter::Predicate(filter) => record(&filter.filtered, None, collector),
            Filter::And(group) => {
                let mut fragments = BooleanExpression::and();
                let mut complete = true;

                for filter in &group.filters {
                    complete &= filter.filter_with_repository(cx, repository, &mut fragments, params);
                }

                if let Some(expr) = fragments.into_where_expression() {
                    collector.add_where_expression(expr);
                }

                complete
            }
            Filter::Or(group) => {
                let mark = params.len();
                let mut fragments = BooleanExpression::or();

                let complete = !group.filters.is_empty()
                    && group
                        .filters
                        .iter()
                        .all(|filter| filter.filter_with_repository(cx, repository, &mut fragments, params));

                match fragments.into_where_expression() {
                    Some(expr) if complete => {
                        collector.add_where_expression(expr);
                        true
                    }
                    _ => {
                        self.reset();
                        params.truncate(mark);
                        false
                    }
                }
            }
            Filter::Not(not) => {
                let mark = params.len();
                let mut fragments = BooleanExpression::and();

                cx.enter_not();
                let complete = not.filter.filter_with_repository(cx, repository, &mut fragments, params);
                cx.exit_not();

                if complete && fragments.len() == 1 {
                    if let Some(expr) = fragments.into_where_expression() {
                        collector.add_where_expression(WhereExpression::not(expr));
                        return true;
                    }
                }

                self.reset();
                params.truncate(mark);
                false
            }
        }
    }

    /// Evaluates the tree against one model.
    ///
    /// Dotted paths navigate relationships; a to-many path matches when any
    /// related value does.
    pub fn evaluate(&self, db: &Db, model: &Model) -> Result<bool> {
        Ok(match self {
            Filter::Equals(filter) => {
                let (values, column) = resolve(db, model, &filter.column)?;
                if filter.value.is_null() {
                    values.iter().any(Value::is_null)
                } else {
                    let target = coerce(column.as_ref(), &filter.value);
                    values.iter().any(|value| !value.is_null() && value.loose_eq(&target))
                }
            }
            Filter::Contains(filter) => {
                let (values, _) = resolve(db, model, &filter.column)?;
                values.iter().filter(|value| !value.is_null()).any(|value| {
                    let value = value.to_string();
                    if filter.case_sensitive {
                        value.contains(&filter.needle)
                    } else {
                        let (value, needle) = fold_case(&value, &filter.needle);
                        value.contains(&needle)
                    }
                })
            }
            Filter::OneOf(filter) => {
                let (values, column) = resolve(db, model, &filter.column)?;
                let targets: Vec<Value> = filter
                    .values
                    .iter()
                    .map(|target| coerce(column.as_ref(), target))
                    .collect();

                values.iter().filter(|value| !value.is_null()).any(|value| {
                    targets.iter().any(|target| value.loose_eq(target))
                })
            }
            Filter::GreaterThan(filter) => compare(db, model, filter, |ordering| {
                ordering.is_gt() || (filter.inclusive && ordering.is_eq())
            })?,
            Filter::LessThan(filter) => compare(db, model, filter, |ordering| {
                ordering.is_lt() || (filter.inclusive && ordering.is_eq())
            })?,
            Filter::StartsWith(filter) => {
                let (values, _) = resolve(db, model, &filter.column)?;
                values.iter().filter(|value| !value.is_null()).any(|value| {
                    let (value, prefix) = fold_case(&value.to_string(), &filter.affix);
                    value.starts_with(&prefix)
                })
            }
            Filter::EndsWith(filter) => {
                let (values, _) = resolve(db, model, &filter.column)?;
                values.iter().filter(|value| !value.is_null()).any(|value| {
                    let (value, suffix) = fold_case(&value.to_string(), &filter.affix);
                    value.ends_with(&suffix)
                })
            }
            Filter::Predicate(filter) => (filter.test)(model),
            Filter::Not(not) => !not.filter.evaluate(db, model)?,
            Filter::And(group) => {
                for filter in &group.filters {
                    if !filter.evaluate(db, model)? {
                        return Ok(false);
                    }
                }
                true
            }
            Filter::Or(group) => {
                for filter in &group.filters {
                    if filter.evaluate(db, model)? {
                        return Ok(true);
                    }
                }
                false
            }
        })
    }

    /// Marks every leaf beneath this node as not filtered.
    pub(crate) fn reset(&self) {
        match self {
            Filter::Not(not) => not.filter.reset(),
            Filter::And(group) | Filter::Or(group) => group.filters.iter().for_each(Filter::reset),
            leaf => {
                if let Some(state) = leaf.leaf_state() {
                    state.set(false);
                }
            }
        }
    }

    /// Every column path a leaf of the tree tests.
    pub fn column_paths(&self) -> Vec<&str> {
        let mut paths = vec![];
        self.collect_paths(&mut paths);
        paths
    }

    fn collect_paths<'a>(&'a self, paths: &mut Vec<&'a str>) {
        match self {
            Filter::Equals(filter) => paths.push(&filter.column),
            Filter::Contains(filter) => paths.push(&filter.column),
            Filter::OneOf(filter) => paths.push(&filter.column),
            Filter::GreaterThan(filter) | Filter::LessThan(filter) => paths.push(&filter.column),
            Filter::StartsWith(filter) | Filter::EndsWith(filter) => paths.push(&filter.column),
            Filter::Predicate(_) => {}
            Filter::Not(not) => not.filter.collect_paths(paths),
            Filter::And(group) | Filter::Or(group) => {
                group.filters.iter().for_each(|filter| filter.collect_paths(paths))
            }
        }
    }

    fn leaf_state(&self) -> Option<&Cell<bool>> {
        match self {
            Filter::Equals(filter) => Some(&filter.filtered),
            Filter::Contains(filter) => Some(&filter.filtered),
            Filter::OneOf(filter) => Some(&filter.filtered),
            Filter::GreaterThan(filter) | Filter::LessThan(filter) => Some(&filter.filtered),
            Filter::StartsWith(filter) | Filter::EndsWith(filter) => Some(&filter.filtered),
            Filter::Predicate(filter) => Some(&filter.filtered),
            Filter::Not(_) | Filter::And(_) | Filter::Or(_) => None,
        }
    }
}

impl Compare {
    fn new(column: impl Into<String>, value: impl Into<Value>, inclusive: bool) -> Compare {
        Compare {
            column: column.into(),
            value: value.into(),
            inclusive,
            filtered: Cell::default(),
        }
    }
}

impl Affix {
    fn new(column: impl Into<String>, affix: impl Into<String>) -> Affix {
        Affix {
            column: column.into(),
            affix: affix.into(),
            filtered: Cell::default(),
        }
    }
}

fn record(
    filtered: &Cell<bool>,
    expr: Option<WhereExpression>,
    collector: &mut dyn WhereExpressionCollector,
) -> bool {
    filtered.set(expr.is_some());

    match expr {
        Some(expr) => {
            collector.add_where_expression(expr);
            true
        }
        None => false,
    }
}

/// Lowercases `text` and `needle` for a case insensitive match. An ASCII
/// needle folds ASCII letters only, which is what SQL `LIKE` does; any
/// other needle folds the full Unicode range.
fn fold_case(text: &str, needle: &str) -> (String, String) {
    if needle.is_ascii() {
        (text.to_ascii_lowercase(), needle.to_ascii_lowercase())
    } else {
        (text.to_lowercase(), needle.to_lowercase())
    }
}

/// Values a column path holds for `model`, and the column definition when
/// the path ends on a schema column. A path that reaches no related model
/// yields a single `Null`.
fn resolve(db: &Db, model: &Model, path: &str) -> Result<(Vec<Value>, Option<Column>)> {
    let mut values = db.path_values(model, path)?;
    if values.is_empty() {
        values.push(Value::Null);
    }
    Ok((values, db.path_column(model.schema(), path).cloned()))
}

/// Brings a filter operand into the column's representation so that it
/// compares the way the backend compares its bound parameter.
fn coerce(column: Option<&Column>, value: &Value) -> Value {
    match column {
        Some(column) => column.coerce(value.clone()).unwrap_or_else(|_| value.clone()),
        None => value.clone(),
    }
}

fn compare(
    db: &Db,
    model: &Model,
    filter: &Compare,
    accept: impl Fn(std::cmp::Ordering) -> bool,
) -> Result<bool> {
    if filter.value.is_null() {
        return Ok(false);
    }

    let (values, column) = resolve(db, model, &filter.column)?;
    let target = coerce(column.as_ref(), &filter.value);

    Ok(values
        .iter()
        .filter(|value| !value.is_null())
        .any(|value| accept(value.loose_cmp(&target))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Schema;
    use stem_core::{
        schema::{ColumnType, ModelSchema},
        stmt::{ColumnRef, CompareOp},
    };

    /// Translates `Equals` on plain columns only.
    struct EqualsOnly;

    impl FilterVisitor for EqualsOnly {
        fn visit_equals(
            &self,
            cx: &mut FilterContext<'_>,
            filter: &Equals,
            params: &mut NamedParams,
        ) -> Option<WhereExpression> {
            cx.model.get_column(&filter.column)?;
            let param = params.add(&filter.column, filter.value.clone());
            Some(WhereExpression::compare(
                ColumnRef::new(&cx.alias, &filter.column),
                CompareOp::Eq,
                param,
            ))
        }
    }

    fn db() -> Db {
        let schema = Schema::builder()
            .model(
                ModelSchema::new("Contact", "tblContact")
                    .auto_increment("ContactID")
                    .column(Column::new("Forename", ColumnType::String))
                    .column(Column::new("Surname", ColumnType::String)),
            )
            .build()
            .unwrap();

        Db::builder().schema(schema).offline().unwrap()
    }

    fn translate(db: &Db, filter: &Filter) -> (bool, Option<WhereExpression>, NamedParams) {
        let model = db.schema().model("Contact").unwrap();
        let mut cx = FilterContext::new(db, model, "c");
        let mut fragments = BooleanExpression::and();
        let mut params = NamedParams::new();

        let complete = filter.filter_with_repository(&mut cx, &EqualsOnly, &mut fragments, &mut params);
        (complete, fragments.into_where_expression(), params)
    }

    #[test]
    fn and_pushes_what_translates() {
        let db = db();
        let filter = Filter::and([
            Filter::equals("Forename", "John"),
            Filter::contains("Surname", "smi"),
        ]);

        let (complete, expr, params) = translate(&db, &filter);

        assert!(!complete);
        assert!(matches!(expr, Some(WhereExpression::Compare { .. })));
        assert_eq!(params.len(), 1);
        assert!(!filter.was_filtered_by_repository());

        let Filter::And(group) = &filter else { unreachable!() };
        assert!(group.filters[0].was_filtered_by_repository());
        assert!(!group.filters[1].was_filtered_by_repository());
    }

    #[test]
    fn or_is_all_or_nothing() {
        let db = db();
        let filter = Filter::or([
            Filter::equals("Forename", "John"),
            Filter::predicate(|_| true),
        ]);

        let (complete, expr, params) = translate(&db, &filter);

        assert!(!complete);
        assert_eq!(expr, None);
        assert!(params.is_empty());

        let Filter::Or(group) = &filter else { unreachable!() };
        assert!(!group.filters[0].was_filtered_by_repository());
    }

    #[test]
    fn not_wraps_exactly_one_fragment() {
        let db = db();

        let filter = Filter::not(Filter::equals("Forename", "John"));
        let (complete, expr, _) = translate(&db, &filter);
        assert!(complete);
        assert!(matches!(expr, Some(WhereExpression::Not(_))));
        assert!(filter.was_filtered_by_repository());

        let filter = Filter::not(Filter::and([]));
        let (complete, expr, _) = translate(&db, &filter);
        assert!(!complete);
        assert_eq!(expr, None);
    }

    #[test]
    fn failure_propagates_upwards() {
        let db = db();
        let filter = Filter::and([
            Filter::equals("Forename", "John"),
            Filter::and([
                Filter::equals("Surname", "Smith"),
                Filter::not(Filter::starts_with("Surname", "S")),
            ]),
        ]);

        translate(&db, &filter);

        let Filter::And(outer) = &filter else { unreachable!() };
        assert!(outer.filters[0].was_filtered_by_repository());
        assert!(!outer.filters[1].was_filtered_by_repository());
        assert!(!filter.was_filtered_by_repository());
    }

    #[test]
    fn probing_leaves_state_untouched() {
        let db = db();
        let model = db.schema().model("Contact").unwrap();
        let cx = FilterContext::new(&db, model, "c");

        let filter = Filter::equals("Forename", "John");
        assert!(filter.can_filter_with_repository(&cx, &EqualsOnly));
        assert!(!filter.was_filtered_by_repository());

        assert!(!Filter::contains("Forename", "oh").can_filter_with_repository(&cx, &EqualsOnly));
    }

    #[test]
    fn evaluate_in_memory() {
        let db = db();
        let mut model = db.create("Contact").unwrap();
        model.set("Forename", "John").unwrap();
        model.set("Surname", "Smith").unwrap();

        let matches = |filter: Filter| filter.evaluate(&db, &model).unwrap();

        assert!(matches(Filter::equals("Forename", "John")));
        assert!(!matches(Filter::equals("Forename", "john")));
        assert!(matches(Filter::contains("Surname", "MIT")));
        assert!(!matches(Filter::contains_case_sensitive("Surname", "MIT")));
        assert!(matches(Filter::one_of("Forename", ["Mary", "John"])));
        assert!(matches(Filter::starts_with("Surname", "sm")));
        assert!(matches(Filter::ends_with("Surname", "TH")));
        assert!(matches(Filter::greater_than("Forename", "Jack")));
        assert!(!matches(Filter::less_than("Forename", "Jack")));
        assert!(matches(Filter::equals("ContactID", Value::Null)));
        assert!(!matches(Filter::greater_than("ContactID", 0)));
        assert!(matches(Filter::not(Filter::greater_than("ContactID", 0))));
        assert!(matches(Filter::or([
            Filter::equals("Forename", "Mary"),
            Filter::predicate(|model| model.get("Surname") == &Value::from("Smith")),
        ])));
        assert!(!matches(Filter::or([])));
        assert!(matches(Filter::and([])));
    }

    #[test]
    fn ascii_needles_fold_ascii_letters_only() {
        let db = db();
        let mut model = db.create("Contact").unwrap();
        model.set("Forename", "J\u{00d6}RG").unwrap();
        model.set("Surname", "\u{212a}ing").unwrap();

        let matches = |filter: Filter| filter.evaluate(&db, &model).unwrap();

        assert!(matches(Filter::contains("Forename", "j\u{00f6}")));
        assert!(matches(Filter::starts_with("Forename", "j")));
        assert!(!matches(Filter::starts_with("Surname", "k")));
        assert!(matches(Filter::ends_with("Surname", "ING")));
    }
}
