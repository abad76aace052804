use crate::{Db, Model, Result, Value};
use indexmap::IndexMap;
use stem_core::stmt::AggregateFunction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Sum,
    Average,
    Count,
    Min,
    Max,
}

/// An aggregate over a column, optionally reached through a relationship
/// (`"Users.Wage"`).
///
/// Backends compute aggregates when they can; otherwise the collection folds
/// the values of its materialized models with
/// [`AggregateState::calculate_by_iteration`]. Both paths give the same
/// answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub kind: AggregateKind,

    /// Column path the aggregate reads
    pub column: String,

    alias: String,
}

/// Running state of one aggregate over one group.
#[derive(Debug, Clone, PartialEq)]
pub enum Running {
    /// Total so far; integer totals stay integers until a float is seen
    Sum(Option<Value>),
    Average { total: f64, count: u64 },
    Count(u64),
    Min(Option<Value>),
    Max(Option<Value>),
}

impl AggregateKind {
    /// Name used in generated aliases, e.g. `SumOf`
    pub fn prefix(self) -> &'static str {
        match self {
            AggregateKind::Sum => "SumOf",
            AggregateKind::Average => "AverageOf",
            AggregateKind::Count => "CountOf",
            AggregateKind::Min => "MinOf",
            AggregateKind::Max => "MaxOf",
        }
    }

    pub fn function(self) -> AggregateFunction {
        match self {
            AggregateKind::Sum => AggregateFunction::Sum,
            AggregateKind::Average => AggregateFunction::Avg,
            AggregateKind::Count => AggregateFunction::Count,
            AggregateKind::Min => AggregateFunction::Min,
            AggregateKind::Max => AggregateFunction::Max,
        }
    }

    /// State before any value has been seen.
    pub fn initial(self) -> Running {
        match self {
            AggregateKind::Sum => Running::Sum(None),
            AggregateKind::Average => Running::Average {
                total: 0.0,
                count: 0,
            },
            AggregateKind::Count => Running::Count(0),
            AggregateKind::Min => Running::Min(None),
            AggregateKind::Max => Running::Max(None),
        }
    }

    /// Folds `value` into `state`. `Null` values are skipped, as SQL
    /// aggregates skip them.
    pub fn fold(self, state: Running, value: &Value) -> Running {
        if value.is_null() {
            return state;
        }

        match state {
            Running::Sum(total) => Running::Sum(Some(match total {
                None => numeric(value),
                Some(total) => add(&total, value),
            })),
            Running::Average { total, count } => match value.to_f64() {
                Some(value) => Running::Average {
                    total: total + value,
                    count: count + 1,
                },
                None => Running::Average { total, count },
            },
            Running::Count(count) => Running::Count(count + 1),
            Running::Min(current) => Running::Min(Some(match current {
                Some(current) if current.loose_cmp(value).is_le() => current,
                _ => value.clone(),
            })),
            Running::Max(current) => Running::Max(Some(match current {
                Some(current) if current.loose_cmp(value).is_ge() => current,
                _ => value.clone(),
            })),
        }
    }
}

impl Running {
    /// Aggregate value of everything folded so far.
    pub fn current_value(&self) -> Value {
        match self {
            Running::Sum(total) => total.clone().unwrap_or(Value::Null),
            Running::Average { count: 0, .. } => Value::Null,
            Running::Average { total, count } => Value::F64(total / *count as f64),
            Running::Count(count) => Value::I64(*count as i64),
            Running::Min(value) | Running::Max(value) => value.clone().unwrap_or(Value::Null),
        }
    }
}

fn numeric(value: &Value) -> Value {
    match value {
        Value::I64(_) | Value::F64(_) => value.clone(),
        other => match (other.to_i64(), other.to_f64()) {
            (Some(v), _) => Value::I64(v),
            (None, Some(v)) => Value::F64(v),
            (None, None) => Value::I64(0),
        },
    }
}

fn add(total: &Value, value: &Value) -> Value {
    match (total, numeric(value)) {
        (Value::I64(a), Value::I64(b)) => match a.checked_add(b) {
            Some(sum) => Value::I64(sum),
            None => Value::F64(*a as f64 + b as f64),
        },
        (a, b) => Value::F64(a.to_f64().unwrap_or(0.0) + b.to_f64().unwrap_or(0.0)),
    }
}

impl Aggregate {
    pub fn new(kind: AggregateKind, column: impl Into<String>) -> Aggregate {
        let column = column.into();
        let alias = format!("{}{}", kind.prefix(), column.replace('.', ""));
        Aggregate {
            kind,
            column,
            alias,
        }
    }

    pub fn sum(column: impl Into<String>) -> Aggregate {
        Aggregate::new(AggregateKind::Sum, column)
    }

    pub fn average(column: impl Into<String>) -> Aggregate {
        Aggregate::new(AggregateKind::Average, column)
    }

    pub fn count(column: impl Into<String>) -> Aggregate {
        Aggregate::new(AggregateKind::Count, column)
    }

    pub fn min(column: impl Into<String>) -> Aggregate {
        Aggregate::new(AggregateKind::Min, column)
    }

    pub fn max(column: impl Into<String>) -> Aggregate {
        Aggregate::new(AggregateKind::Max, column)
    }

    /// Name the result is exposed under, e.g. `SumOfUsersWage`
    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Aggregate {
        self.alias = alias.into();
        self
    }

    /// Splits the column path into the relationship name, if any, and the
    /// column.
    pub fn path(&self) -> (Option<&str>, &str) {
        match self.column.split_once('.') {
            Some((relationship, column)) => (Some(relationship), column),
            None => (None, &self.column),
        }
    }
}

/// Per-group running state of one aggregate.
#[derive(Debug, Clone)]
pub struct AggregateState {
    aggregate: Aggregate,
    groups: IndexMap<String, Running>,
}

impl AggregateState {
    pub fn new(aggregate: Aggregate) -> AggregateState {
        AggregateState {
            aggregate,
            groups: IndexMap::new(),
        }
    }

    pub fn aggregate(&self) -> &Aggregate {
        &self.aggregate
    }

    /// Folds the values `model` contributes into the state of `group_key`
    /// and returns the group's aggregate so far.
    pub fn calculate_by_iteration(&mut self, db: &Db, model: &Model, group_key: &str) -> Result<Value> {
        let values = db.path_values(model, &self.aggregate.column)?;
        Ok(self.fold_values(group_key, &values))
    }

    /// Folds already resolved values into the state of `group_key`.
    pub fn fold_values(&mut self, group_key: &str, values: &[Value]) -> Value {
        let kind = self.aggregate.kind;
        let state = self
            .groups
            .entry(group_key.to_string())
            .or_insert_with(|| kind.initial());

        for value in values {
            *state = kind.fold(std::mem::replace(state, kind.initial()), value);
        }

        state.current_value()
    }

    /// Aggregate value of a group, `Null` for a group never seen.
    pub fn current_value(&self, group_key: &str) -> Value {
        self.groups
            .get(group_key)
            .map(Running::current_value)
            .unwrap_or_else(|| self.aggregate.kind.initial().current_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold_all(kind: AggregateKind, values: &[Value]) -> Value {
        values
            .iter()
            .fold(kind.initial(), |state, value| kind.fold(state, value))
            .current_value()
    }

    #[test]
    fn aliases() {
        assert_eq!(Aggregate::sum("Users.Wage").alias(), "SumOfUsersWage");
        assert_eq!(Aggregate::average("Wage").alias(), "AverageOfWage");
        assert_eq!(Aggregate::count("Wage").with_alias("Headcount").alias(), "Headcount");
        assert_eq!(Aggregate::max("Users.Wage").path(), (Some("Users"), "Wage"));
    }

    #[test]
    fn integer_sums_stay_integers() {
        let values = [Value::I64(100), Value::Null, Value::I64(200)];
        assert_eq!(fold_all(AggregateKind::Sum, &values), Value::I64(300));

        let values = [Value::I64(1), Value::F64(0.5)];
        assert_eq!(fold_all(AggregateKind::Sum, &values), Value::F64(1.5));

        assert_eq!(fold_all(AggregateKind::Sum, &[]), Value::Null);
    }

    #[test]
    fn average_is_correct_after_every_prefix() {
        let values = [4, 8, 15, 16, 23, 42].map(Value::I64);

        let mut state = AggregateKind::Average.initial();
        for (index, value) in values.iter().enumerate() {
            state = AggregateKind::Average.fold(state, value);

            let prefix = &values[..=index];
            let mean = prefix.iter().filter_map(Value::to_f64).sum::<f64>() / prefix.len() as f64;
            assert_eq!(state.current_value(), Value::F64(mean));
        }
    }

    #[test]
    fn average_does_not_depend_on_order() {
        let forward = [3, 1, 4, 1, 5, 9, 2, 6].map(Value::I64);
        let mut backward = forward.clone();
        backward.reverse();

        assert_eq!(
            fold_all(AggregateKind::Average, &forward),
            fold_all(AggregateKind::Average, &backward)
        );
        assert_eq!(fold_all(AggregateKind::Average, &forward), Value::F64(31.0 / 8.0));
    }

    #[test]
    fn count_min_max_skip_nulls() {
        let values = [Value::I64(7), Value::Null, Value::I64(-2), Value::I64(5)];

        assert_eq!(fold_all(AggregateKind::Count, &values), Value::I64(3));
        assert_eq!(fold_all(AggregateKind::Min, &values), Value::I64(-2));
        assert_eq!(fold_all(AggregateKind::Max, &values), Value::I64(7));
        assert_eq!(fold_all(AggregateKind::Max, &[Value::Null]), Value::Null);
    }

    #[test]
    fn groups_are_independent() {
        let mut state = AggregateState::new(Aggregate::sum("Users.Wage"));

        state.fold_values("1", &[Value::I64(100), Value::I64(200)]);
        assert_eq!(state.fold_values("2", &[Value::I64(300)]), Value::I64(300));
        assert_eq!(state.fold_values("2", &[Value::I64(400)]), Value::I64(700));

        assert_eq!(state.current_value("1"), Value::I64(300));
        assert_eq!(state.current_value("3"), Value::Null);
    }
}
