mod params;
pub use params::NamedParams;

mod sql_statement;
pub use sql_statement::{
    AggregateFunction, Join, JoinKind, JoinSource, Limit, SelectExpression, SortExpression,
    SqlStatement,
};

mod value;
pub use value::{Value, DATE_FORMAT, DATE_TIME_FORMAT};

mod where_expression;
use where_expression::and_into;
pub use where_expression::{
    BooleanExpression, BooleanKind, ColumnRef, CompareOp, WhereExpression,
    WhereExpressionCollector,
};

mod write;
pub use write::{Assignment, Delete, Insert, Truncate, Update};

use indexmap::IndexMap;

/// One storage row: named columns in storage order.
pub type Row = IndexMap<String, Value>;

/// A statement ready to be handed to a driver.
#[derive(Debug, Clone)]
pub enum Statement {
    Select(SqlStatement),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    Truncate(Truncate),
}

impl Statement {
    pub fn is_select(&self) -> bool {
        matches!(self, Statement::Select(_))
    }

    pub fn as_select(&self) -> Option<&SqlStatement> {
        match self {
            Statement::Select(stmt) => Some(stmt),
            _ => None,
        }
    }
}

impl From<SqlStatement> for Statement {
    fn from(value: SqlStatement) -> Self {
        Statement::Select(value)
    }
}

impl From<Insert> for Statement {
    fn from(value: Insert) -> Self {
        Statement::Insert(value)
    }
}

impl From<Update> for Statement {
    fn from(value: Update) -> Self {
        Statement::Update(value)
    }
}

impl From<Delete> for Statement {
    fn from(value: Delete) -> Self {
        Statement::Delete(value)
    }
}

impl From<Truncate> for Statement {
    fn from(value: Truncate) -> Self {
        Statement::Truncate(value)
    }
}
