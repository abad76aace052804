use super::{and_into, ColumnRef, WhereExpression, WhereExpressionCollector};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    OnceLock,
};

static NEXT_ALIAS: AtomicU64 = AtomicU64::new(1);

/// Structural representation of one `SELECT`.
///
/// The statement is assembled piece by piece (columns, joins, where
/// fragments) and only rendered to text once the whole tree, including any
/// nested statements joined in by intersections, is final.
#[derive(Debug, Clone)]
pub struct SqlStatement {
    /// Primary table
    pub table: String,

    /// Projected columns, in order
    pub columns: Vec<SelectExpression>,

    pub joins: Vec<Join>,

    pub where_expression: Option<WhereExpression>,

    pub sorts: Vec<SortExpression>,

    pub groups: Vec<ColumnRef>,

    pub limit: Option<Limit>,

    /// Ask the backend for the number of rows the statement matches ignoring
    /// `limit`.
    pub calc_found_rows: bool,

    alias: OnceLock<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectExpression {
    /// `alias.*`
    AllColumns { table: String },

    /// `alias.column [AS name]`
    Column {
        column: ColumnRef,
        alias: Option<String>,
    },

    /// `FUNC([DISTINCT] alias.column) AS name`
    Aggregate {
        function: AggregateFunction,
        column: ColumnRef,
        distinct: bool,
        alias: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Sum,
    Avg,
    Count,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn as_str(self) -> &'static str {
        match self {
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

#[derive(Debug, Clone)]
pub enum JoinSource {
    /// A plain table joined under an alias
    Table { table: String, alias: String },

    /// A nested statement, joined under the statement's own alias
    Statement(Box<SqlStatement>),
}

impl JoinSource {
    pub fn alias(&self) -> &str {
        match self {
            JoinSource::Table { alias, .. } => alias,
            JoinSource::Statement(stmt) => stmt.alias(),
        }
    }
}

/// `<kind> JOIN <source> ON <parent>.<parent_column> = <source alias>.<child_column>`
#[derive(Debug, Clone)]
pub struct Join {
    pub kind: JoinKind,
    pub source: JoinSource,
    pub parent: ColumnRef,
    pub child_column: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortExpression {
    pub column: ColumnRef,
    pub ascending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub offset: usize,
    pub count: usize,
}

impl SqlStatement {
    pub fn new(table: impl Into<String>) -> SqlStatement {
        SqlStatement {
            table: table.into(),
            columns: vec![],
            joins: vec![],
            where_expression: None,
            sorts: vec![],
            groups: vec![],
            limit: None,
            calc_found_rows: false,
            alias: OnceLock::new(),
        }
    }

    /// Creates a statement whose alias is fixed up front.
    pub fn with_alias(table: impl Into<String>, alias: impl Into<String>) -> SqlStatement {
        let stmt = SqlStatement::new(table);
        let _ = stmt.alias.set(alias.into());
        stmt
    }

    /// The alias the primary table is selected under.
    ///
    /// Generated on first request, unique within the process and stable for
    /// the lifetime of the statement.
    pub fn alias(&self) -> &str {
        self.alias.get_or_init(|| {
            let id = NEXT_ALIAS.fetch_add(1, Ordering::Relaxed);
            format!("{}_{id}", self.table)
        })
    }

    /// Reference to `column` of the primary table.
    pub fn column_ref(&self, column: impl Into<String>) -> ColumnRef {
        ColumnRef::new(self.alias(), column)
    }

    pub fn add_column(&mut self, column: SelectExpression) {
        self.columns.push(column);
    }

    pub fn add_join(&mut self, join: Join) {
        self.joins.push(join);
    }

    /// Returns `true` if a join with the given alias was already added.
    pub fn has_join(&self, alias: &str) -> bool {
        self.joins.iter().any(|join| join.source.alias() == alias)
    }

    pub fn add_sort(&mut self, column: ColumnRef, ascending: bool) {
        self.sorts.push(SortExpression { column, ascending });
    }

    pub fn add_group(&mut self, column: ColumnRef) {
        if !self.groups.contains(&column) {
            self.groups.push(column);
        }
    }

    pub fn set_limit(&mut self, offset: usize, count: usize) {
        self.limit = Some(Limit { offset, count });
    }
}

impl WhereExpressionCollector for SqlStatement {
    /// The first fragment becomes the where clause; later fragments are
    /// AND-ed with it.
    fn add_where_expression(&mut self, expr: WhereExpression) {
        and_into(&mut self.where_expression, expr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::stmt::CompareOp;

    #[test]
    fn alias_is_stable_and_unique() {
        let a = SqlStatement::new("tblContact");
        let b = SqlStatement::new("tblContact");

        let first = a.alias().to_string();
        assert_eq!(a.alias(), first);
        assert_ne!(a.alias(), b.alias());
        assert!(first.starts_with("tblContact_"));
    }

    #[test]
    fn fixed_alias() {
        let stmt = SqlStatement::with_alias("tblContact", "Contact");
        assert_eq!(stmt.alias(), "Contact");
        assert_eq!(stmt.column_ref("Forename"), ColumnRef::new("Contact", "Forename"));
    }

    #[test]
    fn where_fragments_are_anded() {
        let mut stmt = SqlStatement::with_alias("tblContact", "Contact");
        let first = WhereExpression::compare(stmt.column_ref("Forename"), CompareOp::Eq, "Forename");
        let second = WhereExpression::compare(stmt.column_ref("CompanyID"), CompareOp::Eq, "CompanyID");
        let third = WhereExpression::IsNull {
            column: stmt.column_ref("Surname"),
            negated: true,
        };

        stmt.add_where_expression(first.clone());
        assert_eq!(stmt.where_expression, Some(first.clone()));

        stmt.add_where_expression(second.clone());
        stmt.add_where_expression(third.clone());
        assert_eq!(
            stmt.where_expression,
            Some(WhereExpression::And(vec![first, second, third]))
        );
    }
}
