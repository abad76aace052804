use super::{and_into, WhereExpression, WhereExpressionCollector};

/// `INSERT INTO table (columns) VALUES (:params)`
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: String,

    /// Column name and placeholder name pairs. Empty inserts a row of
    /// defaults.
    pub values: Vec<Assignment>,
}

/// `UPDATE table AS alias SET column = :param, ... WHERE ...`
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: String,
    pub alias: Option<String>,
    pub assignments: Vec<Assignment>,
    pub where_expression: Option<WhereExpression>,
}

/// `DELETE FROM table WHERE ...`
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: String,
    pub where_expression: Option<WhereExpression>,
}

/// Removes every row of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Truncate {
    pub table: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub param: String,
}

impl Assignment {
    pub fn new(column: impl Into<String>, param: impl Into<String>) -> Assignment {
        Assignment {
            column: column.into(),
            param: param.into(),
        }
    }
}

impl Insert {
    pub fn new(table: impl Into<String>) -> Insert {
        Insert {
            table: table.into(),
            values: vec![],
        }
    }
}

impl Update {
    pub fn new(table: impl Into<String>) -> Update {
        Update {
            table: table.into(),
            alias: None,
            assignments: vec![],
            where_expression: None,
        }
    }
}

impl Delete {
    pub fn new(table: impl Into<String>) -> Delete {
        Delete {
            table: table.into(),
            where_expression: None,
        }
    }
}

impl WhereExpressionCollector for Update {
    fn add_where_expression(&mut self, expr: WhereExpression) {
        and_into(&mut self.where_expression, expr);
    }
}

impl WhereExpressionCollector for Delete {
    fn add_where_expression(&mut self, expr: WhereExpression) {
        and_into(&mut self.where_expression, expr);
    }
}
