/// Reference to a column, optionally qualified by a table alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> ColumnRef {
        ColumnRef {
            table: Some(table.into()),
            column: column.into(),
        }
    }

    /// A column referenced without a table qualifier.
    pub fn bare(column: impl Into<String>) -> ColumnRef {
        ColumnRef {
            table: None,
            column: column.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }
}

/// A node of a statement's boolean where-expression tree.
///
/// Leaves refer to bound values by placeholder name; the values live in the
/// statement's [`NamedParams`](super::NamedParams).
#[derive(Debug, Clone, PartialEq)]
pub enum WhereExpression {
    /// Every child must hold
    And(Vec<WhereExpression>),

    /// At least one child must hold
    Or(Vec<WhereExpression>),

    /// Negates the wrapped expression
    Not(Box<WhereExpression>),

    /// `column <op> :param`
    Compare {
        column: ColumnRef,
        op: CompareOp,
        param: String,
    },

    /// `column IS [NOT] NULL`
    IsNull { column: ColumnRef, negated: bool },

    /// `column LIKE :param`, with `\` as the escape character
    Like { column: ColumnRef, param: String },

    /// `column IN (:p1, :p2, ...)`. An empty list never matches.
    In {
        column: ColumnRef,
        params: Vec<String>,
    },
}

impl WhereExpression {
    pub fn compare(column: ColumnRef, op: CompareOp, param: impl Into<String>) -> WhereExpression {
        WhereExpression::Compare {
            column,
            op,
            param: param.into(),
        }
    }

    pub fn not(expr: WhereExpression) -> WhereExpression {
        WhereExpression::Not(Box::new(expr))
    }
}

/// Anything that accepts where-expression fragments.
///
/// Filters push their translated fragments into a collector without knowing
/// whether it is the top-level statement or an intermediate group.
pub trait WhereExpressionCollector {
    fn add_where_expression(&mut self, expr: WhereExpression);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanKind {
    And,
    Or,
}

/// An intermediate AND / OR group that collects fragments before being
/// folded into its parent.
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanExpression {
    pub kind: BooleanKind,
    pub children: Vec<WhereExpression>,
}

impl BooleanExpression {
    pub fn and() -> BooleanExpression {
        BooleanExpression {
            kind: BooleanKind::And,
            children: vec![],
        }
    }

    pub fn or() -> BooleanExpression {
        BooleanExpression {
            kind: BooleanKind::Or,
            children: vec![],
        }
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Collapses the group into a single expression.
    ///
    /// Returns `None` for an empty group; a single child is returned as is.
    pub fn into_where_expression(mut self) -> Option<WhereExpression> {
        match self.children.len() {
            0 => None,
            1 => self.children.pop(),
            _ => Some(match self.kind {
                BooleanKind::And => WhereExpression::And(self.children),
                BooleanKind::Or => WhereExpression::Or(self.children),
            }),
        }
    }
}

impl WhereExpressionCollector for BooleanExpression {
    fn add_where_expression(&mut self, expr: WhereExpression) {
        self.children.push(expr);
    }
}

/// Adds `expr` to an optional where clause, AND-ing it with what is there.
pub(crate) fn and_into(slot: &mut Option<WhereExpression>, expr: WhereExpression) {
    *slot = Some(match slot.take() {
        None => expr,
        Some(WhereExpression::And(mut children)) => {
            children.push(expr);
            WhereExpression::And(children)
        }
        Some(existing) => WhereExpression::And(vec![existing, expr]),
    });
}
