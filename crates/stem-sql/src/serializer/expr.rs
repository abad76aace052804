use super::{Comma, Delimited, Formatter, ToSql};

use crate::{serializer::ident::Placeholder, stmt::WhereExpression};

/// Wraps composite children in parentheses so precedence survives
/// rendering.
struct Operand<'a>(&'a WhereExpression);

impl ToSql for &WhereExpression {
    fn to_sql(self, f: &mut Formatter<'_>) {
        match self {
            WhereExpression::And(children) => {
                fmt!(f, Delimited(children.iter().map(Operand), " AND "));
            }
            WhereExpression::Or(children) => {
                fmt!(f, Delimited(children.iter().map(Operand), " OR "));
            }
            WhereExpression::Not(inner) => {
                let inner: &WhereExpression = inner;
                fmt!(f, "NOT (" inner ")");
            }
            WhereExpression::Compare { column, op, param } => {
                fmt!(f, column " " op.as_str() " " Placeholder(param));
            }
            WhereExpression::IsNull { column, negated } => {
                let op = if *negated { " IS NOT NULL" } else { " IS NULL" };
                fmt!(f, column op);
            }
            WhereExpression::Like { column, param } => {
                fmt!(f, column " LIKE " Placeholder(param));
                if f.serializer.is_sqlite() {
                    f.dst.push_str(" ESCAPE '\\'");
                }
            }
            WhereExpression::In { params, .. } if params.is_empty() => {
                f.dst.push_str("1 = 0");
            }
            WhereExpression::In { column, params } => {
                fmt!(f, column " IN (" Comma(params.iter().map(Placeholder)) ")");
            }
        }
    }
}

impl ToSql for Operand<'_> {
    fn to_sql(self, f: &mut Formatter<'_>) {
        match self.0 {
            WhereExpression::And(_) | WhereExpression::Or(_) => fmt!(f, "(" self.0 ")"),
            expr => fmt!(f, expr),
        }
    }
}
