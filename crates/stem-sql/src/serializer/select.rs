use super::{Comma, Formatter, Ident, ToSql, FOUND_ROWS_COLUMN};

use crate::stmt::{Join, JoinKind, JoinSource, SelectExpression, SortExpression, SqlStatement};

impl ToSql for &SqlStatement {
    fn to_sql(self, f: &mut Formatter<'_>) {
        let found_rows = self.calc_found_rows && f.depth == 0;

        f.dst.push_str("SELECT ");

        if found_rows && !f.serializer.is_sqlite() {
            f.dst.push_str("SQL_CALC_FOUND_ROWS ");
        }

        if self.columns.is_empty() {
            fmt!(f, Ident(self.alias()) ".*");
        } else {
            fmt!(f, Comma(&self.columns));
        }

        if found_rows && f.serializer.is_sqlite() {
            fmt!(f, ", COUNT(*) OVER () AS " Ident(FOUND_ROWS_COLUMN));
        }

        fmt!(f, " FROM " Ident(&self.table) " AS " Ident(self.alias()));

        for join in &self.joins {
            fmt!(f, " " join);
        }

        if let Some(expr) = &self.where_expression {
            fmt!(f, " WHERE " expr);
        }

        if !self.groups.is_empty() {
            fmt!(f, " GROUP BY " Comma(&self.groups));
        }

        if !self.sorts.is_empty() {
            fmt!(f, " ORDER BY " Comma(&self.sorts));
        }

        if let Some(limit) = &self.limit {
            fmt!(f, " LIMIT " limit.offset ", " limit.count);
        }
    }
}

impl ToSql for &SelectExpression {
    fn to_sql(self, f: &mut Formatter<'_>) {
        match self {
            SelectExpression::AllColumns { table } => fmt!(f, Ident(table) ".*"),
            SelectExpression::Column { column, alias } => {
                fmt!(f, column);
                if let Some(alias) = alias {
                    fmt!(f, " AS " Ident(alias));
                }
            }
            SelectExpression::Aggregate {
                function,
                column,
                distinct,
                alias,
            } => {
                let distinct = if *distinct { "DISTINCT " } else { "" };
                fmt!(f, function.as_str() "(" distinct column ") AS " Ident(alias));
            }
        }
    }
}

impl ToSql for &Join {
    fn to_sql(self, f: &mut Formatter<'_>) {
        let kind = match self.kind {
            JoinKind::Inner => "INNER JOIN ",
            JoinKind::Left => "LEFT JOIN ",
        };

        f.dst.push_str(kind);

        match &self.source {
            JoinSource::Table { table, alias } => fmt!(f, Ident(table) " AS " Ident(alias)),
            JoinSource::Statement(stmt) => {
                f.dst.push('(');
                f.depth += 1;
                fmt!(f, &**stmt);
                f.depth -= 1;
                fmt!(f, ") AS " Ident(stmt.alias()));
            }
        }

        let parent = &self.parent;
        fmt!(
            f, " ON " parent " = " Ident(self.source.alias()) "." Ident(&self.child_column)
        );
    }
}

impl ToSql for &SortExpression {
    fn to_sql(self, f: &mut Formatter<'_>) {
        let direction = if self.ascending { " ASC" } else { " DESC" };
        fmt!(f, &self.column direction);
    }
}
