use super::{Comma, Formatter, Ident, ToSql};

use crate::{
    serializer::ident::Placeholder,
    stmt::{Assignment, Delete, Insert, Statement, Truncate, Update},
};

impl ToSql for &Statement {
    fn to_sql(self, f: &mut Formatter<'_>) {
        match self {
            Statement::CreateTable(stmt) => stmt.to_sql(f),
            Statement::DropTable(stmt) => {
                let if_exists = if stmt.if_exists { "IF EXISTS " } else { "" };
                fmt!(f, "DROP TABLE " if_exists Ident(&stmt.name));
            }
            Statement::Delete(stmt) => stmt.to_sql(f),
            Statement::Insert(stmt) => stmt.to_sql(f),
            Statement::Select(stmt) => stmt.to_sql(f),
            Statement::Truncate(stmt) => stmt.to_sql(f),
            Statement::Update(stmt) => stmt.to_sql(f),
        }
    }
}

impl ToSql for &Insert {
    fn to_sql(self, f: &mut Formatter<'_>) {
        fmt!(f, "INSERT INTO " Ident(&self.table));

        if self.values.is_empty() {
            if f.serializer.is_sqlite() {
                fmt!(f, " DEFAULT VALUES");
            } else {
                fmt!(f, " () VALUES ()");
            }
            return;
        }

        let columns = Comma(self.values.iter().map(|value| Ident(&value.column)));
        let params = Comma(self.values.iter().map(|value| Placeholder(&value.param)));

        fmt!(f, " (" columns ") VALUES (" params ")");
    }
}

impl ToSql for &Update {
    fn to_sql(self, f: &mut Formatter<'_>) {
        fmt!(f, "UPDATE " Ident(&self.table));

        if let Some(alias) = &self.alias {
            fmt!(f, " AS " Ident(alias));
        }

        fmt!(f, " SET " Comma(&self.assignments));

        if let Some(expr) = &self.where_expression {
            fmt!(f, " WHERE " expr);
        }
    }
}

impl ToSql for &Assignment {
    fn to_sql(self, f: &mut Formatter<'_>) {
        fmt!(f, Ident(&self.column) " = " Placeholder(&self.param));
    }
}

impl ToSql for &Delete {
    fn to_sql(self, f: &mut Formatter<'_>) {
        fmt!(f, "DELETE FROM " Ident(&self.table));

        if let Some(expr) = &self.where_expression {
            fmt!(f, " WHERE " expr);
        }
    }
}

impl ToSql for &Truncate {
    fn to_sql(self, f: &mut Formatter<'_>) {
        if f.serializer.is_sqlite() {
            fmt!(f, "DELETE FROM " Ident(&self.table));
        } else {
            fmt!(f, "TRUNCATE TABLE " Ident(&self.table));
        }
    }
}
