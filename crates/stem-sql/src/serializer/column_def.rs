use super::{Comma, Formatter, Ident, ToSql};

use crate::stmt::{ColumnDef, CreateTable};
use stem_core::schema::ColumnType;

impl ToSql for &CreateTable {
    fn to_sql(self, f: &mut Formatter<'_>) {
        fmt!(f, "CREATE TABLE " Ident(&self.name) " (" Comma(&self.columns));

        // SQLite declares an auto-increment key inline with its column.
        let inline_pk = f.serializer.is_sqlite()
            && self
                .columns
                .iter()
                .any(|column| column.primary_key && column.is_auto_increment());

        if !inline_pk {
            let pk = self.columns.iter().filter(|column| column.primary_key);
            fmt!(f, ", PRIMARY KEY (" Comma(pk.map(|column| Ident(&column.name))) ")");
        }

        fmt!(f, ")");
    }
}

impl ToSql for &ColumnDef {
    fn to_sql(self, f: &mut Formatter<'_>) {
        let ty = if f.serializer.is_sqlite() {
            match self.ty {
                ColumnType::AutoIncrement if self.primary_key => "INTEGER PRIMARY KEY AUTOINCREMENT",
                ColumnType::AutoIncrement | ColumnType::Integer | ColumnType::Boolean => "INTEGER",
                ColumnType::Float => "REAL",
                ColumnType::String
                | ColumnType::Date
                | ColumnType::DateTime
                | ColumnType::Uuid => "TEXT",
            }
        } else {
            match self.ty {
                ColumnType::AutoIncrement => "INT NOT NULL AUTO_INCREMENT",
                ColumnType::Integer => "INT",
                ColumnType::Boolean => "TINYINT(1)",
                ColumnType::Float => "DOUBLE",
                ColumnType::String => "VARCHAR(255)",
                ColumnType::Date => "DATE",
                ColumnType::DateTime => "DATETIME",
                ColumnType::Uuid => "CHAR(36)",
            }
        };

        fmt!(f, Ident(&self.name) " " ty);
    }
}
