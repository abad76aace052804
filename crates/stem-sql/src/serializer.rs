#[macro_use]
mod fmt;
use fmt::ToSql;

mod delim;
use delim::{Comma, Delimited};

mod flavor;
use flavor::Flavor;

mod ident;
use ident::Ident;

// Fragment serializers
mod column_def;
mod expr;
mod select;
mod statement;

use crate::stmt::{SqlStatement, Statement};

/// Name of the column SQLite adds to a select to report found rows.
pub const FOUND_ROWS_COLUMN: &str = "__FoundRows";

/// Serialize a statement to a SQL string
#[derive(Debug, Clone, Copy)]
pub struct Serializer {
    /// The database flavor handles the differences between SQL dialects and
    /// supported features.
    flavor: Flavor,
}

struct Formatter<'a> {
    /// Handle to the serializer
    serializer: &'a Serializer,

    /// Where to write the serialized SQL
    dst: &'a mut String,

    /// Current query depth. Nested statements are rendered at depth > 0.
    depth: usize,
}

impl Serializer {
    pub fn serialize(&self, stmt: &Statement) -> String {
        let mut ret = self.serialize_fragment(stmt);
        ret.push(';');
        ret
    }

    /// Serializes a core statement.
    pub fn serialize_core(&self, stmt: &stem_core::stmt::Statement) -> String {
        self.serialize(&Statement::from(stmt.clone()))
    }

    fn serialize_fragment(&self, stmt: &Statement) -> String {
        let mut ret = String::new();

        let mut fmt = Formatter {
            serializer: self,
            dst: &mut ret,
            depth: 0,
        };

        stmt.to_sql(&mut fmt);
        ret
    }

    /// The follow-up query retrieving the found-rows count of the previous
    /// statement, for flavors that report it out of band.
    pub fn found_rows_query(&self) -> Option<&'static str> {
        match self.flavor {
            Flavor::Mysql => Some("SELECT FOUND_ROWS();"),
            Flavor::Sqlite => None,
        }
    }

    /// `SELECT COUNT(*)` over `stmt` with its limit and found-rows request
    /// removed.
    pub fn serialize_count(&self, stmt: &SqlStatement) -> String {
        let mut inner = stmt.clone();
        inner.limit = None;
        inner.calc_found_rows = false;
        inner.sorts.clear();

        format!(
            "SELECT COUNT(*) FROM ({}) AS `__Counted`;",
            self.serialize_fragment(&Statement::Select(inner))
        )
    }

    fn is_sqlite(&self) -> bool {
        matches!(self.flavor, Flavor::Sqlite)
    }
}
