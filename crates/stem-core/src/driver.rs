mod response;
pub use response::{Response, Rows};

use crate::{
    schema::Schema,
    stmt::{NamedParams, Statement},
    Result,
};
use std::{borrow::Cow, fmt::Debug};

/// The SQL dialect a driver speaks.
///
/// Repositories use it to render the text they log and keep in their
/// statement history; drivers use it to render what they execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Mysql,
    Sqlite,
}

impl Dialect {
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Mysql => "MySql",
            Dialect::Sqlite => "Sqlite",
        }
    }
}

pub trait Driver: Debug + Send + Sync + 'static {
    /// Connection URL the driver was created from.
    fn url(&self) -> Cow<'_, str>;

    fn dialect(&self) -> Dialect;

    /// Opens a new connection.
    fn connect(&self) -> Result<Box<dyn Connection>>;

    /// Upper bound on the connections the pool may open, if the backend has
    /// one (an in-memory SQLite database only exists on one connection).
    fn max_connections(&self) -> Option<usize> {
        None
    }
}

pub trait Connection: Debug + Send + 'static {
    /// Executes one statement.
    fn exec(&mut self, op: Operation) -> Result<Response>;

    /// Creates the tables of every model in `schema`, replacing existing ones.
    fn push_schema(&mut self, schema: &Schema) -> Result<()>;
}

/// A statement together with its parameter bindings.
#[derive(Debug, Clone)]
pub struct Operation {
    pub stmt: Statement,
    pub params: NamedParams,
}

impl Operation {
    pub fn new(stmt: impl Into<Statement>, params: NamedParams) -> Operation {
        Operation {
            stmt: stmt.into(),
            params,
        }
    }
}
