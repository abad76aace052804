mod value;
pub(crate) use value::Value;

use rusqlite::Connection as RusqliteConnection;
use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};
use stem_core::{
    driver::{Dialect, Driver, Operation, Response, Rows},
    schema::Schema,
    stmt::{NamedParams, Row, Statement},
    Error, Result,
};
use stem_sql::{self as sql, serializer::FOUND_ROWS_COLUMN, Serializer};
use url::Url;

#[derive(Debug)]
pub enum Sqlite {
    File(PathBuf),
    InMemory,
}

impl Sqlite {
    /// Create a new SQLite driver from a connection URL, either
    /// `sqlite::memory:` or `sqlite:<path>`.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url_str = url.into();
        let url = Url::parse(&url_str).map_err(|err| Error::repository_connection("Sqlite", err))?;

        if url.scheme() != "sqlite" {
            return Err(stem_core::err!(
                "connection URL does not have a `sqlite` scheme; url={}",
                url_str
            ));
        }

        if url.path() == ":memory:" {
            Ok(Self::InMemory)
        } else {
            Ok(Self::File(PathBuf::from(url.path())))
        }
    }

    /// Create an in-memory SQLite database
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    /// Open a SQLite database at the specified file path
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self::File(path.as_ref().to_path_buf())
    }
}

impl Driver for Sqlite {
    fn url(&self) -> Cow<'_, str> {
        match self {
            Sqlite::InMemory => Cow::Borrowed("sqlite::memory:"),
            Sqlite::File(path) => Cow::Owned(format!("sqlite:{}", path.display())),
        }
    }

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn connect(&self) -> Result<Box<dyn stem_core::Connection>> {
        let connection = match self {
            Sqlite::File(path) => Connection::open(path)?,
            Sqlite::InMemory => Connection::in_memory()?,
        };
        Ok(Box::new(connection))
    }

    /// Every connection to `:memory:` opens a distinct database, so the pool
    /// must share a single one.
    fn max_connections(&self) -> Option<usize> {
        matches!(self, Self::InMemory).then_some(1)
    }
}

#[derive(Debug)]
pub struct Connection {
    connection: RusqliteConnection,
}

impl Connection {
    pub fn in_memory() -> Result<Self> {
        let connection = RusqliteConnection::open_in_memory()
            .map_err(|err| Error::repository_connection("Sqlite", err))?;

        Ok(Self { connection })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection = RusqliteConnection::open(path)
            .map_err(|err| Error::repository_connection("Sqlite", err))?;
        Ok(Self { connection })
    }

    /// Prepares `sql` and binds every placeholder it declares from `params`.
    fn prepare<'c>(
        &'c self,
        sql: &str,
        params: &NamedParams,
    ) -> Result<rusqlite::CachedStatement<'c>> {
        let mut stmt = self
            .connection
            .prepare_cached(sql)
            .map_err(|err| Error::repository_statement(sql, err))?;

        for index in 1..=stmt.parameter_count() {
            let Some(name) = stmt.parameter_name(index) else {
                return Err(stem_core::err!("positional parameter in statement; sql={sql}"));
            };

            let Some(value) = params.get(name.trim_start_matches(':')) else {
                return Err(stem_core::err!("no value bound for `{name}`; sql={sql}"));
            };

            stmt.raw_bind_parameter(index, Value::from(value.clone()))
                .map_err(|err| Error::repository_statement(sql, err))?;
        }

        Ok(stmt)
    }

    fn query(&self, sql: &str, params: &NamedParams) -> Result<Vec<Row>> {
        let mut stmt = self.prepare(sql, params)?;

        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = stmt.raw_query();
        let mut ret = vec![];

        loop {
            match rows.next() {
                Ok(Some(row)) => {
                    let mut record = Row::with_capacity(columns.len());

                    for (index, name) in columns.iter().enumerate() {
                        let value = Value::from_sql(row, index)
                            .map_err(|err| Error::repository_statement(sql, err))?;
                        record.insert(name.clone(), value.into_inner());
                    }

                    ret.push(record);
                }
                Ok(None) => break,
                Err(err) => return Err(Error::repository_statement(sql, err)),
            }
        }

        Ok(ret)
    }
}

impl stem_core::driver::Connection for Connection {
    fn exec(&mut self, op: Operation) -> Result<Response> {
        let serializer = Serializer::sqlite();
        let Operation { stmt, params } = op;

        let sql_str = serializer.serialize(&sql::Statement::from(stmt.clone()));

        let Statement::Select(select) = &stmt else {
            let mut prepared = self.prepare(&sql_str, &params)?;
            let count = prepared
                .raw_execute()
                .map_err(|err| Error::repository_statement(&sql_str, err))?;

            let mut response = Response::count(count as u64);

            if matches!(stmt, Statement::Insert(_)) {
                response.last_insert_id = Some(self.connection.last_insert_rowid());
            }

            return Ok(response);
        };

        let mut rows = self.query(&sql_str, &params)?;

        if !select.calc_found_rows {
            return Ok(Response::values(rows));
        }

        // The window column repeats the total on every row; strip it and
        // keep one copy.
        let mut found_rows = None;
        for row in &mut rows {
            if let Some(total) = row.shift_remove(FOUND_ROWS_COLUMN) {
                found_rows = total.to_i64().map(|total| total as u64);
            }
        }

        let found_rows = match found_rows {
            Some(found_rows) => found_rows,
            None if select.limit.is_none() => 0,
            None => {
                // The range starts past the last row; count separately.
                let count_sql = serializer.serialize_count(select);
                self.query(&count_sql, &params)?
                    .first()
                    .and_then(|row| row.values().next())
                    .and_then(|count| count.to_i64())
                    .unwrap_or(0) as u64
            }
        };

        Ok(Response {
            rows: Rows::Values(rows),
            found_rows: Some(found_rows),
            last_insert_id: None,
        })
    }

    fn push_schema(&mut self, schema: &Schema) -> Result<()> {
        let serializer = Serializer::sqlite();

        for model in schema.models() {
            tracing::debug!(table = %model.table, "creating table");

            for stmt in [
                sql::Statement::drop_table_if_exists(&model.table),
                sql::Statement::create_table(model),
            ] {
                let stmt = serializer.serialize(&stmt);
                self.connection
                    .execute(&stmt, [])
                    .map_err(|err| Error::repository_statement(&stmt, err))?;
            }
        }

        Ok(())
    }
}
