use crate::stmt::Row;

#[derive(Debug)]
pub struct Response {
    pub rows: Rows,

    /// Rows the statement matched ignoring its limit, when requested.
    pub found_rows: Option<u64>,

    /// Identifier assigned by an insert into an auto-increment table.
    pub last_insert_id: Option<i64>,
}

#[derive(Debug)]
pub enum Rows {
    /// Number of rows impacted by the operation
    Count(u64),

    /// Operation result
    Values(Vec<Row>),
}

impl Response {
    pub fn count(count: u64) -> Self {
        Self {
            rows: Rows::Count(count),
            found_rows: None,
            last_insert_id: None,
        }
    }

    pub fn values(rows: Vec<Row>) -> Self {
        Self {
            rows: Rows::Values(rows),
            found_rows: None,
            last_insert_id: None,
        }
    }

    /// Consumes the response, returning its rows. A count response yields
    /// no rows.
    pub fn into_rows(self) -> Vec<Row> {
        match self.rows {
            Rows::Values(rows) => rows,
            Rows::Count(_) => vec![],
        }
    }
}

impl Rows {
    pub fn is_count(&self) -> bool {
        matches!(self, Self::Count(_))
    }

    pub fn is_values(&self) -> bool {
        matches!(self, Self::Values(_))
    }

    /// Number of rows affected or returned.
    pub fn len(&self) -> u64 {
        match self {
            Rows::Count(count) => *count,
            Rows::Values(rows) => rows.len() as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
