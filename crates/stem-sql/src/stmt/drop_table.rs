use super::Statement;

/// `DROP TABLE`, used to reset a model's table before the schema is pushed
/// again.
#[derive(Debug, Clone)]
pub struct DropTable {
    pub name: String,
    pub if_exists: bool,
}

impl Statement {
    pub fn drop_table(name: impl Into<String>) -> Statement {
        Statement::DropTable(DropTable {
            name: name.into(),
            if_exists: false,
        })
    }

    /// Like [`drop_table`](Statement::drop_table), but a missing table is
    /// not an error.
    pub fn drop_table_if_exists(name: impl Into<String>) -> Statement {
        Statement::DropTable(DropTable {
            name: name.into(),
            if_exists: true,
        })
    }
}
