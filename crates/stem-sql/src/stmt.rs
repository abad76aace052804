mod column_def;
pub use column_def::ColumnDef;

mod create_table;
pub use create_table::CreateTable;

mod drop_table;
pub use drop_table::DropTable;

pub use stem_core::stmt::*;

/// Every statement the serializer can render: the core query and write
/// statements plus the DDL used to create model tables.
#[derive(Debug, Clone)]
pub enum Statement {
    CreateTable(CreateTable),
    DropTable(DropTable),
    Delete(Delete),
    Insert(Insert),
    Select(SqlStatement),
    Truncate(Truncate),
    Update(Update),
}

impl Statement {
    pub fn is_select(&self) -> bool {
        matches!(self, Statement::Select(_))
    }
}

impl From<stem_core::stmt::Statement> for Statement {
    fn from(value: stem_core::stmt::Statement) -> Self {
        match value {
            stem_core::stmt::Statement::Select(stmt) => Statement::Select(stmt),
            stem_core::stmt::Statement::Insert(stmt) => Statement::Insert(stmt),
            stem_core::stmt::Statement::Update(stmt) => Statement::Update(stmt),
            stem_core::stmt::Statement::Delete(stmt) => Statement::Delete(stmt),
            stem_core::stmt::Statement::Truncate(stmt) => Statement::Truncate(stmt),
        }
    }
}

impl From<SqlStatement> for Statement {
    fn from(value: SqlStatement) -> Self {
        Statement::Select(value)
    }
}
