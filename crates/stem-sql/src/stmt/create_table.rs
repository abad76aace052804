use super::{ColumnDef, Statement};

use stem_core::schema::ModelSchema;

#[derive(Debug, Clone)]
pub struct CreateTable {
    /// Name of the table
    pub name: String,

    /// Column definitions
    pub columns: Vec<ColumnDef>,
}

impl Statement {
    /// `CREATE TABLE` for the model's table, the unique identifier being
    /// the primary key.
    pub fn create_table(model: &ModelSchema) -> Self {
        CreateTable {
            name: model.table.clone(),
            columns: model
                .columns
                .values()
                .map(|column| ColumnDef::from_schema(column, column.name == model.unique_identifier))
                .collect(),
        }
        .into()
    }
}

impl From<CreateTable> for Statement {
    fn from(value: CreateTable) -> Self {
        Self::CreateTable(value)
    }
}
