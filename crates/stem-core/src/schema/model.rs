use super::{Column, ColumnType, Relationship};
use indexmap::IndexMap;

/// Describes one model: its table, columns and relationships.
#[derive(Debug, Clone)]
pub struct ModelSchema {
    /// Model name, e.g. `Contact`
    pub name: String,

    /// Table (or collection) the model is stored in
    pub table: String,

    /// Name of the unique identifier column
    pub unique_identifier: String,

    pub columns: IndexMap<String, Column>,

    /// Relationships navigable from this model, keyed by navigation name
    pub relationships: IndexMap<String, Relationship>,
}

impl ModelSchema {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> ModelSchema {
        ModelSchema {
            name: name.into(),
            table: table.into(),
            unique_identifier: String::new(),
            columns: IndexMap::new(),
            relationships: IndexMap::new(),
        }
    }

    /// Declares the unique identifier as an auto-increment integer column.
    pub fn auto_increment(self, name: impl Into<String>) -> ModelSchema {
        self.unique_identifier(Column::new(name, ColumnType::AutoIncrement))
    }

    /// Declares `column` as the unique identifier.
    pub fn unique_identifier(mut self, column: Column) -> ModelSchema {
        self.unique_identifier = column.name.clone();
        self.columns.shift_insert(0, column.name.clone(), column);
        self
    }

    pub fn column(mut self, column: Column) -> ModelSchema {
        self.columns.insert(column.name.clone(), column);
        self
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn unique_identifier_column(&self) -> Option<&Column> {
        self.columns.get(&self.unique_identifier)
    }

    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.get(name)
    }

    /// Splits a dotted column path into its relationship and the remainder.
    ///
    /// Returns `None` for a plain column name.
    pub fn split_path<'a>(&self, path: &'a str) -> Option<(&Relationship, &'a str)> {
        let (navigation, rest) = path.split_once('.')?;
        let relationship = self.relationships.get(navigation)?;
        Some((relationship, rest))
    }
}
