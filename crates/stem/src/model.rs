use crate::{err, Result, Row, Value};
use indexmap::IndexSet;
use std::sync::Arc;
use stem_core::schema::ModelSchema;

static NULL: Value = Value::Null;

/// One entity instance.
///
/// A model owns its values; the values are never shared with a repository's
/// object cache, so mutating a model (including date values) has no effect on
/// other instances until it is saved.
#[derive(Debug, Clone)]
pub struct Model {
    schema: Arc<ModelSchema>,

    /// Column values in their in-memory representation
    values: Row,

    /// Columns set since the model was loaded, created or last saved
    changes: IndexSet<String>,

    new: bool,

    /// Values computed by the collection the model came from: aggregate
    /// columns and pulled-up intersection columns.
    extras: Row,
}

impl Model {
    /// Creates an unsaved model with every column at its initial value.
    pub fn new(schema: Arc<ModelSchema>) -> Model {
        let values = schema
            .columns
            .values()
            .map(|column| (column.name.clone(), column.initial_value()))
            .collect();

        Model {
            schema,
            values,
            changes: IndexSet::new(),
            new: true,
            extras: Row::new(),
        }
    }

    /// Hydrates a model from a raw storage row.
    pub fn from_storage(schema: Arc<ModelSchema>, row: &Row) -> Result<Model> {
        let mut values = Row::with_capacity(schema.columns.len());

        for column in schema.columns.values() {
            let value = match row.get(&column.name) {
                Some(value) => column.from_storage(value)?,
                None => Value::Null,
            };
            values.insert(column.name.clone(), value);
        }

        Ok(Model {
            schema,
            values,
            changes: IndexSet::new(),
            new: false,
            extras: Row::new(),
        })
    }

    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    /// Returns the value of a column or of a collection extra. Unknown names
    /// read as `Null`.
    pub fn get(&self, name: &str) -> &Value {
        self.values
            .get(name)
            .or_else(|| self.extras.get(name))
            .unwrap_or(&NULL)
    }

    /// Sets a column, coercing `value` through the column type.
    ///
    /// Setting the unique identifier of a model that already has one to a
    /// different value is an error.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let Some(column) = self.schema.get_column(name) else {
            return Err(err!("model `{}` has no column `{name}`", self.schema.name));
        };

        let value = column.coerce(value.into())?;
        let current = self.get(name);

        if current == &value {
            return Ok(());
        }

        if name == self.schema.unique_identifier && !current.is_null() {
            return Err(err!(
                "the unique identifier of `{}` {current} cannot change to {value}",
                self.schema.name
            ));
        }

        self.values.insert(name.to_string(), value);
        self.changes.insert(name.to_string());
        Ok(())
    }

    pub fn unique_identifier(&self) -> &Value {
        self.get(&self.schema.unique_identifier)
    }

    /// Returns `true` until the model is first saved.
    pub fn is_new(&self) -> bool {
        self.new
    }

    /// Names of the columns set since the model was loaded or last saved.
    pub fn changes(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(String::as_str)
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn values(&self) -> &Row {
        &self.values
    }

    pub fn extras(&self) -> &Row {
        &self.extras
    }

    /// Storage representation of the named columns.
    pub(crate) fn storage_row<'a>(&self, columns: impl IntoIterator<Item = &'a str>) -> Result<Row> {
        let mut row = Row::new();

        for name in columns {
            let Some(column) = self.schema.get_column(name) else {
                continue;
            };
            row.insert(name.to_string(), column.to_storage(self.get(name))?);
        }

        Ok(row)
    }

    pub(crate) fn assign_unique_identifier(&mut self, id: Value) -> Result<()> {
        let name = self.schema.unique_identifier.clone();
        let Some(column) = self.schema.get_column(&name) else {
            return Err(err!("model `{}` has no unique identifier", self.schema.name));
        };
        let id = column.coerce(id)?;
        self.values.insert(name, id);
        Ok(())
    }

    pub(crate) fn mark_saved(&mut self) {
        self.changes.clear();
        self.new = false;
    }

    pub(crate) fn set_extras(&mut self, extras: Row) {
        self.extras = extras;
    }

    pub(crate) fn set_extra(&mut self, name: &str, value: Value) {
        self.extras.insert(name.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use stem_core::schema::{Column, ColumnType};

    fn contact() -> Arc<ModelSchema> {
        Arc::new(
            ModelSchema::new("Contact", "tblContact")
                .auto_increment("ContactID")
                .column(Column::new("Forename", ColumnType::String))
                .column(Column::new("DateOfBirth", ColumnType::Date))
                .column(Column::new("Active", ColumnType::Boolean).default_value(true)),
        )
    }

    #[test]
    fn new_models_start_with_defaults() {
        let model = Model::new(contact());

        assert!(model.is_new());
        assert!(!model.has_changes());
        assert_eq!(model.get("Active"), &Value::Bool(true));
        assert_eq!(model.unique_identifier(), &Value::Null);
    }

    #[test]
    fn set_records_changes_and_coerces() {
        let mut model = Model::new(contact());

        model.set("DateOfBirth", "1990-02-03").unwrap();
        model.set("Active", true).unwrap();

        assert_eq!(
            model.get("DateOfBirth"),
            &Value::Date(NaiveDate::from_ymd_opt(1990, 2, 3).unwrap())
        );
        assert_eq!(model.changes().collect::<Vec<_>>(), ["DateOfBirth"]);
        assert!(model.set("Nope", 1).is_err());
    }

    #[test]
    fn unique_identifier_is_immutable_once_assigned() {
        let mut model = Model::new(contact());
        model.set("ContactID", 4).unwrap();
        model.set("ContactID", "4").unwrap();

        assert!(model.set("ContactID", 5).is_err());
        assert_eq!(model.unique_identifier(), &Value::I64(4));
    }

    #[test]
    fn hydration_applies_storage_transforms() {
        let mut row = Row::new();
        row.insert("ContactID".into(), Value::I64(1));
        row.insert("Forename".into(), Value::from("John"));
        row.insert("DateOfBirth".into(), Value::from("1980-01-01"));
        row.insert("Active".into(), Value::I64(0));

        let model = Model::from_storage(contact(), &row).unwrap();

        assert!(!model.is_new());
        assert_eq!(model.get("Active"), &Value::Bool(false));
        assert_eq!(
            model.storage_row(["DateOfBirth", "Active"]).unwrap(),
            Row::from_iter([
                ("DateOfBirth".to_string(), Value::from("1980-01-01")),
                ("Active".to_string(), Value::I64(0)),
            ])
        );
    }
}
