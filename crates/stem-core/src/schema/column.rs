use crate::{
    stmt::{Value, DATE_FORMAT, DATE_TIME_FORMAT},
    Error, Result,
};
use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

/// A model column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// The name of the column in the database, also its property name.
    pub name: String,

    pub ty: ColumnType,

    /// Value given to the column when an insert leaves it unset.
    pub default: Value,
}

/// The column type, from the engine's point of view.
///
/// Each type knows how to coerce an assigned value and how to move it to
/// and from the storage representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Integer whose value is assigned by the backend on insert
    AutoIncrement,
    Integer,
    Float,
    String,
    /// Stored as `0` / `1`
    Boolean,
    /// Stored as `YYYY-MM-DD`
    Date,
    /// Stored as `YYYY-MM-DD HH:MM:SS`
    DateTime,
    /// Stored as its hyphenated text form; new models get a v4 identifier
    Uuid,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Column {
        Column {
            name: name.into(),
            ty,
            default: Value::Null,
        }
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Column {
        self.default = value.into();
        self
    }

    /// Value a freshly created model starts with.
    pub fn initial_value(&self) -> Value {
        match self.ty {
            ColumnType::Uuid if self.default.is_null() => Value::Uuid(Uuid::new_v4()),
            _ => self.default.clone(),
        }
    }

    /// Converts `value` into the column's in-memory representation.
    pub fn coerce(&self, value: Value) -> Result<Value> {
        self.ty.coerce(value)
    }

    /// Converts an in-memory value into its storage representation.
    pub fn to_storage(&self, value: &Value) -> Result<Value> {
        self.ty.to_storage(value)
    }

    /// Converts a storage value back into its in-memory representation.
    pub fn from_storage(&self, value: &Value) -> Result<Value> {
        self.ty.coerce(value.clone())
    }
}

impl ColumnType {
    pub fn is_auto_increment(self) -> bool {
        matches!(self, ColumnType::AutoIncrement)
    }

    pub fn coerce(self, value: Value) -> Result<Value> {
        if value.is_null() {
            return Ok(value);
        }

        match self {
            ColumnType::AutoIncrement | ColumnType::Integer => match value {
                Value::I64(_) => Ok(value),
                other => other
                    .to_i64()
                    .map(Value::I64)
                    .ok_or_else(|| Error::type_conversion(other, "Integer")),
            },
            ColumnType::Float => match value {
                Value::F64(_) => Ok(value),
                other => other
                    .to_f64()
                    .map(Value::F64)
                    .ok_or_else(|| Error::type_conversion(other, "Float")),
            },
            ColumnType::String => match value {
                Value::String(_) => Ok(value),
                other => Ok(Value::String(other.to_string())),
            },
            ColumnType::Boolean => match value {
                Value::Bool(_) => Ok(value),
                Value::String(ref v) if v.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
                Value::String(ref v) if v.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
                other => Ok(Value::Bool(other.is_truthy())),
            },
            ColumnType::Date => match value {
                Value::Date(_) => Ok(value),
                Value::DateTime(v) => Ok(Value::Date(v.date())),
                Value::String(v) => {
                    let date = match NaiveDate::parse_from_str(&v, DATE_FORMAT) {
                        Ok(date) => date,
                        Err(_) => NaiveDateTime::parse_from_str(&v, DATE_TIME_FORMAT)?.date(),
                    };
                    Ok(Value::Date(date))
                }
                other => Err(Error::type_conversion(other, "Date")),
            },
            ColumnType::DateTime => match value {
                Value::DateTime(_) => Ok(value),
                Value::Date(v) => Ok(Value::DateTime(v.and_time(chrono::NaiveTime::MIN))),
                Value::String(v) => {
                    let date_time = match NaiveDateTime::parse_from_str(&v, DATE_TIME_FORMAT) {
                        Ok(date_time) => date_time,
                        Err(_) => NaiveDate::parse_from_str(&v, DATE_FORMAT)?
                            .and_time(chrono::NaiveTime::MIN),
                    };
                    Ok(Value::DateTime(date_time))
                }
                other => Err(Error::type_conversion(other, "DateTime")),
            },
            ColumnType::Uuid => match value {
                Value::Uuid(_) => Ok(value),
                Value::String(v) => Ok(Value::Uuid(v.parse::<Uuid>()?)),
                other => Err(Error::type_conversion(other, "Uuid")),
            },
        }
    }

    pub fn to_storage(self, value: &Value) -> Result<Value> {
        let value = self.coerce(value.clone())?;

        Ok(match value {
            Value::Bool(v) => Value::I64(v as i64),
            Value::Date(_) | Value::DateTime(_) | Value::Uuid(_) => {
                Value::String(value.to_string())
            }
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn date_time_round_trips_through_storage() {
        let column = Column::new("CreatedAt", ColumnType::DateTime);
        let value = column.coerce(Value::from("2024-05-06 07:08:09")).unwrap();

        let stored = column.to_storage(&value).unwrap();
        assert_eq!(stored, Value::from("2024-05-06 07:08:09"));
        assert_eq!(column.from_storage(&stored).unwrap(), value);
    }

    #[test]
    fn booleans_are_stored_as_integers() {
        let column = Column::new("Active", ColumnType::Boolean);

        assert_eq!(column.to_storage(&Value::Bool(true)).unwrap(), Value::I64(1));
        assert_eq!(column.from_storage(&Value::I64(0)).unwrap(), Value::Bool(false));
    }

    #[test]
    fn integers_reject_text() {
        let column = Column::new("Wage", ColumnType::Integer);

        assert_eq!(column.coerce(Value::from("12")).unwrap(), Value::I64(12));
        assert!(column.coerce(Value::from("twelve")).unwrap_err().is_type_conversion());
    }

    #[test]
    fn uuid_columns_initialise_new_identifiers() {
        let column = Column::new("Token", ColumnType::Uuid);

        let a = column.initial_value();
        let b = column.initial_value();
        assert!(matches!(a, Value::Uuid(_)));
        assert_ne!(a, b);
    }
}
