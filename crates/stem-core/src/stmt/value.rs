use chrono::{NaiveDate, NaiveDateTime};
use std::cmp::Ordering;
use uuid::Uuid;

/// Storage format for date-time columns.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Storage format for date columns.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Default, Clone, PartialEq)]
pub enum Value {
    /// Null value
    #[default]
    Null,

    /// Boolean value
    Bool(bool),

    /// Signed 64-bit integer
    I64(i64),

    /// 64-bit float
    F64(f64),

    /// String value
    String(String),

    /// Calendar date without a time zone
    Date(NaiveDate),

    /// Date and time without a time zone
    DateTime(NaiveDateTime),

    /// A universally unique identifier
    Uuid(Uuid),
}

impl Value {
    pub const fn null() -> Self {
        Self::Null
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::I64(_) | Self::F64(_))
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::I64(_) => "I64",
            Value::F64(_) => "F64",
            Value::String(_) => "String",
            Value::Date(_) => "Date",
            Value::DateTime(_) => "DateTime",
            Value::Uuid(_) => "Uuid",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            Value::Bool(v) => Some(*v as i64),
            Value::F64(v) if v.fract() == 0.0 => Some(*v as i64),
            Value::String(v) => v.trim().parse().ok(),
            _ => None,
        }
    }

    /// Numeric reading of the value. Strings are parsed.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::I64(v) => Some(*v as f64),
            Value::F64(v) => Some(*v),
            Value::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            Value::String(v) => v.trim().parse().ok(),
            _ => None,
        }
    }

    /// Truthiness used by in-memory evaluation of boolean columns.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(v) => *v,
            Value::I64(v) => *v != 0,
            Value::F64(v) => *v != 0.0,
            Value::String(v) => !v.is_empty() && v != "0",
            _ => true,
        }
    }

    /// Equality as seen by in-memory filters.
    ///
    /// Numbers compare numerically across `I64` and `F64`, numeric strings
    /// equal the number they spell, and booleans equal `0` / `1`.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            _ => self.loose_cmp(other) == Ordering::Equal,
        }
    }

    /// Total ordering used by in-memory sorts and range filters.
    ///
    /// `Null` sorts before every other value.
    pub fn loose_cmp(&self, other: &Value) -> Ordering {
        use Value::*;

        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Null, _) => Ordering::Less,
            (_, Null) => Ordering::Greater,
            (I64(a), I64(b)) => a.cmp(b),
            (Bool(a), Bool(b)) => a.cmp(b),
            (String(a), String(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            (DateTime(a), DateTime(b)) => a.cmp(b),
            (Date(a), DateTime(b)) => a.and_time(chrono::NaiveTime::MIN).cmp(b),
            (DateTime(a), Date(b)) => a.cmp(&b.and_time(chrono::NaiveTime::MIN)),
            (Uuid(a), Uuid(b)) => a.cmp(b),
            _ if self.is_numeric() || other.is_numeric() || self.is_bool() || other.is_bool() => {
                match (self.to_f64(), other.to_f64()) {
                    (Some(a), Some(b)) => a.total_cmp(&b),
                    _ => self.to_string().cmp(&other.to_string()),
                }
            }
            _ => self.to_string().cmp(&other.to_string()),
        }
    }

    fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }
}

impl core::fmt::Display for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{}", *v as i64),
            Value::I64(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
            Value::Date(v) => write!(f, "{}", v.format(DATE_FORMAT)),
            Value::DateTime(v) => write!(f, "{}", v.format(DATE_TIME_FORMAT)),
            Value::Uuid(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(src: bool) -> Self {
        Self::Bool(src)
    }
}

impl From<i64> for Value {
    fn from(src: i64) -> Self {
        Self::I64(src)
    }
}

impl From<i32> for Value {
    fn from(src: i32) -> Self {
        Self::I64(src as i64)
    }
}

impl From<usize> for Value {
    fn from(src: usize) -> Self {
        Self::I64(src as i64)
    }
}

impl From<f64> for Value {
    fn from(src: f64) -> Self {
        Self::F64(src)
    }
}

impl From<String> for Value {
    fn from(src: String) -> Self {
        Self::String(src)
    }
}

impl From<&String> for Value {
    fn from(src: &String) -> Self {
        Self::String(src.clone())
    }
}

impl From<&str> for Value {
    fn from(src: &str) -> Self {
        Self::String(src.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(src: NaiveDate) -> Self {
        Self::Date(src)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(src: NaiveDateTime) -> Self {
        Self::DateTime(src)
    }
}

impl From<Uuid> for Value {
    fn from(src: Uuid) -> Self {
        Self::Uuid(src)
    }
}

impl<T> From<Option<T>> for Value
where
    Value: From<T>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Value::from(value),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sorts_first() {
        assert_eq!(Value::Null.loose_cmp(&Value::I64(-5)), Ordering::Less);
        assert_eq!(Value::from("a").loose_cmp(&Value::Null), Ordering::Greater);
        assert!(Value::Null.loose_eq(&Value::Null));
        assert!(!Value::Null.loose_eq(&Value::from("")));
    }

    #[test]
    fn numbers_compare_across_types() {
        assert!(Value::I64(2).loose_eq(&Value::F64(2.0)));
        assert!(Value::I64(2).loose_eq(&Value::from("2")));
        assert!(Value::from("10").loose_eq(&Value::I64(10)));
        assert_eq!(Value::I64(9).loose_cmp(&Value::from("10")), Ordering::Less);
        assert!(Value::Bool(true).loose_eq(&Value::I64(1)));
    }

    #[test]
    fn strings_compare_bytewise() {
        assert_eq!(Value::from("10").loose_cmp(&Value::from("9")), Ordering::Less);
        assert!(!Value::from("John").loose_eq(&Value::from("john")));
    }

    #[test]
    fn dates_compare_with_date_times() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let later = date.and_hms_opt(10, 0, 0).unwrap();

        assert_eq!(Value::Date(date).loose_cmp(&Value::DateTime(later)), Ordering::Less);
        assert_eq!(Value::DateTime(later).to_string(), "2024-03-01 10:00:00");
    }
}
