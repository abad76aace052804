use super::Error;
use crate::stmt::Value;

/// Error when fetching a model by unique identifier yields no row.
#[derive(Debug)]
pub(super) struct RecordNotFoundError {
    model: Box<str>,
    id: Box<str>,
}

impl std::error::Error for RecordNotFoundError {}

impl core::fmt::Display for RecordNotFoundError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "record not found: {} with id {}", self.model, self.id)
    }
}

impl Error {
    /// Creates a record not found error for the given model and identifier.
    pub fn record_not_found(model: impl Into<String>, id: &Value) -> Error {
        Error::from(super::ErrorKind::RecordNotFound(RecordNotFoundError {
            model: model.into().into(),
            id: id.to_string().into(),
        }))
    }

    /// Returns `true` if this error is a record not found error.
    pub fn is_record_not_found(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::RecordNotFound(_)))
    }
}
