use super::Error;

/// Error when a collection's updates cannot be committed as one backend
/// statement.
#[derive(Debug)]
pub(super) struct BatchUpdateNotPossibleError;

impl std::error::Error for BatchUpdateNotPossibleError {}

impl core::fmt::Display for BatchUpdateNotPossibleError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str("batch update not possible")
    }
}

impl Error {
    /// Creates a batch update not possible error.
    ///
    /// Raised when the collection's filter is not completely translatable or
    /// the collection needs joins, intersections or a range.
    pub fn batch_update_not_possible() -> Error {
        Error::from(super::ErrorKind::BatchUpdateNotPossible(
            BatchUpdateNotPossibleError,
        ))
    }

    /// Returns `true` if this error is a batch update not possible error.
    pub fn is_batch_update_not_possible(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::BatchUpdateNotPossible(_)))
    }
}
