use super::Error;

#[derive(Debug)]
pub(super) struct SortNotValidError {
    path: Box<str>,
}

impl std::error::Error for SortNotValidError {}

impl core::fmt::Display for SortNotValidError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "sort not valid: the column path `{}` cannot be resolved",
            self.path
        )
    }
}

impl Error {
    /// Creates an error for a sort whose column path does not resolve.
    pub fn sort_not_valid(path: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::SortNotValid(SortNotValidError {
            path: path.into().into(),
        }))
    }

    /// Returns `true` if this error is a sort not valid error.
    pub fn is_sort_not_valid(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::SortNotValid(_)))
    }
}
