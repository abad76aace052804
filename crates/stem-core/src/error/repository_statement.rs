use super::Error;

/// Error when the backend rejects or fails to execute a statement.
///
/// Carries the rendered statement text so the failing query can be logged.
#[derive(Debug)]
pub(super) struct RepositoryStatementError {
    statement: Box<str>,
    inner: Box<dyn std::error::Error + Send + Sync>,
}

impl std::error::Error for RepositoryStatementError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.inner.as_ref())
    }
}

impl core::fmt::Display for RepositoryStatementError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "statement failed: {}: {}", self.statement, self.inner)
    }
}

impl Error {
    /// Creates an error for a statement the backend failed to execute.
    pub fn repository_statement(
        statement: impl Into<String>,
        err: impl std::error::Error + Send + Sync + 'static,
    ) -> Error {
        Error::from(super::ErrorKind::RepositoryStatement(
            RepositoryStatementError {
                statement: statement.into().into(),
                inner: Box::new(err),
            },
        ))
    }

    /// Returns `true` if this error is a statement failure.
    pub fn is_repository_statement(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::RepositoryStatement(_)))
    }
}
