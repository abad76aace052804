use super::Error;

/// Error when a backend connection cannot be established.
#[derive(Debug)]
pub(super) struct RepositoryConnectionError {
    backend: Box<str>,
    inner: Box<dyn std::error::Error + Send + Sync>,
}

impl std::error::Error for RepositoryConnectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.inner.as_ref())
    }
}

impl core::fmt::Display for RepositoryConnectionError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "could not connect to {}: {}", self.backend, self.inner)?;
        let mut source = self.inner.source();
        while let Some(err) = source {
            write!(f, ": {}", err)?;
            source = err.source();
        }
        Ok(())
    }
}

impl Error {
    /// Creates an error for a failed connection attempt against `backend`.
    pub fn repository_connection(
        backend: impl Into<String>,
        err: impl std::error::Error + Send + Sync + 'static,
    ) -> Error {
        Error::from(super::ErrorKind::RepositoryConnection(
            RepositoryConnectionError {
                backend: backend.into().into(),
                inner: Box::new(err),
            },
        ))
    }

    /// Returns `true` if this error is a connection failure.
    pub fn is_repository_connection(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::RepositoryConnection(_)))
    }
}
