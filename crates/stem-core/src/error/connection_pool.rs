use super::{Error, ErrorKind};

/// A connection could not be checked out of a pool.
#[derive(Debug)]
pub(super) struct ConnectionPoolError {
    cause: Box<dyn std::error::Error + Send + Sync>,
}

impl std::error::Error for ConnectionPoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.cause.as_ref())
    }
}

impl core::fmt::Display for ConnectionPoolError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "connection pool: {}", self.cause)
    }
}

impl Error {
    pub fn connection_pool(cause: impl std::error::Error + Send + Sync + 'static) -> Error {
        Error::from(ErrorKind::ConnectionPool(ConnectionPoolError {
            cause: Box::new(cause),
        }))
    }

    pub fn is_connection_pool(&self) -> bool {
        self.any_kind(|kind| matches!(kind, ErrorKind::ConnectionPool(_)))
    }
}
