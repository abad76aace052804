mod adhoc;
mod batch_update_not_possible;
mod connection_pool;
mod invalid_schema;
mod record_not_found;
mod repository_connection;
mod repository_statement;
mod sort_not_valid;
mod type_conversion;

use adhoc::AdhocError;
use batch_update_not_possible::BatchUpdateNotPossibleError;
use connection_pool::ConnectionPoolError;
use invalid_schema::InvalidSchemaError;
use record_not_found::RecordNotFoundError;
use repository_connection::RepositoryConnectionError;
use repository_statement::RepositoryStatementError;
use sort_not_valid::SortNotValidError;
use std::sync::Arc;
use type_conversion::TypeConversionError;

/// Returns early with an ad-hoc error built from a format string.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::from_args(format_args!($($arg)*)))
    };
}

/// Builds an ad-hoc error from a format string.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        $crate::Error::from_args(format_args!($($arg)*))
    };
}

/// An error raised by the query engine or one of its backends.
///
/// Errors are cheap to clone and carry an optional cause chain. Translation
/// failures (a filter or aggregate a backend cannot express) are never
/// reported through this type; they are ordinary `false` / `None` results.
#[derive(Clone)]
pub struct Error {
    inner: Option<Arc<ErrorInner>>,
}

#[derive(Debug)]
struct ErrorInner {
    kind: ErrorKind,
    cause: Option<Error>,
}

impl Error {
    /// Wraps this error in `consequent`, which becomes the outermost message.
    ///
    /// `Display` walks the chain outside in, so the root cause is printed
    /// last.
    #[inline(always)]
    pub fn context(self, consequent: impl IntoError) -> Error {
        self.context_impl(consequent.into_error())
    }

    #[inline(never)]
    #[cold]
    fn context_impl(self, consequent: Error) -> Error {
        let kind = match consequent.inner {
            Some(inner) => match Arc::try_unwrap(inner) {
                Ok(inner) => {
                    debug_assert!(inner.cause.is_none(), "context already has a cause");
                    inner.kind
                }
                Err(shared) => ErrorKind::Adhoc(AdhocError::new(shared.kind.to_string())),
            },
            None => ErrorKind::Unknown,
        };

        Error {
            inner: Some(Arc::new(ErrorInner {
                kind,
                cause: Some(self),
            })),
        }
    }

    fn chain(&self) -> impl Iterator<Item = &Error> {
        let mut err = self;
        core::iter::once(err).chain(core::iter::from_fn(move || {
            err = err.inner.as_ref().and_then(|inner| inner.cause.as_ref())?;
            Some(err)
        }))
    }

    fn kind(&self) -> &ErrorKind {
        self.inner
            .as_ref()
            .map(|inner| &inner.kind)
            .unwrap_or(&ErrorKind::Unknown)
    }

    /// Matches `f` against this error and every cause beneath it.
    fn any_kind(&self, f: impl Fn(&ErrorKind) -> bool) -> bool {
        self.chain().any(|err| f(err.kind()))
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.kind() {
            ErrorKind::RepositoryConnection(err) => Some(err),
            ErrorKind::RepositoryStatement(err) => Some(err),
            ErrorKind::ConnectionPool(err) => Some(err),
            ErrorKind::Anyhow(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        for (depth, err) in self.chain().enumerate() {
            if depth > 0 {
                f.write_str(": ")?;
            }
            core::fmt::Display::fmt(err.kind(), f)?;
        }
        Ok(())
    }
}

impl core::fmt::Debug for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match &self.inner {
            Some(inner) if f.alternate() => f
                .debug_struct("Error")
                .field("kind", &inner.kind)
                .field("cause", &inner.cause)
                .finish(),
            _ => core::fmt::Display::fmt(self, f),
        }
    }
}

#[derive(Debug)]
enum ErrorKind {
    Anyhow(anyhow::Error),
    Adhoc(AdhocError),
    BatchUpdateNotPossible(BatchUpdateNotPossibleError),
    ConnectionPool(ConnectionPoolError),
    InvalidSchema(InvalidSchemaError),
    RecordNotFound(RecordNotFoundError),
    RepositoryConnection(RepositoryConnectionError),
    RepositoryStatement(RepositoryStatementError),
    SortNotValid(SortNotValidError),
    TypeConversion(TypeConversionError),
    Unknown,
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        use self::ErrorKind::*;

        match self {
            Anyhow(err) => core::fmt::Display::fmt(err, f),
            Adhoc(err) => core::fmt::Display::fmt(err, f),
            BatchUpdateNotPossible(err) => core::fmt::Display::fmt(err, f),
            ConnectionPool(err) => core::fmt::Display::fmt(err, f),
            InvalidSchema(err) => core::fmt::Display::fmt(err, f),
            RecordNotFound(err) => core::fmt::Display::fmt(err, f),
            RepositoryConnection(err) => core::fmt::Display::fmt(err, f),
            RepositoryStatement(err) => core::fmt::Display::fmt(err, f),
            SortNotValid(err) => core::fmt::Display::fmt(err, f),
            TypeConversion(err) => core::fmt::Display::fmt(err, f),
            Unknown => f.write_str("unknown stem error"),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {
            inner: Some(Arc::new(ErrorInner { kind, cause: None })),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Error {
        Error::from(ErrorKind::Anyhow(err))
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Error {
        Error::from(anyhow::Error::from(err))
    }
}

impl From<uuid::Error> for Error {
    fn from(err: uuid::Error) -> Error {
        Error::from(anyhow::Error::from(err))
    }
}

impl From<chrono::ParseError> for Error {
    fn from(err: chrono::ParseError) -> Error {
        Error::from(anyhow::Error::from(err))
    }
}

/// Anything usable as the context of an [`Error`].
pub trait IntoError {
    fn into_error(self) -> Error;
}

impl IntoError for Error {
    #[inline(always)]
    fn into_error(self) -> Error {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stmt::Value;

    #[test]
    fn errors_are_pointer_sized() {
        assert_eq!(std::mem::size_of::<Error>(), std::mem::size_of::<usize>());
    }

    #[test]
    fn context_is_printed_outside_in() {
        let err = err!("no such table: tblContact")
            .context(err!("fetching `Contact` 4"))
            .context(err!("Collection::models"));

        assert_eq!(
            err.to_string(),
            "Collection::models: fetching `Contact` 4: no such table: tblContact"
        );
    }

    #[test]
    fn anyhow_errors_convert() {
        let err: Error = anyhow::anyhow!("disk full").into();
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn record_not_found_names_model_and_id() {
        let err = Error::record_not_found("Company", &Value::I64(12));
        assert_eq!(err.to_string(), "record not found: Company with id 12");
        assert!(err.is_record_not_found());
    }

    #[test]
    fn kind_predicates_see_through_context() {
        let err = Error::batch_update_not_possible().context(err!("Collection::batch_update"));

        assert!(err.is_batch_update_not_possible());
        assert_eq!(
            err.to_string(),
            "Collection::batch_update: batch update not possible"
        );
    }

    #[test]
    fn sort_not_valid_names_the_path() {
        let err = Error::sort_not_valid("Company.Nope");
        assert_eq!(
            err.to_string(),
            "sort not valid: the column path `Company.Nope` cannot be resolved"
        );
        assert!(err.is_sort_not_valid());
        assert!(!err.is_record_not_found());
    }

    #[test]
    fn statement_error_keeps_statement_text() {
        let io = std::io::Error::other("near \"BOSELECTA\": syntax error");
        let err = Error::repository_statement("BOSELECTA 5", io);

        assert!(err.is_repository_statement());
        assert_eq!(
            err.to_string(),
            "statement failed: BOSELECTA 5: near \"BOSELECTA\": syntax error"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn connection_error_names_backend() {
        let io = std::io::Error::other("access denied");
        let err = Error::repository_connection("MySql", io);

        assert!(err.is_repository_connection());
        assert_eq!(
            err.to_string(),
            "could not connect to MySql: access denied"
        );
    }

    #[test]
    fn type_conversion_error() {
        let err = Error::type_conversion(Value::from("abc"), "DateTime");
        assert_eq!(err.to_string(), "cannot convert String to DateTime");
    }
}
