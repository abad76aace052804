use crate::{err, Result};
use std::borrow::Cow;
use stem_core::driver::{Dialect, Driver};
pub use stem_core::driver::{Connection, Operation, Response};
use url::Url;

/// A driver picked from the scheme of a connection URL.
#[derive(Debug)]
pub struct Connect {
    url: Url,
    driver: Box<dyn Driver>,
}

impl Connect {
    pub fn new(url: &str) -> Result<Self> {
        let parsed =
            Url::parse(url).map_err(|e| err!("invalid connection URL; url={url}; {e}"))?;

        let driver = match parsed.scheme() {
            "sqlite" => connect_sqlite(&parsed)?,
            "mysql" => {
                return Err(err!(
                    "no MySQL driver is bundled; build the `Db` with a driver instead; url={url}"
                ))
            }
            scheme => {
                return Err(err!(
                    "unsupported database; scheme={scheme}; url={url}"
                ))
            }
        };

        Ok(Self {
            url: parsed,
            driver,
        })
    }
}

impl Driver for Connect {
    fn url(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.url.as_str())
    }

    fn dialect(&self) -> Dialect {
        self.driver.dialect()
    }

    fn connect(&self) -> Result<Box<dyn Connection>> {
        self.driver.connect()
    }

    fn max_connections(&self) -> Option<usize> {
        self.driver.max_connections()
    }
}

#[cfg(feature = "sqlite")]
fn connect_sqlite(url: &Url) -> Result<Box<dyn Driver>> {
    Ok(Box::new(stem_driver_sqlite::Sqlite::new(url.as_str())?))
}

#[cfg(not(feature = "sqlite"))]
fn connect_sqlite(_url: &Url) -> Result<Box<dyn Driver>> {
    Err(err!("`sqlite` feature not enabled"))
}
