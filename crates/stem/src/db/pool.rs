//! Connection pooling for database connections.

use super::{Connect, ConnectionSettings};
use crate::{Error, Result};
use serde::Deserialize;
use std::{
    collections::HashMap,
    fmt,
    ops::{Deref, DerefMut},
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use stem_core::{
    driver::{Dialect, Driver},
    Connection,
};

/// Get the default maximum size of a pool, which is `cpu_core_count * 2`
/// including logical cores (Hyper-Threading).
fn get_default_pool_max_size() -> usize {
    std::thread::available_parallelism()
        .map(|cores| cores.get() * 2)
        .unwrap_or(4)
}

/// Configuration for connection pool behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_size: usize,

    /// How long a checkout waits for a connection to be returned before
    /// failing.
    pub checkout_timeout: Duration,
}

impl PoolConfig {
    /// Creates a new pool configuration with default settings.
    pub fn new() -> Self {
        Self {
            max_size: get_default_pool_max_size(),
            checkout_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Opens pooled connections through a [`Driver`].
#[derive(Debug)]
struct Manager {
    driver: Box<dyn Driver>,
}

impl r2d2::ManageConnection for Manager {
    type Connection = Box<dyn Connection>;
    type Error = Error;

    fn connect(&self) -> Result<Box<dyn Connection>> {
        self.driver.connect()
    }

    fn is_valid(&self, _connection: &mut Box<dyn Connection>) -> Result<()> {
        Ok(())
    }

    fn has_broken(&self, _connection: &mut Box<dyn Connection>) -> bool {
        false
    }
}

/// A connection pool that manages database connections.
pub struct Pool {
    inner: r2d2::Pool<Manager>,
    dialect: Dialect,
    url: String,
}

impl Pool {
    /// Creates a new connection pool from the given driver.
    ///
    /// One connection is opened eagerly so that bad settings are reported
    /// here rather than on first use. Idle connections are never closed: an
    /// in-memory database lives only as long as its connection.
    pub fn new(driver: impl Driver, config: PoolConfig) -> Result<Self> {
        let max_size = match driver.max_connections() {
            Some(max_connections) => max_connections.min(config.max_size),
            None => config.max_size,
        }
        .max(1);

        let dialect = driver.dialect();
        let url = driver.url().into_owned();

        let inner = r2d2::Pool::builder()
            .max_size(u32::try_from(max_size).unwrap_or(u32::MAX))
            .min_idle(Some(1))
            .idle_timeout(None)
            .max_lifetime(None)
            .test_on_check_out(false)
            .connection_timeout(config.checkout_timeout.max(Duration::from_millis(1)))
            .build(Manager {
                driver: Box::new(driver),
            })
            .map_err(Error::connection_pool)?;

        Ok(Self {
            inner,
            dialect,
            url,
        })
    }

    /// Creates a new connection pool from a connection URL.
    pub fn connect(url: &str, config: PoolConfig) -> Result<Self> {
        Self::new(Connect::new(url)?, config)
    }

    /// Retrieves a connection from the pool, waiting up to the checkout
    /// timeout for one to be returned.
    pub fn get(&self) -> Result<PoolConnection> {
        let inner = self.inner.get().map_err(Error::connection_pool)?;
        Ok(PoolConnection { inner })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn max_size(&self) -> usize {
        self.inner.max_size() as usize
    }

    /// Number of connections currently waiting in the pool.
    pub fn idle(&self) -> usize {
        self.inner.state().idle_connections as usize
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("url", &self.url)
            .field("dialect", &self.dialect)
            .field("max_size", &self.max_size())
            .finish()
    }
}

/// A connection retrieved from a pool.
///
/// When dropped, the connection is returned to the pool for reuse.
pub struct PoolConnection {
    inner: r2d2::PooledConnection<Manager>,
}

impl Deref for PoolConnection {
    type Target = Box<dyn Connection>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for PoolConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

/// Pools shared between several [`Db`](crate::Db) handles.
///
/// The registry is owned by the caller. Handles built against the same
/// registry with equivalent [`ConnectionSettings`] reuse one pool.
#[derive(Debug, Clone, Default)]
pub struct PoolRegistry {
    pools: Arc<Mutex<HashMap<u64, Arc<Pool>>>>,
}

impl PoolRegistry {
    pub fn new() -> PoolRegistry {
        PoolRegistry::default()
    }

    /// Returns the pool registered for `settings`, creating it with `create`
    /// if there is none yet.
    pub fn get_or_create(
        &self,
        settings: &ConnectionSettings,
        create: impl FnOnce() -> Result<Pool>,
    ) -> Result<Arc<Pool>> {
        let mut pools = self.pools.lock().unwrap_or_else(PoisonError::into_inner);
        let key = settings.hash_key();

        if let Some(pool) = pools.get(&key) {
            return Ok(pool.clone());
        }

        let pool = Arc::new(create()?);
        pools.insert(key, pool.clone());
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.pools
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
