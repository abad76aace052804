use super::{Connect, ConnectionSettings, Db, Pool, PoolConfig, PoolRegistry};
use crate::{err, Result, Schema};
use std::sync::Arc;
use stem_core::driver::Driver;

#[derive(Debug, Default)]
pub struct Builder {
    schema: Option<Schema>,

    pool_config: PoolConfig,

    /// Registry to look pools up in, when pools are shared between handles
    registry: Option<PoolRegistry>,
}

impl Builder {
    pub fn schema(&mut self, schema: Schema) -> &mut Self {
        self.schema = Some(schema);
        self
    }

    pub fn pool_config(&mut self, config: PoolConfig) -> &mut Self {
        self.pool_config = config;
        self
    }

    /// Shares connection pools through `registry`.
    pub fn pools(&mut self, registry: &PoolRegistry) -> &mut Self {
        self.registry = Some(registry.clone());
        self
    }

    pub fn connect(&mut self, url: &str) -> Result<Db> {
        let schema = self.take_schema()?;
        let config = self.pool_config.clone();

        let pool = match &self.registry {
            Some(registry) => {
                let settings = ConnectionSettings::from_url(url)?;
                registry.get_or_create(&settings, || Pool::new(Connect::new(url)?, config))?
            }
            None => Arc::new(Pool::new(Connect::new(url)?, config)?),
        };

        Ok(Db::new(schema, Some(pool)))
    }

    pub fn build(&mut self, driver: impl Driver) -> Result<Db> {
        let schema = self.take_schema()?;
        let pool = Pool::new(driver, self.pool_config.clone())?;
        Ok(Db::new(schema, Some(Arc::new(pool))))
    }

    /// Builds a handle whose repositories keep their data in memory and
    /// translate nothing.
    pub fn offline(&mut self) -> Result<Db> {
        let schema = self.take_schema()?;
        Ok(Db::new(schema, None))
    }

    fn take_schema(&mut self) -> Result<Schema> {
        self.schema
            .take()
            .ok_or_else(|| err!("no schema given to the `Db` builder"))
    }
}
