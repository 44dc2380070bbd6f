//! Construct named object pools from runtime configuration.

use std::collections::HashMap;

use crate::config::{PoolSettings, RuntimeConfig};
use crate::core::error::CoreError;
use crate::core::pool::{ObjectPool, Poolable};

/// Builds one [`ObjectPool`] per configured pool using a caller-supplied
/// factory factory: `factory(name, settings)` produces the constructor for
/// that pool's objects.
pub fn build_pools<T, F>(
    cfg: &RuntimeConfig,
    mut factory: F,
) -> Result<HashMap<String, ObjectPool<T>>, CoreError>
where
    T: Poolable + 'static,
    F: FnMut(&str, &PoolSettings) -> Result<Box<dyn Fn() -> T + Send + Sync>, CoreError>,
{
    cfg.validate()?;

    let mut pools = HashMap::new();
    for (name, settings) in &cfg.pools {
        let make = factory(name, settings)?;
        let pool = ObjectPool::with_config(name.clone(), settings.prealloc, settings.max_idle, make);
        pools.insert(name.clone(), pool);
    }
    Ok(pools)
}
