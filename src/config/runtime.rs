//! Pool and tick-loop configuration structures.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::error::CoreError;

/// Per-pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Objects constructed up front.
    #[serde(default)]
    pub prealloc: usize,
    /// Ceiling on idle instances retained by the pool.
    pub max_idle: usize,
}

/// Root runtime configuration for one server process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Main-loop tick interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Map of pool name to settings.
    pub pools: HashMap<String, PoolSettings>,
}

impl PoolSettings {
    /// Validates pool settings values.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_idle == 0 {
            return Err(CoreError::Config("max_idle must be greater than 0".into()));
        }
        if self.prealloc > self.max_idle {
            return Err(CoreError::Config(format!(
                "prealloc {} exceeds max_idle {}",
                self.prealloc, self.max_idle
            )));
        }
        Ok(())
    }
}

impl RuntimeConfig {
    /// Validates the tick interval and every pool.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.tick_interval_ms == 0 {
            return Err(CoreError::Config(
                "tick_interval_ms must be greater than 0".into(),
            ));
        }
        for (name, pool) in &self.pools {
            pool.validate()
                .map_err(|e| CoreError::Config(format!("pool `{name}` invalid: {e}")))?;
        }
        Ok(())
    }

    /// Parses runtime configuration from a JSON string and validates it.
    pub fn from_json_str(input: &str) -> Result<Self, CoreError> {
        let cfg: RuntimeConfig = serde_json::from_str(input)
            .map_err(|e| CoreError::Config(format!("parse error: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_config_parses() {
        let cfg = RuntimeConfig::from_json_str(
            r#"{
                "tick_interval_ms": 100,
                "pools": {
                    "messages": { "prealloc": 16, "max_idle": 256 },
                    "streams": { "max_idle": 64 }
                }
            }"#,
        )
        .expect("config should parse");
        assert_eq!(cfg.tick_interval_ms, 100);
        assert_eq!(cfg.pools["streams"].prealloc, 0);
    }

    #[test]
    fn zero_tick_interval_is_rejected() {
        let err = RuntimeConfig::from_json_str(r#"{ "tick_interval_ms": 0, "pools": {} }"#)
            .expect_err("should fail validation");
        assert!(err.to_string().contains("tick_interval_ms"));
    }

    #[test]
    fn prealloc_above_ceiling_is_rejected() {
        let cfg = PoolSettings {
            prealloc: 10,
            max_idle: 4,
        };
        assert!(cfg.validate().is_err());
    }
}
