use serde::{Deserialize, Serialize};

use crate::{ExecutorError, ExecutorResult};

/// Configuration for a task pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of items processed at the same time
    pub concurrency: usize,
    /// Optional label attached to log records
    pub name: Option<String>,
    /// Buffer size of the event broadcast channel
    pub event_capacity: usize,
}

impl PoolConfig {
    pub const DEFAULT_CONCURRENCY: usize = 10;

    /// Check the values that cannot be enforced by the type system
    pub fn validate(&self) -> ExecutorResult<()> {
        if self.concurrency < 1 {
            return Err(ExecutorError::InvalidConcurrency(self.concurrency));
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            concurrency: Self::DEFAULT_CONCURRENCY,
            name: None,
            event_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.concurrency, 10);
        assert!(config.name.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = PoolConfig { concurrency: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(ExecutorError::InvalidConcurrency(0))));
    }

    #[test]
    fn test_partial_config_from_json() {
        let config: PoolConfig = serde_json::from_str(r#"{ "concurrency": 3 }"#).unwrap();
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.event_capacity, 1024);

        let config: PoolConfig = serde_json::from_str(r#"{ "name": "thumbnails" }"#).unwrap();
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.name.as_deref(), Some("thumbnails"));
    }
}
