// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Dispatcher configuration.

use crate::error::ConfigError;

/// Queue capacity used when nothing else is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Prefix for task thread names (`<prefix>-task-N`).
pub const DEFAULT_THREAD_PREFIX: &str = "strand";

pub const ENV_QUEUE_CAPACITY: &str = "STRAND_QUEUE_CAPACITY";
pub const ENV_THREAD_PREFIX: &str = "STRAND_THREAD_PREFIX";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorConfig {
    /// Maximum queued messages before `enqueue` blocks.
    pub capacity: usize,
    pub thread_prefix: String,
}

impl ActorConfig {
    pub fn new() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            thread_prefix: DEFAULT_THREAD_PREFIX.to_string(),
        }
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn thread_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_prefix = prefix.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::InvalidCapacity(self.capacity));
        }
        if self.thread_prefix.is_empty() {
            return Err(ConfigError::EmptyThreadPrefix);
        }
        Ok(())
    }

    /// Defaults overridden by `STRAND_QUEUE_CAPACITY` / `STRAND_THREAD_PREFIX`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();
        if let Some(raw) = lookup(ENV_QUEUE_CAPACITY) {
            config.capacity = raw.trim().parse().map_err(|_| ConfigError::Parse {
                key: ENV_QUEUE_CAPACITY,
                value: raw.clone(),
            })?;
        }
        if let Some(prefix) = lookup(ENV_THREAD_PREFIX) {
            config.thread_prefix = prefix;
        }
        config.validate()?;
        Ok(config)
    }
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self::new()
    }
}
