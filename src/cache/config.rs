//! Cache configuration, derived from the `[cache]` settings section.

use std::{num::NonZeroUsize, path::PathBuf};

pub(crate) const DEFAULT_CACHE_DIRECTORY: &str = "/tmp/diagram-cache";
pub(crate) const DEFAULT_MEMORY_BUDGET_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Root of the persistent tier.
    pub directory: PathBuf,
    /// Upper bound on bytes held by the memory tier.
    pub memory_budget_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_CACHE_DIRECTORY),
            memory_budget_bytes: DEFAULT_MEMORY_BUDGET_BYTES,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            directory: settings.directory.clone(),
            memory_budget_bytes: settings.memory_budget_bytes.get(),
        }
    }
}

impl CacheConfig {
    /// Returns the memory budget as NonZeroUsize, clamping to 1 if zero.
    pub fn memory_budget_bytes_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.memory_budget_bytes).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert_eq!(config.directory, PathBuf::from("/tmp/diagram-cache"));
        assert_eq!(config.memory_budget_bytes, 64 * 1024 * 1024);
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            memory_budget_bytes: 0,
            ..Default::default()
        };
        assert_eq!(config.memory_budget_bytes_non_zero().get(), 1);
    }
}
