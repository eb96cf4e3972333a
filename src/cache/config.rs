//! Decision cache configuration.
//!
//! Controls the capacity of the visibility, filter and mute decision caches via `feedline.toml`.

use std::num::NonZeroUsize;

use serde::Deserialize;

pub const DEFAULT_VISIBILITY_LIMIT: usize = 20_000;
pub const DEFAULT_FILTER_LIMIT: usize = 10_000;
pub const DEFAULT_MUTE_LIMIT: usize = 10_000;

/// Decision cache configuration from `feedline.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum visibility decisions kept.
    pub visibility_limit: usize,
    /// Maximum per-(viewer, post) filter result sets kept.
    pub filter_limit: usize,
    /// Maximum per-(viewer, post) mute details kept.
    pub mute_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            visibility_limit: DEFAULT_VISIBILITY_LIMIT,
            filter_limit: DEFAULT_FILTER_LIMIT,
            mute_limit: DEFAULT_MUTE_LIMIT,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            visibility_limit: settings.visibility_limit,
            filter_limit: settings.filter_limit,
            mute_limit: settings.mute_limit,
        }
    }
}

impl CacheConfig {
    /// Returns the visibility limit as NonZeroUsize, clamping to 1 if zero.
    pub fn visibility_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.visibility_limit).unwrap_or(NonZeroUsize::MIN)
    }

    /// Returns the filter limit as NonZeroUsize, clamping to 1 if zero.
    pub fn filter_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.filter_limit).unwrap_or(NonZeroUsize::MIN)
    }

    /// Returns the mute limit as NonZeroUsize, clamping to 1 if zero.
    pub fn mute_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.mute_limit).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert_eq!(config.visibility_limit, 20_000);
        assert_eq!(config.filter_limit, 10_000);
        assert_eq!(config.mute_limit, 10_000);
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            filter_limit: 0,
            ..Default::default()
        };
        assert_eq!(config.filter_limit_non_zero().get(), 1);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: CacheConfig = toml::from_str("visibility_limit = 5").expect("parse");
        assert_eq!(config.visibility_limit, 5);
        assert_eq!(config.mute_limit, DEFAULT_MUTE_LIMIT);
    }
}
