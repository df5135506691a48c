//! Runtime configuration
//!
//! Every section has working defaults, so an empty TOML document is a valid
//! configuration. [`PlatefulConfig::validate`] rejects values that would
//! make the services misbehave (zero capacities, unsorted thresholds).

use crate::error::PlatefulError;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatefulConfig {
    /// Activity feed
    pub feed: FeedConfig,
    /// Name search
    pub search: SearchConfig,
    /// Advisory failure channel
    pub diagnostics: DiagnosticsConfig,
    /// Review rules
    pub reviews: ReviewConfig,
    /// Caller-side retry schedule
    pub retry: RetryPolicy,
}

/// Activity feed settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Events returned when the caller does not pass a limit
    pub default_limit: usize,
    /// Per-user queries in flight during fan-out
    pub fanout_concurrency: usize,
    /// Display names kept in the name cache
    pub name_cache_capacity: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            fanout_concurrency: 16,
            name_cache_capacity: 1024,
        }
    }
}

/// Search settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Hard cap on search results
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { max_results: 25 }
    }
}

/// Diagnostics settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Advisory failures retained in memory
    pub capacity: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

/// Review rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Tags kept per review after normalization
    pub max_tags: usize,
    /// Review counts at which a reviewer gains a level
    pub level_thresholds: Vec<u64>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            max_tags: 10,
            level_thresholds: vec![1, 5, 15, 30, 50, 100],
        }
    }
}

impl PlatefulConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML. Missing sections and keys take their defaults.
    ///
    /// # Errors
    /// `PlatefulError::Config` on malformed TOML or invalid values.
    pub fn from_toml_str(raw: &str) -> Result<Self, PlatefulError> {
        let config: Self =
            toml::from_str(raw).map_err(|e| PlatefulError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// `PlatefulError::Config` when the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PlatefulError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PlatefulError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Check internal consistency
    ///
    /// # Errors
    /// `PlatefulError::Config` describing the first offending value.
    pub fn validate(&self) -> Result<(), PlatefulError> {
        let positive = [
            ("feed.default_limit", self.feed.default_limit),
            ("feed.fanout_concurrency", self.feed.fanout_concurrency),
            ("search.max_results", self.search.max_results),
            ("diagnostics.capacity", self.diagnostics.capacity),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(PlatefulError::Config(format!("{name} must be positive")));
        }
        if self.feed.name_cache_capacity == 0 {
            return Err(PlatefulError::Config(
                "feed.name_cache_capacity must be positive".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(PlatefulError::Config("retry.max_attempts must be positive".into()));
        }
        let thresholds = &self.reviews.level_thresholds;
        if thresholds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PlatefulError::Config(
                "reviews.level_thresholds must be strictly increasing".into(),
            ));
        }
        Ok(())
    }

    /// With default feed limit
    #[inline]
    #[must_use]
    pub fn with_feed_limit(mut self, limit: usize) -> Self {
        self.feed.default_limit = limit;
        self
    }

    /// With fan-out concurrency
    #[inline]
    #[must_use]
    pub fn with_fanout_concurrency(mut self, width: usize) -> Self {
        self.feed.fanout_concurrency = width;
        self
    }

    /// With max tags per review
    #[inline]
    #[must_use]
    pub fn with_max_tags(mut self, max: usize) -> Self {
        self.reviews.max_tags = max;
        self
    }

    /// With reviewer level thresholds
    #[inline]
    #[must_use]
    pub fn with_level_thresholds(mut self, thresholds: Vec<u64>) -> Self {
        self.reviews.level_thresholds = thresholds;
        self
    }

    /// With retry policy
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }
}
