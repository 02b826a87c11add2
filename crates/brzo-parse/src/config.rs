use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tuning knobs for an [`Engine`](crate::Engine).
///
/// Every key is optional in TOML; missing keys take their default.
///
/// ```toml
/// compact = true
/// collect_interval = 64
/// forest_pass_limit = 16
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Compact the derivative after every token consumed by `parse`.
    pub compact: bool,

    /// Free unreachable derived nodes every this many driver steps.
    /// `0` disables periodic collection.
    pub collect_interval: usize,

    /// Minimum pass budget when building a parse forest. The solver gives
    /// up only after this many passes and after two more passes than the
    /// nodes it has evaluated, so only infinite forests are cut short.
    /// `0` removes the bound.
    pub forest_pass_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            compact: true,
            collect_interval: 64,
            forest_pass_limit: 16,
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn with_compaction(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    pub fn with_collect_interval(mut self, interval: usize) -> Self {
        self.collect_interval = interval;
        self
    }

    pub fn with_forest_pass_limit(mut self, limit: usize) -> Self {
        self.forest_pass_limit = limit;
        self
    }
}
