//! Simulator configuration.

use serde::{Deserialize, Serialize};

/// Settings for a [`ClassicalSim`](crate::ClassicalSim).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Fail when a register is released clean while holding a non-zero value.
    pub enforce_release_at_zero: bool,
    /// Force every X-basis outcome of a measurement-based uncomputation.
    /// `None` samples them.
    pub mbu_bias: Option<bool>,
    /// Seed for sampled outcomes and `randomize`. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            enforce_release_at_zero: true,
            mbu_bias: None,
            seed: None,
        }
    }
}

impl SimConfig {
    /// Default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether clean releases must be zero.
    pub fn with_enforce_release_at_zero(mut self, enforce: bool) -> Self {
        self.enforce_release_at_zero = enforce;
        self
    }

    /// Force measurement-based uncomputation outcomes.
    pub fn with_mbu_bias(mut self, bias: Option<bool>) -> Self {
        self.mbu_bias = bias;
        self
    }

    /// Seed the simulator's random source.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimConfig::default();
        assert!(config.enforce_release_at_zero);
        assert_eq!(config.mbu_bias, None);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_builder_and_serde() {
        let config = SimConfig::new()
            .with_enforce_release_at_zero(false)
            .with_mbu_bias(Some(true))
            .with_seed(7);
        let json = serde_json::to_string(&config).unwrap();
        let back: SimConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
        assert_eq!(back.seed, Some(7));
    }
}
