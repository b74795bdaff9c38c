use crate::domain::features::Feature;
use crate::domain::profile::Profile;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Engine-wide knobs. The defaults reproduce the production behavior; they
/// are only overridden in tests and experiments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum raw bars before any training is attempted.
    pub min_bars: usize,
    /// Minimum labeled rows after feature/label filtering.
    pub min_training_rows: usize,
    /// Allowed forecast horizon, in trading days.
    pub horizon_min: u32,
    pub horizon_max: u32,
    /// Sample weight assigned to the oldest labeled row; the newest gets 1.0.
    pub weight_floor: f64,
    /// Confidence penalty for a call that contradicts the VWAP side.
    pub flow_penalty: f64,
    /// Post-penalty confidence below this collapses the signal to NEUTRAL.
    pub confidence_floor: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_bars: 50,
            min_training_rows: 10,
            horizon_min: 1,
            horizon_max: 90,
            weight_floor: 0.1,
            flow_penalty: 0.15,
            confidence_floor: 0.55,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.min_bars > 0, "min_bars must be positive");
        anyhow::ensure!(
            self.min_training_rows >= 2,
            "min_training_rows must be at least 2"
        );
        anyhow::ensure!(
            self.horizon_min >= 1 && self.horizon_min <= self.horizon_max,
            "horizon bounds must satisfy 1 <= min <= max"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.weight_floor),
            "weight_floor must be within [0, 1]"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.flow_penalty),
            "flow_penalty must be within [0, 1]"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.confidence_floor),
            "confidence_floor must be within [0, 1]"
        );
        Ok(())
    }
}

/// Per-call options for [`Analyzer::analyze`].
///
/// [`Analyzer::analyze`]: crate::application::pipeline::Analyzer::analyze
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub profile: Profile,
    /// Explicit feature selection; `None` uses the profile's default subset.
    /// An explicit list is always unioned with the mandatory flow/volatility
    /// core before availability filtering.
    pub features: Option<Vec<Feature>>,
    /// Importance-based feature pruning (on unless disabled).
    pub auto_prune: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self::new(Profile::default())
    }
}

impl AnalysisOptions {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            features: None,
            auto_prune: true,
        }
    }

    pub fn with_features(mut self, features: Vec<Feature>) -> Self {
        self.features = Some(features);
        self
    }

    pub fn without_pruning(mut self) -> Self {
        self.auto_prune = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_horizon_bounds_rejected() {
        let config = EngineConfig {
            horizon_min: 10,
            horizon_max: 5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_options_builder() {
        let opts = AnalysisOptions::new(Profile::Momentum)
            .with_features(vec![Feature::Rsi])
            .without_pruning();
        assert_eq!(opts.profile, Profile::Momentum);
        assert_eq!(opts.features.as_deref(), Some(&[Feature::Rsi][..]));
        assert!(!opts.auto_prune);
    }
}
