use crate::domain::features::Feature;
use crate::domain::profile::Profile;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Final directional call for the forecast horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Neutral,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell => write!(f, "SELL"),
            Signal::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// One inference outcome. Constructed once per call, immutable, returned to
/// the caller; persisting it (for the audit trail) is the caller's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub signal: Signal,
    /// Class probability of the voted direction, post consistency filter.
    pub confidence: f64,
    pub predicted_price: f64,
    /// Columns the ensembles were actually fitted on, canonical order.
    pub used_features: Vec<Feature>,
    pub profile: Profile,
}
