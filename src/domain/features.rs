use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of derivable indicator columns.
///
/// The variant order is the canonical column order everywhere: feature
/// vectors, pruning scores and `used_features` in results all follow it.
/// Reordering is a breaking change for persisted predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    #[serde(rename = "VWAP")]
    Vwap,
    #[serde(rename = "Dist_VWAP")]
    DistVwap,
    #[serde(rename = "OBV")]
    Obv,
    #[serde(rename = "MFI")]
    Mfi,
    #[serde(rename = "RSI")]
    Rsi,
    #[serde(rename = "MACD")]
    Macd,
    #[serde(rename = "SMA_14")]
    Sma14,
    #[serde(rename = "SMA_20")]
    Sma20,
    #[serde(rename = "SMA_50")]
    Sma50,
    #[serde(rename = "SMA_200")]
    Sma200,
    #[serde(rename = "BB_Upper")]
    BbUpper,
    #[serde(rename = "BB_Lower")]
    BbLower,
    #[serde(rename = "ATR")]
    Atr,
    #[serde(rename = "Dist_SMA200")]
    DistSma200,
}

/// Every feature, in canonical column order.
pub const ALL_FEATURES: &[Feature] = &[
    Feature::Vwap,
    Feature::DistVwap,
    Feature::Obv,
    Feature::Mfi,
    Feature::Rsi,
    Feature::Macd,
    Feature::Sma14,
    Feature::Sma20,
    Feature::Sma50,
    Feature::Sma200,
    Feature::BbUpper,
    Feature::BbLower,
    Feature::Atr,
    Feature::DistSma200,
];

/// Features unioned into every user-supplied selection so the flow and
/// volatility context is never absent (when history allows them at all).
pub const MANDATORY_CORE: &[Feature] = &[Feature::DistVwap, Feature::Atr];

impl Feature {
    pub fn name(self) -> &'static str {
        match self {
            Feature::Vwap => "VWAP",
            Feature::DistVwap => "Dist_VWAP",
            Feature::Obv => "OBV",
            Feature::Mfi => "MFI",
            Feature::Rsi => "RSI",
            Feature::Macd => "MACD",
            Feature::Sma14 => "SMA_14",
            Feature::Sma20 => "SMA_20",
            Feature::Sma50 => "SMA_50",
            Feature::Sma200 => "SMA_200",
            Feature::BbUpper => "BB_Upper",
            Feature::BbLower => "BB_Lower",
            Feature::Atr => "ATR",
            Feature::DistSma200 => "Dist_SMA200",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        ALL_FEATURES
            .iter()
            .copied()
            .find(|f| f.name().to_uppercase() == normalized)
            .ok_or_else(|| anyhow::anyhow!("Unknown feature: {}", s))
    }
}

/// Deduplicate `features` into canonical column order.
pub fn canonical_order(features: &[Feature]) -> Vec<Feature> {
    ALL_FEATURES
        .iter()
        .copied()
        .filter(|f| features.contains(f))
        .collect()
}
