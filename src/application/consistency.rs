//! Post-hoc consistency rules over the raw ensemble output.
//!
//! A directional call made against the smart-money flow reference (the
//! 21-session VWAP) is treated as lower conviction, and anything that ends
//! up below the confidence floor collapses to NEUTRAL. The predicted price
//! is never touched here.

use crate::config::EngineConfig;
use crate::domain::prediction::Signal;
use tracing::debug;

/// Signal and confidence after the override rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilteredSignal {
    pub signal: Signal,
    pub confidence: f64,
}

/// Apply the flow override and the confidence floor to a raw classifier
/// vote. `vwap` is the latest row's VWAP when available; without it the flow
/// rule is skipped entirely.
pub fn apply(
    predicted_up: bool,
    probability: f64,
    close: f64,
    vwap: Option<f64>,
    config: &EngineConfig,
) -> FilteredSignal {
    let mut confidence = probability;

    if let Some(vwap) = vwap {
        let against_flow = (predicted_up && close < vwap) || (!predicted_up && close > vwap);
        if against_flow {
            confidence -= config.flow_penalty;
            debug!(
                close,
                vwap, confidence, "Directional call contradicts VWAP side; penalizing confidence"
            );
        }
    }

    let signal = if confidence < config.confidence_floor {
        Signal::Neutral
    } else if predicted_up {
        Signal::Buy
    } else {
        Signal::Sell
    };

    FilteredSignal { signal, confidence }
}
