use super::price_bar::PriceBar;
use serde::{Deserialize, Serialize};

/// Trailing sessions used for the 52-week statistics (one trading year).
const WEEK52_SESSIONS: usize = 252;

/// Live-quote style snapshot derived from persisted history.
///
/// The market-data provider normally supplies this directly; this fallback
/// computes the same figures from the stored bar series when the provider's
/// metadata is unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub symbol: String,
    pub price: f64,
    pub week52_low: f64,
    pub week52_high: f64,
    pub week52_mid: f64,
}

/// Compute the 52-week snapshot over the trailing year of `bars`.
/// Returns `None` when the series is empty or the latest close is missing.
pub fn week52_snapshot(symbol: &str, bars: &[PriceBar]) -> Option<QuoteSnapshot> {
    let price = bars.last()?.effective_close()?;
    let window = &bars[bars.len().saturating_sub(WEEK52_SESSIONS)..];

    let mut low = f64::INFINITY;
    let mut high = f64::NEG_INFINITY;
    for bar in window {
        low = low.min(bar.low);
        high = high.max(bar.high);
    }
    if !low.is_finite() || !high.is_finite() {
        return None;
    }

    Some(QuoteSnapshot {
        symbol: symbol.to_uppercase(),
        price,
        week52_low: low,
        week52_high: high,
        week52_mid: (low + high) / 2.0,
    })
}

/// Post-hoc audit of a persisted prediction against the realized close on
/// the target date. The persistence layer stores this next to the original
/// prediction once the target session has traded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionAudit {
    pub predicted_price: f64,
    pub realized_price: f64,
    /// Absolute relative error vs the realized close.
    pub relative_error: f64,
    /// True when the error is within the configured tolerance.
    pub hit: bool,
}

/// Grade a prediction once the realized close is known. `tolerance` is a
/// relative error bound (e.g. 0.02 for 2%). Returns `None` when the realized
/// price is not a usable denominator.
pub fn audit_prediction(
    predicted_price: f64,
    realized_price: f64,
    tolerance: f64,
) -> Option<PredictionAudit> {
    if realized_price <= 0.0 || !realized_price.is_finite() || !predicted_price.is_finite() {
        return None;
    }

    let relative_error = (predicted_price - realized_price).abs() / realized_price;
    Some(PredictionAudit {
        predicted_price,
        realized_price,
        relative_error,
        hit: relative_error <= tolerance,
    })
}
