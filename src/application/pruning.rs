//! Importance-based feature pruning.
//!
//! A lightweight ranking model (one weighted regression stump per feature)
//! scores each column against the return label; columns at or above the mean
//! importance are retained. The pass degrades, it never fails: a degenerate
//! or non-finite ranking falls back to the full selected set.

use crate::domain::features::Feature;
use rayon::prelude::*;
use tracing::{debug, warn};

/// Two-path outcome of the pruning pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureSelection {
    /// Ranking succeeded; only columns at or above the mean importance.
    Pruned(Vec<Feature>),
    /// Ranking not applicable or numerically degenerate; full selected set.
    Full(Vec<Feature>),
}

impl FeatureSelection {
    pub fn features(&self) -> &[Feature] {
        match self {
            FeatureSelection::Pruned(f) | FeatureSelection::Full(f) => f,
        }
    }

    pub fn into_features(self) -> Vec<Feature> {
        match self {
            FeatureSelection::Pruned(f) | FeatureSelection::Full(f) => f,
        }
    }

    pub fn was_pruned(&self) -> bool {
        matches!(self, FeatureSelection::Pruned(_))
    }
}

/// Best weighted variance reduction achievable by a single split on one
/// column. `points` are (feature value, label, weight).
fn stump_gain(mut points: Vec<(f64, f64, f64)>) -> f64 {
    let total_w: f64 = points.iter().map(|p| p.2).sum();
    if total_w <= 0.0 {
        return f64::NAN;
    }
    let total_wy: f64 = points.iter().map(|p| p.1 * p.2).sum();
    let total_wyy: f64 = points.iter().map(|p| p.1 * p.1 * p.2).sum();
    let base_sse = total_wyy - total_wy * total_wy / total_w;

    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut left_w = 0.0;
    let mut left_wy = 0.0;
    let mut left_wyy = 0.0;
    let mut best_sse = base_sse;

    for k in 0..points.len() - 1 {
        let (value, y, w) = points[k];
        left_w += w;
        left_wy += y * w;
        left_wyy += y * y * w;

        // A split only exists between distinct feature values.
        if value == points[k + 1].0 {
            continue;
        }

        let right_w = total_w - left_w;
        if left_w <= 0.0 || right_w <= 0.0 {
            continue;
        }
        let right_wy = total_wy - left_wy;
        let right_wyy = total_wyy - left_wyy;

        let sse = (left_wyy - left_wy * left_wy / left_w)
            + (right_wyy - right_wy * right_wy / right_w);
        best_sse = best_sse.min(sse);
    }

    base_sse - best_sse
}

/// Rank `features` against the return label and keep those at or above the
/// mean importance. Falls back to the full set (with a warning) when the
/// ranking is degenerate.
pub fn prune_by_importance(
    features: &[Feature],
    x: &[Vec<f64>],
    y: &[f64],
    sample_weights: &[f64],
) -> FeatureSelection {
    if features.len() <= 1 || x.len() < 2 {
        return FeatureSelection::Full(features.to_vec());
    }

    let gains: Vec<f64> = (0..features.len())
        .into_par_iter()
        .map(|col| {
            let points: Vec<(f64, f64, f64)> = x
                .iter()
                .zip(y)
                .zip(sample_weights)
                .map(|((row, y), w)| (row[col], *y, *w))
                .collect();
            stump_gain(points)
        })
        .collect();

    if gains.iter().any(|g| !g.is_finite()) {
        warn!("Feature ranking produced non-finite importances; keeping full feature set");
        return FeatureSelection::Full(features.to_vec());
    }

    let total: f64 = gains.iter().sum();
    if total <= 0.0 {
        warn!("No feature carries any split gain; keeping full feature set");
        return FeatureSelection::Full(features.to_vec());
    }

    let mean = total / gains.len() as f64;
    let kept: Vec<Feature> = features
        .iter()
        .zip(&gains)
        .filter(|(_, gain)| **gain >= mean)
        .map(|(f, _)| *f)
        .collect();

    debug!(
        kept = kept.len(),
        selected = features.len(),
        "Importance pruning retained features at or above the mean gain"
    );
    FeatureSelection::Pruned(kept)
}
