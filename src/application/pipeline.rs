//! Training-and-inference pipeline: labeling, feature resolution, recency
//! weighting, ensemble fitting and the single-step forecast.
//!
//! Every invocation is self-contained: indicators, weights and both
//! ensembles are rebuilt from the supplied series, and nothing is cached
//! across calls. Shortfalls at any gate produce `Ok(None)`, the expected
//! outcome for thin histories, while `Err` is reserved for contract
//! violations and internal model faults.

use crate::application::consistency;
use crate::application::models::ensemble::{ClassifierEnsemble, RegressorEnsemble};
use crate::application::models::sampling::linear_weights;
use crate::application::pruning::{FeatureSelection, prune_by_importance};
use crate::config::{AnalysisOptions, EngineConfig};
use crate::domain::errors::EngineError;
use crate::domain::features::{Feature, MANDATORY_CORE, canonical_order};
use crate::domain::indicators::IndicatorFrame;
use crate::domain::market::PriceBar;
use crate::domain::prediction::PredictionResult;
use tracing::debug;

/// Stateless analysis engine. Construct once (or per call; it holds only
/// configuration) and invoke [`Analyzer::analyze`] per instrument.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: EngineConfig,
}

struct TrainingFrame {
    x: Vec<Vec<f64>>,
    y_direction: Vec<f64>,
    y_return: Vec<f64>,
}

impl Analyzer {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Produce a direction signal, confidence and price target for `horizon`
    /// trading days ahead, or `Ok(None)` when the series cannot support a
    /// trained model.
    pub fn analyze(
        &self,
        bars: &[PriceBar],
        horizon: u32,
        options: &AnalysisOptions,
    ) -> Result<Option<PredictionResult>, EngineError> {
        if horizon < self.config.horizon_min || horizon > self.config.horizon_max {
            return Err(EngineError::InvalidHorizon {
                horizon,
                min: self.config.horizon_min,
                max: self.config.horizon_max,
            });
        }

        if bars.len() < self.config.min_bars {
            debug!(
                bars = bars.len(),
                required = self.config.min_bars,
                "Not enough history to train"
            );
            return Ok(None);
        }

        let frame = IndicatorFrame::compute(bars);

        let selected = resolve_features(&frame, options);
        if selected.is_empty() {
            debug!("No requested feature is derivable from this history");
            return Ok(None);
        }

        let last_idx = frame.len() - 1;
        let Some(current_close) = frame.close(last_idx).filter(|c| *c > 0.0) else {
            debug!("Latest session has no usable close");
            return Ok(None);
        };

        let Some(training) = label_rows(&frame, &selected, horizon as usize) else {
            debug!("Labeling produced no usable rows");
            return Ok(None);
        };
        if training.x.len() < self.config.min_training_rows {
            debug!(
                rows = training.x.len(),
                required = self.config.min_training_rows,
                "Too few labeled rows after filtering"
            );
            return Ok(None);
        }

        let weights = linear_weights(training.x.len(), self.config.weight_floor);

        let selection = if options.auto_prune {
            prune_by_importance(&selected, &training.x, &training.y_return, &weights)
        } else {
            FeatureSelection::Full(selected.clone())
        };
        let used_features = selection.into_features();
        let x = project_columns(&training.x, &selected, &used_features);

        let classifier =
            ClassifierEnsemble::fit(options.profile, &x, &training.y_direction, &weights)?;
        let regressor = RegressorEnsemble::fit(options.profile, &x, &training.y_return, &weights)?;

        let latest = frame.latest().expect("non-empty frame has a latest row");
        let last_features: Vec<f64> = used_features
            .iter()
            .map(|f| {
                latest
                    .get(*f)
                    .expect("used features are defined on the latest row")
            })
            .collect();

        let vote = classifier.predict(&last_features)?;
        let predicted_log_return = regressor.predict(&last_features)?;
        let predicted_price = current_close * predicted_log_return.exp();

        let filtered = consistency::apply(
            vote.up,
            vote.probability,
            current_close,
            latest.vwap,
            &self.config,
        );

        debug!(
            signal = %filtered.signal,
            confidence = filtered.confidence,
            predicted_price,
            features = used_features.len(),
            "Analysis complete"
        );

        Ok(Some(PredictionResult {
            signal: filtered.signal,
            confidence: filtered.confidence,
            predicted_price,
            used_features,
            profile: options.profile,
        }))
    }
}

/// Resolve the training columns: the profile's default subset, or an
/// explicit list unioned with the mandatory flow/volatility core; either
/// way, only columns defined on the most recent row survive.
fn resolve_features(frame: &IndicatorFrame, options: &AnalysisOptions) -> Vec<Feature> {
    let available = frame.available_features();

    match &options.features {
        None => options
            .profile
            .spec()
            .default_features
            .iter()
            .copied()
            .filter(|f| available.contains(f))
            .collect(),
        Some(requested) => {
            let mut candidates = requested.clone();
            candidates.extend_from_slice(MANDATORY_CORE);
            canonical_order(&candidates)
                .into_iter()
                .filter(|f| available.contains(f))
                .collect()
        }
    }
}

/// Label every row whose selected features and horizon-ahead close are
/// defined. Returns `None` for an empty result to keep the gate explicit.
fn label_rows(frame: &IndicatorFrame, selected: &[Feature], horizon: usize) -> Option<TrainingFrame> {
    let n = frame.len();
    let mut x = Vec::new();
    let mut y_direction = Vec::new();
    let mut y_return = Vec::new();

    for t in 0..n.saturating_sub(horizon) {
        let Some(close) = frame.close(t).filter(|c| *c > 0.0) else {
            continue;
        };
        let Some(future_close) = frame.close(t + horizon).filter(|c| *c > 0.0) else {
            continue;
        };

        let row = frame.rows()[t];
        let features: Option<Vec<f64>> = selected.iter().map(|f| row.get(*f)).collect();
        let Some(features) = features else {
            continue;
        };

        x.push(features);
        y_direction.push(if future_close > close { 1.0 } else { 0.0 });
        y_return.push((future_close / close).ln());
    }

    if x.is_empty() {
        return None;
    }
    Some(TrainingFrame {
        x,
        y_direction,
        y_return,
    })
}

/// Re-project rows built over `selected` onto the pruned `kept` columns.
fn project_columns(x: &[Vec<f64>], selected: &[Feature], kept: &[Feature]) -> Vec<Vec<f64>> {
    if selected == kept {
        return x.to_vec();
    }
    let indices: Vec<usize> = kept
        .iter()
        .map(|f| {
            selected
                .iter()
                .position(|s| s == f)
                .expect("kept features are a subset of selected features")
        })
        .collect();

    x.iter()
        .map(|row| indices.iter().map(|i| row[*i]).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::profile::Profile;
    use chrono::NaiveDate;

    fn bar(i: usize, close: f64, volume: f64) -> PriceBar {
        PriceBar {
            date: NaiveDate::from_ymd_opt(2023, 1, 1)
                .unwrap()
                .checked_add_days(chrono::Days::new(i as u64))
                .unwrap(),
            open: close,
            high: close * 1.02,
            low: close * 0.98,
            close,
            volume,
        }
    }

    fn series(n: usize) -> Vec<PriceBar> {
        (0..n)
            .map(|i| bar(i, 100.0 + 3.0 * ((i % 5) as f64 - 2.0), 1000.0))
            .collect()
    }

    #[test]
    fn test_out_of_range_horizon_is_an_error() {
        let analyzer = Analyzer::default();
        let bars = series(60);

        assert!(matches!(
            analyzer.analyze(&bars, 0, &AnalysisOptions::default()),
            Err(EngineError::InvalidHorizon { .. })
        ));
        assert!(matches!(
            analyzer.analyze(&bars, 91, &AnalysisOptions::default()),
            Err(EngineError::InvalidHorizon { .. })
        ));
    }

    #[test]
    fn test_short_series_returns_no_result() {
        let analyzer = Analyzer::default();
        let bars = series(49);

        let outcome = analyzer.analyze(&bars, 5, &AnalysisOptions::default()).unwrap();
        assert!(outcome.is_none());
    }

    #[test]
    fn test_missing_latest_close_returns_no_result() {
        let analyzer = Analyzer::default();
        let mut bars = series(60);
        bars.last_mut().unwrap().close = 0.0;

        let outcome = analyzer.analyze(&bars, 5, &AnalysisOptions::default()).unwrap();
        assert!(outcome.is_none());
    }

    #[test]
    fn test_feature_resolution_unions_the_mandatory_core() {
        let frame = IndicatorFrame::compute(&series(60));
        let options =
            AnalysisOptions::new(Profile::Conservative).with_features(vec![Feature::Rsi]);

        let selected = resolve_features(&frame, &options);
        assert!(selected.contains(&Feature::Rsi));
        assert!(selected.contains(&Feature::DistVwap));
        assert!(selected.contains(&Feature::Atr));
    }

    #[test]
    fn test_feature_resolution_drops_underivable_columns() {
        // 60 bars cannot carry the 200-session trend columns.
        let frame = IndicatorFrame::compute(&series(60));
        let options = AnalysisOptions::new(Profile::Conservative);

        let selected = resolve_features(&frame, &options);
        assert!(!selected.contains(&Feature::Sma200));
        assert!(selected.contains(&Feature::Vwap));
    }

    #[test]
    fn test_label_rows_drops_the_horizon_tail() {
        let frame = IndicatorFrame::compute(&series(60));
        let training = label_rows(&frame, &[Feature::Atr], 5).unwrap();

        // ATR defines from row 13; the last 5 rows cannot be labeled.
        assert_eq!(training.x.len(), 60 - 13 - 5);
        assert_eq!(training.y_direction.len(), training.y_return.len());
        assert!(training.y_direction.iter().all(|y| *y == 0.0 || *y == 1.0));
    }

    #[test]
    fn test_project_columns_keeps_subset_order() {
        let x = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
        let selected = [Feature::Vwap, Feature::Rsi, Feature::Atr];
        let kept = [Feature::Vwap, Feature::Atr];

        let projected = project_columns(&x, &selected, &kept);
        assert_eq!(projected, vec![vec![1.0, 3.0], vec![4.0, 6.0]]);
    }
}
