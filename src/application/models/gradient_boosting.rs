//! In-crate gradient boosting over decision-tree base learners.
//!
//! smartcore ships forests but no boosting, so the boosting loop lives here:
//! squared-loss stagewise fitting for the regressor, logistic loss with a
//! sigmoid link for the direction classifier. Each stage fits a tree to the
//! current pseudo-residuals on a recency-weighted bootstrap of the training
//! set, which is how per-sample weights reach the tree fits.

use super::matrix;
use super::sampling::{select_rows, weighted_bootstrap};
use crate::domain::errors::EngineError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};

type BaseTree = DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Boosting hyperparameters.
#[derive(Debug, Clone, Copy)]
pub struct BoostParams {
    pub n_trees: usize,
    pub max_depth: Option<u16>,
    pub learning_rate: f64,
    pub seed: u64,
}

impl Default for BoostParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: Some(3),
            learning_rate: 0.1,
            seed: 42,
        }
    }
}

fn tree_parameters(max_depth: Option<u16>) -> DecisionTreeRegressorParameters {
    let params = DecisionTreeRegressorParameters::default();
    match max_depth {
        Some(depth) => params.with_max_depth(depth),
        None => params,
    }
}

fn weighted_mean(y: &[f64], weights: &[f64]) -> f64 {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return y.iter().sum::<f64>() / y.len() as f64;
    }
    y.iter().zip(weights).map(|(y, w)| y * w).sum::<f64>() / total
}

fn sigmoid(score: f64) -> f64 {
    1.0 / (1.0 + (-score).exp())
}

/// Run one boosting pass: returns the fitted stage trees, updating `scores`
/// in place through `gradient` (prediction space → pseudo-residuals).
fn boost(
    x: &Vec<Vec<f64>>,
    sample_weights: &[f64],
    params: &BoostParams,
    scores: &mut [f64],
    gradient: impl Fn(f64, f64) -> f64,
    y: &[f64],
) -> Result<Vec<BaseTree>, EngineError> {
    let full = matrix(x)?;
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut trees = Vec::with_capacity(params.n_trees);

    for _ in 0..params.n_trees {
        let residuals: Vec<f64> = y
            .iter()
            .zip(scores.iter())
            .map(|(y, s)| gradient(*y, *s))
            .collect();

        let indices = weighted_bootstrap(&mut rng, sample_weights);
        let x_boot = select_rows(x, &indices);
        let r_boot = select_rows(&residuals, &indices);

        let tree = BaseTree::fit(&matrix(&x_boot)?, &r_boot, tree_parameters(params.max_depth))
            .map_err(|e| EngineError::Training {
                reason: e.to_string(),
            })?;

        let step = tree.predict(&full).map_err(|e| EngineError::Prediction {
            reason: e.to_string(),
        })?;
        for (score, delta) in scores.iter_mut().zip(step) {
            *score += params.learning_rate * delta;
        }
        trees.push(tree);
    }

    Ok(trees)
}

fn predict_score(
    base: f64,
    learning_rate: f64,
    trees: &[BaseTree],
    features: &[f64],
) -> Result<f64, EngineError> {
    let row = matrix(&vec![features.to_vec()])?;
    let mut score = base;
    for tree in trees {
        let step = tree.predict(&row).map_err(|e| EngineError::Prediction {
            reason: e.to_string(),
        })?;
        score += learning_rate * step[0];
    }
    Ok(score)
}

/// Squared-loss gradient-boosted regressor.
pub struct GradientBoostedRegressor {
    base: f64,
    learning_rate: f64,
    trees: Vec<BaseTree>,
}

impl GradientBoostedRegressor {
    pub fn fit(
        x: &Vec<Vec<f64>>,
        y: &[f64],
        sample_weights: &[f64],
        params: &BoostParams,
    ) -> Result<Self, EngineError> {
        let base = weighted_mean(y, sample_weights);
        let mut scores = vec![base; y.len()];
        let trees = boost(x, sample_weights, params, &mut scores, |y, s| y - s, y)?;

        Ok(Self {
            base,
            learning_rate: params.learning_rate,
            trees,
        })
    }

    pub fn predict(&self, features: &[f64]) -> Result<f64, EngineError> {
        predict_score(self.base, self.learning_rate, &self.trees, features)
    }
}

/// Logistic-loss gradient-boosted classifier for binary direction labels.
/// Scores live in log-odds space; probabilities come out of the sigmoid.
pub struct GradientBoostedClassifier {
    base_score: f64,
    learning_rate: f64,
    trees: Vec<BaseTree>,
}

impl GradientBoostedClassifier {
    pub fn fit(
        x: &Vec<Vec<f64>>,
        y: &[f64],
        sample_weights: &[f64],
        params: &BoostParams,
    ) -> Result<Self, EngineError> {
        // Prior log-odds, clamped so single-class training data stays finite.
        let prior = weighted_mean(y, sample_weights).clamp(1e-6, 1.0 - 1e-6);
        let base_score = (prior / (1.0 - prior)).ln();

        let mut scores = vec![base_score; y.len()];
        let trees = boost(
            x,
            sample_weights,
            params,
            &mut scores,
            |y, s| y - sigmoid(s),
            y,
        )?;

        Ok(Self {
            base_score,
            learning_rate: params.learning_rate,
            trees,
        })
    }

    /// Probability of the positive (up) class.
    pub fn predict_probability(&self, features: &[f64]) -> Result<f64, EngineError> {
        let score = predict_score(self.base_score, self.learning_rate, &self.trees, features)?;
        Ok(sigmoid(score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_data(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64, (i % 7) as f64]).collect();
        let y: Vec<f64> = (0..n).map(|i| 0.5 * i as f64).collect();
        (x, y)
    }

    #[test]
    fn test_regressor_learns_a_trend() {
        let (x, y) = linear_data(80);
        let weights = vec![1.0; 80];
        let model = GradientBoostedRegressor::fit(&x, &y, &weights, &BoostParams::default())
            .expect("fit should succeed");

        let low = model.predict(&[5.0, 5.0]).unwrap();
        let high = model.predict(&[70.0, 0.0]).unwrap();
        assert!(high > low, "boosted regressor must track the trend");
    }

    #[test]
    fn test_regressor_is_deterministic_for_a_seed() {
        let (x, y) = linear_data(60);
        let weights = vec![1.0; 60];
        let params = BoostParams {
            n_trees: 25,
            ..Default::default()
        };

        let a = GradientBoostedRegressor::fit(&x, &y, &weights, &params).unwrap();
        let b = GradientBoostedRegressor::fit(&x, &y, &weights, &params).unwrap();
        assert_eq!(
            a.predict(&[10.0, 3.0]).unwrap(),
            b.predict(&[10.0, 3.0]).unwrap()
        );
    }

    #[test]
    fn test_classifier_separates_labels() {
        // Up when the first feature is large.
        let x: Vec<Vec<f64>> = (0..100).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..100).map(|i| if i >= 50 { 1.0 } else { 0.0 }).collect();
        let weights = vec![1.0; 100];

        let model = GradientBoostedClassifier::fit(&x, &y, &weights, &BoostParams::default())
            .expect("fit should succeed");

        let p_low = model.predict_probability(&[5.0]).unwrap();
        let p_high = model.predict_probability(&[95.0]).unwrap();
        assert!(p_high > 0.5, "high regime should vote up, got {}", p_high);
        assert!(p_low < 0.5, "low regime should vote down, got {}", p_low);
    }

    #[test]
    fn test_classifier_probability_stays_in_unit_interval() {
        let x: Vec<Vec<f64>> = (0..40).map(|i| vec![(i % 5) as f64]).collect();
        let y: Vec<f64> = (0..40).map(|i| (i % 2) as f64).collect();
        let weights = vec![1.0; 40];

        let model =
            GradientBoostedClassifier::fit(&x, &y, &weights, &BoostParams::default()).unwrap();
        for v in 0..5 {
            let p = model.predict_probability(&[v as f64]).unwrap();
            assert!((0.0..=1.0).contains(&p));
        }
    }
}
