//! Profile-weighted ensembles: a soft-voting direction classifier and a
//! vote-averaged return regressor, built fresh for every inference call.
//!
//! Construction is deterministic for a (profile, kind) pair: every base
//! estimator and every bootstrap draw is seeded with a fixed constant, so
//! repeated calls produce identical model structure.

use super::gradient_boosting::{BoostParams, GradientBoostedClassifier, GradientBoostedRegressor};
use super::matrix;
use super::sampling::{select_rows, weighted_bootstrap};
use crate::domain::errors::EngineError;
use crate::domain::profile::{Profile, TreeSpec};
use rand::SeedableRng;
use rand::rngs::StdRng;
use smartcore::ensemble::extra_trees_regressor::{
    ExtraTreesRegressor, ExtraTreesRegressorParameters,
};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;
type ExtraForest = ExtraTreesRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

const BASE_SEED: u64 = 42;
const CLASSIFIER_FOREST_SEED: u64 = 43;
const REGRESSOR_BOOST_SEED: u64 = 44;
const REGRESSOR_FOREST_SEED: u64 = 45;
const REGRESSOR_EXTRA_SEED: u64 = 46;

const LEARNING_RATE: f64 = 0.1;

/// Outcome of the soft vote: the winning class and its class probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionVote {
    pub up: bool,
    pub probability: f64,
}

fn boost_params(spec: TreeSpec, seed: u64) -> BoostParams {
    BoostParams {
        n_trees: spec.n_trees,
        max_depth: spec.max_depth,
        learning_rate: LEARNING_RATE,
        seed,
    }
}

/// Weighted-bootstrap the training set, then fit a random forest on it.
fn fit_forest(
    x: &Vec<Vec<f64>>,
    y: &[f64],
    sample_weights: &[f64],
    spec: TreeSpec,
    bootstrap_seed: u64,
) -> Result<Forest, EngineError> {
    let mut rng = StdRng::seed_from_u64(bootstrap_seed);
    let indices = weighted_bootstrap(&mut rng, sample_weights);
    let x_boot = select_rows(x, &indices);
    let y_boot = select_rows(y, &indices);

    let mut params = RandomForestRegressorParameters::default()
        .with_n_trees(spec.n_trees)
        .with_seed(BASE_SEED);
    if let Some(depth) = spec.max_depth {
        params = params.with_max_depth(depth);
    }

    Forest::fit(&matrix(&x_boot)?, &y_boot, params).map_err(|e| EngineError::Training {
        reason: e.to_string(),
    })
}

fn fit_extra_trees(
    x: &Vec<Vec<f64>>,
    y: &[f64],
    sample_weights: &[f64],
    spec: TreeSpec,
    bootstrap_seed: u64,
) -> Result<ExtraForest, EngineError> {
    let mut rng = StdRng::seed_from_u64(bootstrap_seed);
    let indices = weighted_bootstrap(&mut rng, sample_weights);
    let x_boot = select_rows(x, &indices);
    let y_boot = select_rows(y, &indices);

    let mut params = ExtraTreesRegressorParameters::default()
        .with_n_trees(spec.n_trees)
        .with_seed(BASE_SEED);
    if let Some(depth) = spec.max_depth {
        params = params.with_max_depth(depth);
    }

    ExtraForest::fit(&matrix(&x_boot)?, &y_boot, params).map_err(|e| EngineError::Training {
        reason: e.to_string(),
    })
}

fn predict_single<F>(predict: F, features: &[f64]) -> Result<f64, EngineError>
where
    F: FnOnce(&DenseMatrix<f64>) -> Result<Vec<f64>, smartcore::error::Failed>,
{
    let row = matrix(&vec![features.to_vec()])?;
    let predictions = predict(&row).map_err(|e| EngineError::Prediction {
        reason: e.to_string(),
    })?;
    predictions
        .first()
        .copied()
        .ok_or_else(|| EngineError::Prediction {
            reason: "no prediction returned".to_string(),
        })
}

/// Soft-voting direction classifier: a gradient-boosted logistic model and a
/// forest vote model, combined by the profile's vote weights. The forest
/// regresses on the {0,1} labels; its mean leaf vote is the up-probability.
pub struct ClassifierEnsemble {
    votes: [f64; 2],
    boosted: GradientBoostedClassifier,
    forest: Forest,
}

impl ClassifierEnsemble {
    pub fn fit(
        profile: Profile,
        x: &Vec<Vec<f64>>,
        y_direction: &[f64],
        sample_weights: &[f64],
    ) -> Result<Self, EngineError> {
        let spec = profile.spec();
        let boosted = GradientBoostedClassifier::fit(
            x,
            y_direction,
            sample_weights,
            &boost_params(spec.boost_clf, BASE_SEED),
        )?;
        let forest = fit_forest(
            x,
            y_direction,
            sample_weights,
            spec.forest_clf,
            CLASSIFIER_FOREST_SEED,
        )?;

        Ok(Self {
            votes: spec.classifier_votes,
            boosted,
            forest,
        })
    }

    pub fn predict(&self, features: &[f64]) -> Result<DirectionVote, EngineError> {
        let p_boost = self.boosted.predict_probability(features)?;
        let p_forest =
            predict_single(|row| self.forest.predict(row), features)?.clamp(0.0, 1.0);

        let [w_boost, w_forest] = self.votes;
        let p_up = (w_boost * p_boost + w_forest * p_forest) / (w_boost + w_forest);

        let up = p_up >= 0.5;
        Ok(DirectionVote {
            up,
            probability: if up { p_up } else { 1.0 - p_up },
        })
    }
}

/// Vote-averaged return regressor: boosting, random forest and extra-trees
/// combined by the profile's vote weights.
pub struct RegressorEnsemble {
    votes: [f64; 3],
    boosted: GradientBoostedRegressor,
    forest: Forest,
    extra: ExtraForest,
}

impl RegressorEnsemble {
    pub fn fit(
        profile: Profile,
        x: &Vec<Vec<f64>>,
        y_return: &[f64],
        sample_weights: &[f64],
    ) -> Result<Self, EngineError> {
        let spec = profile.spec();
        let boosted = GradientBoostedRegressor::fit(
            x,
            y_return,
            sample_weights,
            &boost_params(spec.boost_reg, REGRESSOR_BOOST_SEED),
        )?;
        let forest = fit_forest(
            x,
            y_return,
            sample_weights,
            spec.forest_reg,
            REGRESSOR_FOREST_SEED,
        )?;
        let extra = fit_extra_trees(
            x,
            y_return,
            sample_weights,
            spec.extra_reg,
            REGRESSOR_EXTRA_SEED,
        )?;

        Ok(Self {
            votes: spec.regressor_votes,
            boosted,
            forest,
            extra,
        })
    }

    pub fn predict(&self, features: &[f64]) -> Result<f64, EngineError> {
        let p_boost = self.boosted.predict(features)?;
        let p_forest = predict_single(|row| self.forest.predict(row), features)?;
        let p_extra = predict_single(|row| self.extra.predict(row), features)?;

        let [w_boost, w_forest, w_extra] = self.votes;
        let total = w_boost + w_forest + w_extra;
        Ok((w_boost * p_boost + w_forest * p_forest + w_extra * p_extra) / total)
    }
}
