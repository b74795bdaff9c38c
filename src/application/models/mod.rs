// Ensemble estimators (profile-weighted voting)
pub mod ensemble;

// In-crate boosting over decision-tree base learners
pub mod gradient_boosting;

// Recency weights and weighted resampling
pub mod sampling;

use crate::domain::errors::EngineError;
use smartcore::linalg::basic::matrix::DenseMatrix;

pub(crate) fn matrix(rows: &Vec<Vec<f64>>) -> Result<DenseMatrix<f64>, EngineError> {
    DenseMatrix::from_2d_vec(rows).map_err(|e| EngineError::Matrix {
        reason: e.to_string(),
    })
}
