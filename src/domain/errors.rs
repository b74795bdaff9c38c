use thiserror::Error;

/// Errors surfaced by the analysis engine.
///
/// Insufficient history is deliberately not represented here: it is an
/// expected outcome for newly listed or illiquid instruments and is signaled
/// as `Ok(None)` by the pipeline instead of an error.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid forecast horizon {horizon}: must be within {min}..={max} trading days")]
    InvalidHorizon { horizon: u32, min: u32, max: u32 },

    #[error("Feature matrix construction failed: {reason}")]
    Matrix { reason: String },

    #[error("Model training failed: {reason}")]
    Training { reason: String },

    #[error("Model prediction failed: {reason}")]
    Prediction { reason: String },
}
