// Post-hoc signal override rules
pub mod consistency;

// Ensemble model construction
pub mod models;

// Training and inference orchestration
pub mod pipeline;

// Importance-based feature pruning
pub mod pruning;
