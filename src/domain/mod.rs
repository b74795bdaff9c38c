// Market data domain
pub mod market;

// Derived indicator columns
pub mod indicators;

// Feature registry
pub mod features;

// Analysis profiles
pub mod profile;

// Inference outcome types
pub mod prediction;

// Domain-specific error types
pub mod errors;
