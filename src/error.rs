//! Error types for Vigil

use thiserror::Error;

/// Errors that can cross the public API.
///
/// Everything except the JSON/parse variants signals programmer error (bad
/// dimensions, bad capacities, bad configuration) and is raised at the call site.
#[derive(Debug, Error)]
pub enum VigilError {
    #[error("Dimension mismatch: expected {expected} values, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid buffer capacity: {0} (must be > 0)")]
    InvalidCapacity(usize),

    #[error("Invalid smoothing factor: {0} (must be in (0, 1])")]
    InvalidSmoothingFactor(f64),

    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse input: {0}")]
    ParseError(String),
}

/// Audio cue failures. Caught and logged by the alert engine, never propagated.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Audio output unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to play tone: {0}")]
    Playback(String),

    #[error("Audio backend is closed")]
    Closed,
}
