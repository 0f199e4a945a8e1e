//! Error types for chunked inference and separation

use sp_dsp::DspError;
use thiserror::Error;

/// Separation pipeline error types
#[derive(Error, Debug)]
pub enum SepError {
    /// Model file not found
    #[error("Model not found: {path}")]
    ModelNotFound { path: String },

    /// Tract backend error
    #[error("Tract error: {0}")]
    TractError(String),

    /// Inference returned an error or unusable result
    #[error("Inference failed: {reason}")]
    InferenceFailed { reason: String },

    /// External engine did not answer within the caller's budget
    #[error("Inference timeout after {timeout_ms}ms")]
    InferenceTimeout { timeout_ms: u64 },

    /// Caller passed a time slice longer than one chunk
    #[error("Chunk size mismatch: slice spans {got} frames, chunk holds {capacity}")]
    ChunkSizeMismatch { got: usize, capacity: usize },

    /// Tensor or mask shape inconsistency
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    /// Unsupported channel layout
    #[error("Channel count mismatch: expected {expected}, got {got}")]
    ChannelMismatch { expected: String, got: usize },

    /// Signal rate does not match the model's training rate
    #[error("Invalid sample rate: expected {expected}, got {got}")]
    InvalidSampleRate { expected: u32, got: u32 },

    /// Propagated DSP-core error
    #[error(transparent)]
    Dsp(#[from] DspError),
}

/// Result type for separation operations
pub type SepResult<T> = Result<T, SepError>;
