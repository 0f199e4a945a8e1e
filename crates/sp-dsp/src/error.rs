//! Error types for the DSP core

use thiserror::Error;

/// DSP processing error types
#[derive(Error, Debug)]
pub enum DspError {
    /// Bad window or frame length
    #[error("Invalid length: {reason}")]
    InvalidLength { reason: String },

    /// Buffer or spectrum shape inconsistency
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    /// Channel count mismatch
    #[error("Channel count mismatch: expected {expected}, got {got}")]
    ChannelMismatch { expected: usize, got: usize },

    /// FFT backend failure
    #[error("FFT failed: {0}")]
    FftFailed(String),

    /// NaN or Inf detected in a stage output
    #[error("Numeric anomaly in {stage}: {count} non-finite samples")]
    NumericAnomaly { stage: &'static str, count: usize },
}

/// Result type for DSP operations
pub type DspResult<T> = Result<T, DspError>;
