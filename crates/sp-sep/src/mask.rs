//! Complex mask application and amplitude complement
//!
//! Masks come back from the inference engine with no inherent magnitude
//! bound — values above 1 are legal model output and are applied as-is.
//! The residual (complement) mask keeps the predicted phase and inverts
//! only the amplitude: `(1 − |m|) · e^(i·arg m)`. This is an
//! approximation of an ideal complementary separation and is not energy
//! conserving in general; it matches the reference implementation and
//! is kept as a documented limitation rather than "fixed".

use ndarray::Array3;
use num_complex::Complex32;
use serde::{Deserialize, Serialize};

use crate::error::{SepError, SepResult};

/// Complex-valued mask, `[channels, bins, frames]`
pub type Mask = Array3<Complex32>;

/// Mask engine options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct MaskEngineConfig {
    /// Clamp complement magnitudes into [0, 1]. Off by default: the
    /// unclamped form is what the reference pipeline produces, and
    /// clamping changes the residual stem audibly.
    pub clamp_magnitude: bool,
}

/// Applies masks to spectrogram slices and derives residual masks
#[derive(Debug, Clone, Default)]
pub struct MaskEngine {
    config: MaskEngineConfig,
}

impl MaskEngine {
    /// Create with options
    pub fn new(config: MaskEngineConfig) -> Self {
        Self { config }
    }

    /// Elementwise complex multiplication of `slice` by `mask`.
    ///
    /// Shapes must match exactly; a mismatch means an upstream
    /// truncation or chunking bug and fails fast.
    pub fn apply(&self, slice: &Array3<Complex32>, mask: &Mask) -> SepResult<Array3<Complex32>> {
        if slice.shape() != mask.shape() {
            return Err(SepError::ShapeMismatch {
                expected: format!("{:?}", slice.shape()),
                got: format!("{:?}", mask.shape()),
            });
        }
        Ok(slice * mask)
    }

    /// Amplitude-complement mask with preserved phase.
    pub fn complement(&self, mask: &Mask) -> Mask {
        mask.map(|m| {
            let mut amplitude = 1.0 - m.norm();
            if self.config.clamp_magnitude {
                amplitude = amplitude.clamp(0.0, 1.0);
            }
            Complex32::from_polar(amplitude, m.arg())
        })
    }
}
