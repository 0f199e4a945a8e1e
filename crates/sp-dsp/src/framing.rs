//! Signal framing and weighted overlap-add reconstruction
//!
//! The forward path slices a channel into overlapping windowed frames on
//! a fixed hop grid. The inverse path sums synthesis frames back into a
//! continuous signal, normalized by accumulated window energy. The
//! window-energy normalization is the contract both sides of a
//! cross-implementation comparison must match bit-for-bit; dividing by
//! the plain window sum or a fixed 1/N instead silently changes output
//! amplitude.

use crate::error::{DspError, DspResult};
use crate::window::Window;

/// Accumulated window energy below this is treated as an unreachable
/// edge and left unnormalized.
pub const OLA_EPSILON: f32 = 1e-8;

/// One windowed slice of a signal channel
#[derive(Debug, Clone)]
pub struct Frame {
    /// Channel this frame was cut from
    pub channel: usize,
    /// Starting sample offset in the source channel
    pub offset: usize,
    /// Windowed samples, length N
    pub samples: Vec<f32>,
}

/// Stateless framing / overlap-add engine
pub struct FramingEngine;

impl FramingEngine {
    /// Number of frames produced for a channel of `len` samples
    pub fn frame_count(len: usize, frame_size: usize, hop: usize) -> usize {
        if len < frame_size {
            0
        } else {
            (len - frame_size) / hop + 1
        }
    }

    fn check_hop(frame_size: usize, hop: usize) -> DspResult<()> {
        if hop == 0 || hop > frame_size {
            return Err(DspError::InvalidLength {
                reason: format!("hop {} outside 1..={}", hop, frame_size),
            });
        }
        Ok(())
    }

    /// Slice `samples` into overlapping windowed frames.
    ///
    /// Returns zero frames when the channel is shorter than the window;
    /// padding for tail coverage is the caller's policy, not applied
    /// here.
    pub fn frame(
        samples: &[f32],
        window: &Window,
        hop: usize,
        channel: usize,
    ) -> DspResult<Vec<Frame>> {
        let n = window.len();
        Self::check_hop(n, hop)?;

        let count = Self::frame_count(samples.len(), n, hop);
        let coeffs = window.coefficients();

        let mut frames = Vec::with_capacity(count);
        for i in 0..count {
            let offset = i * hop;
            let windowed = samples[offset..offset + n]
                .iter()
                .zip(coeffs)
                .map(|(&s, &w)| s * w)
                .collect();
            frames.push(Frame {
                channel,
                offset,
                samples: windowed,
            });
        }

        log::debug!(
            "framed {} samples into {} frames (n={}, hop={})",
            samples.len(),
            frames.len(),
            n,
            hop
        );

        Ok(frames)
    }

    /// Weighted overlap-add reconstruction.
    ///
    /// `frames` are synthesis outputs in frame-index order (frame i
    /// lands at offset i*hop). Each frame is windowed here (the second
    /// windowing of the analysis/synthesis pair), accumulated, and the
    /// result divided by the accumulated window energy. Edge positions
    /// whose accumulated energy is below [`OLA_EPSILON`] are left
    /// undivided to avoid blowing up on near-zero denominators.
    pub fn reconstruct(
        frames: &[Vec<f32>],
        window: &Window,
        hop: usize,
        out_len: usize,
    ) -> DspResult<Vec<f32>> {
        let n = window.len();
        Self::check_hop(n, hop)?;

        let coeffs = window.coefficients();
        let mut output = vec![0.0f32; out_len];
        let mut energy = vec![0.0f32; out_len];

        for (i, frame) in frames.iter().enumerate() {
            if frame.len() != n {
                return Err(DspError::ShapeMismatch {
                    expected: format!("{} samples per synthesis frame", n),
                    got: format!("{} samples (frame {})", frame.len(), i),
                });
            }

            let start = i * hop;
            for (j, (&sample, &w)) in frame.iter().zip(coeffs).enumerate() {
                let pos = start + j;
                if pos >= out_len {
                    break;
                }
                output[pos] += sample * w;
                energy[pos] += w * w;
            }
        }

        for (out, &e) in output.iter_mut().zip(&energy) {
            if e >= OLA_EPSILON {
                *out /= e;
            }
        }

        let non_finite = output.iter().filter(|s| !s.is_finite()).count();
        if non_finite > 0 {
            return Err(DspError::NumericAnomaly {
                stage: "overlap-add",
                count: non_finite,
            });
        }

        Ok(output)
    }
}
