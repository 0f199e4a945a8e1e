//! Fixed-shape tensor packaging for the inference engine
//!
//! The model consumes `[1, 4, freq_bins, chunk_frames]` f32 tensors with
//! planes ordered `[ch0_re, ch0_im, ch1_re, ch1_im]`. Frequency bins
//! above the model's limit are discarded (never interpolated); slices
//! shorter than one chunk are zero-padded on the trailing time edge
//! only. Mono input duplicates its single channel into both channel
//! slots — a deliberate approximation, not true stereo separation.

use std::ops::Range;

use ndarray::Array4;
use num_complex::Complex32;

use sp_dsp::Spectrogram;

use crate::error::{SepError, SepResult};
use crate::mask::Mask;

/// Real/imaginary planes per model input: two channels × (re, im)
pub const MODEL_PLANES: usize = 4;

/// Channel slots the model expects
pub const MODEL_CHANNELS: usize = 2;

/// One fixed-shape inference input: `[1, 4, bins, chunk_frames]`
#[derive(Debug, Clone)]
pub struct ModelChunk {
    /// Tensor handed to the inference engine
    pub tensor: Array4<f32>,
    /// Frames carrying data before the trailing zero pad
    pub valid_frames: usize,
    /// Frame offset of this chunk in the source spectrogram
    pub start_frame: usize,
}

impl ModelChunk {
    /// Frequency bins in this chunk
    pub fn num_bins(&self) -> usize {
        self.tensor.shape()[2]
    }

    /// Time capacity of this chunk
    pub fn chunk_frames(&self) -> usize {
        self.tensor.shape()[3]
    }
}

/// Packs spectrogram slices into model tensors and unpacks mask tensors
pub struct ChunkAdapter;

impl ChunkAdapter {
    /// Package a contiguous frame range of one or two channel
    /// spectrograms into a model tensor.
    ///
    /// Fails with `ChunkSizeMismatch` when the range is longer than
    /// `chunk_frames`; slicing down to chunk size is the caller's job
    /// and is never done silently here.
    pub fn to_tensor(
        spectrograms: &[Spectrogram],
        range: Range<usize>,
        freq_bins_limit: usize,
        chunk_frames: usize,
    ) -> SepResult<ModelChunk> {
        if spectrograms.is_empty() || spectrograms.len() > MODEL_CHANNELS {
            return Err(SepError::ChannelMismatch {
                expected: format!("1..={}", MODEL_CHANNELS),
                got: spectrograms.len(),
            });
        }
        if freq_bins_limit == 0 || chunk_frames == 0 {
            return Err(SepError::ShapeMismatch {
                expected: "positive freq_bins_limit and chunk_frames".into(),
                got: format!("limit={}, chunk_frames={}", freq_bins_limit, chunk_frames),
            });
        }

        let num_frames = spectrograms[0].num_frames();
        let num_bins = spectrograms[0].num_bins();
        for s in &spectrograms[1..] {
            if s.num_frames() != num_frames || s.num_bins() != num_bins {
                return Err(SepError::ShapeMismatch {
                    expected: format!("{} frames x {} bins", num_frames, num_bins),
                    got: format!("{} frames x {} bins", s.num_frames(), s.num_bins()),
                });
            }
        }

        if range.start >= range.end || range.end > num_frames {
            return Err(SepError::ShapeMismatch {
                expected: format!("non-empty frame range within 0..{}", num_frames),
                got: format!("{}..{}", range.start, range.end),
            });
        }
        let slice_frames = range.end - range.start;
        if slice_frames > chunk_frames {
            return Err(SepError::ChunkSizeMismatch {
                got: slice_frames,
                capacity: chunk_frames,
            });
        }

        // Truncation only: bins above the limit are discarded
        let bins = freq_bins_limit.min(num_bins);

        let mut tensor = Array4::<f32>::zeros((1, MODEL_PLANES, bins, chunk_frames));
        for slot in 0..MODEL_CHANNELS {
            // Mono duplicates channel 0 into both slots
            let source = &spectrograms[slot.min(spectrograms.len() - 1)];
            for (t, frame_idx) in range.clone().enumerate() {
                let frame = source.frame(frame_idx);
                for b in 0..bins {
                    let c = frame.bins[b];
                    tensor[[0, 2 * slot, b, t]] = c.re;
                    tensor[[0, 2 * slot + 1, b, t]] = c.im;
                }
            }
        }

        Ok(ModelChunk {
            tensor,
            valid_frames: slice_frames,
            start_frame: range.start,
        })
    }

    /// Interpret an inference output tensor as a complex mask,
    /// trimming any trailing time padding back to `original_frames`.
    pub fn from_tensor(tensor: &Array4<f32>, original_frames: usize) -> SepResult<Mask> {
        let shape = tensor.shape();
        if shape[0] != 1 || shape[1] != MODEL_PLANES {
            return Err(SepError::ShapeMismatch {
                expected: format!("[1, {}, bins, frames]", MODEL_PLANES),
                got: format!("{:?}", shape),
            });
        }

        let bins = shape[2];
        let frames = shape[3];
        if original_frames > frames {
            return Err(SepError::ChunkSizeMismatch {
                got: original_frames,
                capacity: frames,
            });
        }

        let mut mask = Mask::zeros((MODEL_CHANNELS, bins, original_frames));
        for slot in 0..MODEL_CHANNELS {
            for b in 0..bins {
                for t in 0..original_frames {
                    mask[[slot, b, t]] = Complex32::new(
                        tensor[[0, 2 * slot, b, t]],
                        tensor[[0, 2 * slot + 1, b, t]],
                    );
                }
            }
        }

        Ok(mask)
    }
}
