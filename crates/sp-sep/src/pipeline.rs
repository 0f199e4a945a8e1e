//! Separation pipeline orchestration
//!
//! Drives one separation call through its stages:
//! `Framed → Transformed → Chunked → Inferred → Masked → Synthesized →
//! Done`. Chunks carry no state between each other, so the
//! Chunked→Inferred→Masked span runs on a rayon pool when enabled;
//! framing and the overlap-add accumulation stay single-threaded per
//! channel. A failure at any stage aborts the whole call — no partial
//! stems are ever returned.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ndarray::{Array3, Axis};
use num_complex::Complex32;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use sp_dsp::{
    DspError, FramingEngine, Signal, SpectralFrame, SpectralTransform, Spectrogram, Window,
    WindowKind, WindowTable,
};

use crate::chunk::{ChunkAdapter, ModelChunk, MODEL_CHANNELS};
use crate::error::{SepError, SepResult};
use crate::inference::{predict_with_timeout, validate_mask_shape, MaskPredictor};
use crate::mask::{Mask, MaskEngine, MaskEngineConfig};

/// Pipeline stages, strictly sequential per channel and per chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Signal sliced into windowed frames
    Framed,
    /// Frames transformed to spectral frames
    Transformed,
    /// Spectrogram packaged into model tensors
    Chunked,
    /// Masks received from the inference engine
    Inferred,
    /// Masks applied to the spectrogram
    Masked,
    /// Masked spectra synthesized and overlap-added
    Synthesized,
    /// Stems ready
    Done,
}

/// Separation configuration.
///
/// Defaults match the MDX-Net style vocal/instrumental model the
/// reference pipeline runs: 4096-point Hann analysis at 75% overlap,
/// bins truncated to 2048, 256-frame chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeparationConfig {
    /// Model sample rate in Hz
    pub sample_rate: u32,

    /// STFT frame size
    pub n_fft: usize,

    /// STFT hop size
    pub hop: usize,

    /// Analysis/synthesis window kind
    pub window: WindowKind,

    /// Frequency bins kept for the model (truncation, never expansion)
    pub freq_bins_limit: usize,

    /// Time frames per model chunk
    pub chunk_frames: usize,

    /// Budget for one inference call; `None` waits indefinitely
    pub inference_timeout_ms: Option<u64>,

    /// Run chunks on a worker pool
    pub parallel_chunks: bool,

    /// Clamp residual-mask magnitudes into [0, 1] (documented option,
    /// off by default)
    pub clamp_complement: bool,
}

impl Default for SeparationConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            n_fft: 4096,
            hop: 1024,
            window: WindowKind::Hann,
            freq_bins_limit: 2048,
            chunk_frames: 256,
            inference_timeout_ms: Some(30_000),
            parallel_chunks: true,
            clamp_complement: false,
        }
    }
}

/// Processing statistics for one separation call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeparationStats {
    /// Spectral frames per channel
    pub frames: usize,

    /// Model chunks processed
    pub chunks: usize,

    /// Wall-clock time (ms)
    pub total_time_ms: u64,

    /// Chunks ran on the worker pool
    pub parallel: bool,
}

/// Separated output stems
#[derive(Debug, Clone)]
pub struct Stems {
    /// The stem the model isolates (e.g. vocals)
    pub primary: Signal,

    /// Amplitude-complement residual (e.g. instrumental)
    pub residual: Signal,

    /// Processing stats
    pub stats: SeparationStats,
}

/// Intermediate values captured at each stage boundary, for diagnostic
/// dumping and cross-implementation comparison
#[derive(Debug, Clone, Default)]
pub struct SeparationTrace {
    /// Analysis/synthesis window coefficients
    pub window: Vec<f32>,

    /// Mix spectrogram per model channel
    pub spectrograms: Vec<Spectrogram>,

    /// Model input tensors, in chunk order
    pub chunks: Vec<ModelChunk>,

    /// Raw per-chunk masks, in chunk order
    pub chunk_masks: Vec<Mask>,

    /// Full primary mask after concatenation
    pub mask: Option<Mask>,

    /// Derived residual mask
    pub residual_mask: Option<Mask>,
}

/// Orchestrates framing, transform, chunked inference, masking and
/// synthesis for one model
pub struct SeparationPipeline {
    config: SeparationConfig,
    windows: WindowTable,
    transform: SpectralTransform,
    mask_engine: MaskEngine,
    predictor: Arc<dyn MaskPredictor>,
}

impl SeparationPipeline {
    /// Create a pipeline around an inference engine
    pub fn new(config: SeparationConfig, predictor: Arc<dyn MaskPredictor>) -> SepResult<Self> {
        if config.hop == 0 || config.hop > config.n_fft {
            return Err(DspError::InvalidLength {
                reason: format!("hop {} outside 1..={}", config.hop, config.n_fft),
            }
            .into());
        }
        if config.freq_bins_limit == 0 || config.chunk_frames == 0 {
            return Err(DspError::InvalidLength {
                reason: "freq_bins_limit and chunk_frames must be positive".into(),
            }
            .into());
        }

        let transform = SpectralTransform::new(config.n_fft)?;
        let mask_engine = MaskEngine::new(MaskEngineConfig {
            clamp_magnitude: config.clamp_complement,
        });

        Ok(Self {
            config,
            windows: WindowTable::new(),
            transform,
            mask_engine,
            predictor,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &SeparationConfig {
        &self.config
    }

    /// Separate a signal into primary and residual stems
    pub fn separate(&self, signal: &Signal) -> SepResult<Stems> {
        self.run(signal, false).map(|(stems, _)| stems)
    }

    /// Separate and capture every stage-boundary value for diagnostics
    pub fn separate_traced(&self, signal: &Signal) -> SepResult<(Stems, SeparationTrace)> {
        self.run(signal, true)
            .map(|(stems, trace)| (stems, trace.unwrap_or_default()))
    }

    fn run(
        &self,
        signal: &Signal,
        capture: bool,
    ) -> SepResult<(Stems, Option<SeparationTrace>)> {
        let started = Instant::now();

        if signal.num_channels() > MODEL_CHANNELS {
            return Err(SepError::ChannelMismatch {
                expected: format!("1..={}", MODEL_CHANNELS),
                got: signal.num_channels(),
            });
        }
        if signal.sample_rate() != self.config.sample_rate {
            return Err(SepError::InvalidSampleRate {
                expected: self.config.sample_rate,
                got: signal.sample_rate(),
            });
        }
        if signal.is_empty() {
            return Err(DspError::InvalidLength {
                reason: "empty signal".into(),
            }
            .into());
        }

        let window = self.windows.build(self.config.n_fft, self.config.window)?;
        let padded_len = self.padded_len(signal.len());

        // Framed / Transformed, per model channel (mono duplicated)
        let mut spectrograms = Vec::with_capacity(MODEL_CHANNELS);
        for slot in 0..MODEL_CHANNELS {
            let source = signal.channel(slot.min(signal.num_channels() - 1));
            let mut padded = Vec::with_capacity(padded_len);
            padded.extend_from_slice(source);
            padded.resize(padded_len, 0.0);

            let frames = FramingEngine::frame(&padded, &window, self.config.hop, slot)?;
            log::debug!("[{:?}] channel {}: {} frames", Stage::Framed, slot, frames.len());

            let spectrogram = self.transform.analyze_all(&frames)?;
            log::debug!(
                "[{:?}] channel {}: {} bins",
                Stage::Transformed,
                slot,
                spectrogram.num_bins()
            );
            spectrograms.push(spectrogram);
        }

        let num_frames = spectrograms[0].num_frames();
        let bins = self.config.freq_bins_limit.min(self.transform.num_bins());

        // Chunked → Inferred → Masked per chunk, independent and
        // order-preserving
        let ranges: Vec<std::ops::Range<usize>> = (0..num_frames)
            .step_by(self.config.chunk_frames)
            .map(|start| start..(start + self.config.chunk_frames).min(num_frames))
            .collect();
        log::debug!("[{:?}] {} chunks of {} frames", Stage::Chunked, ranges.len(), self.config.chunk_frames);

        let process = |range: &std::ops::Range<usize>| -> SepResult<(ModelChunk, Mask)> {
            let chunk = ChunkAdapter::to_tensor(
                &spectrograms,
                range.clone(),
                self.config.freq_bins_limit,
                self.config.chunk_frames,
            )?;

            let output = match self.config.inference_timeout_ms {
                Some(ms) => predict_with_timeout(
                    Arc::clone(&self.predictor),
                    chunk.clone(),
                    Duration::from_millis(ms),
                )?,
                None => self.predictor.predict(&chunk)?,
            };
            validate_mask_shape(&chunk, output.shape())?;

            let mask = ChunkAdapter::from_tensor(&output, chunk.valid_frames)?;
            Ok((chunk, mask))
        };

        let results: Vec<(ModelChunk, Mask)> = if self.config.parallel_chunks {
            ranges.par_iter().map(process).collect::<SepResult<_>>()?
        } else {
            ranges.iter().map(process).collect::<SepResult<_>>()?
        };
        log::debug!("[{:?}] {} chunk masks received", Stage::Inferred, results.len());

        let (chunks, chunk_masks): (Vec<ModelChunk>, Vec<Mask>) = results.into_iter().unzip();

        let mask_views: Vec<_> = chunk_masks.iter().map(|m| m.view()).collect();
        let full_mask =
            ndarray::concatenate(Axis(2), &mask_views).map_err(|e| SepError::ShapeMismatch {
                expected: "chunk masks concatenable along time".into(),
                got: e.to_string(),
            })?;

        // Masked
        let mix = mix_tensor(&spectrograms, bins);
        let primary_spec = self.mask_engine.apply(&mix, &full_mask)?;
        let residual_mask = self.mask_engine.complement(&full_mask);
        let residual_spec = self.mask_engine.apply(&mix, &residual_mask)?;
        log::debug!("[{:?}] primary + residual masks applied", Stage::Masked);

        // Synthesized
        let primary = self.synthesize_stem(&primary_spec, &window, padded_len, signal)?;
        let residual = self.synthesize_stem(&residual_spec, &window, padded_len, signal)?;
        log::debug!("[{:?}] stems reconstructed", Stage::Synthesized);

        let stats = SeparationStats {
            frames: num_frames,
            chunks: ranges.len(),
            total_time_ms: started.elapsed().as_millis() as u64,
            parallel: self.config.parallel_chunks,
        };
        log::info!(
            "[{:?}] {} frames, {} chunks in {}ms ({})",
            Stage::Done,
            stats.frames,
            stats.chunks,
            stats.total_time_ms,
            self.predictor.name()
        );

        let trace = capture.then(|| SeparationTrace {
            window: window.coefficients().to_vec(),
            spectrograms,
            chunks,
            chunk_masks,
            mask: Some(full_mask),
            residual_mask: Some(residual_mask),
        });

        Ok((
            Stems {
                primary,
                residual,
                stats,
            },
            trace,
        ))
    }

    /// Tail-pad the input so the last hop-grid frame covers the signal
    /// end (the frame-count floor would otherwise drop the tail).
    fn padded_len(&self, len: usize) -> usize {
        let n = self.config.n_fft;
        if len <= n {
            n
        } else {
            n + (len - n).div_ceil(self.config.hop) * self.config.hop
        }
    }

    /// Masked spectrum back to a time-domain stem. Bins above the model
    /// limit were discarded at truncation and synthesize as zero.
    fn synthesize_stem(
        &self,
        masked: &Array3<Complex32>,
        window: &Window,
        padded_len: usize,
        input: &Signal,
    ) -> SepResult<Signal> {
        let num_frames = masked.shape()[2];
        let bins = masked.shape()[1];
        let full_bins = self.transform.num_bins();

        let mut slot_outputs = Vec::with_capacity(MODEL_CHANNELS);
        for slot in 0..MODEL_CHANNELS {
            let mut synthesis = Vec::with_capacity(num_frames);
            for t in 0..num_frames {
                let mut frame_bins = vec![Complex32::new(0.0, 0.0); full_bins];
                for b in 0..bins {
                    frame_bins[b] = masked[[slot, b, t]];
                }
                let spectral = SpectralFrame {
                    channel: slot,
                    index: t,
                    bins: frame_bins,
                };
                synthesis.push(self.transform.synthesize(&spectral)?);
            }

            let mut samples =
                FramingEngine::reconstruct(&synthesis, window, self.config.hop, padded_len)?;
            samples.truncate(input.len());
            slot_outputs.push(samples);
        }

        // Mono input went through the model duplicated; average it back
        // instead of returning fake stereo.
        let channels = if input.num_channels() == 1 {
            let (left, right) = (slot_outputs.remove(0), slot_outputs.remove(0));
            vec![left
                .iter()
                .zip(&right)
                .map(|(l, r)| 0.5 * (l + r))
                .collect()]
        } else {
            slot_outputs
        };

        Ok(Signal::new(input.sample_rate(), channels)?)
    }
}

/// Stack per-channel spectrograms into a `[channels, bins, frames]`
/// complex tensor, truncated to the model's bin count.
fn mix_tensor(spectrograms: &[Spectrogram], bins: usize) -> Array3<Complex32> {
    let num_frames = spectrograms[0].num_frames();
    let mut mix = Array3::zeros((spectrograms.len(), bins, num_frames));
    for (slot, spectrogram) in spectrograms.iter().enumerate() {
        for t in 0..num_frames {
            let frame = spectrogram.frame(t);
            for b in 0..bins {
                mix[[slot, b, t]] = frame.bins[b];
            }
        }
    }
    mix
}
