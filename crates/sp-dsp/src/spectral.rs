//! Forward and inverse spectral transform of single frames
//!
//! `analyze` produces the non-redundant half-spectrum (N/2+1 bins) of an
//! already-windowed real frame; `synthesize` is its exact numerical
//! inverse. No scaling beyond the 1/N of the inverse FFT is applied
//! here; all amplitude normalization lives in the overlap-add stage.

use std::sync::Arc;

use num_complex::Complex32;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};

use crate::error::{DspError, DspResult};
use crate::framing::Frame;

/// Complex half-spectrum of one frame
#[derive(Debug, Clone)]
pub struct SpectralFrame {
    /// Channel this frame belongs to
    pub channel: usize,
    /// Frame index on the hop grid (time position)
    pub index: usize,
    /// N/2+1 complex bins; bin 0 is DC, the last bin is Nyquist
    pub bins: Vec<Complex32>,
}

impl SpectralFrame {
    /// Magnitude of each bin
    pub fn magnitudes(&self) -> Vec<f32> {
        self.bins.iter().map(|c| c.norm()).collect()
    }

    /// Index of the bin with the largest magnitude
    pub fn peak_bin(&self) -> usize {
        self.bins
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.norm().total_cmp(&b.norm()))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }
}

/// Spectral frames of one channel, in frame-index order
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// Channel id
    pub channel: usize,
    frames: Vec<SpectralFrame>,
}

impl Spectrogram {
    /// Build from frames (already in index order)
    pub fn new(channel: usize, frames: Vec<SpectralFrame>) -> Self {
        Self { channel, frames }
    }

    /// Number of time frames
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Number of frequency bins (0 when empty)
    pub fn num_bins(&self) -> usize {
        self.frames.first().map_or(0, |f| f.bins.len())
    }

    /// All frames
    pub fn frames(&self) -> &[SpectralFrame] {
        &self.frames
    }

    /// One frame by index
    pub fn frame(&self, index: usize) -> &SpectralFrame {
        &self.frames[index]
    }

    /// One complex bin
    pub fn bin(&self, frame: usize, bin: usize) -> Complex32 {
        self.frames[frame].bins[bin]
    }
}

/// FFT-backed analysis/synthesis transform for frames of a fixed size
pub struct SpectralTransform {
    n_fft: usize,
    forward: Arc<dyn RealToComplex<f32>>,
    inverse: Arc<dyn ComplexToReal<f32>>,
}

impl SpectralTransform {
    /// Plan transforms for frames of `n_fft` samples.
    ///
    /// `n_fft` must be a positive even number so the half-spectrum has
    /// an exact Nyquist bin.
    pub fn new(n_fft: usize) -> DspResult<Self> {
        if n_fft == 0 || n_fft % 2 != 0 {
            return Err(DspError::InvalidLength {
                reason: format!("n_fft must be positive and even, got {}", n_fft),
            });
        }

        let mut planner = RealFftPlanner::new();
        Ok(Self {
            n_fft,
            forward: planner.plan_fft_forward(n_fft),
            inverse: planner.plan_fft_inverse(n_fft),
        })
    }

    /// Frame size N
    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    /// Half-spectrum size N/2+1
    pub fn num_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Forward transform of one windowed frame.
    ///
    /// `index` is the frame's position on the caller's hop grid and is
    /// recorded on the result unchanged.
    pub fn analyze(&self, frame: &Frame, index: usize) -> DspResult<SpectralFrame> {
        if frame.samples.len() != self.n_fft {
            return Err(DspError::InvalidLength {
                reason: format!(
                    "frame has {} samples, transform expects {}",
                    frame.samples.len(),
                    self.n_fft
                ),
            });
        }

        let mut input = frame.samples.clone();
        let mut bins = vec![Complex32::new(0.0, 0.0); self.num_bins()];
        let mut scratch = vec![Complex32::new(0.0, 0.0); self.forward.get_scratch_len()];

        self.forward
            .process_with_scratch(&mut input, &mut bins, &mut scratch)
            .map_err(|e| DspError::FftFailed(e.to_string()))?;

        Ok(SpectralFrame {
            channel: frame.channel,
            index,
            bins,
        })
    }

    /// Analyze a whole channel's frames into a spectrogram
    pub fn analyze_all(&self, frames: &[Frame]) -> DspResult<Spectrogram> {
        let channel = frames.first().map_or(0, |f| f.channel);
        let spectral = frames
            .iter()
            .enumerate()
            .map(|(i, f)| self.analyze(f, i))
            .collect::<DspResult<Vec<_>>>()?;
        Ok(Spectrogram::new(channel, spectral))
    }

    /// Inverse transform: half-spectrum back to a real frame of N
    /// samples.
    ///
    /// The full spectrum is implied by conjugate symmetry. Output is
    /// not windowed; the overlap-add stage applies the synthesis
    /// window. `synthesize(analyze(x))` equals `x` to float precision.
    pub fn synthesize(&self, frame: &SpectralFrame) -> DspResult<Vec<f32>> {
        if frame.bins.len() != self.num_bins() {
            return Err(DspError::ShapeMismatch {
                expected: format!("{} bins", self.num_bins()),
                got: format!("{} bins", frame.bins.len()),
            });
        }

        let mut input = frame.bins.clone();
        // realfft's c2r ignores the redundant imaginary parts only in
        // exact arithmetic; zero them so masked DC/Nyquist bins cannot
        // leak into the real frame.
        input[0].im = 0.0;
        let nyquist = self.num_bins() - 1;
        input[nyquist].im = 0.0;

        let mut output = vec![0.0f32; self.n_fft];
        let mut scratch = vec![Complex32::new(0.0, 0.0); self.inverse.get_scratch_len()];

        self.inverse
            .process_with_scratch(&mut input, &mut output, &mut scratch)
            .map_err(|e| DspError::FftFailed(e.to_string()))?;

        // realfft's inverse is unnormalized; 1/N makes this the exact
        // inverse of `analyze`.
        let norm = 1.0 / self.n_fft as f32;
        let mut non_finite = 0usize;
        for sample in &mut output {
            *sample *= norm;
            if !sample.is_finite() {
                non_finite += 1;
            }
        }

        if non_finite > 0 {
            return Err(DspError::NumericAnomaly {
                stage: "synthesize",
                count: non_finite,
            });
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::FramingEngine;
    use crate::window::{WindowKind, WindowTable};

    #[test]
    fn test_odd_or_zero_n_fft_rejected() {
        assert!(SpectralTransform::new(0).is_err());
        assert!(SpectralTransform::new(1023).is_err());
        assert!(SpectralTransform::new(1024).is_ok());
    }

    #[test]
    fn test_analyze_synthesize_round_trip() {
        let n = 512;
        let transform = SpectralTransform::new(n).unwrap();
        let window = WindowTable::new().build(n, WindowKind::Hann).unwrap();

        let samples: Vec<f32> = (0..n)
            .map(|i| (i as f32 * 0.05).sin() + 0.3 * (i as f32 * 0.21).cos())
            .collect();
        let frames = FramingEngine::frame(&samples, &window, n, 0).unwrap();
        assert_eq!(frames.len(), 1);

        let spectral = transform.analyze(&frames[0], 0).unwrap();
        assert_eq!(spectral.bins.len(), n / 2 + 1);

        let restored = transform.synthesize(&spectral).unwrap();
        for (a, b) in frames[0].samples.iter().zip(&restored) {
            assert!((a - b).abs() < 1e-5, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_real_input_symmetry_bins() {
        let n = 64;
        let transform = SpectralTransform::new(n).unwrap();
        let window = WindowTable::new().build(n, WindowKind::Hann).unwrap();
        let samples: Vec<f32> = (0..n).map(|i| ((i % 7) as f32 - 3.0) * 0.1).collect();
        let frames = FramingEngine::frame(&samples, &window, n, 0).unwrap();

        let spectral = transform.analyze(&frames[0], 0).unwrap();
        // DC and Nyquist carry zero imaginary part for real input
        assert!(spectral.bins[0].im.abs() < 1e-5);
        assert!(spectral.bins[n / 2].im.abs() < 1e-5);
    }

    #[test]
    fn test_wrong_bin_count_rejected() {
        let transform = SpectralTransform::new(64).unwrap();
        let frame = SpectralFrame {
            channel: 0,
            index: 0,
            bins: vec![Complex32::new(0.0, 0.0); 16],
        };
        assert!(matches!(
            transform.synthesize(&frame),
            Err(DspError::ShapeMismatch { .. })
        ));
    }
}
