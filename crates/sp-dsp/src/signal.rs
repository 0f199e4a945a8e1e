//! In-memory audio signal model
//!
//! A `Signal` is a planar (channel-major) float buffer with a sample
//! rate. All channels share one length; file I/O lives outside this
//! crate and hands buffers in through `new` or `from_interleaved`.

use crate::error::{DspError, DspResult};

/// Multi-channel audio signal (planar storage)
#[derive(Debug, Clone)]
pub struct Signal {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl Signal {
    /// Create from planar channel buffers.
    ///
    /// All channels must have the same length.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> DspResult<Self> {
        if channels.is_empty() {
            return Err(DspError::InvalidLength {
                reason: "signal needs at least one channel".into(),
            });
        }

        let len = channels[0].len();
        for (ch, samples) in channels.iter().enumerate() {
            if samples.len() != len {
                return Err(DspError::ShapeMismatch {
                    expected: format!("{} samples (channel 0)", len),
                    got: format!("{} samples (channel {})", samples.len(), ch),
                });
            }
        }

        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// Create a mono signal
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            channels: vec![samples],
        }
    }

    /// Create from an interleaved buffer
    pub fn from_interleaved(
        sample_rate: u32,
        interleaved: &[f32],
        num_channels: usize,
    ) -> DspResult<Self> {
        if num_channels == 0 {
            return Err(DspError::InvalidLength {
                reason: "signal needs at least one channel".into(),
            });
        }
        if interleaved.len() % num_channels != 0 {
            return Err(DspError::ShapeMismatch {
                expected: format!("length divisible by {} channels", num_channels),
                got: format!("{} samples", interleaved.len()),
            });
        }

        let samples = interleaved.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(samples); num_channels];
        for (i, &sample) in interleaved.iter().enumerate() {
            channels[i % num_channels].push(sample);
        }

        Self::new(sample_rate, channels)
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    /// True if the signal holds no samples
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    /// One channel's samples
    pub fn channel(&self, ch: usize) -> &[f32] {
        &self.channels[ch]
    }

    /// Interleave channels into one buffer
    pub fn to_interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.len() * self.num_channels());
        for i in 0..self.len() {
            for ch in &self.channels {
                out.push(ch[i]);
            }
        }
        out
    }

    /// Average all channels down to mono
    pub fn to_mono(&self) -> Vec<f32> {
        if self.num_channels() == 1 {
            return self.channels[0].clone();
        }

        let scale = 1.0 / self.num_channels() as f32;
        (0..self.len())
            .map(|i| self.channels.iter().map(|ch| ch[i]).sum::<f32>() * scale)
            .collect()
    }

    /// Peak absolute sample value across all channels
    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|ch| ch.iter())
            .map(|s| s.abs())
            .fold(0.0f32, f32::max)
    }

    /// RMS level across all channels
    pub fn rms(&self) -> f32 {
        let total: usize = self.channels.iter().map(|ch| ch.len()).sum();
        if total == 0 {
            return 0.0;
        }
        let sum_sq: f32 = self
            .channels
            .iter()
            .flat_map(|ch| ch.iter())
            .map(|&s| s * s)
            .sum();
        (sum_sq / total as f32).sqrt()
    }
}
