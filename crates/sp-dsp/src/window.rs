//! Analysis/synthesis window construction and caching
//!
//! Windows are pure functions of (length, kind). The table caches built
//! windows by key so repeated lookups return the same shared instance,
//! which guarantees bit-identical coefficients for a matched
//! analysis/synthesis pair.

use std::collections::HashMap;
use std::f32::consts::PI;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{DspError, DspResult};

/// Window function kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowKind {
    /// Hann (raised cosine), the production window for 75% overlap
    Hann,
    /// Hamming
    Hamming,
    /// 4-term Blackman-Harris
    BlackmanHarris,
}

impl WindowKind {
    /// Short name for file naming and logs
    pub fn short_name(&self) -> &'static str {
        match self {
            WindowKind::Hann => "hann",
            WindowKind::Hamming => "hamming",
            WindowKind::BlackmanHarris => "blackman_harris",
        }
    }
}

/// An immutable window of N coefficients
#[derive(Debug, Clone)]
pub struct Window {
    kind: WindowKind,
    coefficients: Vec<f32>,
}

impl Window {
    /// Window kind
    pub fn kind(&self) -> WindowKind {
        self.kind
    }

    /// Window length N
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    /// True for a zero-length window (never produced by `build`)
    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Window coefficients
    pub fn coefficients(&self) -> &[f32] {
        &self.coefficients
    }

    /// Sum of squared coefficients
    pub fn energy(&self) -> f32 {
        self.coefficients.iter().map(|&w| w * w).sum()
    }
}

/// Cache of built windows, keyed by (length, kind)
#[derive(Debug, Default)]
pub struct WindowTable {
    cache: Mutex<HashMap<(usize, WindowKind), Arc<Window>>>,
}

impl WindowTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build (or fetch from cache) a window of `len` coefficients.
    ///
    /// Deterministic: two calls with the same key return the same shared
    /// instance. Fails with `InvalidLength` for a zero length.
    pub fn build(&self, len: usize, kind: WindowKind) -> DspResult<Arc<Window>> {
        if len == 0 {
            return Err(DspError::InvalidLength {
                reason: "window length must be positive".into(),
            });
        }

        let mut cache = self.cache.lock();
        let window = cache
            .entry((len, kind))
            .or_insert_with(|| Arc::new(compute_window(len, kind)));
        Ok(Arc::clone(window))
    }

    /// Number of cached windows
    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }
}

/// Compute window coefficients (periodic form, as used for STFT)
fn compute_window(len: usize, kind: WindowKind) -> Window {
    let n = len as f32;
    let coefficients = match kind {
        WindowKind::Hann => (0..len)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / n).cos()))
            .collect(),
        WindowKind::Hamming => (0..len)
            .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f32 / n).cos())
            .collect(),
        WindowKind::BlackmanHarris => (0..len)
            .map(|i| {
                let x = 2.0 * PI * i as f32 / n;
                0.35875 - 0.48829 * x.cos() + 0.14128 * (2.0 * x).cos()
                    - 0.01168 * (3.0 * x).cos()
            })
            .collect(),
    };

    Window { kind, coefficients }
}
