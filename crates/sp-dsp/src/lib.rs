//! # SpectraProbe DSP Core
//!
//! Windowed analysis/synthesis transform (STFT/iSTFT) with weighted
//! overlap-add reconstruction, built for bit-for-bit cross-checking of
//! spectral source-separation pipelines:
//! - Cached, deterministic window construction
//! - Hop-grid framing with no hidden padding policy
//! - Real-input FFT analysis / exact inverse synthesis
//! - Window-energy overlap-add normalization
//!
//! Every stage is a discrete, inspectable component so intermediate
//! values can be dumped and compared against a second implementation.

pub mod error;
pub mod framing;
pub mod signal;
pub mod spectral;
pub mod window;

pub use error::{DspError, DspResult};
pub use framing::{Frame, FramingEngine, OLA_EPSILON};
pub use signal::Signal;
pub use spectral::{SpectralFrame, SpectralTransform, Spectrogram};
pub use window::{Window, WindowKind, WindowTable};
