//! # SpectraProbe Separation Pipeline
//!
//! Chunked tensor-inference adapter and mask application for spectral
//! source separation:
//! - Fixed-shape `[1, 4, bins, frames]` model chunks with trailing-edge
//!   zero padding and frequency truncation
//! - Complex mask application and amplitude-complement residual masks
//! - Opaque inference seam ([`MaskPredictor`]) with a tract ONNX
//!   backend and a caller-supplied timeout
//! - Stage-by-stage orchestration with optional capture of every
//!   intermediate value for cross-implementation diagnostics
//!
//! Chunks are independent; the inference span runs on a rayon pool when
//! enabled, while overlap-add accumulation stays single-threaded.

pub mod chunk;
pub mod error;
pub mod inference;
pub mod mask;
pub mod pipeline;

pub use chunk::{ChunkAdapter, ModelChunk, MODEL_CHANNELS, MODEL_PLANES};
pub use error::{SepError, SepResult};
pub use inference::{
    predict_with_timeout, ConstantMaskPredictor, MaskPredictor, TractPredictor,
};
pub use mask::{Mask, MaskEngine, MaskEngineConfig};
pub use pipeline::{
    SeparationConfig, SeparationPipeline, SeparationStats, SeparationTrace, Stage, Stems,
};
