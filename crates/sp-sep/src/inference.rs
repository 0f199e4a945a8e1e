//! Inference engine seam
//!
//! The pipeline only needs a synchronous tensor-in/tensor-out call with
//! a fixed shape; everything behind [`MaskPredictor`] is opaque. The
//! bundled backend is tract (pure Rust ONNX). Output shape is validated
//! at this boundary so malformed inference results fail fast instead of
//! propagating downstream.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ndarray::Array4;

use crate::chunk::ModelChunk;
use crate::error::{SepError, SepResult};

/// Synchronous mask-prediction engine.
///
/// Implementations must be callable from worker threads; if the
/// underlying engine is single-threaded, serialize inside `predict`.
pub trait MaskPredictor: Send + Sync {
    /// Map a model chunk to a mask tensor of the same shape
    fn predict(&self, chunk: &ModelChunk) -> SepResult<Array4<f32>>;

    /// Engine name for logs and reports
    fn name(&self) -> &str {
        "predictor"
    }
}

/// Tract model wrapper
type TractPlan = tract_onnx::prelude::SimplePlan<
    tract_onnx::prelude::TypedFact,
    Box<dyn tract_onnx::prelude::TypedOp>,
    tract_onnx::prelude::Graph<
        tract_onnx::prelude::TypedFact,
        Box<dyn tract_onnx::prelude::TypedOp>,
    >,
>;

/// ONNX mask predictor backed by tract
pub struct TractPredictor {
    plan: TractPlan,
    name: String,
}

impl TractPredictor {
    /// Load an ONNX model from disk
    pub fn load<P: AsRef<Path>>(model_path: P) -> SepResult<Self> {
        use tract_onnx::prelude::*;

        let path = model_path.as_ref();
        if !path.exists() {
            return Err(SepError::ModelNotFound {
                path: path.display().to_string(),
            });
        }

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("onnx-model")
            .to_string();

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| SepError::TractError(e.to_string()))?
            .into_optimized()
            .map_err(|e| SepError::TractError(e.to_string()))?
            .into_runnable()
            .map_err(|e| SepError::TractError(e.to_string()))?;

        log::info!("loaded mask model {} from {}", name, path.display());

        Ok(Self { plan, name })
    }
}

impl MaskPredictor for TractPredictor {
    fn predict(&self, chunk: &ModelChunk) -> SepResult<Array4<f32>> {
        use tract_onnx::prelude::*;

        let tensor: Tensor = chunk.tensor.clone().into_dyn().into();
        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| SepError::TractError(e.to_string()))?;

        let output = outputs.first().ok_or_else(|| SepError::InferenceFailed {
            reason: "no output from model".into(),
        })?;

        let view = output
            .to_array_view::<f32>()
            .map_err(|e| SepError::TractError(e.to_string()))?;

        validate_mask_shape(chunk, view.shape())?;

        view.to_owned()
            .into_dimensionality::<ndarray::Ix4>()
            .map_err(|e| SepError::InferenceFailed {
                reason: format!("shape conversion failed: {}", e),
            })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Null engine returning the same complex mask value everywhere.
///
/// `ConstantMaskPredictor::identity()` yields a unity mask, which makes
/// the pipeline a pure analysis/synthesis round trip — the standard
/// way to validate the transform chain without a model in the loop.
#[derive(Debug, Clone, Copy)]
pub struct ConstantMaskPredictor {
    /// Mask value written into every bin
    pub value: num_complex::Complex32,
}

impl ConstantMaskPredictor {
    /// Unity mask (primary stem reproduces the mix)
    pub fn identity() -> Self {
        Self {
            value: num_complex::Complex32::new(1.0, 0.0),
        }
    }
}

impl MaskPredictor for ConstantMaskPredictor {
    fn predict(&self, chunk: &ModelChunk) -> SepResult<Array4<f32>> {
        let shape = chunk.tensor.raw_dim();
        let mut output = Array4::zeros(shape);
        let planes = chunk.tensor.shape()[1];
        for slot in 0..planes / 2 {
            output
                .index_axis_mut(ndarray::Axis(1), 2 * slot)
                .fill(self.value.re);
            output
                .index_axis_mut(ndarray::Axis(1), 2 * slot + 1)
                .fill(self.value.im);
        }
        Ok(output)
    }

    fn name(&self) -> &str {
        "constant-mask"
    }
}

/// Strict boundary check: the mask tensor must mirror the input shape.
pub fn validate_mask_shape(chunk: &ModelChunk, got: &[usize]) -> SepResult<()> {
    let expected = chunk.tensor.shape();
    if got != expected {
        return Err(SepError::ShapeMismatch {
            expected: format!("{:?}", expected),
            got: format!("{:?}", got),
        });
    }
    Ok(())
}

/// Run one prediction under a caller-supplied timeout.
///
/// The engine call itself cannot be cancelled; on expiry the worker
/// thread is abandoned to finish in the background and
/// `InferenceTimeout` is returned. Retrying is the caller's policy.
pub fn predict_with_timeout(
    predictor: Arc<dyn MaskPredictor>,
    chunk: ModelChunk,
    timeout: Duration,
) -> SepResult<Array4<f32>> {
    let (tx, rx) = crossbeam_channel::bounded(1);

    std::thread::spawn(move || {
        let _ = tx.send(predictor.predict(&chunk));
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(_) => Err(SepError::InferenceTimeout {
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::MODEL_PLANES;

    struct SlowPredictor(Duration);

    impl MaskPredictor for SlowPredictor {
        fn predict(&self, chunk: &ModelChunk) -> SepResult<Array4<f32>> {
            std::thread::sleep(self.0);
            Ok(chunk.tensor.clone())
        }
    }

    fn dummy_chunk() -> ModelChunk {
        ModelChunk {
            tensor: Array4::zeros((1, MODEL_PLANES, 8, 4)),
            valid_frames: 4,
            start_frame: 0,
        }
    }

    #[test]
    fn test_missing_model_file() {
        let result = TractPredictor::load("/nonexistent/model.onnx");
        assert!(matches!(result, Err(SepError::ModelNotFound { .. })));
    }

    #[test]
    fn test_shape_validation() {
        let chunk = dummy_chunk();
        assert!(validate_mask_shape(&chunk, &[1, 4, 8, 4]).is_ok());
        assert!(validate_mask_shape(&chunk, &[1, 4, 8, 5]).is_err());
        assert!(validate_mask_shape(&chunk, &[1, 4, 8]).is_err());
    }

    #[test]
    fn test_timeout_expires() {
        let predictor: Arc<dyn MaskPredictor> =
            Arc::new(SlowPredictor(Duration::from_millis(500)));
        let result =
            predict_with_timeout(predictor, dummy_chunk(), Duration::from_millis(20));
        assert!(matches!(result, Err(SepError::InferenceTimeout { .. })));
    }

    #[test]
    fn test_timeout_not_hit() {
        let predictor: Arc<dyn MaskPredictor> =
            Arc::new(SlowPredictor(Duration::from_millis(1)));
        let result =
            predict_with_timeout(predictor, dummy_chunk(), Duration::from_millis(2000));
        assert!(result.is_ok());
    }
}
