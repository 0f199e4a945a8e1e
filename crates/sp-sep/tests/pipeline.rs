//! End-to-end pipeline tests with stub inference engines
//!
//! The model is replaced by small predictors with known behavior so the
//! orchestration itself — framing, chunking, mask plumbing, synthesis,
//! failure propagation — is what gets exercised.

use std::sync::Arc;
use std::time::Duration;

use ndarray::Array4;
use sp_dsp::{Signal, WindowKind};
use sp_sep::{
    ConstantMaskPredictor, MaskPredictor, ModelChunk, SepError, SeparationConfig,
    SeparationPipeline, SepResult,
};

fn test_config() -> SeparationConfig {
    SeparationConfig {
        sample_rate: 44100,
        n_fft: 256,
        hop: 64,
        window: WindowKind::Hann,
        freq_bins_limit: 100,
        chunk_frames: 8,
        inference_timeout_ms: None,
        parallel_chunks: true,
        clamp_complement: false,
    }
}

/// Low tone whose energy sits far below the truncation limit.
fn tone(len: usize, phase: f32) -> Vec<f32> {
    (0..len)
        .map(|i| (2.0 * std::f32::consts::PI * 1723.0 * i as f32 / 44100.0 + phase).sin())
        .collect()
}

struct SlowPredictor;

impl MaskPredictor for SlowPredictor {
    fn predict(&self, chunk: &ModelChunk) -> SepResult<Array4<f32>> {
        std::thread::sleep(Duration::from_millis(300));
        Ok(chunk.tensor.clone())
    }
}

struct NanPredictor;

impl MaskPredictor for NanPredictor {
    fn predict(&self, chunk: &ModelChunk) -> SepResult<Array4<f32>> {
        Ok(Array4::from_elem(chunk.tensor.raw_dim(), f32::NAN))
    }
}

struct WrongShapePredictor;

impl MaskPredictor for WrongShapePredictor {
    fn predict(&self, chunk: &ModelChunk) -> SepResult<Array4<f32>> {
        let shape = chunk.tensor.shape();
        Ok(Array4::zeros((1, shape[1], shape[2], shape[3] + 1)))
    }
}

#[test]
fn identity_mask_round_trips_the_mix() {
    let _ = env_logger::builder().is_test(true).try_init();

    let len = 4096;
    let signal = Signal::new(44100, vec![tone(len, 0.0), tone(len, 0.9)]).unwrap();
    let pipeline = SeparationPipeline::new(
        test_config(),
        Arc::new(ConstantMaskPredictor::identity()),
    )
    .unwrap();

    let stems = pipeline.separate(&signal).unwrap();
    assert_eq!(stems.primary.num_channels(), 2);
    assert_eq!(stems.primary.len(), len);

    // Interior samples of the primary stem reproduce the mix; the
    // residual from a unity mask is silence.
    for ch in 0..2 {
        let mix = signal.channel(ch);
        let primary = stems.primary.channel(ch);
        let residual = stems.residual.channel(ch);
        for i in 256..len - 256 {
            assert!(
                (primary[i] - mix[i]).abs() < 1e-4,
                "ch {} sample {}: {} vs {}",
                ch,
                i,
                primary[i],
                mix[i]
            );
            assert!(residual[i].abs() < 1e-4);
        }
    }
}

#[test]
fn mono_input_yields_mono_stems() {
    let len = 2048;
    let signal = Signal::mono(44100, tone(len, 0.0));
    let pipeline = SeparationPipeline::new(
        test_config(),
        Arc::new(ConstantMaskPredictor::identity()),
    )
    .unwrap();

    let stems = pipeline.separate(&signal).unwrap();
    assert_eq!(stems.primary.num_channels(), 1);
    assert_eq!(stems.residual.num_channels(), 1);
    assert_eq!(stems.primary.len(), len);

    let mix = signal.channel(0);
    let primary = stems.primary.channel(0);
    for i in 256..len - 256 {
        assert!((primary[i] - mix[i]).abs() < 1e-4);
    }
}

#[test]
fn chunk_count_and_stats_are_reported() {
    let config = test_config();
    let len = 2048; // padded to 2048 -> (2048-256)/64+1 = 29 frames -> 4 chunks
    let signal = Signal::mono(44100, tone(len, 0.0));
    let pipeline =
        SeparationPipeline::new(config, Arc::new(ConstantMaskPredictor::identity())).unwrap();

    let stems = pipeline.separate(&signal).unwrap();
    assert_eq!(stems.stats.frames, 29);
    assert_eq!(stems.stats.chunks, 4);
    assert!(stems.stats.parallel);
}

#[test]
fn trace_captures_every_stage_boundary() {
    let signal = Signal::mono(44100, tone(1024, 0.0));
    let pipeline = SeparationPipeline::new(
        test_config(),
        Arc::new(ConstantMaskPredictor::identity()),
    )
    .unwrap();

    let (_, trace) = pipeline.separate_traced(&signal).unwrap();
    assert_eq!(trace.window.len(), 256);
    assert_eq!(trace.spectrograms.len(), 2);
    assert_eq!(trace.chunks.len(), trace.chunk_masks.len());
    assert!(!trace.chunks.is_empty());

    let mask = trace.mask.unwrap();
    assert_eq!(mask.shape()[0], 2);
    assert_eq!(mask.shape()[1], 100);
    assert_eq!(mask.shape()[2], trace.spectrograms[0].num_frames());
    assert!(trace.residual_mask.is_some());
}

#[test]
fn nan_from_the_engine_aborts_the_call() {
    let signal = Signal::mono(44100, tone(1024, 0.0));
    let pipeline = SeparationPipeline::new(test_config(), Arc::new(NanPredictor)).unwrap();

    let result = pipeline.separate(&signal);
    assert!(matches!(
        result,
        Err(SepError::Dsp(sp_dsp::DspError::NumericAnomaly { .. }))
    ));
}

#[test]
fn malformed_engine_output_fails_fast() {
    let signal = Signal::mono(44100, tone(1024, 0.0));
    let pipeline =
        SeparationPipeline::new(test_config(), Arc::new(WrongShapePredictor)).unwrap();

    let result = pipeline.separate(&signal);
    assert!(matches!(result, Err(SepError::ShapeMismatch { .. })));
}

#[test]
fn slow_engine_hits_the_timeout() {
    let mut config = test_config();
    config.inference_timeout_ms = Some(10);
    config.parallel_chunks = false;

    let signal = Signal::mono(44100, tone(1024, 0.0));
    let pipeline = SeparationPipeline::new(config, Arc::new(SlowPredictor)).unwrap();

    let result = pipeline.separate(&signal);
    assert!(matches!(result, Err(SepError::InferenceTimeout { .. })));
}

#[test]
fn sample_rate_is_validated() {
    let signal = Signal::mono(48000, tone(1024, 0.0));
    let pipeline = SeparationPipeline::new(
        test_config(),
        Arc::new(ConstantMaskPredictor::identity()),
    )
    .unwrap();

    let result = pipeline.separate(&signal);
    assert!(matches!(
        result,
        Err(SepError::InvalidSampleRate {
            expected: 44100,
            got: 48000
        })
    ));
}

#[test]
fn too_many_channels_are_rejected() {
    let signal = Signal::new(44100, vec![vec![0.0; 512]; 3]).unwrap();
    let pipeline = SeparationPipeline::new(
        test_config(),
        Arc::new(ConstantMaskPredictor::identity()),
    )
    .unwrap();

    assert!(matches!(
        pipeline.separate(&signal),
        Err(SepError::ChannelMismatch { .. })
    ));
}
