//! Dump a full pipeline trace and check self-agreement
//!
//! Exercises the path the tooling exists for: capture every stage
//! boundary of one separation call, dump it to the text exchange
//! format, and run the batch comparison. Comparing a run against
//! itself must produce an all-pass report with zero difference.

use std::path::Path;
use std::sync::Arc;

use sp_diff::{compare_dirs, dump_chunk, dump_mask, dump_reals, dump_spectrogram, DiffConfig};
use sp_dsp::{Signal, WindowKind};
use sp_sep::{ConstantMaskPredictor, SeparationConfig, SeparationPipeline, SeparationTrace};

fn run_traced() -> SeparationTrace {
    let config = SeparationConfig {
        sample_rate: 44100,
        n_fft: 256,
        hop: 64,
        window: WindowKind::Hann,
        freq_bins_limit: 100,
        chunk_frames: 8,
        inference_timeout_ms: None,
        parallel_chunks: false,
        clamp_complement: false,
    };

    let samples: Vec<f32> = (0..2048)
        .map(|i| (2.0 * std::f32::consts::PI * 1723.0 * i as f32 / 44100.0).sin())
        .collect();
    let signal = Signal::mono(44100, samples);

    let pipeline =
        SeparationPipeline::new(config, Arc::new(ConstantMaskPredictor::identity())).unwrap();
    let (_, trace) = pipeline.separate_traced(&signal).unwrap();
    trace
}

fn dump_trace(dir: &Path, trace: &SeparationTrace) {
    dump_reals(dir.join("window.txt"), &trace.window).unwrap();
    for (ch, spectrogram) in trace.spectrograms.iter().enumerate() {
        dump_spectrogram(dir.join(format!("spectrogram_ch{}.txt", ch)), spectrogram).unwrap();
    }
    for (i, chunk) in trace.chunks.iter().enumerate() {
        dump_chunk(dir.join(format!("chunk_{:03}.txt", i)), chunk).unwrap();
    }
    for (i, mask) in trace.chunk_masks.iter().enumerate() {
        dump_mask(dir.join(format!("mask_{:03}.txt", i)), mask).unwrap();
    }
    dump_mask(dir.join("mask_full.txt"), trace.mask.as_ref().unwrap()).unwrap();
    dump_mask(
        dir.join("mask_residual.txt"),
        trace.residual_mask.as_ref().unwrap(),
    )
    .unwrap();
}

#[test]
fn traced_run_agrees_with_itself() {
    let root = tempfile::tempdir().unwrap();
    let ref_dir = root.path().join("reference");
    let cand_dir = root.path().join("candidate");
    std::fs::create_dir_all(&ref_dir).unwrap();
    std::fs::create_dir_all(&cand_dir).unwrap();

    // Two identical runs of a deterministic pipeline
    dump_trace(&ref_dir, &run_traced());
    dump_trace(&cand_dir, &run_traced());

    let reports = compare_dirs(&ref_dir, &cand_dir, &DiffConfig::default()).unwrap();
    assert!(!reports.is_empty());
    for report in &reports {
        assert!(report.passed, "{} diverged: {:?}", report.name, report);
        assert_eq!(report.max_abs_diff, 0.0, "{} not bit-identical", report.name);
    }
}
