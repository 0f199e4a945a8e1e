//! Tolerance-based comparison of numeric dumps
//!
//! Compares a candidate dump against a reference dump and produces a
//! serializable report. The metrics are the ones that have actually
//! caught cross-implementation bugs: maximum absolute difference (frame
//! alignment, scaling), RMS difference (broadband noise floor), and the
//! difference relative to the reference peak (amplitude-normalization
//! mistakes that scale with signal level).

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dump::load_values;
use crate::error::{DiffError, DiffResult};

/// Comparison tolerances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Maximum allowed absolute difference per value
    pub max_abs_tolerance: f32,

    /// Maximum allowed RMS difference over the whole dump
    pub rms_tolerance: f32,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            max_abs_tolerance: 1e-5,
            rms_tolerance: 1e-6,
        }
    }
}

impl DiffConfig {
    /// Loose tolerances for comparing across FFT libraries
    pub fn cross_library() -> Self {
        Self {
            max_abs_tolerance: 1e-4,
            rms_tolerance: 1e-5,
        }
    }
}

/// Result of comparing one candidate dump against its reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffReport {
    /// Dump name (file stem)
    pub name: String,

    /// Values compared
    pub len: usize,

    /// Largest absolute difference
    pub max_abs_diff: f32,

    /// Index of the largest difference
    pub max_abs_index: usize,

    /// RMS of the difference
    pub rms_diff: f32,

    /// Peak absolute reference value (for relative interpretation)
    pub reference_peak: f32,

    /// Verdict under the config used
    pub passed: bool,
}

impl DiffReport {
    /// Largest difference relative to the reference peak
    pub fn relative_to_peak(&self) -> f32 {
        if self.reference_peak > 0.0 {
            self.max_abs_diff / self.reference_peak
        } else {
            self.max_abs_diff
        }
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> DiffResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Compare two value sequences
pub fn compare_values(
    name: &str,
    reference: &[f32],
    candidate: &[f32],
    config: &DiffConfig,
) -> DiffResult<DiffReport> {
    if reference.len() != candidate.len() {
        return Err(DiffError::LengthMismatch {
            reference: reference.len(),
            candidate: candidate.len(),
        });
    }

    let mut max_abs_diff = 0.0f32;
    let mut max_abs_index = 0usize;
    let mut sum_sq = 0.0f64;
    let mut reference_peak = 0.0f32;

    for (i, (&r, &c)) in reference.iter().zip(candidate).enumerate() {
        let diff = (r - c).abs();
        if diff > max_abs_diff {
            max_abs_diff = diff;
            max_abs_index = i;
        }
        sum_sq += (diff as f64) * (diff as f64);
        reference_peak = reference_peak.max(r.abs());
    }

    let rms_diff = if reference.is_empty() {
        0.0
    } else {
        (sum_sq / reference.len() as f64).sqrt() as f32
    };

    let passed = max_abs_diff <= config.max_abs_tolerance && rms_diff <= config.rms_tolerance;
    let report = DiffReport {
        name: name.to_string(),
        len: reference.len(),
        max_abs_diff,
        max_abs_index,
        rms_diff,
        reference_peak,
        passed,
    };

    if !passed {
        log::warn!(
            "{}: max_abs {:.3e} at {} (rms {:.3e}) exceeds tolerance",
            name,
            max_abs_diff,
            max_abs_index,
            rms_diff
        );
    }

    Ok(report)
}

/// Compare two dump files
pub fn compare_files<P: AsRef<Path>>(
    reference: P,
    candidate: P,
    config: &DiffConfig,
) -> DiffResult<DiffReport> {
    let name = reference
        .as_ref()
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("dump")
        .to_string();

    let ref_values = load_values(&reference)?;
    let cand_values = load_values(&candidate)?;
    compare_values(&name, &ref_values, &cand_values, config)
}

/// Compare every dump in `reference_dir` against the same file name in
/// `candidate_dir`. Missing candidates are skipped with a warning;
/// order is stable by file name.
pub fn compare_dirs<P: AsRef<Path>>(
    reference_dir: P,
    candidate_dir: P,
    config: &DiffConfig,
) -> DiffResult<Vec<DiffReport>> {
    let mut entries = BTreeMap::new();
    for entry in std::fs::read_dir(&reference_dir)? {
        let entry = entry?;
        if entry.path().is_file() {
            entries.insert(entry.file_name(), entry.path());
        }
    }

    let mut reports = Vec::with_capacity(entries.len());
    for (file_name, ref_path) in entries {
        let cand_path = candidate_dir.as_ref().join(&file_name);
        if !cand_path.exists() {
            log::warn!("no candidate for {:?}, skipping", file_name);
            continue;
        }
        reports.push(compare_files(&ref_path, &cand_path, config)?);
    }

    Ok(reports)
}
