//! Flat numeric text dumps of stage-boundary values
//!
//! The exchange format shared with other implementations of the
//! pipeline: one value per line for real data, `re im` per line for
//! complex data, `{:.9e}` formatting. Deliberately free of any header
//! or framing so any language can produce and consume it.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use num_complex::Complex32;

use sp_dsp::{Spectrogram, Window};
use sp_sep::{Mask, ModelChunk};

use crate::error::{DiffError, DiffResult};

/// Write real values, one per line
pub fn dump_reals<P: AsRef<Path>>(path: P, values: &[f32]) -> DiffResult<()> {
    let mut writer = BufWriter::new(File::create(&path)?);
    for v in values {
        writeln!(writer, "{:.9e}", v)?;
    }
    writer.flush()?;
    log::debug!(
        "dumped {} values to {}",
        values.len(),
        path.as_ref().display()
    );
    Ok(())
}

/// Write complex values, `re im` per line
pub fn dump_complex<P: AsRef<Path>>(path: P, values: &[Complex32]) -> DiffResult<()> {
    let mut writer = BufWriter::new(File::create(&path)?);
    for c in values {
        writeln!(writer, "{:.9e} {:.9e}", c.re, c.im)?;
    }
    writer.flush()?;
    Ok(())
}

/// Load every float in the file, in order (handles both real and
/// complex dumps: a complex dump loads as interleaved re/im pairs)
pub fn load_values<P: AsRef<Path>>(path: P) -> DiffResult<Vec<f32>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);

    let mut values = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        for token in line.split_whitespace() {
            let value: f32 = token.parse().map_err(|_| DiffError::Parse {
                path: path.display().to_string(),
                line: line_no + 1,
                reason: format!("not a float: {:?}", token),
            })?;
            values.push(value);
        }
    }
    Ok(values)
}

/// Dump a window's coefficients
pub fn dump_window<P: AsRef<Path>>(path: P, window: &Window) -> DiffResult<()> {
    dump_reals(path, window.coefficients())
}

/// Dump a spectrogram frame-major: all bins of frame 0, then frame 1, …
pub fn dump_spectrogram<P: AsRef<Path>>(path: P, spectrogram: &Spectrogram) -> DiffResult<()> {
    let mut values = Vec::with_capacity(spectrogram.num_frames() * spectrogram.num_bins());
    for frame in spectrogram.frames() {
        values.extend_from_slice(&frame.bins);
    }
    dump_complex(path, &values)
}

/// Dump a model chunk plane-major, matching the tensor's memory order
pub fn dump_chunk<P: AsRef<Path>>(path: P, chunk: &ModelChunk) -> DiffResult<()> {
    let flat: Vec<f32> = chunk.tensor.iter().copied().collect();
    dump_reals(path, &flat)
}

/// Dump a mask channel-major as `re im` lines
pub fn dump_mask<P: AsRef<Path>>(path: P, mask: &Mask) -> DiffResult<()> {
    let flat: Vec<Complex32> = mask.iter().copied().collect();
    dump_complex(path, &flat)
}
