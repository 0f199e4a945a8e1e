//! # SpectraProbe Diff Tooling
//!
//! Cross-implementation agreement checks for the separation pipeline:
//! - Flat numeric text dumps of every stage-boundary value (window,
//!   spectrogram, model chunk, mask) in a language-neutral format
//! - Tolerance-based comparison with JSON reports
//!
//! A reference implementation dumps its intermediates, this one dumps
//! the same stages, and `compare_dirs` pins down the first stage where
//! the two pipelines diverge.

pub mod compare;
pub mod dump;
pub mod error;

pub use compare::{compare_dirs, compare_files, compare_values, DiffConfig, DiffReport};
pub use dump::{
    dump_chunk, dump_complex, dump_mask, dump_reals, dump_spectrogram, dump_window, load_values,
};
pub use error::{DiffError, DiffResult};
