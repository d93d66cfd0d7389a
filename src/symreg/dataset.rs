//! Tabular sample files.
//!
//! One sample per line: the input values followed by the target, separated
//! by tabs or spaces. Every row must have the same number of columns.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// One regression sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Input values, bound to the variables `x1..xN` in order.
    pub inputs: Vec<f64>,
    /// Expected output.
    pub target: f64,
}

impl Sample {
    /// Create a sample.
    #[must_use]
    pub fn new(inputs: Vec<f64>, target: f64) -> Self {
        Self { inputs, target }
    }
}

/// Errors raised while reading samples.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A value is not a number.
    #[error("line {line}: '{token}' is not a number")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// Offending token.
        token: String,
    },

    /// A row has a different width than the first one.
    #[error("line {line}: expected {expected} columns, found {found}")]
    Ragged {
        /// 1-based line number.
        line: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of this row.
        found: usize,
    },

    /// A row has no input column.
    #[error("line {line}: need at least one input and a target, found {found} column(s)")]
    TooNarrow {
        /// 1-based line number.
        line: usize,
        /// Width of this row.
        found: usize,
    },

    /// The file holds no samples.
    #[error("no samples found")]
    Empty,
}

/// Parse samples from text.
///
/// Blank lines are skipped.
///
/// # Errors
///
/// Returns a [`DatasetError`] for unparsable values, rows of differing
/// widths, rows with fewer than two columns, or input without any row.
pub fn parse_samples(text: &str) -> Result<Vec<Sample>, DatasetError> {
    let mut samples = Vec::new();
    let mut width = None;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        if raw.trim().is_empty() {
            continue;
        }

        let values = raw
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|_| DatasetError::Parse {
                    line,
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if values.len() < 2 {
            return Err(DatasetError::TooNarrow {
                line,
                found: values.len(),
            });
        }
        let expected = *width.get_or_insert(values.len());
        if values.len() != expected {
            return Err(DatasetError::Ragged {
                line,
                expected,
                found: values.len(),
            });
        }

        let (target, inputs) = values.split_last().ok_or(DatasetError::Empty)?;
        samples.push(Sample::new(inputs.to_vec(), *target));
    }

    if samples.is_empty() {
        return Err(DatasetError::Empty);
    }
    Ok(samples)
}

/// Read samples from a file.
///
/// # Errors
///
/// Returns [`DatasetError::Io`] if the file cannot be read, or any error of
/// [`parse_samples`].
pub fn load_samples(path: &Path) -> Result<Vec<Sample>, DatasetError> {
    let text = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let samples = parse_samples(&text)?;
    log::info!(
        "loaded {} samples with {} input(s) from {}",
        samples.len(),
        samples.first().map_or(0, |s| s.inputs.len()),
        path.display()
    );
    Ok(samples)
}
