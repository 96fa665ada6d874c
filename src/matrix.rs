//! Plain-text numeric matrices.
//!
//! Rows are lines, columns are whitespace-separated tokens (spaces or tabs).
//! Blank lines are skipped and `#` starts a comment that runs to the end of
//! the line. Every data row must have the same number of columns.

use log::debug;
use ndarray::{Array2, ShapeError};
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Parsed matrix, indexed `[row, col]`.
pub type Matrix = Array2<f64>;

/// Errors produced while loading a matrix.
#[derive(Debug)]
pub enum MatrixError {
    /// Underlying read failure (missing file, permissions, invalid UTF-8)
    Io(io::Error),
    /// A token that is not a floating point number
    Parse {
        line: usize,
        column: usize,
        token: String,
    },
    /// A row whose length differs from the first data row
    Ragged {
        line: usize,
        expected: usize,
        found: usize,
    },
    /// No data rows at all
    Empty,
    Shape(ShapeError),
}

impl fmt::Display for MatrixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatrixError::Io(e) => write!(f, "I/O error: {e}"),
            MatrixError::Parse {
                line,
                column,
                token,
            } => write!(
                f,
                "could not convert '{token}' to a number (line {line}, column {column})"
            ),
            MatrixError::Ragged {
                line,
                expected,
                found,
            } => write!(
                f,
                "wrong number of columns at line {line}: expected {expected}, found {found}"
            ),
            MatrixError::Empty => write!(f, "input contains no data rows"),
            MatrixError::Shape(e) => write!(f, "invalid matrix shape: {e}"),
        }
    }
}

impl std::error::Error for MatrixError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MatrixError::Io(e) => Some(e),
            MatrixError::Shape(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for MatrixError {
    fn from(e: io::Error) -> Self {
        MatrixError::Io(e)
    }
}

impl From<ShapeError> for MatrixError {
    fn from(e: ShapeError) -> Self {
        MatrixError::Shape(e)
    }
}

/// Parse a matrix from any buffered reader.
pub fn parse_matrix<R: BufRead>(reader: R) -> Result<Matrix, MatrixError> {
    let mut data: Vec<f64> = Vec::new();
    let mut cols: Option<usize> = None;
    let mut rows = 0usize;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let lineno = idx + 1;
        let content = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line.as_str(),
        };

        let before = data.len();
        for (col, token) in content.split_whitespace().enumerate() {
            let value = token.parse::<f64>().map_err(|_| MatrixError::Parse {
                line: lineno,
                column: col + 1,
                token: token.to_string(),
            })?;
            data.push(value);
        }

        let found = data.len() - before;
        if found == 0 {
            continue;
        }

        match cols {
            None => cols = Some(found),
            Some(expected) if expected != found => {
                return Err(MatrixError::Ragged {
                    line: lineno,
                    expected,
                    found,
                });
            }
            Some(_) => {}
        }
        rows += 1;
    }

    let cols = cols.ok_or(MatrixError::Empty)?;
    debug!("parsed matrix {rows}x{cols}");
    Ok(Array2::from_shape_vec((rows, cols), data)?)
}

pub fn parse_str(text: &str) -> Result<Matrix, MatrixError> {
    parse_matrix(text.as_bytes())
}

/// Load a matrix from a text file on disk.
pub fn load_matrix(path: &Path) -> Result<Matrix, MatrixError> {
    let file = File::open(path)?;
    parse_matrix(BufReader::new(file))
}

/// Smallest and largest finite values, or `None` if there are none.
pub fn finite_range(matrix: &Matrix) -> Option<(f64, f64)> {
    matrix
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
