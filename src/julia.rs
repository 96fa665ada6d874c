//! Escape-time sampling of a Julia set for `f(z) = z^2 + c`.
//!
//! Each sample of a rectangular window is iterated until `|z|` exceeds the
//! divergence radius `R = (1 + sqrt(1 + 4|c|)) / 2`. The recorded value is
//! `k / max_iters` for the iteration `k` at which it escaped, `0` for samples
//! that start outside `R`, and `1` for samples that never escape.

use anyhow::{Context, Result};
use log::{debug, info};
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use ndarray::Array2;

use crate::complex::Complex;
use crate::matrix::Matrix;

/// Largest grid `JuliaSet::new` will lay out.
pub const MAX_SAMPLES: usize = 1 << 28;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JuliaParams {
    /// Parameter in `f(z) = z^2 + c`
    pub c: Complex,
    /// One corner of the window
    pub z0: Complex,
    /// Opposite corner
    pub z1: Complex,
    /// Sample spacing
    pub dx: f64,
    pub max_iters: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JuliaError {
    InvalidStep(f64),
    NonFiniteCorner,
    EmptyWindow { rows: usize, cols: usize },
    WindowTooLarge { rows: usize, cols: usize },
}

impl fmt::Display for JuliaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JuliaError::InvalidStep(dx) => {
                write!(f, "step size must be positive and finite, got {dx}")
            }
            JuliaError::NonFiniteCorner => write!(f, "window corners must be finite"),
            JuliaError::EmptyWindow { rows, cols } => {
                write!(f, "window holds no samples ({rows} rows x {cols} cols)")
            }
            JuliaError::WindowTooLarge { rows, cols } => write!(
                f,
                "window of {rows} rows x {cols} cols exceeds {MAX_SAMPLES} samples"
            ),
        }
    }
}

impl std::error::Error for JuliaError {}

#[derive(Debug, Clone, Copy)]
enum Sample {
    Live(Complex),
    Escaped(f64),
}

impl Sample {
    fn value(&self) -> f64 {
        match *self {
            Sample::Escaped(v) => v,
            Sample::Live(_) => 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JuliaSet {
    c: Complex,
    radius: f64,
    lower_left: Complex,
    rows: usize,
    cols: usize,
    max_iters: usize,
    samples: Vec<Sample>,
}

/// Divergence radius for parameter `c`.
pub fn escape_radius(c: Complex) -> f64 {
    0.5 * (1.0 + (1.0 + 4.0 * c.abs()).sqrt())
}

impl JuliaSet {
    /// Lay out the sample grid. Nothing is iterated until [`compute`].
    ///
    /// [`compute`]: JuliaSet::compute
    pub fn new(params: JuliaParams) -> Result<Self, JuliaError> {
        let JuliaParams {
            c,
            z0,
            z1,
            dx,
            max_iters,
        } = params;

        if !(dx.is_finite() && dx > 0.0) {
            return Err(JuliaError::InvalidStep(dx));
        }
        let finite = |z: Complex| z.re.is_finite() && z.im.is_finite();
        if !finite(z0) || !finite(z1) {
            return Err(JuliaError::NonFiniteCorner);
        }

        let lower_left = Complex::new(z0.re.min(z1.re), z0.im.min(z1.im));
        let upper_right = Complex::new(z0.re.max(z1.re), z0.im.max(z1.im));
        let rows = ((upper_right.im - lower_left.im) / dx).floor() as usize;
        let cols = ((upper_right.re - lower_left.re) / dx).floor() as usize;
        if rows == 0 || cols == 0 {
            return Err(JuliaError::EmptyWindow { rows, cols });
        }
        let total = rows
            .checked_mul(cols)
            .filter(|&n| n <= MAX_SAMPLES)
            .ok_or(JuliaError::WindowTooLarge { rows, cols })?;

        let radius = escape_radius(c);
        let escaped = |z: Complex| z.norm_sqr() > radius * radius;
        let mut samples = Vec::with_capacity(total);
        for i in 0..rows {
            for j in 0..cols {
                let z = Complex::new(
                    lower_left.re + j as f64 * dx,
                    lower_left.im + i as f64 * dx,
                );
                samples.push(if escaped(z) {
                    Sample::Escaped(0.0)
                } else {
                    Sample::Live(z)
                });
            }
        }
        debug!("julia grid {rows}x{cols}, radius {radius}");

        Ok(Self {
            c,
            radius,
            lower_left,
            rows,
            cols,
            max_iters,
            samples,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn lower_left(&self) -> Complex {
        self.lower_left
    }

    /// Iterate every live sample up to `max_iters` times.
    pub fn compute(&mut self) {
        let (c, max_iters) = (self.c, self.max_iters);
        let r2 = self.radius * self.radius;
        let mut escaped = 0usize;
        for sample in self.samples.iter_mut() {
            let Sample::Live(mut z) = *sample else {
                continue;
            };
            for k in 0..max_iters {
                z = z * z + c;
                if z.norm_sqr() > r2 {
                    *sample = Sample::Escaped(k as f64 / max_iters as f64);
                    escaped += 1;
                    break;
                }
            }
        }
        info!(
            "iterated {} samples, {escaped} escaped within {max_iters} iterations",
            self.samples.len()
        );
    }

    /// Per-sample values, row-major.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(Sample::value)
    }

    pub fn to_matrix(&self) -> Matrix {
        let cols = self.cols;
        Array2::from_shape_fn((self.rows, cols), |(i, j)| self.samples[i * cols + j].value())
    }

    /// Write one line per row, each value followed by a tab.
    pub fn write_to<W: Write>(&self, mut out: W) -> io::Result<()> {
        for row in self.to_matrix().rows() {
            for v in row {
                write!(out, "{v}\t")?;
            }
            writeln!(out)?;
        }
        out.flush()
    }

    /// Write the values to `path`, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        self.write_to(BufWriter::new(file))
            .with_context(|| format!("Failed to write output file: {}", path.display()))
    }
}
