//! Render plain-text numeric matrices as images, and generate such matrices
//! from Julia sets.

pub mod cli;
pub mod colormap;
pub mod complex;
pub mod display;
pub mod julia;
pub mod matrix;
pub mod render;

pub use colormap::{Colormap, ColormapType};
pub use complex::Complex;
pub use julia::{JuliaParams, JuliaSet};
pub use matrix::{finite_range, load_matrix, parse_str, Matrix, MatrixError};
pub use render::{Figure, FigureStyle, Normalize};
