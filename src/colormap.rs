//! Colormaps for mapping normalized values to RGB.
//!
//! Gradients are linear interpolations between key colors.

/// Maps a normalized scalar to an RGB color.
pub trait Colormap {
    /// Map a value in [0, 1] to an RGB color. Out-of-range input is clamped.
    fn map(&self, value: f64) -> [u8; 3];

    /// Color used for values that cannot be normalized (NaN).
    fn bad(&self) -> [u8; 3] {
        [255, 255, 255]
    }
}

/// Reversed grayscale: 0 is white, 1 is black.
pub struct GrayR;

/// Viridis: dark purple through teal to yellow.
pub struct Viridis;

// Sampled from the reference viridis table at eighths.
const VIRIDIS_KEYS: &[(f64, [u8; 3])] = &[
    (0.000, [68, 1, 84]),
    (0.125, [71, 44, 122]),
    (0.250, [59, 81, 139]),
    (0.375, [44, 113, 142]),
    (0.500, [33, 144, 141]),
    (0.625, [39, 173, 129]),
    (0.750, [92, 200, 99]),
    (0.875, [170, 220, 50]),
    (1.000, [253, 231, 37]),
];

fn interpolate(keys: &[(f64, [u8; 3])], value: f64) -> [u8; 3] {
    let v = value.clamp(0.0, 1.0);

    let upper = keys
        .iter()
        .position(|&(t, _)| t >= v)
        .unwrap_or(keys.len() - 1);
    if upper == 0 {
        return keys[0].1;
    }

    let (t0, c0) = keys[upper - 1];
    let (t1, c1) = keys[upper];
    let t = (v - t0) / (t1 - t0);
    let lerp = |a: u8, b: u8| (a as f64 + t * (b as f64 - a as f64)).round() as u8;

    [lerp(c0[0], c1[0]), lerp(c0[1], c1[1]), lerp(c0[2], c1[2])]
}

impl Colormap for GrayR {
    fn map(&self, value: f64) -> [u8; 3] {
        let v = ((1.0 - value.clamp(0.0, 1.0)) * 255.0).round() as u8;
        [v, v, v]
    }
}

impl Colormap for Viridis {
    fn map(&self, value: f64) -> [u8; 3] {
        interpolate(VIRIDIS_KEYS, value)
    }
}

/// Selectable colormaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColormapType {
    GrayR,
    #[default]
    Viridis,
}

impl ColormapType {
    pub fn get(&self) -> Box<dyn Colormap> {
        match self {
            ColormapType::GrayR => Box::new(GrayR),
            ColormapType::Viridis => Box::new(Viridis),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ColormapType::GrayR => "gray_r",
            ColormapType::Viridis => "viridis",
        }
    }
}
