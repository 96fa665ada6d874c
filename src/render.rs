use anyhow::{anyhow, bail, Context, Result};
use image::{ImageBuffer, Rgb, RgbImage};
use log::debug;
use ndarray::Array2;
use plotters::prelude::*;
use plotters::style::FontStyle;
use std::path::Path;
use std::sync::OnceLock;

use crate::colormap::{Colormap, ColormapType};
use crate::matrix::{finite_range, Matrix};

// --- figure layout constants ---

/// Default figure size in inches (width, height).
pub const DEFAULT_FIGSIZE: (f64, f64) = (6.4, 4.8);
pub const DEFAULT_DPI: f64 = 100.0;
/// Margin kept around the content when cropping tightly, in inches.
pub const TIGHT_PAD_INCHES: f64 = 0.1;
/// Largest canvas `Figure::render` will allocate.
pub const MAX_CANVAS_PIXELS: f64 = 64.0 * 1024.0 * 1024.0;

// Axes box as fractions of the figure (left, bottom, right, top).
const AXES_LEFT: f64 = 0.125;
const AXES_RIGHT: f64 = 0.9;
const AXES_BOTTOM: f64 = 0.11;
const AXES_TOP: f64 = 0.88;

const TICK_FONT_PT: f64 = 10.0;
const TICK_LENGTH_PT: f64 = 3.5;
const MAX_TICKS: usize = 10;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

static DEJAVU_SANS: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Linear mapping from `[vmin, vmax]` onto `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalize {
    pub vmin: f64,
    pub vmax: f64,
}

impl Normalize {
    /// Range of the finite values in the matrix (`[0, 1]` if there are none).
    pub fn from_matrix(matrix: &Matrix) -> Self {
        let (vmin, vmax) = finite_range(matrix).unwrap_or((0.0, 1.0));
        Self { vmin, vmax }
    }

    /// `None` for NaN. A degenerate range maps everything to 0.
    pub fn apply(&self, value: f64) -> Option<f64> {
        if value.is_nan() {
            return None;
        }
        if self.vmax == self.vmin {
            return Some(0.0);
        }
        Some(((value - self.vmin) / (self.vmax - self.vmin)).clamp(0.0, 1.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FigureStyle {
    pub colormap: ColormapType,
    /// Hide ticks, labels and the frame.
    pub axis_off: bool,
    pub figsize: (f64, f64),
    pub dpi: f64,
}

impl Default for FigureStyle {
    fn default() -> Self {
        Self {
            colormap: ColormapType::default(),
            axis_off: false,
            figsize: DEFAULT_FIGSIZE,
            dpi: DEFAULT_DPI,
        }
    }
}

/// Pixel rectangle within the figure canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A rendered matrix on a figure canvas.
#[derive(Debug, Clone)]
pub struct Figure {
    canvas: RgbImage,
    content: Bounds,
    dpi: f64,
}

impl Figure {
    /// Render `matrix` with nearest-neighbor cells centered in the axes box,
    /// keeping cells square and row 0 at the top.
    pub fn render(matrix: &Matrix, style: &FigureStyle) -> Result<Self> {
        let (fig_w, fig_h) = canvas_size(style)?;

        let ax_x0 = AXES_LEFT * fig_w as f64;
        let ax_w = (AXES_RIGHT - AXES_LEFT) * fig_w as f64;
        // image rows grow downward, so the top edge sits at 1 - AXES_TOP
        let ax_y0 = (1.0 - AXES_TOP) * fig_h as f64;
        let ax_h = (AXES_TOP - AXES_BOTTOM) * fig_h as f64;

        let (rows, cols) = matrix.dim();
        let scale = (ax_w / cols as f64).min(ax_h / rows as f64);
        let width = ((cols as f64 * scale).round() as u32).max(1);
        let height = ((rows as f64 * scale).round() as u32).max(1);
        let content = Bounds {
            x: (ax_x0 + (ax_w - width as f64) / 2.0).round().max(0.0) as u32,
            y: (ax_y0 + (ax_h - height as f64) / 2.0).round().max(0.0) as u32,
            width,
            height,
        };
        debug!(
            "figure {fig_w}x{fig_h}, image {}x{} at ({}, {})",
            content.width,
            content.height,
            content.x,
            content.y
        );

        let norm = Normalize::from_matrix(matrix);
        let cmap = style.colormap.get();
        let colors = colorize(matrix, &norm, cmap.as_ref());

        let mut canvas: RgbImage = ImageBuffer::from_pixel(fig_w, fig_h, BACKGROUND);
        for py in 0..content.height {
            let row = ((py as u64 * rows as u64) / content.height as u64) as usize;
            for px in 0..content.width {
                let col = ((px as u64 * cols as u64) / content.width as u64) as usize;
                let (x, y) = (content.x + px, content.y + py);
                if x < fig_w && y < fig_h {
                    canvas.put_pixel(x, y, colors[[row, col]]);
                }
            }
        }

        if !style.axis_off {
            draw_axes(&mut canvas, &content, (rows, cols), style.dpi)?;
        }

        Ok(Self {
            canvas,
            content,
            dpi: style.dpi,
        })
    }

    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.canvas
    }

    /// Where the matrix cells were drawn on the canvas.
    pub fn content_bounds(&self) -> Bounds {
        self.content
    }

    /// Canvas cropped to the cells plus `TIGHT_PAD_INCHES` of margin.
    pub fn tight_image(&self) -> RgbImage {
        let pad = (TIGHT_PAD_INCHES * self.dpi).round() as u32;
        let x0 = self.content.x.saturating_sub(pad);
        let y0 = self.content.y.saturating_sub(pad);
        let x1 = (self.content.x + self.content.width + pad).min(self.width());
        let y1 = (self.content.y + self.content.height + pad).min(self.height());
        image::imageops::crop_imm(&self.canvas, x0, y0, x1 - x0, y1 - y0).to_image()
    }

    pub fn to_argb(&self) -> Vec<u32> {
        self.canvas
            .pixels()
            .map(|p| {
                let [r, g, b] = p.0;
                0xFF00_0000 | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
            })
            .collect()
    }

    /// Encode as PNG bytes, optionally cropped tightly.
    pub fn encode_png(&self, tight: bool) -> Result<Vec<u8>> {
        let img = if tight {
            self.tight_image()
        } else {
            self.canvas.clone()
        };

        let mut out: Vec<u8> = Vec::new();
        let dynimg = image::DynamicImage::ImageRgb8(img);
        dynimg
            .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
            .context("Failed to encode output PNG")?;
        Ok(out)
    }

    /// Write the figure to `path` as PNG, replacing any existing file.
    pub fn save_png(&self, path: &Path, tight: bool) -> Result<()> {
        let bytes = self.encode_png(tight)?;
        std::fs::write(path, bytes)
            .with_context(|| format!("Failed to save output image: {}", path.display()))
    }
}

fn canvas_size(style: &FigureStyle) -> Result<(u32, u32)> {
    let w = (style.figsize.0 * style.dpi).round();
    let h = (style.figsize.1 * style.dpi).round();
    if !(w.is_finite() && h.is_finite()) || w * h > MAX_CANVAS_PIXELS {
        bail!(
            "figure of {w}x{h} pixels at dpi {} exceeds the {MAX_CANVAS_PIXELS} pixel limit",
            style.dpi
        );
    }
    Ok(((w as u32).max(1), (h as u32).max(1)))
}

fn colorize(matrix: &Matrix, norm: &Normalize, cmap: &dyn Colormap) -> Array2<Rgb<u8>> {
    matrix.map(|&v| match norm.apply(v) {
        Some(t) => Rgb(cmap.map(t)),
        None => Rgb(cmap.bad()),
    })
}

fn register_font() -> Result<()> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let ok = *REGISTERED.get_or_init(|| {
        plotters::style::register_font("sans-serif", FontStyle::Normal, DEJAVU_SANS).is_ok()
    });
    if !ok {
        bail!("Failed to load the bundled tick label font");
    }
    Ok(())
}

fn format_tick(v: f64) -> String {
    let r = v.round();
    if (v - r).abs() < 1e-9 {
        format!("{}", r as i64)
    } else {
        format!("{v:.1}")
    }
}

// Ticks, tick labels and frame around `content`. The chart is placed so its
// plotting area coincides with the cells; cell centers sit on integer
// coordinates and the y labels count rows from the top.
fn draw_axes(
    canvas: &mut RgbImage,
    content: &Bounds,
    (rows, cols): (usize, usize),
    dpi: f64,
) -> Result<()> {
    register_font()?;

    let (w, h) = canvas.dimensions();
    let font_px = (TICK_FONT_PT * dpi / 72.0).round().max(1.0);
    let tick_px = (TICK_LENGTH_PT * dpi / 72.0).round().max(1.0) as i32;

    let below = h.saturating_sub(content.y + content.height);
    let y_area = (font_px as u32 * 4).min(content.x) as i32;
    let x_area = (font_px as u32 * 2).min(below) as i32;

    let root = BitMapBackend::with_buffer(&mut **canvas, (w, h)).into_drawing_area();
    let area = root.clone().shrink(
        (content.x as i32 - y_area, content.y as i32),
        (
            content.width as i32 + y_area,
            content.height as i32 + x_area,
        ),
    );

    let mut chart = ChartBuilder::on(&area)
        .x_label_area_size(x_area)
        .y_label_area_size(y_area)
        .build_cartesian_2d(-0.5..cols as f64 - 0.5, -0.5..rows as f64 - 0.5)
        .map_err(|e| anyhow!("Failed to lay out axes: {e:?}"))?;
    debug!("axes plotting area {:?}", chart.plotting_area().get_pixel_range());

    let col_label = |x: &f64| format_tick(*x);
    let row_label = |y: &f64| format_tick(rows as f64 - 1.0 - *y);
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(cols.min(MAX_TICKS))
        .y_labels(rows.min(MAX_TICKS))
        .x_label_formatter(&col_label)
        .y_label_formatter(&row_label)
        .label_style(("sans-serif", font_px).into_font().color(&BLACK))
        .axis_style(BLACK.stroke_width(1))
        .set_all_tick_mark_size(tick_px)
        .draw()
        .map_err(|e| anyhow!("Failed to draw axes: {e:?}"))?;

    let top_left = (content.x as i32 - 1, content.y as i32 - 1);
    let bottom_right = (
        (content.x + content.width) as i32,
        (content.y + content.height) as i32,
    );
    root.draw(&Rectangle::new([top_left, bottom_right], BLACK.stroke_width(1)))
        .map_err(|e| anyhow!("Failed to draw axes frame: {e:?}"))?;
    root.present()
        .map_err(|e| anyhow!("Failed to draw axes: {e:?}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::parse_str;

    const BLACK_PX: Rgb<u8> = Rgb([0, 0, 0]);

    fn gray_style() -> FigureStyle {
        FigureStyle {
            colormap: ColormapType::GrayR,
            axis_off: true,
            ..FigureStyle::default()
        }
    }

    fn has_dark_pixel(img: &RgbImage, xs: std::ops::Range<u32>, ys: std::ops::Range<u32>) -> bool {
        ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
            .any(|(x, y)| img.get_pixel(x, y).0[0] < 128)
    }

    #[test]
    fn normalize_handles_degenerate_and_nan() {
        let n = Normalize {
            vmin: 2.0,
            vmax: 2.0,
        };
        assert_eq!(n.apply(2.0), Some(0.0));
        assert_eq!(n.apply(f64::NAN), None);

        let n = Normalize {
            vmin: 0.0,
            vmax: 4.0,
        };
        assert_eq!(n.apply(1.0), Some(0.25));
        assert_eq!(n.apply(9.0), Some(1.0));
        assert_eq!(n.apply(f64::NEG_INFINITY), Some(0.0));
    }

    #[test]
    fn default_figure_is_640_by_480() {
        let m = parse_str("1 2 3\n4 5 6\n").unwrap();
        let fig = Figure::render(&m, &FigureStyle::default()).unwrap();
        assert_eq!((fig.width(), fig.height()), (640, 480));
    }

    #[test]
    fn content_keeps_cells_square_and_centered() {
        let m = parse_str("1 2 3\n4 5 6\n").unwrap();
        let fig = Figure::render(&m, &gray_style()).unwrap();
        let b = fig.content_bounds();
        // axes box is 496 x 369.6; width limits the scale
        assert_eq!(b.width, 496);
        assert_eq!(b.height, 331);
        assert_eq!(b.x, 80);
        assert!(b.y > 58 && b.y < 80);
    }

    #[test]
    fn gray_r_puts_min_white_and_max_black() {
        let m = parse_str("0 1\n").unwrap();
        let fig = Figure::render(&m, &gray_style()).unwrap();
        let b = fig.content_bounds();
        let img = fig.image();
        assert_eq!(img.get_pixel(b.x, b.y + 1), &BACKGROUND);
        assert_eq!(img.get_pixel(b.x + b.width - 1, b.y + 1), &BLACK_PX);
    }

    #[test]
    fn row_zero_is_drawn_on_top() {
        let m = parse_str("0\n1\n").unwrap();
        let fig = Figure::render(&m, &gray_style()).unwrap();
        let b = fig.content_bounds();
        let img = fig.image();
        assert_eq!(img.get_pixel(b.x, b.y), &BACKGROUND);
        assert_eq!(img.get_pixel(b.x, b.y + b.height - 1), &BLACK_PX);
    }

    #[test]
    fn constant_matrix_renders_low_end() {
        let m = parse_str("3 3\n3 3\n").unwrap();
        let fig = Figure::render(&m, &gray_style()).unwrap();
        let b = fig.content_bounds();
        assert_eq!(fig.image().get_pixel(b.x + 1, b.y + 1), &BACKGROUND);
    }

    #[test]
    fn axis_off_leaves_margins_blank() {
        let m = parse_str("1 0\n0 1\n").unwrap();
        let fig = Figure::render(&m, &gray_style()).unwrap();
        let b = fig.content_bounds();
        assert!(!has_dark_pixel(fig.image(), 0..b.x, 0..fig.height()));
        assert!(!has_dark_pixel(
            fig.image(),
            0..fig.width(),
            b.y + b.height..fig.height()
        ));
    }

    #[test]
    fn axes_draw_frame_ticks_and_labels() {
        let m = parse_str("0 1\n1 0\n").unwrap();
        let fig = Figure::render(&m, &FigureStyle::default()).unwrap();
        let b = fig.content_bounds();
        let img = fig.image();

        assert_eq!(img.get_pixel(b.x - 1, b.y - 1), &BLACK_PX);
        assert_eq!(img.get_pixel(b.x + b.width, b.y + 5), &BLACK_PX);
        assert_eq!(img.get_pixel(0, 0), &BACKGROUND);

        // y ticks and labels left of the frame, x ticks and labels below it
        assert!(has_dark_pixel(img, b.x - 40..b.x - 2, b.y..b.y + b.height));
        assert!(has_dark_pixel(
            img,
            b.x..b.x + b.width,
            b.y + b.height + 2..b.y + b.height + 25
        ));
        // nothing right of the frame
        assert!(!has_dark_pixel(img, b.x + b.width + 2..fig.width(), 0..fig.height()));
    }

    #[test]
    fn row_labels_count_from_the_top() {
        assert_eq!(format_tick(1.0 - 1.0), "0");
        assert_eq!(format_tick(1.0 - 0.0), "1");
        assert_eq!(format_tick(-0.0), "0");
        assert_eq!(format_tick(0.5), "0.5");
    }

    #[test]
    fn oversized_canvas_is_an_error() {
        let m = parse_str("1 2\n").unwrap();
        let style = FigureStyle {
            dpi: 1e9,
            ..gray_style()
        };
        let err = Figure::render(&m, &style).unwrap_err();
        assert!(err.to_string().contains("pixel limit"));

        let style = FigureStyle {
            dpi: f64::INFINITY,
            ..gray_style()
        };
        assert!(Figure::render(&m, &style).is_err());
    }

    #[test]
    fn tight_image_crops_to_padded_content() {
        let m = parse_str("1 2 3\n4 5 6\n").unwrap();
        let fig = Figure::render(&m, &gray_style()).unwrap();
        let b = fig.content_bounds();
        let tight = fig.tight_image();
        assert_eq!(tight.width(), b.width + 20);
        assert_eq!(tight.height(), b.height + 20);
    }

    #[test]
    fn argb_matches_canvas() {
        let m = parse_str("0 1\n").unwrap();
        let fig = Figure::render(&m, &gray_style()).unwrap();
        let argb = fig.to_argb();
        assert_eq!(argb.len(), (fig.width() * fig.height()) as usize);
        assert_eq!(argb[0], 0xFFFF_FFFF);
    }

    #[test]
    fn encoding_is_deterministic() {
        let m = parse_str("0.1 0.7 0.3\n0.9 0.2 0.5\n").unwrap();
        let a = Figure::render(&m, &gray_style()).unwrap().encode_png(true).unwrap();
        let b = Figure::render(&m, &gray_style()).unwrap().encode_png(true).unwrap();
        assert!(a.starts_with(&[0x89, b'P', b'N', b'G']));
        assert_eq!(a, b);
    }
}
