use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use log::info;
use std::path::{Path, PathBuf};

use crate::colormap::ColormapType;
use crate::display;
use crate::matrix::load_matrix;
use crate::render::{Figure, FigureStyle, DEFAULT_DPI, DEFAULT_FIGSIZE};

#[derive(Parser, Debug)]
#[command(author, version, about = "Render a whitespace-delimited numeric matrix as an image")]
pub struct ViewerArgs {
    /// Text matrix to render (rows = lines, columns = whitespace-separated values)
    pub input: Option<PathBuf>,

    /// Where the figure is saved after the window closes (grayscale viewer only)
    #[arg(short, long, default_value = "out.png")]
    pub output: PathBuf,

    /// Figure resolution in dots per inch
    #[arg(long, default_value_t = DEFAULT_DPI)]
    pub dpi: f64,

    /// Skip the preview window
    #[arg(long)]
    pub no_display: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Which of the two viewers is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Reversed grayscale, no axes, saved tightly after display.
    GrayReversed,
    /// Default colormap with framed axes, display only.
    Color,
}

impl Variant {
    pub fn style(&self, dpi: f64) -> FigureStyle {
        match self {
            Variant::GrayReversed => FigureStyle {
                colormap: ColormapType::GrayR,
                axis_off: true,
                figsize: DEFAULT_FIGSIZE,
                dpi,
            },
            Variant::Color => FigureStyle {
                colormap: ColormapType::Viridis,
                axis_off: false,
                figsize: DEFAULT_FIGSIZE,
                dpi,
            },
        }
    }

    pub fn saves_figure(&self) -> bool {
        matches!(self, Variant::GrayReversed)
    }
}

/// `argv[0]`, as the user typed it.
pub fn program_name() -> String {
    std::env::args_os()
        .next()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}

/// Set up `env_logger`; `RUST_LOG` wins over the verbosity flag.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .try_init();
}

pub fn usage_line(program: &str) -> String {
    format!("usage: {program} <out.txt>")
}

pub fn run_viewer(variant: Variant, args: &ViewerArgs, program: &str) -> Result<()> {
    let Some(input) = args.input.as_deref() else {
        println!("{}", usage_line(program));
        return Ok(());
    };
    if !(args.dpi.is_finite() && args.dpi > 0.0) {
        bail!("dpi must be a positive number, got {}", args.dpi);
    }

    let figure = render_file(variant, input, args.dpi)?;

    if args.no_display {
        info!("preview window skipped");
    } else {
        display::show(&figure, &input.display().to_string())?;
    }

    if variant.saves_figure() {
        figure.save_png(&args.output, true)?;
        info!("wrote {}", args.output.display());
    }
    Ok(())
}

/// Load `input` and render it with the variant's style.
pub fn render_file(variant: Variant, input: &Path, dpi: f64) -> Result<Figure> {
    let matrix = load_matrix(input)
        .with_context(|| format!("Failed to load matrix: {}", input.display()))?;
    let (rows, cols) = matrix.dim();
    let style = variant.style(dpi);
    info!(
        "loaded {} ({rows}x{cols}), colormap {}",
        input.display(),
        style.colormap.name()
    );
    Figure::render(&matrix, &style)
        .with_context(|| format!("Failed to render matrix: {}", input.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_invocation() {
        let args = ViewerArgs::try_parse_from(["matrix-view"]).unwrap();
        assert!(args.input.is_none());
        assert_eq!(args.output, PathBuf::from("out.png"));
        assert_eq!(args.dpi, 100.0);
        assert!(!args.no_display);
    }

    #[test]
    fn parses_flags() {
        let args = ViewerArgs::try_parse_from([
            "matrix-view",
            "data.txt",
            "--no-display",
            "-o",
            "fig.png",
            "--dpi",
            "50",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.input, Some(PathBuf::from("data.txt")));
        assert_eq!(args.output, PathBuf::from("fig.png"));
        assert_eq!(args.dpi, 50.0);
        assert!(args.no_display);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn usage_mentions_program() {
        assert_eq!(usage_line("./view"), "usage: ./view <out.txt>");
    }

    #[test]
    fn only_grayscale_viewer_saves() {
        assert!(Variant::GrayReversed.saves_figure());
        assert!(!Variant::Color.saves_figure());
        assert!(Variant::GrayReversed.style(100.0).axis_off);
        assert_eq!(Variant::Color.style(72.0).colormap, ColormapType::Viridis);
    }

    #[test]
    fn oversized_dpi_is_reported_not_a_crash() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("m.txt");
        std::fs::write(&input, "1 2\n3 4\n").unwrap();
        let args = ViewerArgs::try_parse_from([
            "matrix-view",
            input.to_str().unwrap(),
            "--no-display",
            "--dpi",
            "1e12",
            "-o",
            dir.path().join("out.png").to_str().unwrap(),
        ])
        .unwrap();
        let err = run_viewer(Variant::GrayReversed, &args, "matrix-view").unwrap_err();
        assert!(format!("{err:#}").contains("pixel limit"));
        assert!(!dir.path().join("out.png").exists());
    }

    #[test]
    fn missing_input_is_not_an_error() {
        let args = ViewerArgs::try_parse_from(["matrix-view", "--dpi=-1"]).unwrap();
        assert!(run_viewer(Variant::GrayReversed, &args, "matrix-view").is_ok());
    }
}
