use anyhow::Result;
use clap::Parser;
use matrix_view::cli::{self, Variant, ViewerArgs};

// Reversed grayscale, no axes; saves the figure after the window closes.
fn main() -> Result<()> {
    let args = ViewerArgs::parse();
    cli::init_logging(args.verbose);
    cli::run_viewer(Variant::GrayReversed, &args, &cli::program_name())
}
