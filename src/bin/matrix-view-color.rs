use anyhow::Result;
use clap::Parser;
use matrix_view::cli::{self, Variant, ViewerArgs};

// Default colormap with axes; display only, nothing is written.
fn main() -> Result<()> {
    let args = ViewerArgs::parse();
    cli::init_logging(args.verbose);
    cli::run_viewer(Variant::Color, &args, &cli::program_name())
}
