use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;

use matrix_view::cli::{init_logging, program_name};
use matrix_view::{Complex, JuliaParams, JuliaSet};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Sample a Julia set of f(z) = z^2 + c into a tab-delimited matrix",
    allow_negative_numbers = true
)]
struct Args {
    /// re(c) im(c) re(z0) im(z0) re(z1) im(z1) dx maxiters (options go first)
    #[arg(num_args = 0.., allow_hyphen_values = true)]
    values: Vec<String>,

    /// Output matrix path
    #[arg(short, long, default_value = "out.txt")]
    output: PathBuf,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn print_usage(bin: &str) {
    println!("usage: {bin} <re(c)><im(c)> <re(z0)><im(z0)> <re(z1)><im(z1)> <dx> <maxiters>");
    println!("\tc : parameter in f(z) = z^2 + c");
    println!("\tz0 : corner of window");
    println!("\tz1 : opposite corner of window");
    println!("\tdx : step size in points to evaluate");
    println!("\tmaxiters : maximum iterations to compute");
}

fn parse_f64(name: &str, raw: &str) -> Result<f64> {
    raw.parse::<f64>()
        .with_context(|| format!("Invalid {name}: '{raw}'"))
}

fn parse_params(values: &[String]) -> Result<JuliaParams> {
    let c = Complex::new(parse_f64("re(c)", &values[0])?, parse_f64("im(c)", &values[1])?);
    let z0 = Complex::new(parse_f64("re(z0)", &values[2])?, parse_f64("im(z0)", &values[3])?);
    let z1 = Complex::new(parse_f64("re(z1)", &values[4])?, parse_f64("im(z1)", &values[5])?);
    let dx = parse_f64("dx", &values[6])?;
    let max_iters = values[7]
        .parse::<usize>()
        .with_context(|| format!("Invalid maxiters: '{}'", values[7]))?;
    Ok(JuliaParams {
        c,
        z0,
        z1,
        dx,
        max_iters,
    })
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.verbose);

    println!("Generating a Julia set...");
    if args.values.len() < 8 {
        print_usage(&program_name());
        return Ok(ExitCode::FAILURE);
    }
    if args.values.len() > 8 {
        bail!(
            "expected 8 values, got {}: {:?} (options must come before the numbers)",
            args.values.len(),
            &args.values[8..]
        );
    }

    let params = parse_params(&args.values)?;
    let mut set = JuliaSet::new(params)?;
    println!("ll left corner: {}", set.lower_left());
    info!("divergence radius {}", set.radius());

    set.compute();
    set.save(&args.output)?;
    info!(
        "wrote {}x{} matrix to {}",
        set.rows(),
        set.cols(),
        args.output.display()
    );
    Ok(ExitCode::SUCCESS)
}
