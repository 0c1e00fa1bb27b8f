//! tiltslice CLI - slice STL models for 3- and 5-axis printers
//!
//! `tiltslice slice` turns a model into G-code with one of four strategies;
//! `tiltslice simplify` reduces a model to an exact triangle count.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod args;
mod run;

use args::{SimplifyArgs, SliceArgs};

#[derive(Parser, Debug)]
#[command(name = "tiltslice")]
#[command(about = "Multi-axis slicer for tilting-bed printers", long_about = None)]
struct Cli {
    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Slice an STL model into G-code
    Slice(SliceArgs),
    /// Reduce an STL model to an exact number of triangles
    Simplify(SimplifyArgs),
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "tiltslice=debug"
    } else {
        "tiltslice=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Slice(args) => run::run_slice(args)?,
        Commands::Simplify(args) => run::run_simplify(args)?,
    }

    Ok(())
}
