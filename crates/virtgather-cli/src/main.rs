//! virtgather CLI
//!
//! Reads a JSON list of target endpoints, runs every target through its
//! platform module, and writes the merged inventory as pretty JSON to
//! stdout or a file.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use virtgather_core::{Gatherer, load_targets, write_output};
use virtgather_modules::builtin_registry;

#[derive(Parser)]
#[command(name = "virtgather")]
#[command(version)]
#[command(about = "Gather virtual host inventories from hypervisors and VM managers", long_about = None)]
struct Cli {
    /// JSON file describing the target endpoints
    #[arg(short, long, value_name = "INFILE")]
    infile: Option<PathBuf>,

    /// Write the inventory to this file instead of stdout
    #[arg(short, long, value_name = "OUTFILE")]
    outfile: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// List available modules with their parameter templates and exit
    #[arg(short, long)]
    list_modules: bool,
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    // Diagnostics go to stderr so stdout stays valid JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_level(cli.verbose).to_string())),
        )
        .with_writer(std::io::stderr)
        .init();

    let gatherer = Gatherer::new(builtin_registry());

    if cli.list_modules {
        write_output(cli.outfile.as_deref(), &gatherer.registry().list_available())?;
        return Ok(());
    }

    let infile = cli
        .infile
        .ok_or_else(|| eyre!("no input file given, use --infile or --list-modules"))?;

    let targets = load_targets(&infile)?;
    let inventory = gatherer.gather(&targets).await;
    write_output(cli.outfile.as_deref(), &inventory)?;

    Ok(())
}
