//! Fleetguard CLI - the incident engine daemon.
//!
//! This binary wires the fleetguard library with in-process collaborator
//! implementations and runs the pipeline until interrupted.

mod error;
mod runner;

use clap::Parser;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "fleetguard")]
#[command(about = "Incident intake, dispatch, and propagation daemon", long_about = None)]
#[command(version = fleetguard::VERSION)]
struct Args {
    /// Path to the INI configuration file
    #[arg(long, default_value = "fleetguard.ini")]
    config: PathBuf,

    /// Region this instance serves (used for the local operator roster)
    #[arg(long, default_value = "global")]
    region: String,

    /// Append durable incident snapshots to this JSON-lines file
    #[arg(long)]
    journal: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    if let Err(error) = runner::run(args) {
        eprintln!("fleetguard: {error}");
        process::exit(1);
    }
}
