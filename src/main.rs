//! Main entry point for the fwmerge CLI tool

use clap::Parser;
use fwmerge::cli::{Args, run_cli};

fn main() {
    let args = Args::parse();

    if let Err(e) = run_cli(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
