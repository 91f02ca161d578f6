use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

fn main() -> Result<()> {
    // Parse CLI arguments
    let parsed = cli::Cli::parse();

    parsed.dispatch()
}
