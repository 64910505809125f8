//! Operator CLI over the API spec catalog.
//!
//! Every command prints JSON on success and exits non-zero on failure.

use clap::Parser;

mod cli;
mod commands;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    commands::run_command(cli)
}
