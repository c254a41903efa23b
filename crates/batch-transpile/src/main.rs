//! batch-transpile: runs an external transpiler over groups of source files.

mod cli;
mod config;
mod files;
mod orchestrator;
mod output;

use clap::Parser;
use cli::Args;
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.no_color {
        colored::control::set_override(false);
    }

    let report = orchestrator::run(args).await?;

    if !report.success() {
        std::process::exit(1);
    }
    Ok(())
}
