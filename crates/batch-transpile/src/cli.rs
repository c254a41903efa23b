//! CLI argument parsing.

use crate::config::{ExtraArgs, OptionsConfig};
use camino::Utf8PathBuf;
use clap::Parser;

/// Batch transpiler driver: runs an external transpiler over groups of files.
#[derive(Debug, Parser)]
#[command(name = "batch-transpile")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Targets to run (all targets when omitted); with --out, the source files
    #[arg(value_name = "TARGET|SOURCE")]
    pub inputs: Vec<String>,

    /// Working directory for the run
    #[arg(long, default_value = ".")]
    pub workspace: Utf8PathBuf,

    /// Path to the task file (defaults to transpile.json in the workspace)
    #[arg(long)]
    pub config: Option<Utf8PathBuf>,

    /// Transpile the given sources into this file without a task file
    #[arg(long, value_name = "DEST")]
    pub out: Option<Utf8PathBuf>,

    /// Transpiler executable or script
    #[arg(long)]
    pub command: Option<String>,

    /// Runtime file to prepend to the output
    #[arg(long)]
    pub runtime: Option<String>,

    /// Interpreter for script transpilers
    #[arg(long)]
    pub interpreter: Option<String>,

    /// Extra arguments passed to the transpiler (e.g. --extra-args="--experimental")
    #[arg(long = "extra-args", allow_hyphen_values = true)]
    pub extra_args: Option<String>,

    /// Prepend the runtime to the (single) output file
    #[arg(long = "include-runtime")]
    pub include_runtime: bool,

    /// Print the transpiler command lines without running them
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Print resolved options and command lines
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long = "no-color")]
    pub no_color: bool,
}

impl Args {
    /// Returns the options given on the command line, which take precedence
    /// over the task file.
    pub fn options_overlay(&self) -> OptionsConfig {
        OptionsConfig {
            command: self.command.clone(),
            runtime: self.runtime.clone(),
            interpreter: self.interpreter.clone(),
            extra_args: self.extra_args.clone().map(ExtraArgs::Raw),
            include_runtime: self.include_runtime.then_some(true),
        }
    }

    /// Returns whether sources were given directly instead of targets.
    pub fn is_ad_hoc(&self) -> bool {
        self.out.is_some()
    }
}
