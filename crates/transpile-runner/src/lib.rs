//! Concurrent runner for external transpiler processes.
//!
//! Each [`FileGroup`] maps an ordered list of sources to one output file and is
//! handed to the transpiler as `<command> --out <destination> [extra args]
//! <sources...>`. Groups run concurrently; the [`RunSummary`] reports overall
//! success once every group has finished.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use camino::Utf8PathBuf;
//! use transpile_runner::{FileGroup, SilentReporter, TranspileOptions, TranspileRunner};
//!
//! #[tokio::main]
//! async fn main() {
//!     let options = TranspileOptions::new("node_modules/.bin/traceur", "traceur-runtime.js");
//!     let runner = TranspileRunner::new(options);
//!     let groups = vec![FileGroup::new(vec![Utf8PathBuf::from("src/app.js")], "dist/app.js")];
//!
//!     let summary = runner.run(groups, Arc::new(SilentReporter)).await.unwrap();
//!     assert!(summary.success);
//! }
//! ```

mod command;
mod quote;
mod runner;

pub use command::{find_interpreter, split_args, Invocation, Program, SplitArgsError, OUT_FLAG};
pub use quote::ShellQuoting;
pub use runner::{
    inject_runtime, FileGroup, GroupOutcome, GroupStatus, Reporter, RunState, RunSummary,
    RunnerError, SilentReporter, TranspileOptions, TranspileRunner,
};
