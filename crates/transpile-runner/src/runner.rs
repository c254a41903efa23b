//! Batch transpile orchestration.

use crate::command::{Invocation, Program};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Error types for the transpile runner.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The runtime can only be injected into a single output file.
    #[error("including the runtime into more than one output file rejected ({groups} file groups)")]
    RuntimeRequiresSingleGroup { groups: usize },

    /// Reading the runtime or the output, or rewriting the output, failed.
    #[error("failed to inject runtime {runtime} into {destination}: {source}")]
    RuntimeInjection {
        runtime: Utf8PathBuf,
        destination: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A group task panicked or was cancelled.
    #[error("transpile task failed: {0}")]
    TaskFailed(String),
}

/// One source-set-to-destination transpilation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileGroup {
    /// Source files, in the order they are passed to the transpiler.
    pub sources: Vec<Utf8PathBuf>,
    /// Output file.
    pub destination: Utf8PathBuf,
}

impl FileGroup {
    /// Creates a new file group.
    pub fn new(sources: Vec<Utf8PathBuf>, destination: impl Into<Utf8PathBuf>) -> Self {
        Self {
            sources,
            destination: destination.into(),
        }
    }

    /// Returns the sources joined by spaces, for reports.
    pub fn sources_display(&self) -> String {
        self.sources
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Options controlling how the transpiler is run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranspileOptions {
    /// Transpiler executable or script.
    pub command: Utf8PathBuf,
    /// Interpreter for script commands; looked up on `PATH` when unset.
    pub interpreter: Option<Utf8PathBuf>,
    /// Runtime file prepended to the output when `include_runtime` is set.
    pub runtime: Utf8PathBuf,
    /// Arguments inserted between the output flag and the sources.
    pub extra_args: Vec<String>,
    /// Whether to prepend the runtime to the output.
    pub include_runtime: bool,
    /// Directory the transpiler runs in; relative paths resolve against it.
    pub working_dir: Option<Utf8PathBuf>,
}

impl TranspileOptions {
    /// Creates options for `command` with everything else at its default.
    pub fn new(command: impl Into<Utf8PathBuf>, runtime: impl Into<Utf8PathBuf>) -> Self {
        Self {
            command: command.into(),
            interpreter: None,
            runtime: runtime.into(),
            extra_args: Vec::new(),
            include_runtime: false,
            working_dir: None,
        }
    }

    fn resolve_path(&self, path: &Utf8Path) -> Utf8PathBuf {
        match &self.working_dir {
            Some(dir) => dir.join(path),
            None => path.to_owned(),
        }
    }
}

/// Result of running the transpiler for one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupStatus {
    /// The transpiler exited with status 0.
    Succeeded,
    /// The transpiler could not be spawned or exited unsuccessfully.
    Failed {
        /// Spawn error or exit status description.
        error: String,
        /// Captured standard error.
        stderr: String,
    },
}

/// Outcome of one file group.
#[derive(Debug, Clone)]
pub struct GroupOutcome {
    pub group: FileGroup,
    pub status: GroupStatus,
    pub elapsed: Duration,
}

impl GroupOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, GroupStatus::Succeeded)
    }
}

/// Receives progress events while a run is in flight.
///
/// Called from the tasks running the groups, in completion order.
pub trait Reporter: Send + Sync {
    /// A group's transpiler process finished.
    fn group_finished(&self, outcome: &GroupOutcome);

    /// The runtime is about to be prepended to `destination`.
    fn injecting_runtime(&self, destination: &Utf8Path, runtime: &Utf8Path) {
        let _ = (destination, runtime);
    }
}

/// Reporter that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn group_finished(&self, _outcome: &GroupOutcome) {}
}

/// Completion accounting for a run.
#[derive(Debug)]
pub struct RunState {
    groups_total: usize,
    groups_completed: usize,
    success: bool,
    outcomes: Vec<GroupOutcome>,
}

impl RunState {
    pub fn new(groups_total: usize) -> Self {
        Self {
            groups_total,
            groups_completed: 0,
            success: true,
            outcomes: Vec::with_capacity(groups_total),
        }
    }

    /// Records a finished group. A failure downgrades the run permanently.
    pub fn record(&mut self, outcome: GroupOutcome) {
        self.groups_completed += 1;
        if !outcome.succeeded() {
            self.success = false;
        }
        self.outcomes.push(outcome);
    }

    pub fn is_complete(&self) -> bool {
        self.groups_completed == self.groups_total
    }

    /// Consumes the state into the final summary.
    pub fn finish(self) -> RunSummary {
        RunSummary {
            success: self.success,
            outcomes: self.outcomes,
        }
    }
}

/// Final result of a run.
#[derive(Debug)]
pub struct RunSummary {
    /// Whether every group succeeded.
    pub success: bool,
    /// Per-group outcomes, in the order the groups were given.
    pub outcomes: Vec<GroupOutcome>,
}

impl RunSummary {
    pub fn succeeded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.succeeded_count()
    }
}

/// Runs the transpiler once per file group, concurrently.
#[derive(Debug, Clone)]
pub struct TranspileRunner {
    options: Arc<TranspileOptions>,
    program: Program,
}

impl TranspileRunner {
    /// Creates a new runner.
    pub fn new(options: TranspileOptions) -> Self {
        let program = Program::resolve(&options.command, options.interpreter.as_deref());
        Self {
            options: Arc::new(options),
            program,
        }
    }

    pub fn options(&self) -> &TranspileOptions {
        &self.options
    }

    /// Assembles the invocation for `group` without running it.
    pub fn invocation(&self, group: &FileGroup) -> Invocation {
        Invocation::new(
            self.program.clone(),
            &group.destination,
            &self.options.extra_args,
            &group.sources,
        )
    }

    /// Rejects option/group combinations that cannot run.
    pub fn validate(&self, groups: &[FileGroup]) -> Result<(), RunnerError> {
        if self.options.include_runtime && groups.len() != 1 {
            return Err(RunnerError::RuntimeRequiresSingleGroup {
                groups: groups.len(),
            });
        }
        Ok(())
    }

    /// Transpiles every group and returns once all of them have finished.
    ///
    /// Transpiler failures are reported through `reporter` and the summary;
    /// only configuration and runtime injection errors are returned as `Err`.
    pub async fn run(
        &self,
        groups: Vec<FileGroup>,
        reporter: Arc<dyn Reporter>,
    ) -> Result<RunSummary, RunnerError> {
        self.validate(&groups)?;

        let mut state = RunState::new(groups.len());
        let mut handles = Vec::with_capacity(groups.len());
        for group in groups {
            let invocation = self.invocation(&group);
            let options = Arc::clone(&self.options);
            let reporter = Arc::clone(&reporter);
            handles.push(tokio::spawn(async move {
                run_group(group, invocation, &options, reporter.as_ref()).await
            }));
        }

        for handle in handles {
            let outcome = handle
                .await
                .map_err(|e| RunnerError::TaskFailed(e.to_string()))??;
            state.record(outcome);
        }

        debug_assert!(state.is_complete());
        Ok(state.finish())
    }
}

async fn run_group(
    group: FileGroup,
    invocation: Invocation,
    options: &TranspileOptions,
    reporter: &dyn Reporter,
) -> Result<GroupOutcome, RunnerError> {
    let start = Instant::now();
    let output = invocation
        .to_command(options.working_dir.as_deref())
        .output()
        .await;

    let status = match output {
        Ok(output) if output.status.success() => GroupStatus::Succeeded,
        Ok(output) => GroupStatus::Failed {
            error: match output.status.code() {
                Some(code) => format!("transpiler exited with code {code}"),
                None => format!("transpiler terminated: {}", output.status),
            },
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        },
        Err(e) => GroupStatus::Failed {
            error: format!("failed to spawn {}: {e}", options.command),
            stderr: String::new(),
        },
    };

    let outcome = GroupOutcome {
        group,
        status,
        elapsed: start.elapsed(),
    };
    reporter.group_finished(&outcome);

    if options.include_runtime {
        reporter.injecting_runtime(&outcome.group.destination, &options.runtime);
        inject_runtime(
            &options.resolve_path(&options.runtime),
            &options.resolve_path(&outcome.group.destination),
        )
        .map_err(|source| RunnerError::RuntimeInjection {
            runtime: options.runtime.clone(),
            destination: outcome.group.destination.clone(),
            source,
        })?;
    }

    Ok(outcome)
}

/// Prepends the runtime text to `destination`, separated by a newline.
pub fn inject_runtime(runtime: &Utf8Path, destination: &Utf8Path) -> std::io::Result<()> {
    let runtime_text = fs::read_to_string(runtime)?;
    let output_text = fs::read_to_string(destination)?;
    fs::write(destination, format!("{runtime_text}\n{output_text}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn outcome(status: GroupStatus) -> GroupOutcome {
        GroupOutcome {
            group: FileGroup::new(vec![Utf8PathBuf::from("a.js")], "out.js"),
            status,
            elapsed: Duration::ZERO,
        }
    }

    fn failed() -> GroupStatus {
        GroupStatus::Failed {
            error: "transpiler exited with code 1".to_string(),
            stderr: String::new(),
        }
    }

    #[test]
    fn test_run_state_failure_is_sticky() {
        let mut state = RunState::new(3);
        state.record(outcome(GroupStatus::Succeeded));
        state.record(outcome(failed()));
        assert!(!state.is_complete());
        state.record(outcome(GroupStatus::Succeeded));
        assert!(state.is_complete());

        let summary = state.finish();
        assert!(!summary.success);
        assert_eq!(summary.succeeded_count(), 2);
        assert_eq!(summary.failed_count(), 1);
    }

    #[test]
    fn test_empty_run_state_is_complete() {
        let state = RunState::new(0);
        assert!(state.is_complete());
        assert!(state.finish().success);
    }

    #[test]
    fn test_validate_rejects_runtime_with_many_groups() {
        let mut options = TranspileOptions::new("traceur", "runtime.js");
        options.include_runtime = true;
        let runner = TranspileRunner::new(options);

        let groups = vec![
            FileGroup::new(vec![Utf8PathBuf::from("a.js")], "a.out.js"),
            FileGroup::new(vec![Utf8PathBuf::from("b.js")], "b.out.js"),
        ];
        assert!(matches!(
            runner.validate(&groups),
            Err(RunnerError::RuntimeRequiresSingleGroup { groups: 2 })
        ));
        assert!(runner.validate(&groups[..1]).is_ok());
        assert!(runner.validate(&[]).is_err());
    }

    #[test]
    fn test_inject_runtime_prepends_with_newline() {
        let dir = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let runtime = dir.join("runtime.js");
        let destination = dir.join("out.js");
        fs::write(&runtime, "SHIM;").unwrap();
        fs::write(&destination, "OUTPUT;").unwrap();

        inject_runtime(&runtime, &destination).unwrap();

        assert_eq!(fs::read_to_string(&destination).unwrap(), "SHIM;\nOUTPUT;");
    }

    #[test]
    fn test_inject_runtime_missing_output() {
        let dir = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let runtime = dir.join("runtime.js");
        fs::write(&runtime, "SHIM;").unwrap();

        assert!(inject_runtime(&runtime, &dir.join("missing.js")).is_err());
    }

    #[test]
    fn test_sources_display() {
        let group = FileGroup::new(
            vec![Utf8PathBuf::from("src/a.js"), Utf8PathBuf::from("src/b.js")],
            "out.js",
        );
        assert_eq!(group.sources_display(), "src/a.js src/b.js");
    }
}
