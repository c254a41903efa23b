//! Output formatting.

use camino::Utf8Path;
use colored::Colorize;
use std::io::{self, Write};
use transpile_runner::{
    FileGroup, GroupOutcome, GroupStatus, Reporter, RunSummary, ShellQuoting, TranspileOptions,
    TranspileRunner,
};

/// Prints per-group progress to the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter {
    verbose: bool,
}

impl ConsoleReporter {
    /// Creates a new reporter.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Reporter for ConsoleReporter {
    fn group_finished(&self, outcome: &GroupOutcome) {
        let mut report = format_transpiling(&outcome.group, outcome.succeeded());
        report.push('\n');
        if self.verbose {
            report.push_str(&format!("  took {:.2?}\n", outcome.elapsed));
        }
        let details = match &outcome.status {
            GroupStatus::Failed { error, stderr } => format_failure(error, stderr),
            GroupStatus::Succeeded => String::new(),
        };

        // Both locks are held so concurrent groups cannot interleave.
        let mut out = io::stdout().lock();
        let mut err = io::stderr().lock();
        let _ = out.write_all(report.as_bytes());
        let _ = out.flush();
        let _ = err.write_all(details.as_bytes());
    }

    fn injecting_runtime(&self, destination: &Utf8Path, runtime: &Utf8Path) {
        println!("{}", format_injecting(destination, runtime));
    }
}

/// Formats the line reporting a transpiled group.
pub fn format_transpiling(group: &FileGroup, succeeded: bool) -> String {
    let destination = group.destination.as_str();
    let sources = group.sources_display();
    if succeeded {
        format!(
            "transpiling: {} <- {}",
            destination.green(),
            sources.green()
        )
    } else {
        format!("transpiling: {} <- {}", destination.red(), sources.red())
    }
}

/// Formats the error and captured stderr of a failed group, one `>>` line each.
pub fn format_failure(error: &str, stderr: &str) -> String {
    std::iter::once(error)
        .chain(stderr.lines())
        .map(|line| format!("{} {}\n", ">>".red(), line))
        .collect()
}

/// Formats the line reporting a runtime injection.
pub fn format_injecting(destination: &Utf8Path, runtime: &Utf8Path) -> String {
    format!(
        "injecting:   {} <- {}",
        destination.as_str().green(),
        runtime.as_str().green()
    )
}

/// Formats the resolved options of a target, one flag per line.
pub fn format_options(target: &str, options: &TranspileOptions) -> String {
    let interpreter = options
        .interpreter
        .as_ref()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "(auto)".to_string());
    format!(
        "Options for {}:\n  command: {}\n  interpreter: {}\n  runtime: {}\n  extraArgs: {:?}\n  includeRuntime: {}\n",
        target.bold(),
        options.command,
        interpreter,
        options.runtime,
        options.extra_args,
        options.include_runtime
    )
}

/// Formats the command line that would run for `group`.
pub fn format_command(runner: &TranspileRunner, group: &FileGroup) -> String {
    format!(
        "{} {}",
        "$".dimmed(),
        runner.invocation(group).render(ShellQuoting::host())
    )
}

/// Result of one target.
#[derive(Debug, Default)]
pub struct TargetReport {
    /// Target name.
    pub name: String,
    /// Number of groups transpiled successfully.
    pub succeeded: usize,
    /// Number of groups whose transpiler failed.
    pub failed: usize,
}

impl TargetReport {
    pub fn from_summary(name: &str, summary: &RunSummary) -> Self {
        Self {
            name: name.to_string(),
            succeeded: summary.succeeded_count(),
            failed: summary.failed_count(),
        }
    }

    /// Formats the summary line.
    pub fn format(&self) -> String {
        let file_word = |count: usize| if count == 1 { "file" } else { "files" };
        let line = format!(
            "{}: transpiled {} {}, {} failed",
            self.name,
            self.succeeded,
            file_word(self.succeeded),
            self.failed
        );
        if self.failed > 0 {
            line.red().to_string()
        } else {
            line.green().to_string()
        }
    }
}

/// Result of a whole invocation.
#[derive(Debug, Default)]
pub struct RunReport {
    pub targets: Vec<TargetReport>,
}

impl RunReport {
    /// Returns whether every group of every target succeeded.
    pub fn success(&self) -> bool {
        self.targets.iter().all(|t| t.failed == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use pretty_assertions::assert_eq;

    fn group() -> FileGroup {
        FileGroup::new(
            vec![Utf8PathBuf::from("src/a.js"), Utf8PathBuf::from("src/b.js")],
            "dist/app.js",
        )
    }

    #[test]
    fn test_format_transpiling() {
        let line = format_transpiling(&group(), true);
        assert!(line.starts_with("transpiling: "));
        assert!(line.contains("dist/app.js"));
        assert!(line.contains("src/a.js src/b.js"));

        let line = format_transpiling(&group(), false);
        assert!(line.contains("dist/app.js"));
    }

    #[test]
    fn test_format_failure_is_one_block() {
        colored::control::set_override(false);
        let block = format_failure(
            "transpiler exited with code 1",
            "syntax error in src/a.js\n  at line 3\n",
        );
        assert_eq!(
            block,
            ">> transpiler exited with code 1\n>> syntax error in src/a.js\n>>   at line 3\n"
        );
        assert_eq!(format_failure("failed to spawn traceur", ""), ">> failed to spawn traceur\n");
    }

    #[test]
    fn test_format_injecting() {
        let line = format_injecting(Utf8Path::new("dist/app.js"), Utf8Path::new("runtime.js"));
        assert!(line.starts_with("injecting:   "));
        assert!(line.contains("runtime.js"));
    }

    #[test]
    fn test_format_options() {
        let mut options = TranspileOptions::new("traceur", "runtime.js");
        options.extra_args = vec!["--experimental".to_string()];
        let text = format_options("app", &options);
        assert!(text.contains("command: traceur"));
        assert!(text.contains("interpreter: (auto)"));
        assert!(text.contains("extraArgs: [\"--experimental\"]"));
        assert!(text.contains("includeRuntime: false"));
    }

    #[test]
    fn test_format_command() {
        let runner = TranspileRunner::new(TranspileOptions::new("traceur", "runtime.js"));
        let line = format_command(&runner, &group());
        assert!(line.contains("--out"));
        assert!(line.contains("dist/app.js"));
    }

    #[test]
    fn test_target_report() {
        let report = TargetReport {
            name: "app".to_string(),
            succeeded: 1,
            failed: 2,
        };
        let line = report.format();
        assert!(line.contains("app: transpiled 1 file, 2 failed"));

        let run = RunReport {
            targets: vec![report],
        };
        assert!(!run.success());
        assert!(RunReport::default().success());
    }
}
