//! Main orchestration logic.

use crate::cli::Args;
use crate::config::{read_env_bool, ConfigError, OptionsConfig, TaskConfig};
use crate::files::SourceExpander;
use crate::output::{
    format_command, format_options, ConsoleReporter, RunReport, TargetReport,
};
use camino::{Utf8Path, Utf8PathBuf};
use colored::Colorize;
use miette::Diagnostic;
use std::sync::Arc;
use thiserror::Error;
use transpile_runner::{FileGroup, RunnerError, TranspileRunner};

/// Name under which ad-hoc runs are reported.
const AD_HOC_TARGET: &str = "default";

/// Orchestration errors.
#[derive(Debug, Error, Diagnostic)]
pub enum OrchestratorError {
    /// Task file or option error.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    /// Fatal runner error.
    #[error("target {target}: {source}")]
    #[diagnostic(code(batch_transpile::runner))]
    Runner {
        target: String,
        #[source]
        source: RunnerError,
    },

    /// Workspace path could not be determined.
    #[error("invalid workspace: {0}")]
    InvalidWorkspace(String),
}

/// One target ready to run. Sources are expanded when the target starts, so
/// a target can pick up files written by the targets before it.
#[derive(Debug)]
struct TargetPlan {
    name: String,
    runner: TranspileRunner,
    /// `(dest, source patterns)` pairs in file order.
    entries: Vec<(String, Vec<String>)>,
}

impl TargetPlan {
    fn expand_groups(&self, workspace: &Utf8Path) -> Result<Vec<FileGroup>, OrchestratorError> {
        let expander = SourceExpander::new(workspace);
        self.entries
            .iter()
            .map(|(dest, patterns)| expand_group(&expander, &self.name, dest, patterns))
            .collect()
    }
}

/// Runs every requested target, one after another.
pub async fn run(args: Args) -> Result<RunReport, OrchestratorError> {
    let workspace = resolve_workspace(&args.workspace)?;
    let verbose = args.verbose || read_env_bool("BATCH_TRANSPILE_VERBOSE").unwrap_or(false);

    let plans = plan(&args, &workspace)?;
    let reporter = Arc::new(ConsoleReporter::new(verbose));
    let mut report = RunReport::default();

    for plan in plans {
        let groups = plan.expand_groups(&workspace)?;
        if verbose || args.dry_run {
            print!("{}", format_options(&plan.name, plan.runner.options()));
            for group in &groups {
                println!("{}", format_command(&plan.runner, group));
            }
        }
        if args.dry_run {
            plan.runner
                .validate(&groups)
                .map_err(|source| OrchestratorError::Runner {
                    target: plan.name.clone(),
                    source,
                })?;
            continue;
        }

        let summary = plan
            .runner
            .run(groups, reporter.clone())
            .await
            .map_err(|source| OrchestratorError::Runner {
                target: plan.name.clone(),
                source,
            })?;

        let target_report = TargetReport::from_summary(&plan.name, &summary);
        println!("{}", target_report.format());
        report.targets.push(target_report);
    }

    Ok(report)
}

fn resolve_workspace(workspace: &Utf8Path) -> Result<Utf8PathBuf, OrchestratorError> {
    if workspace.is_absolute() {
        return Ok(workspace.to_owned());
    }
    let current = std::env::current_dir()
        .map_err(|e| OrchestratorError::InvalidWorkspace(e.to_string()))?;
    let current = Utf8PathBuf::try_from(current)
        .map_err(|e| OrchestratorError::InvalidWorkspace(e.to_string()))?;
    Ok(current.join(workspace))
}

/// Resolves targets and their options before anything runs.
fn plan(args: &Args, workspace: &Utf8Path) -> Result<Vec<TargetPlan>, OrchestratorError> {
    let overlay = args.options_overlay();

    if let Some(out) = &args.out {
        let task_options = match TaskConfig::find(workspace, args.config.as_deref())? {
            Some((_, config)) => config.options,
            None => OptionsConfig::default(),
        };
        let options = task_options.merge(&overlay).resolve(workspace)?;
        return Ok(vec![TargetPlan {
            name: AD_HOC_TARGET.to_string(),
            runner: TranspileRunner::new(options),
            entries: vec![(out.to_string(), args.inputs.clone())],
        }]);
    }

    let (path, config) = match TaskConfig::find(workspace, args.config.as_deref())? {
        Some(found) => found,
        None => return Err(ConfigError::NotFound(workspace.join(crate::config::CONFIG_FILE)).into()),
    };
    if config.targets.is_empty() {
        return Err(ConfigError::NoTargets(path).into());
    }

    let mut plans = Vec::new();
    for (name, target) in config.select_targets(&args.inputs)? {
        let options = config
            .options
            .merge(&target.options)
            .merge(&overlay)
            .resolve(workspace)?;
        plans.push(TargetPlan {
            name: name.to_string(),
            runner: TranspileRunner::new(options),
            entries: target.files.entries(),
        });
    }

    Ok(plans)
}

fn expand_group(
    expander: &SourceExpander,
    target: &str,
    dest: &str,
    patterns: &[String],
) -> Result<FileGroup, OrchestratorError> {
    let expanded = expander.expand(patterns)?;
    for pattern in &expanded.unmatched {
        eprintln!(
            "{} {}: pattern {} matched no files",
            "Warning:".yellow(),
            target,
            pattern
        );
    }
    Ok(FileGroup::new(expanded.sources, dest))
}
