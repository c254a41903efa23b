//! Task file loading.

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use miette::Diagnostic;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use thiserror::Error;
use transpile_runner::{split_args, SplitArgsError, TranspileOptions};

/// Default task file name, looked up in the workspace.
pub const CONFIG_FILE: &str = "transpile.json";

/// Transpiler name looked up when no command is configured.
const DEFAULT_COMMAND: &str = "traceur";

/// Runtime location used when no runtime is configured.
const DEFAULT_RUNTIME: &str = "node_modules/traceur/bin/traceur-runtime.js";

/// Task file errors.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// Task file does not exist.
    #[error("task file not found: {0}")]
    #[diagnostic(
        code(batch_transpile::config::not_found),
        help("create transpile.json in the workspace, or pass --out with source files")
    )]
    NotFound(Utf8PathBuf),

    /// Task file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Task file is not valid JSON of the expected shape.
    #[error("failed to parse {path}: {message}")]
    #[diagnostic(code(batch_transpile::config::parse))]
    Parse { path: Utf8PathBuf, message: String },

    /// A requested target is not defined.
    #[error("unknown target: {name} (available: {available})")]
    #[diagnostic(code(batch_transpile::config::unknown_target))]
    UnknownTarget { name: String, available: String },

    /// The task file defines no targets.
    #[error("no targets defined in {0}")]
    NoTargets(Utf8PathBuf),

    /// extraArgs could not be split into words.
    #[error("invalid extraArgs: {0}")]
    InvalidExtraArgs(#[from] SplitArgsError),

    /// A source pattern is not a valid glob.
    #[error("invalid glob pattern: {0}")]
    InvalidGlob(String),
}

/// Top-level task file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskConfig {
    /// Options shared by every target.
    #[serde(default)]
    pub options: OptionsConfig,

    /// Named targets.
    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfig>,
}

/// Transpiler options as written in the task file or on the command line.
///
/// Every field is optional so that layers can be merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsConfig {
    /// Transpiler executable or script.
    pub command: Option<String>,

    /// Runtime file prepended to the output.
    pub runtime: Option<String>,

    /// Interpreter for script commands.
    pub interpreter: Option<String>,

    /// Extra transpiler arguments.
    pub extra_args: Option<ExtraArgs>,

    /// Whether to prepend the runtime.
    pub include_runtime: Option<bool>,
}

/// Extra arguments, either one raw string or already split.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ExtraArgs {
    Raw(String),
    List(Vec<String>),
}

impl ExtraArgs {
    /// Splits the arguments into words.
    pub fn to_words(&self) -> Result<Vec<String>, ConfigError> {
        match self {
            Self::Raw(raw) => Ok(split_args(raw)?),
            Self::List(words) => Ok(words.clone()),
        }
    }
}

/// One named target.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetConfig {
    /// Options overriding the task-level ones.
    #[serde(default)]
    pub options: OptionsConfig,

    /// File groups of this target.
    pub files: FilesConfig,
}

/// File groups, as a list of `{src, dest}` entries or a `dest -> src` map.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FilesConfig {
    List(Vec<FileEntry>),
    Map(IndexMap<String, SourceList>),
}

/// A single `{src, dest}` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct FileEntry {
    pub src: SourceList,
    pub dest: String,
}

/// One source pattern or several.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SourceList {
    One(String),
    Many(Vec<String>),
}

impl SourceList {
    pub fn patterns(&self) -> Vec<String> {
        match self {
            Self::One(pattern) => vec![pattern.clone()],
            Self::Many(patterns) => patterns.clone(),
        }
    }
}

impl FilesConfig {
    /// Returns `(dest, source patterns)` pairs in file order.
    pub fn entries(&self) -> Vec<(String, Vec<String>)> {
        match self {
            Self::List(entries) => entries
                .iter()
                .map(|entry| (entry.dest.clone(), entry.src.patterns()))
                .collect(),
            Self::Map(map) => map
                .iter()
                .map(|(dest, src)| (dest.clone(), src.patterns()))
                .collect(),
        }
    }
}

impl TaskConfig {
    /// Loads a task file.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_owned()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;

        Self::parse(&content).map_err(|message| ConfigError::Parse {
            path: path.to_owned(),
            message,
        })
    }

    /// Loads the task file from `path`, or from the workspace default location.
    /// Returns `None` when no explicit path was given and the default is absent.
    pub fn find(
        workspace: &Utf8Path,
        path: Option<&Utf8Path>,
    ) -> Result<Option<(Utf8PathBuf, Self)>, ConfigError> {
        let path = match path {
            Some(path) => workspace.join(path),
            None => {
                let default = workspace.join(CONFIG_FILE);
                if !default.exists() {
                    return Ok(None);
                }
                default
            }
        };
        Self::load(&path).map(|config| Some((path, config)))
    }

    /// Parses task file content. `//` and `/* */` comments are allowed.
    pub fn parse(content: &str) -> Result<Self, String> {
        let content = remove_json_comments(content);
        serde_json::from_str(&content).map_err(|e| e.to_string())
    }

    /// Returns the targets to run: the requested ones, or all of them.
    pub fn select_targets(
        &self,
        requested: &[String],
    ) -> Result<Vec<(&str, &TargetConfig)>, ConfigError> {
        if requested.is_empty() {
            return Ok(self
                .targets
                .iter()
                .map(|(name, target)| (name.as_str(), target))
                .collect());
        }

        requested
            .iter()
            .map(|name| {
                self.targets
                    .get_key_value(name)
                    .map(|(name, target)| (name.as_str(), target))
                    .ok_or_else(|| {
                        ConfigError::UnknownTarget {
                            name: name.clone(),
                            available: self.targets.keys().cloned().collect::<Vec<_>>().join(", "),
                        }
                    })
            })
            .collect()
    }
}

impl OptionsConfig {
    /// Returns these options with every field set in `overrides` replaced.
    pub fn merge(&self, overrides: &OptionsConfig) -> OptionsConfig {
        OptionsConfig {
            command: overrides.command.clone().or_else(|| self.command.clone()),
            runtime: overrides.runtime.clone().or_else(|| self.runtime.clone()),
            interpreter: overrides
                .interpreter
                .clone()
                .or_else(|| self.interpreter.clone()),
            extra_args: overrides
                .extra_args
                .clone()
                .or_else(|| self.extra_args.clone()),
            include_runtime: overrides.include_runtime.or(self.include_runtime),
        }
    }

    /// Resolves the options for running in `workspace`, filling in defaults.
    pub fn resolve(&self, workspace: &Utf8Path) -> Result<TranspileOptions, ConfigError> {
        let command = match &self.command {
            Some(command) => expand_path(command),
            None => find_transpiler(workspace),
        };
        let runtime = self
            .runtime
            .as_deref()
            .map(expand_path)
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_RUNTIME));

        let mut options = TranspileOptions::new(command, runtime);
        options.interpreter = self.interpreter.as_deref().map(expand_path);
        options.extra_args = match &self.extra_args {
            Some(extra_args) => extra_args.to_words()?,
            None => Vec::new(),
        };
        options.include_runtime = self.include_runtime.unwrap_or(false);
        options.working_dir = Some(workspace.to_owned());
        Ok(options)
    }
}

/// Finds the transpiler in the workspace or on PATH.
///
/// Search order:
/// 1. Workspace node_modules/.bin/traceur
/// 2. System PATH
/// 3. The bare name, left to the OS to resolve
pub fn find_transpiler(workspace: &Utf8Path) -> Utf8PathBuf {
    let local = workspace.join("node_modules/.bin").join(DEFAULT_COMMAND);
    if local.exists() {
        return local;
    }

    if let Ok(path) = which::which(DEFAULT_COMMAND) {
        if let Ok(utf8_path) = Utf8PathBuf::try_from(path) {
            return utf8_path;
        }
    }

    Utf8PathBuf::from(DEFAULT_COMMAND)
}

fn expand_path(path: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(shellexpand::tilde(path).into_owned())
}

/// Reads a boolean switch from the environment.
pub fn read_env_bool(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Removes single-line and multi-line comments from JSON.
fn remove_json_comments(json: &str) -> String {
    let mut result = String::with_capacity(json.len());
    let mut chars = json.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            result.push(c);
            if c == '"' {
                in_string = false;
            } else if c == '\\' {
                if let Some(next) = chars.next() {
                    result.push(next);
                }
            }
            continue;
        }

        match (c, chars.peek().copied()) {
            ('"', _) => {
                result.push(c);
                in_string = true;
            }
            ('/', Some('/')) => {
                while chars.peek().is_some_and(|&next| next != '\n') {
                    chars.next();
                }
            }
            ('/', Some('*')) => {
                chars.next();
                while let Some(next) = chars.next() {
                    if next == '*' && chars.peek() == Some(&'/') {
                        chars.next();
                        break;
                    }
                }
            }
            _ => result.push(c),
        }
    }

    result
}
