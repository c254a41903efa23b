//! Transpiler invocation assembly.

use crate::quote::ShellQuoting;
use camino::{Utf8Path, Utf8PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

/// Flag the transpiler expects in front of the output path.
pub const OUT_FLAG: &str = "--out";

/// Script file suffix that requires an interpreter to run.
const SCRIPT_SUFFIX: &str = ".js";

/// Default script interpreter name.
const DEFAULT_INTERPRETER: &str = "node";

/// Error produced while splitting an extra-arguments string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SplitArgsError {
    /// A quoted word was never closed.
    #[error("unterminated {0} quote in arguments")]
    UnterminatedQuote(char),

    /// The string ended right after a backslash.
    #[error("dangling backslash at end of arguments")]
    DanglingEscape,
}

/// How the transpiler is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Program {
    /// A native executable, run directly.
    Executable(Utf8PathBuf),
    /// A script file, run through an interpreter.
    Script {
        interpreter: Utf8PathBuf,
        script: Utf8PathBuf,
    },
}

impl Program {
    /// Classifies `command`: names ending in `.js` are scripts and run through
    /// `interpreter` (or the one found by [`find_interpreter`]).
    pub fn resolve(command: &Utf8Path, interpreter: Option<&Utf8Path>) -> Self {
        if command.as_str().ends_with(SCRIPT_SUFFIX) {
            let interpreter = interpreter
                .map(Utf8Path::to_path_buf)
                .unwrap_or_else(find_interpreter);
            Self::Script {
                interpreter,
                script: command.to_owned(),
            }
        } else {
            Self::Executable(command.to_owned())
        }
    }

    fn argv(&self) -> Vec<String> {
        match self {
            Self::Executable(path) => vec![path.to_string()],
            Self::Script {
                interpreter,
                script,
            } => vec![interpreter.to_string(), script.to_string()],
        }
    }
}

/// A fully assembled transpiler invocation for one file group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: Program,
    destination: Utf8PathBuf,
    extra_args: Vec<String>,
    sources: Vec<Utf8PathBuf>,
}

impl Invocation {
    /// Assembles `program --out <destination> [extra_args...] <sources...>`.
    pub fn new(
        program: Program,
        destination: &Utf8Path,
        extra_args: &[String],
        sources: &[Utf8PathBuf],
    ) -> Self {
        Self {
            program,
            destination: destination.to_owned(),
            extra_args: extra_args.to_vec(),
            sources: sources.to_vec(),
        }
    }

    /// Returns the program and its arguments as a single vector.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = self.program.argv();
        argv.push(OUT_FLAG.to_string());
        argv.push(self.destination.to_string());
        argv.extend(self.extra_args.iter().cloned());
        argv.extend(self.sources.iter().map(|s| s.to_string()));
        argv
    }

    /// Renders the invocation as one shell command line.
    ///
    /// Paths are quoted for `quoting`; extra arguments are emitted verbatim.
    pub fn render(&self, quoting: ShellQuoting) -> String {
        let mut parts: Vec<String> = self
            .program
            .argv()
            .iter()
            .map(|arg| quoting.quote(arg))
            .collect();
        parts.push(OUT_FLAG.to_string());
        parts.push(quoting.quote(self.destination.as_str()));
        parts.extend(self.extra_args.iter().cloned());
        parts.extend(self.sources.iter().map(|s| quoting.quote(s.as_str())));
        parts.join(" ")
    }

    /// Builds the process command, with output streams captured.
    pub fn to_command(&self, working_dir: Option<&Utf8Path>) -> Command {
        let argv = self.argv();
        let mut command = Command::new(&argv[0]);
        command
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = working_dir {
            command.current_dir(dir);
        }
        command
    }
}

/// Finds the script interpreter on `PATH`, falling back to the bare name.
pub fn find_interpreter() -> Utf8PathBuf {
    if let Ok(path) = which::which(DEFAULT_INTERPRETER) {
        if let Ok(utf8_path) = Utf8PathBuf::try_from(path) {
            return utf8_path;
        }
    }
    Utf8PathBuf::from(DEFAULT_INTERPRETER)
}

/// Splits a raw argument string into words.
///
/// Words are separated by unquoted whitespace. Single quotes keep their
/// content literally, double quotes allow backslash escapes, and a backslash
/// outside quotes escapes the next character.
pub fn split_args(raw: &str) -> Result<Vec<String>, SplitArgsError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(next) => current.push(next),
                        None => return Err(SplitArgsError::UnterminatedQuote('\'')),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(next) => current.push(next),
                            None => return Err(SplitArgsError::UnterminatedQuote('"')),
                        },
                        Some(next) => current.push(next),
                        None => return Err(SplitArgsError::UnterminatedQuote('"')),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(next) => current.push(next),
                    None => return Err(SplitArgsError::DanglingEscape),
                }
            }
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }

    if in_word {
        words.push(current);
    }

    Ok(words)
}
