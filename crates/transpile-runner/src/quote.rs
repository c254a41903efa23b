//! Shell quoting for rendering invocations as command lines.

/// Quoting rules of the shell a rendered command line is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellQuoting {
    /// `cmd.exe`: embedded double quotes are doubled.
    Windows,
    /// POSIX `sh`: `"`, `\`, `$`, `` ` `` and `!` are backslash-escaped.
    Posix,
}

impl ShellQuoting {
    /// Returns the quoting rules for the platform this binary was built for.
    pub fn host() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Posix
        }
    }

    /// Wraps `text` in double quotes, escaping what the target shell would
    /// otherwise interpret inside them.
    pub fn quote(self, text: &str) -> String {
        let mut quoted = String::with_capacity(text.len() + 2);
        quoted.push('"');
        for c in text.chars() {
            match self {
                Self::Windows => {
                    if c == '"' {
                        quoted.push('"');
                    }
                }
                Self::Posix => {
                    if matches!(c, '"' | '\\' | '$' | '`' | '!') {
                        quoted.push('\\');
                    }
                }
            }
            quoted.push(c);
        }
        quoted.push('"');
        quoted
    }
}

impl Default for ShellQuoting {
    fn default() -> Self {
        Self::host()
    }
}
