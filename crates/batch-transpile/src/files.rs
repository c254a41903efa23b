//! Source pattern expansion.

use crate::config::ConfigError;
use camino::{Utf8Path, Utf8PathBuf};
use globset::{GlobBuilder, GlobMatcher};
use indexmap::IndexSet;
use std::cell::OnceCell;
use walkdir::WalkDir;

/// Sources of one file group after pattern expansion.
#[derive(Debug, Default)]
pub struct ExpandedSources {
    /// Workspace-relative sources, in pattern order.
    pub sources: Vec<Utf8PathBuf>,
    /// Glob patterns that matched no file.
    pub unmatched: Vec<String>,
}

/// Expands source patterns against the files of a workspace.
///
/// Literal entries are kept as written. Entries containing glob
/// metacharacters are replaced by the sorted workspace files they match, and
/// entries starting with `!` remove matching sources collected so far.
pub struct SourceExpander {
    workspace: Utf8PathBuf,
    files: OnceCell<Vec<Utf8PathBuf>>,
}

impl SourceExpander {
    pub fn new(workspace: &Utf8Path) -> Self {
        Self {
            workspace: workspace.to_owned(),
            files: OnceCell::new(),
        }
    }

    /// Expands `patterns` into the sources of one group.
    pub fn expand(&self, patterns: &[String]) -> Result<ExpandedSources, ConfigError> {
        let mut sources: IndexSet<Utf8PathBuf> = IndexSet::new();
        let mut unmatched = Vec::new();

        for pattern in patterns {
            if let Some(excluded) = pattern.strip_prefix('!') {
                let matcher = compile(excluded)?;
                sources.retain(|source| !matcher.is_match(source.as_str()));
                continue;
            }

            if !is_glob(pattern) {
                sources.insert(Utf8PathBuf::from(pattern));
                continue;
            }

            let matcher = compile(pattern)?;
            let mut matched = false;
            for file in self.files() {
                if matcher.is_match(file.as_str()) {
                    matched = true;
                    sources.insert(file.clone());
                }
            }
            if !matched {
                unmatched.push(pattern.clone());
            }
        }

        Ok(ExpandedSources {
            sources: sources.into_iter().collect(),
            unmatched,
        })
    }

    fn files(&self) -> &[Utf8PathBuf] {
        self.files.get_or_init(|| {
            let mut files: Vec<Utf8PathBuf> = WalkDir::new(&self.workspace)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter_map(|e| Utf8PathBuf::try_from(e.into_path()).ok())
                .filter_map(|p| p.strip_prefix(&self.workspace).ok().map(Utf8Path::to_path_buf))
                .collect();
            files.sort();
            files
        })
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

fn compile(pattern: &str) -> Result<GlobMatcher, ConfigError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| ConfigError::InvalidGlob(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn workspace(files: &[&str]) -> (TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        for file in files {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "").unwrap();
        }
        (dir, root)
    }

    fn patterns(patterns: &[&str]) -> Vec<String> {
        patterns.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_literal_sources_keep_order() {
        let (_dir, root) = workspace(&[]);
        let expander = SourceExpander::new(&root);

        let expanded = expander
            .expand(&patterns(&["src/b.js", "src/a.js", "src/b.js"]))
            .unwrap();
        assert_eq!(expanded.sources, vec!["src/b.js", "src/a.js"]);
        assert!(expanded.unmatched.is_empty());
    }

    #[test]
    fn test_glob_matches_sorted() {
        let (_dir, root) = workspace(&["src/b.js", "src/a.js", "src/nested/c.js", "src/d.ts"]);
        let expander = SourceExpander::new(&root);

        let expanded = expander.expand(&patterns(&["src/*.js"])).unwrap();
        assert_eq!(expanded.sources, vec!["src/a.js", "src/b.js"]);

        let expanded = expander.expand(&patterns(&["src/**/*.js"])).unwrap();
        assert_eq!(
            expanded.sources,
            vec!["src/a.js", "src/b.js", "src/nested/c.js"]
        );
    }

    #[test]
    fn test_literal_before_glob_wins_position() {
        let (_dir, root) = workspace(&["src/a.js", "src/main.js"]);
        let expander = SourceExpander::new(&root);

        let expanded = expander
            .expand(&patterns(&["src/main.js", "src/*.js"]))
            .unwrap();
        assert_eq!(expanded.sources, vec!["src/main.js", "src/a.js"]);
    }

    #[test]
    fn test_negated_pattern_excludes() {
        let (_dir, root) = workspace(&["src/a.js", "src/a.spec.js", "src/b.js"]);
        let expander = SourceExpander::new(&root);

        let expanded = expander
            .expand(&patterns(&["src/*.js", "!src/*.spec.js"]))
            .unwrap();
        assert_eq!(expanded.sources, vec!["src/a.js", "src/b.js"]);
    }

    #[test]
    fn test_unmatched_glob_reported() {
        let (_dir, root) = workspace(&["src/a.js"]);
        let expander = SourceExpander::new(&root);

        let expanded = expander
            .expand(&patterns(&["lib/*.js", "src/a.js"]))
            .unwrap();
        assert_eq!(expanded.sources, vec!["src/a.js"]);
        assert_eq!(expanded.unmatched, vec!["lib/*.js"]);
    }

    #[test]
    fn test_invalid_glob() {
        let (_dir, root) = workspace(&[]);
        let expander = SourceExpander::new(&root);

        assert!(matches!(
            expander.expand(&patterns(&["src/[.js"])),
            Err(ConfigError::InvalidGlob(_))
        ));
    }
}
