//! Glob-based exclusion of relative paths.
//!
//! Each pattern is tested against the base name, the full relative path, and
//! every ancestor segment. A trailing `/` restricts a pattern to directories.
//! `*` also crosses `/` when matched against a full path, like `fnmatch`.

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::ConfigError;

/// Patterns every matcher starts with.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    "__pycache__",
    "*.pyc",
    ".DS_Store",
    "node_modules",
    ".venv",
    "venv",
];

/// Suffix of the engine's in-flight copies. Never inventoried.
pub const TMP_SUFFIX: &str = ".foldersync.tmp";

#[derive(Debug, Clone)]
pub struct ExclusionMatcher {
    patterns: Vec<String>,
    any_kind: GlobSet,
    dirs_only: GlobSet,
}

impl ExclusionMatcher {
    /// Default patterns followed by `extra`.
    pub fn new<S: AsRef<str>>(extra: &[S]) -> Result<Self, ConfigError> {
        let patterns = DEFAULT_EXCLUDES
            .iter()
            .map(|p| p.to_string())
            .chain(extra.iter().map(|p| p.as_ref().trim().to_string()))
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>();

        let mut any_kind = GlobSetBuilder::new();
        let mut dirs_only = GlobSetBuilder::new();
        for pattern in &patterns {
            match pattern.strip_suffix('/') {
                Some(dir_pattern) => dirs_only.add(compile(pattern, dir_pattern)?),
                None => any_kind.add(compile(pattern, pattern)?),
            };
        }

        Ok(Self {
            any_kind: build(any_kind, &patterns)?,
            dirs_only: build(dirs_only, &patterns)?,
            patterns,
        })
    }

    /// Matcher with only [`DEFAULT_EXCLUDES`].
    pub fn with_defaults() -> Self {
        let mut any_kind = GlobSetBuilder::new();
        for pattern in DEFAULT_EXCLUDES {
            if let Ok(glob) = Glob::new(pattern) {
                any_kind.add(glob);
            }
        }
        Self {
            patterns: DEFAULT_EXCLUDES.iter().map(|p| p.to_string()).collect(),
            any_kind: any_kind.build().unwrap_or_else(|_| GlobSet::empty()),
            dirs_only: GlobSet::empty(),
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether `relative_path` (forward slashes) should be left out of a scan.
    pub fn should_exclude(&self, relative_path: &str, is_directory: bool) -> bool {
        let relative_path = relative_path.trim_matches('/');
        if relative_path.is_empty() {
            return false;
        }
        if relative_path.ends_with(TMP_SUFFIX) {
            return true;
        }

        if self.any_kind.is_match(relative_path)
            || (is_directory && self.dirs_only.is_match(relative_path))
        {
            return true;
        }

        let mut segments = relative_path.split('/').peekable();
        while let Some(segment) = segments.next() {
            let is_last = segments.peek().is_none();
            if self.any_kind.is_match(segment) {
                return true;
            }
            if (!is_last || is_directory) && self.dirs_only.is_match(segment) {
                return true;
            }
        }
        false
    }
}

impl Default for ExclusionMatcher {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn compile(original: &str, pattern: &str) -> Result<Glob, ConfigError> {
    Glob::new(pattern).map_err(|source| ConfigError::InvalidPattern {
        pattern: original.to_string(),
        source,
    })
}

fn build(builder: GlobSetBuilder, patterns: &[String]) -> Result<GlobSet, ConfigError> {
    builder.build().map_err(|source| ConfigError::InvalidPattern {
        pattern: patterns.join(", "),
        source,
    })
}
