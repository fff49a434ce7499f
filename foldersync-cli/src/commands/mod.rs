pub mod bulk;
pub mod config;
pub mod sync;

/// How a command that ran to completion went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Clean,
    /// Finished, but some items or units failed.
    Partial,
}

impl RunStatus {
    pub fn from_errors(has_errors: bool) -> Self {
        if has_errors {
            RunStatus::Partial
        } else {
            RunStatus::Clean
        }
    }
}

/// `--exclude` values appended to the settings file's patterns.
pub fn merge_excludes(from_settings: &[String], from_cli: &[String]) -> Vec<String> {
    from_settings.iter().chain(from_cli).cloned().collect()
}
