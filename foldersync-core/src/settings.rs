//! User settings file.
//!
//! # Storage layout
//!
//! ```text
//! ~/.foldersync/
//!   settings.yaml   (mode 0600)
//! ```
//!
//! # API pattern
//!
//! - `fn_at(home: &Path, …)` takes an explicit home; tests use it with `TempDir`.
//! - `fn(…)` derives home from `dirs::home_dir()` and delegates to `_at`.
//!
//! A missing file means defaults. Unknown keys are rejected so typos surface.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};

pub const DEFAULT_WATCH_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_BULK_WORKERS: usize = 4;

/// Defaults applied when the CLI does not override them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Appended to the built-in exclusion patterns on every run.
    pub extra_excludes: Vec<String>,
    pub watch_interval_secs: u64,
    /// Modification times closer than this are treated as equal.
    pub mtime_tolerance_ms: u64,
    pub bulk_workers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            extra_excludes: Vec::new(),
            watch_interval_secs: DEFAULT_WATCH_INTERVAL_SECS,
            mtime_tolerance_ms: 0,
            bulk_workers: DEFAULT_BULK_WORKERS,
        }
    }
}

impl Settings {
    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs)
    }

    pub fn mtime_tolerance(&self) -> Duration {
        Duration::from_millis(self.mtime_tolerance_ms)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `<home>/.foldersync/settings.yaml`: pure, no I/O.
pub fn settings_path_at(home: &Path) -> PathBuf {
    home.join(".foldersync").join("settings.yaml")
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Load settings, or defaults when the file does not exist.
///
/// Returns `ConfigError::Parse` (with path + line context) for malformed YAML.
pub fn load_at(home: &Path) -> Result<Settings, ConfigError> {
    let path = settings_path_at(home);
    if !path.exists() {
        return Ok(Settings::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    if contents.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Settings, ConfigError> {
    load_at(&home()?)
}

// ---------------------------------------------------------------------------
// Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically write settings.
///
/// Write flow: serialize → `settings.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, settings: &Settings) -> Result<PathBuf, ConfigError> {
    let path = settings_path_at(home);
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid settings path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let yaml = settings.to_yaml()?;
    let tmp = path.with_file_name("settings.yaml.tmp");
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }
    Ok(path)
}

/// `save_at` convenience wrapper.
pub fn save(settings: &Settings) -> Result<PathBuf, ConfigError> {
    save_at(&home()?, settings)
}

/// Write a default settings file unless one exists. Returns its path.
pub fn init_at(home: &Path) -> Result<PathBuf, ConfigError> {
    let path = settings_path_at(home);
    if path.exists() {
        return Ok(path);
    }
    save_at(home, &Settings::default())
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}
