//! Recursive, symlink-safe tree walk producing an [`Inventory`].

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::ScanError;
use crate::exclude::ExclusionMatcher;
use crate::types::{EntryKind, FileEntry, Inventory, Side};

/// Result of one scan: the inventory plus every entry that could not be read.
#[derive(Debug, Clone)]
pub struct Scan {
    pub inventory: Inventory,
    pub errors: Vec<ScanError>,
}

/// Walk `root` without following symlinks, pruning excluded directories.
///
/// A missing root yields an empty inventory. Unreadable entries become
/// [`ScanError`]s and are left out; their siblings are still scanned.
pub fn scan(root: &Path, side: Side, matcher: &ExclusionMatcher) -> Scan {
    match std::fs::symlink_metadata(root) {
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::debug!("{side} root {} does not exist; empty inventory", root.display());
            return Scan {
                inventory: Inventory::empty(root),
                errors: Vec::new(),
            };
        }
        Err(err) => {
            return Scan {
                inventory: Inventory::empty(root),
                errors: vec![scan_error(side, root, err.to_string())],
            };
        }
        Ok(_) => {}
    }

    let mut entries = BTreeMap::<String, FileEntry>::new();
    let mut errors = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| match relative_key(root, entry.path()) {
            Some(key) => !matcher.should_exclude(&key, entry.file_type().is_dir()),
            // Surface non-UTF-8 names as errors below rather than hiding them.
            None => true,
        });

    for item in walker {
        let entry = match item {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                // A directory whose listing failed must not be recreated as if empty.
                if let Some(key) = relative_key(root, &path) {
                    entries.remove(&key);
                }
                tracing::warn!("scan error under {}: {err}", root.display());
                errors.push(scan_error(side, &path, err.to_string()));
                continue;
            }
        };

        let path = entry.path();
        let Some(key) = relative_key(root, path) else {
            errors.push(scan_error(side, path, "path is not valid UTF-8".to_string()));
            continue;
        };

        match read_entry(path, key) {
            Ok(file_entry) => {
                entries.insert(file_entry.relative_path.clone(), file_entry);
            }
            Err(err) => {
                tracing::warn!("cannot read {}: {err}", path.display());
                errors.push(scan_error(side, path, err.to_string()));
            }
        }
    }

    tracing::debug!(
        "scanned {side} {}: {} entries, {} errors",
        root.display(),
        entries.len(),
        errors.len()
    );

    Scan {
        inventory: Inventory::new(root, entries.into_values()),
        errors,
    }
}

fn read_entry(path: &Path, relative_path: String) -> std::io::Result<FileEntry> {
    let meta = std::fs::symlink_metadata(path)?;
    let file_type = meta.file_type();
    let kind = if file_type.is_symlink() {
        EntryKind::Symlink {
            target: std::fs::read_link(path)?,
        }
    } else if file_type.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    };
    let size = if kind == EntryKind::File { meta.len() } else { 0 };

    Ok(FileEntry {
        relative_path,
        kind,
        modified: meta.modified()?,
        size,
    })
}

/// `a/b/c` for `<root>/a/b/c`; `None` outside the root or for non-UTF-8 names.
pub fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Inverse of [`relative_key`].
pub fn resolve(root: &Path, relative_path: &str) -> PathBuf {
    relative_path
        .split('/')
        .filter(|part| !part.is_empty())
        .fold(root.to_path_buf(), |acc, part| acc.join(part))
}

fn scan_error(side: Side, path: &Path, message: String) -> ScanError {
    ScanError {
        side,
        path: path.to_path_buf(),
        message,
    }
}
