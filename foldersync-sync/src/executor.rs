//! Apply a plan to two roots.
//!
//! ## File copy protocol
//!
//! 1. Ensure the destination's parent directory exists.
//! 2. Refuse if the destination is a directory.
//! 3. Copy bytes to `<dest>.foldersync.tmp`.
//! 4. Stamp the temp file with the source entry's modification time.
//! 5. Rename over the destination (atomic on POSIX).
//!
//! Symlinks follow the same protocol with a freshly created link in step 3.
//! Nothing is ever deleted; every item fails or succeeds on its own.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use filetime::FileTime;

use foldersync_core::{
    exclude::TMP_SUFFIX, scanner::resolve, CopyError, EntryKind, FileEntry, PlanAction, Side,
    SyncPlanItem, SyncResult,
};

/// Outcome of one applied plan item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Copied { path: PathBuf },
    DirCreated { path: PathBuf },
    Skipped,
}

/// Applies plan items between a fixed pair of roots.
#[derive(Debug, Clone)]
pub struct SyncExecutor {
    source_root: PathBuf,
    target_root: PathBuf,
}

impl SyncExecutor {
    pub fn new(source_root: impl Into<PathBuf>, target_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            target_root: target_root.into(),
        }
    }

    fn root(&self, side: Side) -> &Path {
        match side {
            Side::Source => &self.source_root,
            Side::Target => &self.target_root,
        }
    }

    /// Apply every item; failures are collected, never raised.
    pub fn apply(&self, plan: &[SyncPlanItem]) -> SyncResult {
        let started = Instant::now();
        let mut result = SyncResult::new(Utc::now(), false);

        for item in plan {
            match self.apply_item(item) {
                Ok(ApplyOutcome::Copied { path }) => {
                    tracing::info!("copied ({}): {}", item.reason, path.display());
                    result.copied += 1;
                }
                Ok(ApplyOutcome::DirCreated { path }) => {
                    tracing::info!("created directory: {}", path.display());
                    result.dirs_created += 1;
                }
                Ok(ApplyOutcome::Skipped) => {
                    tracing::debug!("skip ({}): {}", item.reason, item.relative_path);
                    result.skipped += 1;
                }
                Err(err) => {
                    tracing::warn!("{}: {err}", item.relative_path);
                    result.errors.push(
                        CopyError {
                            relative_path: item.relative_path.clone(),
                            action: item.action,
                            message: err.to_string(),
                        }
                        .into(),
                    );
                }
            }
        }

        result.duration_ms = started.elapsed().as_millis();
        result
    }

    /// Apply a single item.
    pub fn apply_item(&self, item: &SyncPlanItem) -> io::Result<ApplyOutcome> {
        let (from, to) = match item.action {
            PlanAction::Skip => return Ok(ApplyOutcome::Skipped),
            PlanAction::CreateDir { on } => {
                let path = resolve(self.root(on), &item.relative_path);
                create_dir(&path)?;
                return Ok(ApplyOutcome::DirCreated { path });
            }
            PlanAction::CopySourceToTarget => (Side::Source, Side::Target),
            PlanAction::CopyTargetToSource => (Side::Target, Side::Source),
        };

        let entry = item.entry.as_ref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "plan item carries no entry")
        })?;
        let src = resolve(self.root(from), &item.relative_path);
        let dst = resolve(self.root(to), &item.relative_path);

        match &entry.kind {
            EntryKind::File => copy_file(&src, &dst, entry)?,
            EntryKind::Symlink { target } => copy_symlink(target, &dst, entry)?,
            EntryKind::Directory => create_dir(&dst)?,
        }
        Ok(ApplyOutcome::Copied { path: dst })
    }
}

/// [`SyncExecutor::apply`] for a one-off call.
pub fn apply(plan: &[SyncPlanItem], source_root: &Path, target_root: &Path) -> SyncResult {
    SyncExecutor::new(source_root, target_root).apply(plan)
}

fn create_dir(path: &Path) -> io::Result<()> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(meta) => {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!(
                    "cannot create directory {}: a {} is in the way",
                    path.display(),
                    if meta.file_type().is_symlink() { "symlink" } else { "file" }
                ),
            ))
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }
    std::fs::create_dir_all(path)
}

fn prepare_destination(dst: &Path) -> io::Result<()> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)?;
    }
    match std::fs::symlink_metadata(dst) {
        Ok(meta) if meta.is_dir() => Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("destination {} is a directory", dst.display()),
        )),
        Ok(_) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

pub(crate) fn tmp_path(dst: &Path) -> PathBuf {
    let mut staged = dst.as_os_str().to_owned();
    staged.push(TMP_SUFFIX);
    PathBuf::from(staged)
}

fn copy_file(src: &Path, dst: &Path, entry: &FileEntry) -> io::Result<()> {
    prepare_destination(dst)?;
    let tmp = tmp_path(dst);
    let mtime = FileTime::from_system_time(entry.modified);

    let staged = std::fs::copy(src, &tmp)
        .and_then(|_| filetime::set_file_mtime(&tmp, mtime))
        .and_then(|_| std::fs::rename(&tmp, dst));
    if let Err(err) = staged {
        let _ = std::fs::remove_file(&tmp);
        return Err(err);
    }
    Ok(())
}

fn copy_symlink(target: &Path, dst: &Path, entry: &FileEntry) -> io::Result<()> {
    prepare_destination(dst)?;
    let tmp = tmp_path(dst);
    let mtime = FileTime::from_system_time(entry.modified);

    // A leftover temp link from an interrupted run would make creation fail.
    let _ = std::fs::remove_file(&tmp);
    let staged = make_symlink(target, &tmp)
        .and_then(|_| filetime::set_symlink_file_times(&tmp, mtime, mtime))
        .and_then(|_| std::fs::rename(&tmp, dst));
    if let Err(err) = staged {
        let _ = std::fs::remove_file(&tmp);
        return Err(err);
    }
    Ok(())
}

#[cfg(unix)]
fn make_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn make_symlink(target: &Path, link: &Path) -> io::Result<()> {
    let resolved = link.parent().map(|p| p.join(target));
    match resolved {
        Some(path) if path.is_dir() => std::os::windows::fs::symlink_dir(target, link),
        _ => std::os::windows::fs::symlink_file(target, link),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use foldersync_core::PlanReason;
    use tempfile::TempDir;

    fn file_entry(path: &str, secs: u64) -> FileEntry {
        FileEntry {
            relative_path: path.to_string(),
            kind: EntryKind::File,
            modified: UNIX_EPOCH + Duration::from_secs(secs),
            size: 0,
        }
    }

    fn copy_item(path: &str, action: PlanAction, entry: FileEntry) -> SyncPlanItem {
        SyncPlanItem {
            relative_path: path.to_string(),
            action,
            reason: PlanReason::OnlyInSource,
            entry: Some(entry),
        }
    }

    fn mtime(path: &Path) -> SystemTime {
        fs::symlink_metadata(path).unwrap().modified().unwrap()
    }

    #[test]
    fn copies_bytes_and_mtime_into_nested_destination() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("deep/er")).unwrap();
        fs::write(src.path().join("deep/er/a.txt"), "payload").unwrap();

        let plan = vec![copy_item(
            "deep/er/a.txt",
            PlanAction::CopySourceToTarget,
            file_entry("deep/er/a.txt", 1_000),
        )];
        let result = apply(&plan, src.path(), dst.path());

        assert_eq!(result.copied, 1);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let copied = dst.path().join("deep/er/a.txt");
        assert_eq!(fs::read_to_string(&copied).unwrap(), "payload");
        assert_eq!(mtime(&copied), UNIX_EPOCH + Duration::from_secs(1_000));
        assert!(!tmp_path(&copied).exists(), "temp file must be renamed away");
    }

    #[test]
    fn copy_target_to_source_writes_into_source_root() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::write(dst.path().join("back.txt"), "from target").unwrap();

        let plan = vec![copy_item(
            "back.txt",
            PlanAction::CopyTargetToSource,
            file_entry("back.txt", 50),
        )];
        let result = apply(&plan, src.path(), dst.path());
        assert_eq!(result.copied, 1);
        assert_eq!(
            fs::read_to_string(src.path().join("back.txt")).unwrap(),
            "from target"
        );
    }

    #[test]
    fn create_dir_makes_parents_and_counts_separately() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let item = SyncPlanItem {
            relative_path: "a/b/c".into(),
            action: PlanAction::CreateDir { on: Side::Target },
            reason: PlanReason::DirectoryMissing,
            entry: None,
        };
        let result = apply(&[item], src.path(), dst.path());
        assert_eq!(result.dirs_created, 1);
        assert_eq!(result.copied, 0);
        assert!(dst.path().join("a/b/c").is_dir());
    }

    #[test]
    fn failures_are_recorded_and_do_not_abort_the_batch() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::write(src.path().join("present.txt"), "ok").unwrap();

        let plan = vec![
            copy_item(
                "missing.txt",
                PlanAction::CopySourceToTarget,
                file_entry("missing.txt", 1),
            ),
            copy_item(
                "present.txt",
                PlanAction::CopySourceToTarget,
                file_entry("present.txt", 1),
            ),
            SyncPlanItem::skip("other", PlanReason::InSync),
        ];
        let result = apply(&plan, src.path(), dst.path());

        assert_eq!(result.copied, 1);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].to_string().contains("missing.txt"));
        assert!(!tmp_path(&dst.path().join("missing.txt")).exists());
    }

    #[test]
    fn refuses_to_overwrite_a_directory_with_a_file() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::write(src.path().join("x"), "file").unwrap();
        fs::create_dir_all(dst.path().join("x/child")).unwrap();

        let plan = vec![copy_item("x", PlanAction::CopySourceToTarget, file_entry("x", 1))];
        let result = apply(&plan, src.path(), dst.path());
        assert_eq!(result.errors.len(), 1);
        assert!(dst.path().join("x/child").is_dir(), "directory must survive");
    }

    #[test]
    #[cfg(unix)]
    fn symlink_is_recreated_not_dereferenced() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::write(src.path().join("real.txt"), "secret bytes").unwrap();
        std::os::unix::fs::symlink("real.txt", src.path().join("alias")).unwrap();

        let entry = FileEntry {
            kind: EntryKind::Symlink {
                target: PathBuf::from("real.txt"),
            },
            ..file_entry("alias", 777)
        };
        let plan = vec![copy_item("alias", PlanAction::CopySourceToTarget, entry)];
        let result = apply(&plan, src.path(), dst.path());
        assert!(result.errors.is_empty(), "{:?}", result.errors);

        let link = dst.path().join("alias");
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("real.txt"));
        assert!(!dst.path().join("real.txt").exists(), "target bytes must not be copied");
        assert_eq!(mtime(&link), UNIX_EPOCH + Duration::from_secs(777));
    }

    #[test]
    #[cfg(unix)]
    fn symlink_replaces_conflicting_file() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::write(dst.path().join("m"), "old file").unwrap();

        let entry = FileEntry {
            kind: EntryKind::Symlink {
                target: PathBuf::from("/elsewhere"),
            },
            ..file_entry("m", 10)
        };
        let plan = vec![copy_item("m", PlanAction::CopySourceToTarget, entry)];
        let result = apply(&plan, src.path(), dst.path());
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(
            fs::read_link(dst.path().join("m")).unwrap(),
            PathBuf::from("/elsewhere")
        );
    }

    #[test]
    #[cfg(unix)]
    fn file_copy_replaces_symlink_without_touching_its_target() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("victim.txt"), "untouched").unwrap();
        std::os::unix::fs::symlink(outside.path().join("victim.txt"), dst.path().join("m"))
            .unwrap();
        fs::write(src.path().join("m"), "new content").unwrap();

        let plan = vec![copy_item("m", PlanAction::CopySourceToTarget, file_entry("m", 10))];
        let result = apply(&plan, src.path(), dst.path());
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert!(!fs::symlink_metadata(dst.path().join("m")).unwrap().file_type().is_symlink());
        assert_eq!(
            fs::read_to_string(outside.path().join("victim.txt")).unwrap(),
            "untouched"
        );
    }

    #[test]
    #[cfg(unix)]
    fn rename_failure_leaves_original_and_cleans_tmp() {
        use std::os::unix::fs::PermissionsExt;

        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::write(src.path().join("file.md"), "new content").unwrap();
        let readonly_dir = dst.path().join("readonly");
        fs::create_dir_all(&readonly_dir).unwrap();
        fs::write(readonly_dir.join("file.md"), "original").unwrap();
        fs::set_permissions(&readonly_dir, fs::Permissions::from_mode(0o555)).unwrap();

        // Root ignores permission bits; nothing to assert in that case.
        let probe = readonly_dir.join(".probe");
        if fs::write(&probe, "").is_ok() {
            let _ = fs::remove_file(&probe);
            fs::set_permissions(&readonly_dir, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let plan = vec![copy_item(
            "readonly/file.md",
            PlanAction::CopySourceToTarget,
            file_entry("readonly/file.md", 10),
        )];
        let result = apply(&plan, src.path(), dst.path());
        fs::set_permissions(&readonly_dir, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(result.errors.len(), 1);
        assert_eq!(
            fs::read_to_string(readonly_dir.join("file.md")).unwrap(),
            "original"
        );
        assert!(!tmp_path(&readonly_dir.join("file.md")).exists());
    }

    #[test]
    #[cfg(unix)]
    fn copies_into_root_with_non_utf8_name() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let src = TempDir::new().unwrap();
        let parent = TempDir::new().unwrap();
        let dst = parent.path().join(OsStr::from_bytes(b"dst\xff"));
        fs::create_dir_all(&dst).unwrap();
        fs::write(src.path().join("a.txt"), "alpha").unwrap();

        let plan = vec![copy_item("a.txt", PlanAction::CopySourceToTarget, file_entry("a.txt", 10))];
        let result = apply(&plan, src.path(), &dst);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.copied, 1);
        assert_eq!(fs::read_to_string(dst.join("a.txt")).unwrap(), "alpha");
        assert!(!tmp_path(&dst.join("a.txt")).exists());
    }
}
