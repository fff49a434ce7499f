use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use filetime::FileTime;
use predicates::str::contains;
use tempfile::TempDir;

fn foldersync_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("foldersync"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

fn write_at(path: &Path, content: &str, secs: i64) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(path, content).expect("write");
    filetime::set_file_mtime(path, FileTime::from_unix_time(secs, 0)).expect("mtime");
}

#[test]
fn one_way_sync_copies_then_reports_nothing_to_do() {
    let home = TempDir::new().expect("home");
    let src = TempDir::new().expect("src");
    let dst = TempDir::new().expect("dst");
    write_at(&src.path().join("a.txt"), "alpha", 100);

    foldersync_cmd(home.path())
        .arg("sync")
        .arg(src.path())
        .arg(dst.path())
        .arg("--one-way")
        .assert()
        .success()
        .stdout(contains("1 copied"))
        .stdout(contains("(one-way)"));

    assert_eq!(fs::read_to_string(dst.path().join("a.txt")).unwrap(), "alpha");
    let mtime = fs::metadata(dst.path().join("a.txt")).unwrap().modified().unwrap();
    assert_eq!(FileTime::from_system_time(mtime).unix_seconds(), 100);

    foldersync_cmd(home.path())
        .arg("sync")
        .arg(src.path())
        .arg(dst.path())
        .arg("--one-way")
        .assert()
        .success()
        .stdout(contains("0 copied"));
}

#[test]
fn dry_run_lists_plan_and_writes_nothing() {
    let home = TempDir::new().expect("home");
    let src = TempDir::new().expect("src");
    let dst = TempDir::new().expect("dst");
    write_at(&src.path().join("docs/guide.md"), "guide", 100);
    write_at(&dst.path().join("back.md"), "back", 100);

    foldersync_cmd(home.path())
        .arg("sync")
        .arg(src.path())
        .arg(dst.path())
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(contains("[dry-run]"))
        .stdout(contains("docs/guide.md"))
        .stdout(contains("back.md"));

    assert!(!dst.path().join("docs").exists());
    assert!(!src.path().join("back.md").exists());
}

#[test]
fn json_output_carries_counts_and_plan() {
    let home = TempDir::new().expect("home");
    let src = TempDir::new().expect("src");
    let dst = TempDir::new().expect("dst");
    write_at(&src.path().join("x.txt"), "new", 200);
    write_at(&dst.path().join("x.txt"), "old", 100);

    let output = foldersync_cmd(home.path())
        .arg("sync")
        .arg(src.path())
        .arg(dst.path())
        .arg("--json")
        .output()
        .expect("run foldersync sync --json");
    assert!(output.status.success(), "{output:?}");

    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(payload["mode"], "bidirectional");
    assert_eq!(payload["result"]["copied"], 1);
    assert_eq!(payload["plan"][0]["relative_path"], "x.txt");
    assert_eq!(payload["plan"][0]["reason"], "source_newer");
    assert_eq!(fs::read_to_string(dst.path().join("x.txt")).unwrap(), "new");
}

#[test]
fn exclude_flag_and_settings_patterns_both_apply() {
    let home = TempDir::new().expect("home");
    let settings = home.path().join(".foldersync/settings.yaml");
    fs::create_dir_all(settings.parent().unwrap()).unwrap();
    fs::write(&settings, "extra_excludes:\n  - '*.log'\n").unwrap();

    let src = TempDir::new().expect("src");
    let dst = TempDir::new().expect("dst");
    write_at(&src.path().join("keep.md"), "k", 100);
    write_at(&src.path().join("debug.log"), "l", 100);
    write_at(&src.path().join("build/out.bin"), "b", 100);
    write_at(&src.path().join("node_modules/pkg/index.js"), "n", 100);

    foldersync_cmd(home.path())
        .arg("sync")
        .arg(src.path())
        .arg(dst.path())
        .args(["--one-way", "--exclude", "build/"])
        .assert()
        .success();

    assert!(dst.path().join("keep.md").is_file());
    assert!(!dst.path().join("debug.log").exists());
    assert!(!dst.path().join("build").exists());
    assert!(!dst.path().join("node_modules").exists());
}

#[test]
fn missing_source_exits_with_code_one() {
    let home = TempDir::new().expect("home");
    let dst = TempDir::new().expect("dst");

    foldersync_cmd(home.path())
        .arg("sync")
        .arg(dst.path().join("absent"))
        .arg(dst.path())
        .assert()
        .code(1)
        .stderr(contains("does not exist"));
}

#[test]
fn overlapping_roots_exit_with_code_one() {
    let home = TempDir::new().expect("home");
    let src = TempDir::new().expect("src");
    fs::create_dir_all(src.path().join("mirror")).unwrap();

    foldersync_cmd(home.path())
        .arg("sync")
        .arg(src.path())
        .arg(src.path().join("mirror"))
        .assert()
        .code(1)
        .stderr(contains("overlap"));
}

#[test]
fn invalid_pattern_and_bad_flags_exit_with_code_one() {
    let home = TempDir::new().expect("home");
    let src = TempDir::new().expect("src");
    let dst = TempDir::new().expect("dst");

    foldersync_cmd(home.path())
        .arg("sync")
        .arg(src.path())
        .arg(dst.path())
        .args(["--exclude", "[unclosed"])
        .assert()
        .code(1)
        .stderr(contains("invalid exclude pattern"));

    foldersync_cmd(home.path())
        .arg("sync")
        .arg(src.path())
        .arg(dst.path())
        .args(["--interval", "3"])
        .assert()
        .code(1);
}

#[test]
fn malformed_settings_exit_with_code_one() {
    let home = TempDir::new().expect("home");
    let settings = home.path().join(".foldersync/settings.yaml");
    fs::create_dir_all(settings.parent().unwrap()).unwrap();
    fs::write(&settings, "watch_interval_secs: [not, a, number]\n").unwrap();
    let src = TempDir::new().expect("src");
    let dst = TempDir::new().expect("dst");

    foldersync_cmd(home.path())
        .arg("sync")
        .arg(src.path())
        .arg(dst.path())
        .assert()
        .code(1)
        .stderr(contains("failed to load settings"));
}

#[test]
fn config_init_then_show() {
    let home = TempDir::new().expect("home");

    foldersync_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(contains("not found, showing defaults"))
        .stdout(contains("watch_interval_secs: 5"));

    foldersync_cmd(home.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(contains("wrote default settings"));
    assert!(home.path().join(".foldersync/settings.yaml").is_file());

    foldersync_cmd(home.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(contains("already exist"));
}
