use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
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

fn make_unit(root: &Path, name: &str) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).expect("mkdir unit");
    fs::write(dir.join("SKILL.md"), format!("# {name}\n")).expect("write SKILL.md");
}

#[test]
fn bulk_dry_run_reports_units_and_writes_nothing() {
    let home = TempDir::new().expect("home");
    let skills = TempDir::new().expect("skills");
    let target = TempDir::new().expect("target");
    make_unit(skills.path(), "alpha");
    make_unit(skills.path(), "beta");

    foldersync_cmd(home.path())
        .arg("bulk")
        .arg(skills.path())
        .arg(target.path())
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(contains("[dry-run]"))
        .stdout(contains("2 synced"))
        .stdout(contains("alpha"))
        .stdout(contains("beta"));

    assert!(!target.path().join("alpha").exists());
    assert!(!target.path().join("beta").exists());
}

#[test]
fn bulk_missing_target_root_exits_one_without_creating_it() {
    let home = TempDir::new().expect("home");
    let skills = TempDir::new().expect("skills");
    let out = TempDir::new().expect("out");
    make_unit(skills.path(), "alpha");
    let target = out.path().join("typo_target");

    foldersync_cmd(home.path())
        .arg("bulk")
        .arg(skills.path())
        .arg(&target)
        .assert()
        .code(1)
        .stderr(contains("does not exist"));

    assert!(!target.exists());
}

#[test]
fn bulk_json_report_lists_units_in_name_order() {
    let home = TempDir::new().expect("home");
    let skills = TempDir::new().expect("skills");
    let target = TempDir::new().expect("target");
    make_unit(skills.path(), "zeta");
    make_unit(skills.path(), "alpha");
    make_unit(skills.path(), ".hidden");

    let output = foldersync_cmd(home.path())
        .arg("bulk")
        .arg(skills.path())
        .arg(target.path())
        .args(["--json", "--workers", "2"])
        .output()
        .expect("run foldersync bulk --json");
    assert!(output.status.success(), "{output:?}");

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(report["synced_count"], 2);
    assert_eq!(report["units"][0]["name"], "alpha");
    assert_eq!(report["units"][0]["status"], "synced");
    assert_eq!(report["units"][1]["name"], "zeta");
    assert!(target.path().join("zeta/SKILL.md").is_file());
    assert!(!target.path().join(".hidden").exists());
}

#[test]
#[cfg(unix)]
fn bulk_skips_symlinked_target_units_by_default() {
    let home = TempDir::new().expect("home");
    let skills = TempDir::new().expect("skills");
    let target = TempDir::new().expect("target");
    let linked = TempDir::new().expect("linked");
    make_unit(skills.path(), "alpha");
    make_unit(skills.path(), "beta");
    std::os::unix::fs::symlink(linked.path(), target.path().join("alpha")).unwrap();

    foldersync_cmd(home.path())
        .arg("bulk")
        .arg(skills.path())
        .arg(target.path())
        .assert()
        .success()
        .stdout(contains("SKIPPED"))
        .stdout(contains("target is a symlink"));

    assert!(!linked.path().join("SKILL.md").exists());
    assert!(target.path().join("beta/SKILL.md").is_file());

    foldersync_cmd(home.path())
        .arg("bulk")
        .arg(skills.path())
        .arg(target.path())
        .arg("--no-skip-symlinks")
        .assert()
        .success();
    assert!(linked.path().join("SKILL.md").is_file());
}

#[test]
fn failed_unit_exits_with_code_two() {
    let home = TempDir::new().expect("home");
    let skills = TempDir::new().expect("skills");
    let target = TempDir::new().expect("target");
    make_unit(skills.path(), "alpha");
    make_unit(skills.path(), "beta");
    fs::write(target.path().join("alpha"), "in the way").unwrap();

    foldersync_cmd(home.path())
        .arg("bulk")
        .arg(skills.path())
        .arg(target.path())
        .assert()
        .code(2)
        .stdout(contains("FAILED"))
        .stdout(contains("1 failed"));

    assert!(target.path().join("beta/SKILL.md").is_file());
}

#[test]
fn bulk_missing_source_exits_with_code_one() {
    let home = TempDir::new().expect("home");
    let target = TempDir::new().expect("target");

    foldersync_cmd(home.path())
        .arg("bulk")
        .arg(target.path().join("no-skills-here"))
        .arg(target.path())
        .assert()
        .code(1)
        .stderr(contains("does not exist"));
}
