//! CLI tests for package-breeder.
//!
//! None of these invoke the bootstrap tool: every nest a command would need
//! is either absent (listing only) or already recorded in `nests/`.

use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SPECIES: &str = "\
common:
  distribution: bookworm
  packages:
    excluded: [a, b]
t1:
  architecture: amd64
  packages:
    included: [a]
t2:
  architecture: armhf
";

fn breeder_cmd() -> Command {
    cargo_bin_cmd!("package-breeder")
}

fn base_dir() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("species.yaml"), SPECIES).unwrap();
    temp
}

/// Record a built nest for `target` without running the bootstrap tool.
fn record_nest(base: &Path, target: &str, architecture: &str) {
    let nests = base.join("nests");
    fs::create_dir_all(&nests).unwrap();
    fs::write(nests.join(format!("{target}.cpio.gz")), "image").unwrap();
    fs::write(
        nests.join(format!("{target}.yaml")),
        format!(
            "built: 2017-05-01T12:30:05\nspecie:\n  distribution: bookworm\n  architecture: {architecture}\n  packages:\n    included: []\n    excluded: [b]\n"
        ),
    )
    .unwrap();
}

#[test]
fn help_lists_commands() {
    breeder_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build-nests"))
        .stdout(predicate::str::contains("hatch-an-egg"));
}

#[test]
fn species_lists_targets_and_nest_state() {
    let base = base_dir();
    record_nest(base.path(), "t2", "armhf");

    breeder_cmd()
        .arg(base.path())
        .arg("species")
        .assert()
        .success()
        .stdout(predicate::str::contains("specie: t1"))
        .stdout(predicate::str::contains("included: a"))
        .stdout(predicate::str::contains("excluded: b"))
        .stdout(predicate::str::contains("nest: not available"))
        .stdout(predicate::str::contains("nest: built 2017-05-01T12:30:05"));
}

#[test]
fn species_json_is_machine_readable() {
    let base = base_dir();
    let output = breeder_cmd()
        .arg(base.path())
        .args(["species", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let listing: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(listing[0]["specie"]["name"], "t1");
    assert_eq!(listing[0]["nest"]["state"], "not_available");
}

#[test]
fn missing_base_dir_fails() {
    breeder_cmd()
        .args(["/nonexistent_breeder_base", "species"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("base directory"));
}

#[test]
fn missing_species_file_fails() {
    let temp = TempDir::new().unwrap();
    breeder_cmd()
        .arg(temp.path())
        .arg("species")
        .assert()
        .failure()
        .stderr(predicate::str::contains("species file"));
}

#[test]
fn malformed_catalog_fails() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("species.yaml"), "t1:\n  architecture: amd64\n").unwrap();
    breeder_cmd()
        .arg(temp.path())
        .arg("species")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing 'distribution'"));
}

#[test]
fn unknown_command_fails() {
    let base = base_dir();
    breeder_cmd()
        .arg(base.path())
        .arg("lay-an-egg")
        .assert()
        .failure();
}

#[test]
fn unknown_target_fails_with_usage() {
    let base = base_dir();
    breeder_cmd()
        .arg(base.path())
        .args(["build-nest", "t9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown specie \"t9\""))
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn build_nests_skips_recorded_nests() {
    let base = base_dir();
    record_nest(base.path(), "t1", "amd64");
    record_nest(base.path(), "t2", "armhf");
    let metadata = base.path().join("nests/t1.yaml");
    let before = fs::read_to_string(&metadata).unwrap();

    breeder_cmd()
        .arg(base.path())
        .arg("build-nests")
        .assert()
        .success()
        .stdout(predicate::str::contains("[nest:t1] already built 2017-05-01T12:30:05"))
        .stdout(predicate::str::contains("[nest:t2] already built"));

    assert_eq!(fs::read_to_string(&metadata).unwrap(), before);
}

#[test]
fn hatch_an_egg_locates_nest() {
    let base = base_dir();
    record_nest(base.path(), "t1", "amd64");
    fs::create_dir_all(base.path().join("genomes")).unwrap();
    fs::write(
        base.path().join("genomes/hello.yaml"),
        "name: hello\nversion: '2.10'\ndependencies:\n  external: [libc6]\n",
    )
    .unwrap();

    breeder_cmd()
        .arg(base.path())
        .args(["hatch-an-egg", "t1", "hello.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[egg:hello-2.10] nest for 't1'"));
}

#[test]
fn hatch_an_egg_without_nest_fails() {
    let base = base_dir();
    fs::create_dir_all(base.path().join("genomes")).unwrap();
    fs::write(
        base.path().join("genomes/hello.yaml"),
        "name: hello\nversion: 1\n",
    )
    .unwrap();

    breeder_cmd()
        .arg(base.path())
        .args(["hatch-an-egg", "t2", "hello.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nest for the specie \"t2\""));
}

#[test]
fn hatch_an_egg_missing_genome_fails() {
    let base = base_dir();
    breeder_cmd()
        .arg(base.path())
        .args(["hatch-an-egg", "t1", "absent.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("genome file"));
}
