//! Smoke tests -- verify the binary runs and the CLI surface is wired.

use assert_cmd::Command;

#[test]
fn test_cli_help() {
    Command::cargo_bin("iobench")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("Scheduled network and file I/O latency benchmark"));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("iobench")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::contains("iobench"));
}

#[test]
fn test_preview_lists_fire_times() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("iobench")
        .unwrap()
        .current_dir(dir.path())
        .env_remove("IOBENCH_CONFIG")
        .args(["--preview", "3"])
        .assert()
        .success()
        .stdout(predicates::str::contains("15:22 UTC+05:00"))
        .stdout(predicates::str::contains("T15:22:00+05:00"));
}

#[test]
fn test_preview_with_invalid_positionals_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("iobench")
        .unwrap()
        .current_dir(dir.path())
        .env_remove("IOBENCH_CONFIG")
        .args(["not-a-number", "6", "--preview", "1"])
        .assert()
        .success()
        .stdout(predicates::str::contains("invalid number of runs"));
}

#[test]
fn test_preview_rejects_bad_schedule() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("iobench.toml"),
        "[schedule]\ntime = \"27:99\"\n",
    )
    .unwrap();
    Command::cargo_bin("iobench")
        .unwrap()
        .current_dir(dir.path())
        .env_remove("IOBENCH_CONFIG")
        .args(["--preview", "1"])
        .assert()
        .failure();
}
