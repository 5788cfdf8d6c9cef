//! CLI tests for keysweep.
//!
//! None of these reach the network: every case fails or exits before the
//! first forge request.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// A keysweep command with an empty environment, run from `dir` so no stray `.env` is picked up.
fn keysweep(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("keysweep");
    cmd.env_clear().current_dir(dir.path());
    cmd
}

fn write_env(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

const VALID_ENV: &str = "GITHUB_TOKEN=ghp_test\n\
OWNER=acme\n\
BRANCH=key-sweep\n\
GITHUB_API_URL=http://127.0.0.1:9\n";

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_help_lists_flags() {
        let dir = TempDir::new().unwrap();
        keysweep(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("--pattern"))
            .stdout(predicate::str::contains("--access-key"))
            .stdout(predicate::str::contains("--json"));
    }

    #[test]
    fn test_version() {
        let dir = TempDir::new().unwrap();
        keysweep(&dir)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("keysweep"));
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        let dir = TempDir::new().unwrap();
        keysweep(&dir)
            .args(["--log-format", "xml"])
            .assert()
            .failure();
    }
}

// =============================================================================
// Configuration Tests
// =============================================================================

mod configuration {
    use super::*;

    #[test]
    fn test_missing_configuration_fails() {
        let dir = TempDir::new().unwrap();
        keysweep(&dir)
            .args(["--pattern", "svc-", "--access-key", "AKIAEXAMPLE"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("GITHUB_TOKEN"));
    }

    #[test]
    fn test_missing_env_file_fails() {
        let dir = TempDir::new().unwrap();
        keysweep(&dir)
            .args(["--env-file", "does-not-exist.env"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("does-not-exist.env"));
    }

    #[test]
    fn test_invalid_finding_pattern_fails() {
        let dir = TempDir::new().unwrap();
        let env = write_env(&dir, "sweep.env", &format!("{}FINDING_PATTERN=present(\n", VALID_ENV));
        keysweep(&dir)
            .arg("--env-file")
            .arg(&env)
            .args(["--pattern", "svc-", "--access-key", "AKIAEXAMPLE"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("FINDING_PATTERN"));
    }

    #[test]
    fn test_invalid_repository_pattern_fails_before_listing() {
        let dir = TempDir::new().unwrap();
        let env = write_env(&dir, "sweep.env", VALID_ENV);
        keysweep(&dir)
            .arg("--env-file")
            .arg(&env)
            .args(["--pattern", "svc-(", "--access-key", "AKIAEXAMPLE"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid repository pattern"));
    }

    #[test]
    fn test_empty_repository_pattern_rejected() {
        let dir = TempDir::new().unwrap();
        write_env(&dir, ".env", VALID_ENV);
        keysweep(&dir)
            .args(["--pattern", "  ", "--access-key", "AKIAEXAMPLE"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("must not be empty"));
    }
}
