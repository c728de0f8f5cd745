//! # Decking CLI Integration Test Common Helpers
//!
//! File: cli/tests/common.rs
//!
//! ## Overview
//!
//! Shared helpers for the integration tests in `cli/tests/`. Each test file
//! declares `mod common;` and gets a `decking` command whose user settings
//! directory points into a temporary directory, so a settings file on the
//! machine running the tests cannot change the outcome.
//!

// Not every test file uses every helper.
#![allow(dead_code)]

pub use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Runs the compiled `decking` binary from `dir`, with `dir` as its config
/// home and `DECKING_CONFIG` cleared.
pub fn decking_cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("decking").expect("Failed to find decking binary for testing");
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir)
        .env("HOME", dir)
        .env_remove("DECKING_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

/// A temporary project directory holding `file_name` with `content`.
pub fn project(file_name: &str, content: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join(file_name);
    fs::write(&path, content).expect("Failed to write definition file");
    (dir, path)
}

/// A valid definition with a two-container cluster (`alice` links to `bob`).
pub const OFFICE: &str = r#"{
    "images": {"repo/alice": "alice", "repo/bob": "bob"},
    "containers": {
        "bob": {"image": "repo/bob", "port": ["8080:80"]},
        "alice": {"image": "repo/alice", "dependencies": ["bob:bob_alias"], "env": ["MODE=dev"]}
    },
    "clusters": {"office": ["alice", "bob"]}
}"#;
