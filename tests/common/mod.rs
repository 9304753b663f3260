//! Common test utilities and fixtures
//!
//! Shared helpers for the stitch library and CLI tests.

#![allow(dead_code)]

use assert_cmd::Command;
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Creates a temporary directory for test fixtures
pub fn create_temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// Parse an inline YAML document
pub fn yaml(src: &str) -> Value {
    serde_yaml::from_str(src).expect("Invalid YAML in test")
}

/// Write `content` to `dir/relative`, creating parent directories
pub fn write_file(dir: &Path, relative: &str, content: &str) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create fixture directory");
    }
    fs::write(&path, content).expect("Failed to write fixture");
    path
}

/// Read a staged YAML file
pub fn read_yaml(path: &Path) -> Value {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
    serde_yaml::from_str(&content).expect("Staged file is not valid YAML")
}

/// Lay out the app/db/metrics stack used across CLI tests:
///
/// ```text
/// stack/app      component.yaml (children: ../db), compose.yaml
/// stack/db       compose.yaml (bare)
/// plugins/metrics component.yaml (when_present: db), compose.yaml
/// ```
pub fn create_stack(root: &Path) {
    write_file(
        root,
        "stack/app/component.yaml",
        "children: [../db]\nlabels: {com.example.stack: shop}\n",
    );
    write_file(
        root,
        "stack/app/compose.yaml",
        "services:\n  app:\n    image: shop/app\n",
    );
    write_file(
        root,
        "stack/db/compose.yaml",
        "services:\n  db:\n    image: postgres:16\n",
    );
    write_file(
        root,
        "plugins/metrics/component.yaml",
        r#"
profiles: [observability]
when_present:
  db:
    services:
      metrics:
        environment: {DB_HOST: db}
        depends_on: [db]
"#,
    );
    write_file(
        root,
        "plugins/metrics/compose.yaml",
        "services:\n  metrics:\n    image: prom/prometheus\n",
    );
}

/// stitch command isolated from the user's config, data dir and environment
pub fn stitch_cmd(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("stitch").expect("stitch binary should build");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("XDG_DATA_HOME", home.join(".local/share"))
        .env_remove("STITCH_PROFILES")
        .env_remove("RUST_LOG")
        .current_dir(home);
    cmd
}
