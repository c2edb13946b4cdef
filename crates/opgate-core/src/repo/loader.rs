//! On-disk loader for repository snapshots.
//!
//! Layout:
//! - `config.yaml`: repository-wide settings (`maintainers`)
//! - `operators/<name>/ci.yaml`: per-operator settings
//! - `catalogs/<catalog>/<name>/`: operators listed in a distribution catalog

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::error::{GateError, Result};
use crate::repo::snapshot::{Config, RepositorySnapshot, Revision};

const REPO_CONFIG: &str = "config.yaml";
const OPERATOR_CONFIG: &str = "ci.yaml";
const OPERATORS_DIR: &str = "operators";
const CATALOGS_DIR: &str = "catalogs";

impl RepositorySnapshot {
    /// Load a snapshot from a checked-out repository.
    pub fn load(root: &Path, revision: Revision) -> Result<Self> {
        if !root.is_dir() {
            return Err(GateError::InvalidRepository(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let mut builder = RepositorySnapshot::builder(revision)
            .root(root)
            .config(read_yaml_mapping(&root.join(REPO_CONFIG))?);

        for dir in subdirectories(&root.join(OPERATORS_DIR))? {
            let name = dir_name(&dir)?;
            let config = read_yaml_mapping(&dir.join(OPERATOR_CONFIG))?;
            builder = builder.operator(&name, config);
        }

        for catalog_dir in subdirectories(&root.join(CATALOGS_DIR))? {
            let catalog = dir_name(&catalog_dir)?;
            builder = builder.catalog(&catalog);
            for entry in subdirectories(&catalog_dir)? {
                builder = builder.catalog_operator(&catalog, &dir_name(&entry)?);
            }
        }

        let snapshot = builder.build();
        debug!(
            "Loaded {} repository from {} ({} operators)",
            revision,
            root.display(),
            snapshot.operators().count()
        );
        Ok(snapshot)
    }
}

/// Read a YAML file whose top level is a mapping.
///
/// A missing or empty file is an empty mapping.
pub fn read_yaml_mapping(path: &Path) -> Result<Config> {
    if !path.is_file() {
        return Ok(Config::new());
    }
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Config::new());
    }
    match serde_yaml::from_str::<Value>(&content)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Config::new()),
        other => Err(GateError::InvalidRepository(format!(
            "{} must contain a mapping, found {}",
            path.display(),
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

/// Sorted, non-hidden subdirectories of `dir`; empty when `dir` does not exist.
fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let hidden = path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with('.'))
            .unwrap_or(true);
        if path.is_dir() && !hidden {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn dir_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            GateError::InvalidRepository(format!("non UTF-8 directory name: {}", path.display()))
        })
}
