//! Read-only repository snapshots.
//!
//! A [`RepositorySnapshot`] is the whole object graph of one revision of the
//! operator repository: repository-wide config, operators with their `ci.yaml`
//! config, and the operators listed in each distribution catalog. Snapshots are
//! built once and never mutated; the gate always receives the base and head
//! snapshots explicitly.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{GateError, Result};

/// Configuration mapping (`config.yaml`, `ci.yaml`).
pub type Config = Map<String, Value>;

/// Which side of the change a snapshot represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Revision {
    /// Target branch, before the change.
    Base,
    /// Pull request head, after the change.
    Head,
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Revision::Base => write!(f, "base"),
            Revision::Head => write!(f, "head"),
        }
    }
}

/// Non-empty string value of a config key; numbers are rendered as strings.
pub fn config_str(config: &Config, key: &str) -> Option<String> {
    match config.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// String entries of a list-valued config key; anything else yields an empty list.
pub fn config_list(config: &Config, key: &str) -> Vec<String> {
    match config.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// One operator as seen in one snapshot.
///
/// Equality and hashing use `(name, revision)` only, so two values loaded
/// separately for the same on-disk operator are interchangeable.
#[derive(Debug, Clone)]
pub struct Operator {
    name: String,
    revision: Revision,
    config: Config,
}

impl Operator {
    pub fn new(name: impl Into<String>, revision: Revision, config: Config) -> Self {
        Self {
            name: name.into(),
            revision,
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Contents of `operators/<name>/ci.yaml`.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl PartialEq for Operator {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.revision == other.revision
    }
}

impl Eq for Operator {}

impl Hash for Operator {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.revision.hash(state);
    }
}

/// Reference to an operator inside a distribution catalog, `<catalog>/<operator>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatalogOperatorRef {
    pub catalog: String,
    pub operator: String,
}

impl CatalogOperatorRef {
    pub fn parse(reference: &str) -> Result<Self> {
        match reference.split_once('/') {
            Some((catalog, operator))
                if !catalog.is_empty() && !operator.is_empty() && !operator.contains('/') =>
            {
                Ok(Self {
                    catalog: catalog.to_string(),
                    operator: operator.to_string(),
                })
            }
            _ => Err(GateError::InvalidCatalogReference(reference.to_string())),
        }
    }
}

impl fmt::Display for CatalogOperatorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.catalog, self.operator)
    }
}

/// A distribution catalog (`catalogs/<name>/`) and the operators it lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistributionCatalog {
    name: String,
    operators: BTreeSet<String>,
}

impl DistributionCatalog {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operators: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contains(&self, operator: &str) -> bool {
        self.operators.contains(operator)
    }

    pub fn operators(&self) -> impl Iterator<Item = &str> {
        self.operators.iter().map(String::as_str)
    }

    pub(crate) fn insert(&mut self, operator: impl Into<String>) {
        self.operators.insert(operator.into());
    }
}

/// Full object graph of one repository revision.
#[derive(Debug, Clone)]
pub struct RepositorySnapshot {
    root: Option<PathBuf>,
    revision: Revision,
    config: Config,
    operators: BTreeMap<String, Operator>,
    catalogs: BTreeMap<String, DistributionCatalog>,
}

impl RepositorySnapshot {
    /// Start building an in-memory snapshot.
    pub fn builder(revision: Revision) -> SnapshotBuilder {
        SnapshotBuilder::new(revision)
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Repository-wide `config.yaml`.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Repository maintainers (`maintainers` in `config.yaml`).
    pub fn maintainers(&self) -> Vec<String> {
        config_list(&self.config, "maintainers")
    }

    pub fn operators(&self) -> impl Iterator<Item = &Operator> {
        self.operators.values()
    }

    pub fn find_operator(&self, name: &str) -> Option<&Operator> {
        self.operators.get(name)
    }

    pub fn operator(&self, name: &str) -> Result<&Operator> {
        self.find_operator(name)
            .ok_or_else(|| GateError::UnknownOperator {
                name: name.to_string(),
                revision: self.revision.to_string(),
            })
    }

    /// Config of an operator in this snapshot; empty when the operator does not exist here.
    pub fn operator_config(&self, name: &str) -> Config {
        self.find_operator(name)
            .map(|op| op.config().clone())
            .unwrap_or_default()
    }

    pub fn catalog(&self, name: &str) -> Result<&DistributionCatalog> {
        self.catalogs
            .get(name)
            .ok_or_else(|| GateError::UnknownCatalog {
                name: name.to_string(),
                revision: self.revision.to_string(),
            })
    }

    /// Resolve a catalog-listed entry to the operator that owns it.
    pub fn resolve_catalog_operator(&self, reference: &CatalogOperatorRef) -> Result<&Operator> {
        let catalog = self.catalog(&reference.catalog)?;
        if !catalog.contains(&reference.operator) {
            return Err(GateError::UnknownCatalogOperator {
                catalog: reference.catalog.clone(),
                operator: reference.operator.clone(),
            });
        }
        self.operator(&reference.operator)
    }
}

/// Builder for in-memory snapshots (also used by the on-disk loader).
#[derive(Debug)]
pub struct SnapshotBuilder {
    root: Option<PathBuf>,
    revision: Revision,
    config: Config,
    operators: BTreeMap<String, Operator>,
    catalogs: BTreeMap<String, DistributionCatalog>,
}

impl SnapshotBuilder {
    fn new(revision: Revision) -> Self {
        Self {
            root: None,
            revision,
            config: Config::new(),
            operators: BTreeMap::new(),
            catalogs: BTreeMap::new(),
        }
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn operator(mut self, name: &str, config: Config) -> Self {
        self.operators.insert(
            name.to_string(),
            Operator::new(name, self.revision, config),
        );
        self
    }

    pub fn catalog(mut self, name: &str) -> Self {
        self.catalogs
            .entry(name.to_string())
            .or_insert_with(|| DistributionCatalog::new(name));
        self
    }

    pub fn catalog_operator(mut self, catalog: &str, operator: &str) -> Self {
        self.catalogs
            .entry(catalog.to_string())
            .or_insert_with(|| DistributionCatalog::new(catalog))
            .insert(operator);
        self
    }

    pub fn build(self) -> RepositorySnapshot {
        RepositorySnapshot {
            root: self.root,
            revision: self.revision,
            config: self.config,
            operators: self.operators,
            catalogs: self.catalogs,
        }
    }
}
