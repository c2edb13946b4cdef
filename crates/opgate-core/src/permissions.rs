//! Change-set aggregator.
//!
//! Collects every operator a pull request touches (directly, or through an
//! entry in a distribution catalog), runs the decision engine on each one in
//! order, and folds the decisions into a single verdict.
//!
//! A [`Decision::Rejected`] stops evaluation immediately and is returned as
//! [`GateError::Rejected`]; operators after it are never looked at.

use std::collections::HashSet;
use std::path::Path;

use opgate_catalog::Catalog;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dispatch::ReviewDispatcher;
use crate::error::{GateError, Result};
use crate::repo::{CatalogOperatorRef, Operator, RepositorySnapshot};
use crate::review::{Decision, OperatorReview, ReviewContext, ReviewOptions};

/// Operators affected by a pull request, as produced by change detection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeDescriptor {
    #[serde(default)]
    pub affected_operators: Vec<String>,
    /// `<catalog>/<operator>` references.
    #[serde(default)]
    pub affected_catalog_operators: Vec<String>,
}

impl ChangeDescriptor {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Pull request being checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// Account that opened the pull request.
    pub owner: String,
}

/// Operators owning the given catalog entries, resolved through the head snapshot.
pub fn extract_operators_from_catalog<'h>(
    head: &'h RepositorySnapshot,
    catalog_operators: &[String],
) -> Result<Vec<&'h Operator>> {
    catalog_operators
        .iter()
        .map(|reference| {
            let reference = CatalogOperatorRef::parse(reference)?;
            head.resolve_catalog_operator(&reference)
        })
        .collect()
}

/// Every operator to evaluate, in evaluation order, without duplicates.
///
/// Explicit operators come first, then catalog-derived ones; the first
/// occurrence of an operator wins.
pub fn affected_operators<'h>(
    head: &'h RepositorySnapshot,
    changes: &ChangeDescriptor,
) -> Result<Vec<&'h Operator>> {
    let mut seen = HashSet::new();
    let mut operators = Vec::new();

    let explicit = changes
        .affected_operators
        .iter()
        .map(|name| head.operator(name))
        .collect::<Result<Vec<_>>>()?;
    let from_catalogs = extract_operators_from_catalog(head, &changes.affected_catalog_operators)?;

    for operator in explicit.into_iter().chain(from_catalogs) {
        if seen.insert(operator) {
            operators.push(operator);
        }
    }
    Ok(operators)
}

/// Capabilities and settings shared by every operator review in a run.
pub struct PermissionCheck<'a> {
    pub catalog: &'a dyn Catalog,
    pub dispatcher: &'a ReviewDispatcher<'a>,
    pub options: ReviewOptions,
}

impl<'a> PermissionCheck<'a> {
    /// Decide the whole change set. `Ok(true)` only when every operator is approved.
    pub async fn run(
        &self,
        base: &RepositorySnapshot,
        head: &RepositorySnapshot,
        pull_request: &PullRequest,
        changes: &ChangeDescriptor,
    ) -> Result<bool> {
        let operators = affected_operators(head, changes)?;
        if operators.is_empty() {
            info!("No operators affected, nothing to gate");
            return Ok(true);
        }

        let mut approved = true;
        for operator in operators {
            let review = OperatorReview::new(ReviewContext {
                operator,
                submitter: &pull_request.owner,
                base,
                head,
                catalog: self.catalog,
                dispatcher: self.dispatcher,
                options: self.options,
            });

            match review.decide().await? {
                Decision::Approved => {
                    info!("Operator {}: approved", operator.name());
                }
                Decision::ReviewRequested => {
                    info!("Operator {}: review requested", operator.name());
                    approved = false;
                }
                Decision::Rejected(reason) => {
                    warn!("Operator {}: rejected: {}", operator.name(), reason);
                    return Err(GateError::Rejected {
                        operator: operator.name().to_string(),
                        reason,
                    });
                }
            }
        }

        Ok(approved)
    }
}

/// Serialized verdict: exactly `{"approved": <bool>}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictOutput {
    pub approved: bool,
}

/// Write the verdict file.
pub fn write_verdict(path: &Path, approved: bool) -> Result<()> {
    let body = serde_json::to_string(&VerdictOutput { approved })?;
    std::fs::write(path, body)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::{Config, Revision};
    use tempfile::tempdir;

    fn head() -> RepositorySnapshot {
        RepositorySnapshot::builder(Revision::Head)
            .operator("operator1", Config::new())
            .operator("operator2", Config::new())
            .operator("operator3", Config::new())
            .catalog_operator("catalog1", "operator1")
            .catalog_operator("catalog1", "operator2")
            .catalog_operator("catalog2", "operator3")
            .build()
    }

    fn names(ops: &[&Operator]) -> Vec<String> {
        ops.iter().map(|o| o.name().to_string()).collect()
    }

    #[test]
    fn test_extract_operators_from_catalog() {
        let head = head();
        let refs = vec![
            "catalog1/operator1".to_string(),
            "catalog1/operator2".to_string(),
            "catalog2/operator3".to_string(),
        ];
        let ops = extract_operators_from_catalog(&head, &refs).unwrap();
        assert_eq!(names(&ops), vec!["operator1", "operator2", "operator3"]);
    }

    #[test]
    fn test_affected_operators_deduplicates() {
        let head = head();
        let changes = ChangeDescriptor {
            affected_operators: vec!["operator2".to_string(), "operator1".to_string()],
            affected_catalog_operators: vec![
                "catalog1/operator1".to_string(),
                "catalog2/operator3".to_string(),
            ],
        };
        let ops = affected_operators(&head, &changes).unwrap();
        assert_eq!(names(&ops), vec!["operator2", "operator1", "operator3"]);
    }

    #[test]
    fn test_affected_operators_unknown_operator() {
        let head = head();
        let changes = ChangeDescriptor {
            affected_operators: vec!["ghost".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            affected_operators(&head, &changes),
            Err(GateError::UnknownOperator { .. })
        ));
    }

    #[test]
    fn test_change_descriptor_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("changes.json");
        std::fs::write(&path, r#"{"affected_operators": ["a"], "extra": 1}"#).unwrap();
        let changes = ChangeDescriptor::from_path(&path).unwrap();
        assert_eq!(changes.affected_operators, vec!["a"]);
        assert!(changes.affected_catalog_operators.is_empty());
    }

    #[test]
    fn test_write_verdict_has_single_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("output.json");
        write_verdict(&path, false).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value, serde_json::json!({"approved": false}));
    }
}
