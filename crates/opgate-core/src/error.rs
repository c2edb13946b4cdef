//! Error taxonomy for the gate.
//!
//! Everything here is fatal to a run: the caller exits non-zero and no
//! verdict is written. "Needs human review" is not an error; it is
//! [`crate::review::Decision::ReviewRequested`].

use opgate_catalog::CatalogError;
use opgate_hosting::HostingError;

/// Gate errors.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("operator {operator} rejected: {reason}")]
    Rejected { operator: String, reason: String },

    #[error("operator not found in {revision} repository: {name}")]
    UnknownOperator { name: String, revision: String },

    #[error("catalog not found in {revision} repository: {name}")]
    UnknownCatalog { name: String, revision: String },

    #[error("operator {operator} not listed in catalog {catalog}")]
    UnknownCatalogOperator { catalog: String, operator: String },

    #[error("invalid catalog operator reference {0:?}, expected <catalog>/<operator>")]
    InvalidCatalogReference(String),

    #[error("invalid repository layout: {0}")]
    InvalidRepository(String),

    #[error("{kind} record is missing required field {field}")]
    MissingField { kind: String, field: String },

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("hosting platform error: {0}")]
    Hosting(#[from] HostingError),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for gate operations.
pub type Result<T> = std::result::Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_names_operator_and_reason() {
        let err = GateError::Rejected {
            operator: "etcd".to_string(),
            reason: "no reviewers".to_string(),
        };
        assert_eq!(err.to_string(), "operator etcd rejected: no reviewers");
    }

    #[test]
    fn catalog_errors_convert() {
        let err: GateError = CatalogError::Http("boom".to_string()).into();
        assert!(matches!(err, GateError::Catalog(_)));
    }
}
