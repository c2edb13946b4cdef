//! Operator repository snapshots (base and head) and their loader.

pub mod loader;
pub mod snapshot;

pub use loader::read_yaml_mapping;
pub use snapshot::{
    config_list, config_str, CatalogOperatorRef, Config, DistributionCatalog, Operator,
    RepositorySnapshot, Revision, SnapshotBuilder,
};
