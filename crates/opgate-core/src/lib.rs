//! opgate Core Library
//!
//! Permission gating for operator pull requests and catalog publication
//! workflows, on top of the `opgate-catalog` and `opgate-hosting` capabilities.

pub mod container_image;
pub mod dispatch;
pub mod error;
pub mod permissions;
pub mod publish;
pub mod repo;
pub mod review;
pub mod telemetry;

pub use container_image::{
    catalog_timestamp, clean_latest_tag, container_image_payload, create_container_image,
    image_exists, remove_latest_from_previous_image, ImageInspection, ImageRequest,
};

pub use dispatch::{owners_review_comment, ReviewDispatcher};

pub use error::{GateError, Result};

pub use permissions::{
    affected_operators, extract_operators_from_catalog, write_verdict, ChangeDescriptor,
    PermissionCheck, PullRequest, VerdictOutput,
};

pub use publish::{
    create_repository, publish_repository, publish_vendor, repository_payload,
    short_description,
};

pub use repo::{
    CatalogOperatorRef, Config, DistributionCatalog, Operator, RepositorySnapshot, Revision,
    SnapshotBuilder,
};

pub use review::{Decision, OperatorReview, ReviewContext, ReviewOptions, Track};

pub use telemetry::init_tracing;

pub use opgate_catalog::{Catalog, CatalogConfig, PyxisClient};
pub use opgate_hosting::{GhCli, HostingPlatform};
