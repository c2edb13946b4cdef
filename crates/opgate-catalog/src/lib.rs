//! opgate-catalog: certification catalog access for opgate
//!
//! This crate is the remote-record layer of the gate. It provides:
//! - `Catalog`: the async capability trait (projects, vendors, repositories,
//!   container images)
//! - `PyxisClient`: the HTTP implementation, configured by `CatalogConfig`
//! - `fakes::MemoryCatalog`: an in-memory, call-recording implementation for tests

pub mod catalog;
pub mod error;
pub mod fakes;
pub mod http;
pub mod records;

pub use catalog::{Catalog, CatalogResult};
pub use error::CatalogError;
pub use http::{CatalogConfig, PyxisClient, DEFAULT_PYXIS_URL};
pub use records::{
    ContainerImage, ContainerImagePayload, DisplayData, ImageQuery, ImageRepository, ImageTag,
    NewImageRepository, OwnershipRecord, ParsedData, Project, ProjectContainer, Repository,
    RepositoryPayload, Vendor, LATEST_TAG,
};
