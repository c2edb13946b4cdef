//! Catalog capability trait.
//!
//! `Catalog` is the narrow interface the gate and the publish workflows use
//! to read and mutate remote certification records. `PyxisClient` talks to
//! the real service; `MemoryCatalog` (see `fakes`) records calls for tests.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::CatalogError;
use crate::records::*;

/// Result type for catalog operations
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Remote certification catalog.
///
/// Guarantees:
/// - Lookups that may legitimately find nothing return `Ok(None)` / empty `Vec`.
/// - Any transport failure or non-2xx answer is an `Err`; nothing is retried.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Fetch a certification project. `Ok(None)` when the project does not exist.
    async fn get_project(&self, cert_project_id: &str) -> CatalogResult<Option<Project>>;

    /// Fetch the vendor owning an organisation id.
    async fn get_vendor_by_org_id(&self, org_id: &str) -> CatalogResult<Vendor>;

    /// Find the container repository registered for an isv_pid.
    async fn get_repository_by_isv_pid(&self, isv_pid: &str)
        -> CatalogResult<Option<Repository>>;

    /// Partially update a vendor.
    async fn patch_vendor(&self, vendor_id: &str, patch: &Value) -> CatalogResult<Vendor>;

    /// Partially update a repository.
    async fn patch_repository(&self, repository_id: &str, patch: &Value)
        -> CatalogResult<Repository>;

    /// Create a new repository.
    async fn create_repository(&self, payload: &RepositoryPayload) -> CatalogResult<Repository>;

    /// Query container images.
    async fn find_images(&self, query: &ImageQuery) -> CatalogResult<Vec<ContainerImage>>;

    /// Replace an existing image record.
    async fn update_image(&self, image: &ContainerImage) -> CatalogResult<ContainerImage>;

    /// Create a new image record.
    async fn create_image(&self, payload: &ContainerImagePayload)
        -> CatalogResult<ContainerImage>;

    /// Ownership record of a certification project, `None` when no project exists.
    async fn get_ownership(&self, cert_project_id: &str) -> CatalogResult<Option<OwnershipRecord>> {
        Ok(self
            .get_project(cert_project_id)
            .await?
            .map(|project| OwnershipRecord::from_project(cert_project_id, &project)))
    }
}
