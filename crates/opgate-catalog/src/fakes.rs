//! In-memory fake catalog (testing only)
//!
//! `MemoryCatalog` satisfies the [`Catalog`] contract without any network
//! access and records every call so tests can assert on what was read and
//! what was mutated.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::catalog::{Catalog, CatalogResult};
use crate::error::CatalogError;
use crate::records::*;

/// One recorded catalog call.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogCall {
    GetProject(String),
    GetVendorByOrgId(String),
    GetRepositoryByIsvPid(String),
    PatchVendor { id: String, patch: Value },
    PatchRepository { id: String, patch: Value },
    CreateRepository(Box<RepositoryPayload>),
    FindImages(ImageQuery),
    UpdateImage(Box<ContainerImage>),
    CreateImage(Box<ContainerImagePayload>),
}

impl CatalogCall {
    /// Whether the call changes remote state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            CatalogCall::PatchVendor { .. }
                | CatalogCall::PatchRepository { .. }
                | CatalogCall::CreateRepository(_)
                | CatalogCall::UpdateImage(_)
                | CatalogCall::CreateImage(_)
        )
    }
}

#[derive(Debug, Default)]
struct State {
    projects: HashMap<String, Project>,
    vendors: HashMap<String, Vendor>,
    repositories: Vec<Repository>,
    images: Vec<ContainerImage>,
    calls: Vec<CatalogCall>,
    next_id: u64,
}

impl State {
    fn allocate_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

/// In-memory catalog backed by plain collections.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    state: Mutex<State>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(self, cert_project_id: &str, project: Project) -> Self {
        self.state
            .lock()
            .unwrap()
            .projects
            .insert(cert_project_id.to_string(), project);
        self
    }

    pub fn with_vendor(self, org_id: &str, vendor: Vendor) -> Self {
        self.state
            .lock()
            .unwrap()
            .vendors
            .insert(org_id.to_string(), vendor);
        self
    }

    pub fn with_repository(self, repository: Repository) -> Self {
        self.state.lock().unwrap().repositories.push(repository);
        self
    }

    pub fn with_image(self, image: ContainerImage) -> Self {
        self.state.lock().unwrap().images.push(image);
        self
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<CatalogCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Only the calls that mutate remote state, in order.
    pub fn mutations(&self) -> Vec<CatalogCall> {
        self.calls().into_iter().filter(|c| c.is_mutation()).collect()
    }

    /// Current image records.
    pub fn images(&self) -> Vec<ContainerImage> {
        self.state.lock().unwrap().images.clone()
    }

    fn record(&self, call: CatalogCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

fn set_published(extra_patch: &Value, published: &mut bool) {
    if let Some(p) = extra_patch.get("published").and_then(Value::as_bool) {
        *published = p;
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn get_project(&self, cert_project_id: &str) -> CatalogResult<Option<Project>> {
        self.record(CatalogCall::GetProject(cert_project_id.to_string()));
        let state = self.state.lock().unwrap();
        Ok(state.projects.get(cert_project_id).cloned())
    }

    async fn get_vendor_by_org_id(&self, org_id: &str) -> CatalogResult<Vendor> {
        self.record(CatalogCall::GetVendorByOrgId(org_id.to_string()));
        let state = self.state.lock().unwrap();
        state
            .vendors
            .get(org_id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound {
                kind: "vendor".to_string(),
                key: org_id.to_string(),
            })
    }

    async fn get_repository_by_isv_pid(
        &self,
        isv_pid: &str,
    ) -> CatalogResult<Option<Repository>> {
        self.record(CatalogCall::GetRepositoryByIsvPid(isv_pid.to_string()));
        let state = self.state.lock().unwrap();
        Ok(state
            .repositories
            .iter()
            .find(|r| r.isv_pid.as_deref() == Some(isv_pid))
            .cloned())
    }

    async fn patch_vendor(&self, vendor_id: &str, patch: &Value) -> CatalogResult<Vendor> {
        self.record(CatalogCall::PatchVendor {
            id: vendor_id.to_string(),
            patch: patch.clone(),
        });
        let mut state = self.state.lock().unwrap();
        let vendor = state
            .vendors
            .values_mut()
            .find(|v| v.id.as_deref() == Some(vendor_id))
            .ok_or_else(|| CatalogError::NotFound {
                kind: "vendor".to_string(),
                key: vendor_id.to_string(),
            })?;
        set_published(patch, &mut vendor.published);
        Ok(vendor.clone())
    }

    async fn patch_repository(
        &self,
        repository_id: &str,
        patch: &Value,
    ) -> CatalogResult<Repository> {
        self.record(CatalogCall::PatchRepository {
            id: repository_id.to_string(),
            patch: patch.clone(),
        });
        let mut state = self.state.lock().unwrap();
        let repository = state
            .repositories
            .iter_mut()
            .find(|r| r.id.as_deref() == Some(repository_id))
            .ok_or_else(|| CatalogError::NotFound {
                kind: "repository".to_string(),
                key: repository_id.to_string(),
            })?;
        set_published(patch, &mut repository.published);
        Ok(repository.clone())
    }

    async fn create_repository(&self, payload: &RepositoryPayload) -> CatalogResult<Repository> {
        self.record(CatalogCall::CreateRepository(Box::new(payload.clone())));
        let mut state = self.state.lock().unwrap();
        let mut repository: Repository = serde_json::from_value(serde_json::to_value(payload)?)?;
        repository.id = Some(state.allocate_id("repository"));
        state.repositories.push(repository.clone());
        Ok(repository)
    }

    async fn find_images(&self, query: &ImageQuery) -> CatalogResult<Vec<ContainerImage>> {
        self.record(CatalogCall::FindImages(query.clone()));
        let state = self.state.lock().unwrap();
        let mut hits: Vec<ContainerImage> = state
            .images
            .iter()
            .filter(|i| !i.deleted)
            .filter(|i| i.isv_pid.as_deref() == Some(query.isv_pid.as_str()))
            .filter(|i| match &query.docker_image_digest {
                Some(d) => i.docker_image_digest.as_deref() == Some(d.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        if query.newest_first {
            // ISO-8601 timestamps sort lexically
            hits.sort_by(|a, b| b.creation_date.cmp(&a.creation_date));
        }
        hits.truncate(query.page_size.max(1));
        Ok(hits)
    }

    async fn update_image(&self, image: &ContainerImage) -> CatalogResult<ContainerImage> {
        self.record(CatalogCall::UpdateImage(Box::new(image.clone())));
        let mut state = self.state.lock().unwrap();
        let slot = state
            .images
            .iter_mut()
            .find(|i| i.id.is_some() && i.id == image.id)
            .ok_or_else(|| CatalogError::MissingId {
                kind: "image".to_string(),
            })?;
        *slot = image.clone();
        Ok(image.clone())
    }

    async fn create_image(
        &self,
        payload: &ContainerImagePayload,
    ) -> CatalogResult<ContainerImage> {
        self.record(CatalogCall::CreateImage(Box::new(payload.clone())));
        let mut state = self.state.lock().unwrap();
        let mut image: ContainerImage = serde_json::from_value(serde_json::to_value(payload)?)?;
        image.id = Some(state.allocate_id("image"));
        // Created images sort after anything seeded by tests.
        image.creation_date = Some(format!("9999-12-31T23:59:59.{:06}", state.next_id));
        state.images.push(image.clone());
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn image(id: &str, created: &str, tags: &[&str]) -> ContainerImage {
        ContainerImage {
            id: Some(id.to_string()),
            isv_pid: Some("ospid-1".to_string()),
            creation_date: Some(created.to_string()),
            repositories: vec![ImageRepository {
                tags: tags.iter().map(|t| ImageTag::new(*t, created)).collect(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_missing_project_is_none() {
        let catalog = MemoryCatalog::new();
        assert!(catalog.get_project("nope").await.unwrap().is_none());
        assert!(catalog.get_ownership("nope").await.unwrap().is_none());
        assert_eq!(catalog.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_patch_vendor_sets_published() {
        let vendor = Vendor {
            id: Some("v1".to_string()),
            ..Default::default()
        };
        let catalog = MemoryCatalog::new().with_vendor("42", vendor);
        let patched = catalog
            .patch_vendor("v1", &json!({"published": true}))
            .await
            .unwrap();
        assert!(patched.published);
        assert_eq!(catalog.mutations().len(), 1);
    }

    #[tokio::test]
    async fn test_find_images_newest_first() {
        let catalog = MemoryCatalog::new()
            .with_image(image("old", "2023-01-01T00:00:00", &["1.0.0"]))
            .with_image(image("new", "2024-01-01T00:00:00", &["1.1.0", "latest"]));
        let hits = catalog
            .find_images(&ImageQuery::for_isv_pid("ospid-1").newest_first())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_find_images_skips_deleted() {
        let mut deleted = image("gone", "2025-01-01T00:00:00", &[]);
        deleted.deleted = true;
        let catalog = MemoryCatalog::new().with_image(deleted);
        let hits = catalog
            .find_images(&ImageQuery::for_isv_pid("ospid-1"))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_reads_are_not_mutations() {
        let catalog = MemoryCatalog::new();
        let _ = catalog.get_repository_by_isv_pid("x").await.unwrap();
        let _ = catalog.get_vendor_by_org_id("x").await;
        assert_eq!(catalog.calls().len(), 2);
        assert!(catalog.mutations().is_empty());
    }
}
