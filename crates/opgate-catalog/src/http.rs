//! Pyxis HTTP client
//!
//! Implements [`Catalog`] against the Pyxis REST API. Every non-2xx answer is
//! surfaced as [`CatalogError::Status`]; the only status given meaning is 404
//! on a single-record project lookup, which becomes `Ok(None)`.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::catalog::{Catalog, CatalogResult};
use crate::error::CatalogError;
use crate::records::*;

/// Default Pyxis endpoint
pub const DEFAULT_PYXIS_URL: &str = "https://pyxis.engineering.redhat.com";

/// Catalog client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of the catalog API
    pub base_url: String,
    /// API key sent as `X-API-KEY` (optional for read-only use)
    pub api_key: Option<String>,
    /// User agent for outgoing requests
    pub user_agent: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            base_url: std::env::var("PYXIS_URL").unwrap_or_else(|_| DEFAULT_PYXIS_URL.to_string()),
            api_key: std::env::var("PYXIS_API_KEY").ok(),
            user_agent: format!("opgate/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl CatalogConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config for a specific endpoint
    pub fn new(base_url: &str) -> Self {
        CatalogConfig {
            base_url: base_url.to_string(),
            api_key: None,
            user_agent: format!("opgate/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set the API key
    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    /// Join a relative API path onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Paged list envelope used by Pyxis collection endpoints.
#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

/// Pyxis catalog client
pub struct PyxisClient {
    config: CatalogConfig,
    http_client: reqwest::Client,
}

impl PyxisClient {
    /// Create a new client
    pub fn new(config: CatalogConfig) -> CatalogResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(PyxisClient {
            config,
            http_client,
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> CatalogResult<Self> {
        Self::new(CatalogConfig::from_env())
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.config.url(path);
        debug!("{} {}", method, url);
        let builder = self.http_client.request(method, url);
        match &self.config.api_key {
            Some(key) => builder.header("X-API-KEY", key),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        builder: RequestBuilder,
    ) -> CatalogResult<T> {
        let response = builder.send().await?;
        let status = response.status();
        let url = response.url().to_string();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                method: method.to_string(),
                url,
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> CatalogResult<T> {
        let builder = self.request(Method::GET, path).query(query);
        self.send(Method::GET, builder).await
    }

    async fn write<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> CatalogResult<T> {
        let builder = self.request(method.clone(), path).json(body);
        self.send(method, builder).await
    }
}

fn require_id<'a>(kind: &str, id: &'a Option<String>) -> CatalogResult<&'a str> {
    id.as_deref().ok_or_else(|| CatalogError::MissingId {
        kind: kind.to_string(),
    })
}

#[async_trait]
impl Catalog for PyxisClient {
    async fn get_project(&self, cert_project_id: &str) -> CatalogResult<Option<Project>> {
        let path = format!("v1/projects/certification/id/{}", cert_project_id);
        match self.get::<Project>(&path, &[]).await {
            Ok(project) => Ok(Some(project)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_vendor_by_org_id(&self, org_id: &str) -> CatalogResult<Vendor> {
        self.get(&format!("v1/vendors/org-id/{}", org_id), &[]).await
    }

    async fn get_repository_by_isv_pid(
        &self,
        isv_pid: &str,
    ) -> CatalogResult<Option<Repository>> {
        let filter = format!("isv_pid==\"{}\"", isv_pid);
        let page: Page<Repository> = self
            .get("v1/repositories", &[("filter", filter)])
            .await?;
        Ok(page.data.into_iter().next())
    }

    async fn patch_vendor(&self, vendor_id: &str, patch: &Value) -> CatalogResult<Vendor> {
        let path = format!("v1/vendors/id/{}", vendor_id);
        self.write(Method::PATCH, &path, patch).await
    }

    async fn patch_repository(
        &self,
        repository_id: &str,
        patch: &Value,
    ) -> CatalogResult<Repository> {
        let path = format!("v1/repositories/id/{}", repository_id);
        self.write(Method::PATCH, &path, patch).await
    }

    async fn create_repository(&self, payload: &RepositoryPayload) -> CatalogResult<Repository> {
        self.write(Method::POST, "v1/repositories", payload).await
    }

    async fn find_images(&self, query: &ImageQuery) -> CatalogResult<Vec<ContainerImage>> {
        let mut params = vec![
            ("filter", query.filter_expression()),
            ("page_size", query.page_size.to_string()),
        ];
        if query.newest_first {
            params.push(("sort_by", "creation_date[desc]".to_string()));
        }
        let page: Page<ContainerImage> = self.get("v1/images", &params).await?;
        Ok(page.data)
    }

    async fn update_image(&self, image: &ContainerImage) -> CatalogResult<ContainerImage> {
        let id = require_id("image", &image.id)?;
        let path = format!("v1/images/id/{}", id);
        self.write(Method::PUT, &path, image).await
    }

    async fn create_image(
        &self,
        payload: &ContainerImagePayload,
    ) -> CatalogResult<ContainerImage> {
        self.write(Method::POST, "v1/images", payload).await
    }
}
