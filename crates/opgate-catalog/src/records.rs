//! Catalog record types.
//!
//! Records fetched from the catalog keep every field they do not model in an
//! `extra` map so that a fetch-modify-put round trip does not drop data.
//! Payload types are the bodies this crate sends when creating records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Certification project and ownership
// ---------------------------------------------------------------------------

/// A certification project as stored in the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Organisation id; the catalog stores it as a number, older records as a string.
    #[serde(default)]
    pub org_id: Option<Value>,
    #[serde(default)]
    pub container: ProjectContainer,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Project {
    /// Organisation id rendered as a string, empty when the project has none.
    pub fn org_id_string(&self) -> String {
        match &self.org_id {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }
}

/// The `container` section of a certification project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectContainer {
    /// Hosting-platform accounts allowed to submit on behalf of the project.
    #[serde(default)]
    pub github_usernames: Vec<String>,
    #[serde(default)]
    pub isv_pid: Option<String>,
    #[serde(default)]
    pub distribution_method: Option<String>,
    #[serde(default)]
    pub repository_name: Option<String>,
    #[serde(default)]
    pub repository_description: Option<String>,
    #[serde(default)]
    pub release_category: Option<String>,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default)]
    pub application_categories: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Who may submit changes for a partner operator.
///
/// A missing record (`None` from [`crate::Catalog::get_ownership`]) is not the
/// same as a record with no authorized identities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipRecord {
    pub cert_project_id: String,
    pub authorized_identities: Vec<String>,
}

impl OwnershipRecord {
    pub fn from_project(cert_project_id: &str, project: &Project) -> Self {
        Self {
            cert_project_id: cert_project_id.to_string(),
            authorized_identities: project.container.github_usernames.clone(),
        }
    }

    pub fn authorizes(&self, identity: &str) -> bool {
        self.authorized_identities.iter().any(|i| i == identity)
    }
}

// ---------------------------------------------------------------------------
// Vendor and container repository
// ---------------------------------------------------------------------------

/// A container vendor (the publishing organisation).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A container repository record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isv_pid: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Display block of a new repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayData {
    pub name: String,
    pub long_description: String,
    pub short_description: String,
}

/// Body of `POST v1/repositories`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryPayload {
    /// Always one entry; `null` when the project has no release category.
    pub release_categories: Vec<Option<String>>,
    pub display_data: DisplayData,
    pub non_production_only: bool,
    pub privileged_images_allowed: bool,
    pub protected_for_pull: bool,
    pub protected_for_search: bool,
    pub registry: String,
    pub repository: String,
    pub build_categories: Vec<String>,
    pub isv_pid: Option<String>,
    pub application_categories: Vec<String>,
    pub includes_multiple_content_streams: bool,
    pub published: bool,
    pub vendor_label: String,
}

// ---------------------------------------------------------------------------
// Container images
// ---------------------------------------------------------------------------

/// Tag name that marks the newest image of a certification project.
pub const LATEST_TAG: &str = "latest";

/// A single tag on an image repository entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageTag {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ImageTag {
    pub fn new(name: impl Into<String>, added_date: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            added_date: Some(added_date.into()),
            extra: Map::new(),
        }
    }

    pub fn is_latest(&self) -> bool {
        self.name == LATEST_TAG
    }
}

/// One registry/repository location of an image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageRepository {
    #[serde(default)]
    pub tags: Vec<ImageTag>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A container image record as returned by the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerImage {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isv_pid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_image_digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub repositories: Vec<ImageRepository>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContainerImage {
    pub fn has_latest_tag(&self) -> bool {
        self.repositories
            .iter()
            .any(|r| r.tags.iter().any(ImageTag::is_latest))
    }
}

/// Fields derived from `skopeo inspect` output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedData {
    pub docker_version: String,
    pub layers: Vec<String>,
    pub architecture: String,
    pub env_variables: Vec<String>,
}

/// Repository entry of a new image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewImageRepository {
    pub published: bool,
    pub registry: String,
    pub repository: String,
    pub push_date: String,
    pub tags: Vec<ImageTag>,
}

/// Body of `POST v1/images`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerImagePayload {
    pub isv_pid: String,
    pub repositories: Vec<NewImageRepository>,
    pub certified: bool,
    pub docker_image_digest: String,
    pub image_id: String,
    pub architecture: String,
    pub parsed_data: ParsedData,
    pub sum_layer_size_bytes: u64,
}

/// Filter for image lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageQuery {
    pub isv_pid: String,
    /// Restrict to one image digest.
    pub docker_image_digest: Option<String>,
    /// Newest first by `creation_date`.
    pub newest_first: bool,
    pub page_size: usize,
}

impl ImageQuery {
    pub fn for_isv_pid(isv_pid: impl Into<String>) -> Self {
        Self {
            isv_pid: isv_pid.into(),
            docker_image_digest: None,
            newest_first: false,
            page_size: 1,
        }
    }

    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.docker_image_digest = Some(digest.into());
        self
    }

    pub fn newest_first(mut self) -> Self {
        self.newest_first = true;
        self
    }

    /// Catalog filter expression; deleted images are always excluded.
    pub fn filter_expression(&self) -> String {
        let mut clauses = vec![format!("isv_pid==\"{}\"", self.isv_pid)];
        if let Some(digest) = &self.docker_image_digest {
            clauses.push(format!("docker_image_digest==\"{}\"", digest));
        }
        clauses.push("not(deleted==true)".to_string());
        clauses.join(";")
    }
}
