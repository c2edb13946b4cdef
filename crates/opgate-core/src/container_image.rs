//! Container image publication.
//!
//! Creates the catalog record for a bundle image unless one already exists
//! for the same isv_pid and digest. At most one image of a certification
//! project carries the `latest` tag: when a new latest image is published,
//! the tag is first stripped from the most recently created previous image,
//! and only then is the new image created.

use chrono::{DateTime, Utc};
use opgate_catalog::{
    Catalog, ContainerImage, ContainerImagePayload, ImageQuery, ImageRepository, ImageTag,
    NewImageRepository, ParsedData, LATEST_TAG,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::{GateError, Result};

/// What to publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub isv_pid: String,
    pub connect_registry: String,
    pub repository: String,
    pub bundle_version: String,
    pub docker_image_digest: String,
    pub is_latest: bool,
}

/// Output of `skopeo inspect` and `podman image inspect` for the image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageInspection {
    pub skopeo: Value,
    pub podman: Value,
}

impl ImageInspection {
    /// `parsed_data` section of the image record.
    pub fn parsed_data(&self) -> ParsedData {
        let strings = |key: &str| -> Vec<String> {
            self.skopeo
                .get(key)
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        };
        let string = |key: &str| -> String {
            self.skopeo
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        ParsedData {
            docker_version: string("DockerVersion"),
            layers: strings("Layers"),
            architecture: string("Architecture"),
            env_variables: strings("Env"),
        }
    }

    /// Total layer size reported by podman for the first inspected image.
    pub fn sum_layer_size_bytes(&self) -> Result<u64> {
        let missing = || GateError::MissingField {
            kind: "podman inspect result".to_string(),
            field: "[0].Size".to_string(),
        };
        match self.podman.get(0).and_then(|image| image.get("Size")) {
            Some(Value::Number(n)) => n.as_u64().ok_or_else(missing),
            Some(Value::String(s)) => s.trim().parse().map_err(|_| missing()),
            _ => Err(missing()),
        }
    }
}

/// Timestamp format used for `push_date` and tag `added_date`.
pub fn catalog_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Whether an image with this isv_pid and digest is already registered.
pub async fn image_exists(catalog: &dyn Catalog, isv_pid: &str, digest: &str) -> Result<bool> {
    let query = ImageQuery::for_isv_pid(isv_pid).with_digest(digest);
    if catalog.find_images(&query).await?.is_empty() {
        info!("Image with given docker_image_digest and isv_pid doesn't exist yet");
        return Ok(false);
    }
    info!("Image with given docker_image_digest and isv_pid already exists");
    Ok(true)
}

/// Remove every `latest` tag in place. Returns whether any was removed.
pub fn clean_latest_tag(repositories: &mut [ImageRepository]) -> bool {
    let mut removed = false;
    for repository in repositories.iter_mut() {
        let before = repository.tags.len();
        repository.tags.retain(|tag| !tag.is_latest());
        removed |= repository.tags.len() != before;
    }
    removed
}

/// Strip `latest` from the newest existing image of the project.
///
/// Returns the updated record, or `None` when there was no previous image or
/// it did not carry the tag (no update call is made in either case).
pub async fn remove_latest_from_previous_image(
    catalog: &dyn Catalog,
    isv_pid: &str,
) -> Result<Option<ContainerImage>> {
    let query = ImageQuery::for_isv_pid(isv_pid).newest_first();
    let Some(mut previous) = catalog.find_images(&query).await?.into_iter().next() else {
        info!("It's the first image for this cert project");
        return Ok(None);
    };

    info!("Found previous image {:?}", previous.id);
    if !clean_latest_tag(&mut previous.repositories) {
        return Ok(None);
    }

    info!("Removing {} tag", LATEST_TAG);
    Ok(Some(catalog.update_image(&previous).await?))
}

/// Body for creating the image record.
pub fn container_image_payload(
    request: &ImageRequest,
    inspection: &ImageInspection,
    now: &str,
) -> Result<ContainerImagePayload> {
    let parsed_data = inspection.parsed_data();

    let mut tags = vec![ImageTag::new(&request.bundle_version, now)];
    if request.is_latest {
        tags.push(ImageTag::new(LATEST_TAG, now));
    }

    Ok(ContainerImagePayload {
        isv_pid: request.isv_pid.clone(),
        repositories: vec![NewImageRepository {
            published: true,
            registry: request.connect_registry.clone(),
            repository: request.repository.clone(),
            push_date: now.to_string(),
            tags,
        }],
        certified: true,
        docker_image_digest: request.docker_image_digest.clone(),
        image_id: request.docker_image_digest.clone(),
        architecture: parsed_data.architecture.clone(),
        parsed_data,
        sum_layer_size_bytes: inspection.sum_layer_size_bytes()?,
    })
}

/// Register the image. `Ok(None)` when it was already registered.
pub async fn create_container_image(
    catalog: &dyn Catalog,
    request: &ImageRequest,
    inspection: &ImageInspection,
) -> Result<Option<ContainerImage>> {
    if image_exists(catalog, &request.isv_pid, &request.docker_image_digest).await? {
        info!("Skipping the image creation");
        return Ok(None);
    }

    // Validate the inputs before touching the previous image.
    let payload = container_image_payload(request, inspection, &catalog_timestamp(Utc::now()))?;

    if request.is_latest {
        remove_latest_from_previous_image(catalog, &request.isv_pid).await?;
    }

    info!("Creating new container image");
    Ok(Some(catalog.create_image(&payload).await?))
}
