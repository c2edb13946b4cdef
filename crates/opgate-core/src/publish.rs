//! Catalog publication workflow.
//!
//! Publishing is idempotent: a record that is already `published` is returned
//! untouched and no mutating call is made. Otherwise a `{"published": true}`
//! patch is issued, or, for a container repository that does not exist yet,
//! the repository is created from the certification project's metadata.

use std::sync::OnceLock;

use opgate_catalog::{Catalog, DisplayData, Project, Repository, RepositoryPayload, Vendor};
use regex::Regex;
use serde_json::json;
use tracing::{info, warn};

use crate::error::{GateError, Result};

/// Distribution methods for which a container repository is created.
pub const SUPPORTED_DISTRIBUTION_METHODS: [&str; 2] = ["rhcc", "marketplace_only"];

/// Width limit for short descriptions (placeholder included).
pub const SHORT_DESCRIPTION_WIDTH: usize = 97;
const SHORT_DESCRIPTION_PLACEHOLDER: &str = "...";

/// Mark the vendor of an organisation as published.
pub async fn publish_vendor(catalog: &dyn Catalog, org_id: &str) -> Result<Vendor> {
    info!("Publishing vendor...");
    let vendor = catalog.get_vendor_by_org_id(org_id).await?;

    if vendor.published {
        info!("Vendor {:?} is already published", vendor.id);
        return Ok(vendor);
    }

    let id = vendor.id.as_deref().ok_or_else(|| GateError::MissingField {
        kind: "vendor".to_string(),
        field: "_id".to_string(),
    })?;
    let published = catalog
        .patch_vendor(id, &json!({ "published": true }))
        .await?;
    info!("Vendor {} is published now", id);
    Ok(published)
}

/// Publish the container repository of a certification project.
///
/// Returns `None` when the repository had to be created but the project's
/// distribution method does not get one.
pub async fn publish_repository(
    catalog: &dyn Catalog,
    cert_project_id: &str,
    connect_registry: &str,
) -> Result<Option<Repository>> {
    info!("Publishing repository...");
    let project = catalog
        .get_project(cert_project_id)
        .await?
        .ok_or_else(|| {
            GateError::Catalog(opgate_catalog::CatalogError::NotFound {
                kind: "certification project".to_string(),
                key: cert_project_id.to_string(),
            })
        })?;
    let isv_pid = project.container.isv_pid.clone().unwrap_or_default();

    if let Some(repository) = catalog.get_repository_by_isv_pid(&isv_pid).await? {
        info!("Repository already exists: {:?}", repository.id);
        if repository.published {
            info!("Repository is already published");
            return Ok(Some(repository));
        }
        let id = repository
            .id
            .as_deref()
            .ok_or_else(|| GateError::MissingField {
                kind: "repository".to_string(),
                field: "_id".to_string(),
            })?;
        let published = catalog
            .patch_repository(id, &json!({ "published": true }))
            .await?;
        info!("Repository {} is published now", id);
        return Ok(Some(published));
    }

    create_repository(catalog, &project, connect_registry).await
}

/// Create a new container repository for a certification project.
pub async fn create_repository(
    catalog: &dyn Catalog,
    project: &Project,
    connect_registry: &str,
) -> Result<Option<Repository>> {
    info!("Creating repository");
    let container = &project.container;
    let distribution = container.distribution_method.as_deref().unwrap_or_default();

    if !SUPPORTED_DISTRIBUTION_METHODS.contains(&distribution) {
        warn!(
            "Unsupported distribution type for operator project: {:?}",
            container.distribution_method
        );
        return Ok(None);
    }

    let vendor = catalog
        .get_vendor_by_org_id(&project.org_id_string())
        .await?;
    let payload = repository_payload(project, &vendor, connect_registry)?;

    let created = catalog.create_repository(&payload).await?;
    info!("A new repository has been created: {:?}", created.id);
    Ok(Some(created))
}

/// Body for creating a container repository.
pub fn repository_payload(
    project: &Project,
    vendor: &Vendor,
    connect_registry: &str,
) -> Result<RepositoryPayload> {
    let container = &project.container;
    let vendor_label = vendor
        .label
        .clone()
        .ok_or_else(|| GateError::MissingField {
            kind: "vendor".to_string(),
            field: "label".to_string(),
        })?;

    let long_description = match container.repository_description.as_deref() {
        Some(d) if !d.is_empty() => d.to_string(),
        _ => " ".to_string(),
    };
    let short_description = short_description(&long_description);

    Ok(RepositoryPayload {
        release_categories: vec![container.release_category.clone()],
        display_data: DisplayData {
            name: project.name.clone().unwrap_or_default(),
            long_description,
            short_description,
        },
        non_production_only: false,
        privileged_images_allowed: container.privileged,
        protected_for_pull: false,
        protected_for_search: false,
        registry: connect_registry.to_string(),
        repository: format!(
            "{}/{}",
            vendor_label,
            container.repository_name.as_deref().unwrap_or_default()
        ),
        build_categories: vec!["Operator bundle".to_string()],
        isv_pid: container.isv_pid.clone(),
        application_categories: container.application_categories.clone(),
        includes_multiple_content_streams: false,
        published: true,
        vendor_label,
    })
}

/// Plain-text, word-boundary-truncated summary of an HTML description.
pub fn short_description(html: &str) -> String {
    shorten(&strip_html(html), SHORT_DESCRIPTION_WIDTH)
}

fn tag_pattern() -> Option<&'static Regex> {
    static TAGS: OnceLock<Option<Regex>> = OnceLock::new();
    TAGS.get_or_init(|| Regex::new(r"(?s)<[^>]*>").ok()).as_ref()
}

/// Drop HTML tags and decode the common character entities.
pub fn strip_html(html: &str) -> String {
    let text = match tag_pattern() {
        Some(re) => re.replace_all(html, " ").into_owned(),
        None => html.to_string(),
    };
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Collapse whitespace and cut at a word boundary so the result, including the
/// `...` placeholder, fits in `width` characters.
pub fn shorten(text: &str, width: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let collapsed = words.join(" ");
    if collapsed.chars().count() <= width {
        return collapsed;
    }

    let budget = width.saturating_sub(SHORT_DESCRIPTION_PLACEHOLDER.len());
    let mut kept = String::new();
    for word in &words {
        let separator = usize::from(!kept.is_empty());
        if kept.chars().count() + separator + word.chars().count() > budget {
            break;
        }
        if separator == 1 {
            kept.push(' ');
        }
        kept.push_str(word);
    }
    // when not even the first word fits, only the placeholder remains
    kept.push_str(SHORT_DESCRIPTION_PLACEHOLDER);
    kept
}
