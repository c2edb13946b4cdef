use opgate_catalog::fakes::{CatalogCall, MemoryCatalog};
use opgate_catalog::{ContainerImage, ImageRepository, ImageTag};
use opgate_core::{create_container_image, ImageInspection, ImageRequest};
use serde_json::json;

const ISV_PID: &str = "ospid-acme";

fn request(digest: &str, is_latest: bool) -> ImageRequest {
    ImageRequest {
        isv_pid: ISV_PID.to_string(),
        connect_registry: "registry.connect.example.com".to_string(),
        repository: "acme/acme-operator-bundle".to_string(),
        bundle_version: "1.1.0".to_string(),
        docker_image_digest: digest.to_string(),
        is_latest,
    }
}

fn inspection() -> ImageInspection {
    ImageInspection {
        skopeo: json!({
            "DockerVersion": "1.13.1",
            "Layers": ["sha256:layer"],
            "Architecture": "amd64",
            "Env": []
        }),
        podman: json!([{"Size": 2048}]),
    }
}

fn image(id: &str, digest: &str, created: &str, tags: &[&str]) -> ContainerImage {
    ContainerImage {
        id: Some(id.to_string()),
        isv_pid: Some(ISV_PID.to_string()),
        docker_image_digest: Some(digest.to_string()),
        creation_date: Some(created.to_string()),
        repositories: vec![ImageRepository {
            tags: tags.iter().map(|t| ImageTag::new(*t, created)).collect(),
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn latest_holders(catalog: &MemoryCatalog) -> Vec<String> {
    catalog
        .images()
        .into_iter()
        .filter(|i| i.has_latest_tag())
        .filter_map(|i| i.id)
        .collect()
}

#[tokio::test]
async fn latest_moves_from_newest_previous_image() {
    let catalog = MemoryCatalog::new()
        .with_image(image("old", "sha256:old", "2023-01-01T00:00:00", &["1.0.0"]))
        .with_image(image(
            "prev",
            "sha256:prev",
            "2024-01-01T00:00:00",
            &["1.0.1", "latest"],
        ));

    let created = create_container_image(&catalog, &request("sha256:new", true), &inspection())
        .await
        .unwrap()
        .unwrap();

    let mutations = catalog.mutations();
    assert_eq!(mutations.len(), 2);
    let CatalogCall::UpdateImage(updated) = &mutations[0] else {
        panic!("expected the previous image update first, got {:?}", mutations[0]);
    };
    assert_eq!(updated.id.as_deref(), Some("prev"));
    assert!(!updated.has_latest_tag());
    assert_eq!(updated.repositories[0].tags[0].name, "1.0.1");
    assert!(matches!(mutations[1], CatalogCall::CreateImage(_)));

    assert_eq!(latest_holders(&catalog), vec![created.id.unwrap()]);
}

#[tokio::test]
async fn previous_image_without_latest_is_not_updated() {
    let catalog = MemoryCatalog::new().with_image(image(
        "prev",
        "sha256:prev",
        "2024-01-01T00:00:00",
        &["1.0.1"],
    ));

    create_container_image(&catalog, &request("sha256:new", true), &inspection())
        .await
        .unwrap();

    let mutations = catalog.mutations();
    assert_eq!(mutations.len(), 1);
    assert!(matches!(mutations[0], CatalogCall::CreateImage(_)));
}

#[tokio::test]
async fn first_image_is_created_with_latest() {
    let catalog = MemoryCatalog::new();

    let created = create_container_image(&catalog, &request("sha256:new", true), &inspection())
        .await
        .unwrap()
        .unwrap();

    assert!(created.has_latest_tag());
    assert_eq!(catalog.mutations().len(), 1);
}

#[tokio::test]
async fn non_latest_image_leaves_previous_tags_alone() {
    let catalog = MemoryCatalog::new().with_image(image(
        "prev",
        "sha256:prev",
        "2024-01-01T00:00:00",
        &["1.0.1", "latest"],
    ));

    let created = create_container_image(&catalog, &request("sha256:new", false), &inspection())
        .await
        .unwrap()
        .unwrap();

    assert!(!created.has_latest_tag());
    assert_eq!(latest_holders(&catalog), vec!["prev".to_string()]);
    assert_eq!(catalog.mutations().len(), 1);
}

#[tokio::test]
async fn existing_image_is_a_no_op() {
    let catalog = MemoryCatalog::new().with_image(image(
        "prev",
        "sha256:same",
        "2024-01-01T00:00:00",
        &["1.0.1", "latest"],
    ));

    let result = create_container_image(&catalog, &request("sha256:same", true), &inspection())
        .await
        .unwrap();

    assert!(result.is_none());
    assert!(catalog.mutations().is_empty());
}

#[tokio::test]
async fn deleted_image_does_not_count_as_existing() {
    let mut deleted = image("gone", "sha256:same", "2024-01-01T00:00:00", &["1.0.1"]);
    deleted.deleted = true;
    let catalog = MemoryCatalog::new().with_image(deleted);

    let result = create_container_image(&catalog, &request("sha256:same", false), &inspection())
        .await
        .unwrap();

    assert!(result.is_some());
}

#[tokio::test]
async fn missing_layer_size_fails_before_any_mutation() {
    let catalog = MemoryCatalog::new().with_image(image(
        "prev",
        "sha256:prev",
        "2024-01-01T00:00:00",
        &["latest"],
    ));
    let inspection = ImageInspection {
        podman: json!([]),
        ..inspection()
    };

    let result = create_container_image(&catalog, &request("sha256:new", true), &inspection).await;

    assert!(result.is_err());
    assert!(catalog.mutations().is_empty());
}
