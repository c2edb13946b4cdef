use opgate_catalog::{
    Catalog, CatalogConfig, CatalogError, ContainerImage, ImageQuery, PyxisClient,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> PyxisClient {
    PyxisClient::new(CatalogConfig::new(&server.uri()).with_api_key("secret")).unwrap()
}

#[tokio::test]
async fn server_error_is_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/vendors/org-id/42"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client(&server).get_vendor_by_org_id("42").await.unwrap_err();

    match err {
        CatalogError::Status {
            status,
            method,
            body,
            url,
        } => {
            assert_eq!(status, 500);
            assert_eq!(method, "GET");
            assert_eq!(body, "boom");
            assert!(url.ends_with("/v1/vendors/org-id/42"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn missing_project_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/projects/certification/id/p1"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .expect(2)
        .mount(&server)
        .await;
    let catalog = client(&server);

    assert!(catalog.get_project("p1").await.unwrap().is_none());
    assert!(catalog.get_ownership("p1").await.unwrap().is_none());
}

#[tokio::test]
async fn project_lookup_server_error_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/projects/certification/id/p1"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client(&server).get_ownership("p1").await.unwrap_err();

    assert!(matches!(err, CatalogError::Status { status: 503, .. }));
}

#[tokio::test]
async fn ownership_comes_from_project_usernames() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/projects/certification/id/p1"))
        .and(header("X-API-KEY", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "p1",
            "org_id": 42,
            "container": {"github_usernames": ["alice", "bob"]}
        })))
        .mount(&server)
        .await;

    let ownership = client(&server).get_ownership("p1").await.unwrap().unwrap();

    assert!(ownership.authorizes("bob"));
    assert!(!ownership.authorizes("mallory"));
}

#[tokio::test]
async fn missing_vendor_stays_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/vendors/org-id/42"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client(&server).get_vendor_by_org_id("42").await.unwrap_err();

    assert!(err.is_not_found());
    assert!(matches!(err, CatalogError::Status { status: 404, .. }));
}

#[tokio::test]
async fn api_key_header_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/vendors/org-id/42"))
        .and(header("X-API-KEY", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "v1",
            "label": "acme",
            "published": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let vendor = client(&server).get_vendor_by_org_id("42").await.unwrap();

    assert_eq!(vendor.label.as_deref(), Some("acme"));
    assert!(vendor.published);
}

#[tokio::test]
async fn repository_lookup_filters_by_isv_pid() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/repositories"))
        .and(query_param("filter", "isv_pid==\"ospid-1\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"_id": "r1", "isv_pid": "ospid-1", "published": false}]
        })))
        .mount(&server)
        .await;

    let repository = client(&server)
        .get_repository_by_isv_pid("ospid-1")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(repository.id.as_deref(), Some("r1"));
    assert!(!repository.published);
}

#[tokio::test]
async fn image_query_sends_filter_sort_and_page_size() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/images"))
        .and(query_param(
            "filter",
            "isv_pid==\"ospid-1\";not(deleted==true)",
        ))
        .and(query_param("page_size", "1"))
        .and(query_param("sort_by", "creation_date[desc]"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "_id": "img-1",
                "isv_pid": "ospid-1",
                "repositories": [{"tags": [{"name": "latest"}], "registry": "r"}]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let query = ImageQuery::for_isv_pid("ospid-1").newest_first();
    let images = client(&server).find_images(&query).await.unwrap();

    assert_eq!(images.len(), 1);
    assert!(images[0].has_latest_tag());
    // unmodelled fields survive for the later PUT
    assert_eq!(images[0].repositories[0].extra["registry"], json!("r"));
}

#[tokio::test]
async fn image_existence_query_includes_digest() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/images"))
        .and(query_param(
            "filter",
            "isv_pid==\"ospid-1\";docker_image_digest==\"sha256:abc\";not(deleted==true)",
        ))
        .and(query_param("page_size", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let query = ImageQuery::for_isv_pid("ospid-1").with_digest("sha256:abc");
    let images = client(&server).find_images(&query).await.unwrap();

    assert!(images.is_empty());
}

#[tokio::test]
async fn patch_vendor_sends_published_flag() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/v1/vendors/id/v1"))
        .and(body_json(json!({"published": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "v1",
            "published": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let vendor = client(&server)
        .patch_vendor("v1", &json!({"published": true}))
        .await
        .unwrap();

    assert!(vendor.published);
}

#[tokio::test]
async fn update_image_puts_whole_record() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/images/id/img-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"_id": "img-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let image = ContainerImage {
        id: Some("img-1".to_string()),
        ..Default::default()
    };
    let updated = client(&server).update_image(&image).await.unwrap();

    assert_eq!(updated.id.as_deref(), Some("img-1"));
}

#[tokio::test]
async fn update_image_without_id_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server)
        .update_image(&ContainerImage::default())
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogError::MissingId { .. }));
}

#[tokio::test]
async fn rejected_write_is_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/v1/repositories/id/r1"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let err = client(&server)
        .patch_repository("r1", &json!({"published": true}))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CatalogError::Status { status: 403, ref method, .. } if method == "PATCH"
    ));
}
