use super::*;
use axum::body::{Body, to_bytes};
use axum::extract::FromRequest;
use axum::http::Request;
use tower::ServiceExt;

use crate::state::test_helpers;

const BOUNDARY: &str = "liftfeed-test-boundary";

fn multipart_request(parts: &[(&str, &str, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, content_type, bytes) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{name}.bin\"\r\n").as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    Request::builder()
        .method("PUT")
        .uri("/upload")
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

async fn upload_from(parts: &[(&str, &str, &[u8])]) -> Result<Upload, StatusCode> {
    let multipart = Multipart::from_request(multipart_request(parts), &()).await.unwrap();
    read_upload(multipart).await
}

// =============================================================================
// read_upload
// =============================================================================

#[tokio::test]
async fn read_upload_prefers_field_named_file() {
    let upload = upload_from(&[("caption", "text/plain", b"hello"), ("file", "image/png", b"\x89PNG")])
        .await
        .unwrap();
    assert_eq!(upload.content_type, "image/png");
    assert_eq!(upload.bytes, b"\x89PNG");
}

#[tokio::test]
async fn read_upload_falls_back_to_first_part() {
    let upload = upload_from(&[("avatar", "image/jpeg", b"jpg"), ("other", "image/gif", b"gif")])
        .await
        .unwrap();
    assert_eq!(upload.content_type, "image/jpeg");
    assert_eq!(upload.bytes, b"jpg");
}

#[tokio::test]
async fn read_upload_without_parts_is_bad_request() {
    assert_eq!(upload_from(&[]).await.unwrap_err(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// storage_error_to_status
// =============================================================================

#[test]
fn storage_errors_map_to_statuses() {
    assert_eq!(storage_error_to_status(StorageError::Empty), StatusCode::BAD_REQUEST);
    assert_eq!(storage_error_to_status(StorageError::InvalidPath("..".into())), StatusCode::BAD_REQUEST);
    assert_eq!(
        storage_error_to_status(StorageError::TooLarge { size: 10, max: 5 }),
        StatusCode::PAYLOAD_TOO_LARGE
    );
    assert_eq!(
        storage_error_to_status(StorageError::UnsupportedType("text/plain".into())),
        StatusCode::UNSUPPORTED_MEDIA_TYPE
    );
    assert_eq!(storage_error_to_status(StorageError::Backend("503".into())), StatusCode::BAD_GATEWAY);
    assert_eq!(
        storage_error_to_status(StorageError::Config("missing".into())),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

// =============================================================================
// Router
// =============================================================================

#[tokio::test]
async fn healthz_returns_ok() {
    let app = app(test_helpers::test_app_state(), None);
    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = app(test_helpers::test_app_state(), None);
    let response = app
        .oneshot(Request::builder().uri("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn local_mount_serves_stored_objects() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("avatars")).unwrap();
    std::fs::write(dir.path().join("avatars").join("u1.png"), b"avatar-bytes").unwrap();

    let app = app(test_helpers::test_app_state(), Some(("/storage".into(), dir.path().to_path_buf())));
    let response = app
        .oneshot(Request::builder().uri("/storage/avatars/u1.png").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/png");
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"avatar-bytes");
}

#[tokio::test]
async fn protected_routes_require_auth() {
    let id = uuid::Uuid::nil();
    let cases = [
        ("GET", "/api/feed".to_owned()),
        ("GET", "/api/profiles/me".to_owned()),
        ("GET", format!("/api/profiles/{id}")),
        ("POST", format!("/api/profiles/{id}/follow")),
        ("GET", format!("/api/profiles/{id}/workouts")),
        ("POST", "/api/workouts".to_owned()),
        ("GET", format!("/api/workouts/{id}")),
        ("DELETE", format!("/api/workouts/{id}")),
        ("GET", format!("/api/workouts/{id}/like")),
        ("POST", format!("/api/workouts/{id}/like")),
        ("GET", format!("/api/workouts/{id}/comments")),
        ("DELETE", format!("/api/comments/{id}")),
        ("GET", "/api/exercises".to_owned()),
        ("GET", "/api/exercises/categories".to_owned()),
    ];
    for (method, uri) in cases {
        let app = app(test_helpers::test_app_state(), None);
        let response = app
            .oneshot(Request::builder().method(method).uri(&uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
    }
}
