//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the JSON API under `/api`, the health probe, and (for
//! the local object store) the static file mount that serves uploaded
//! avatars and workout images. Every API route except auth bootstrap
//! requires a session via `auth::AuthUser`.

pub mod auth;
pub mod comments;
pub mod exercises;
pub mod feed;
pub mod profiles;
pub mod workouts;

use std::path::PathBuf;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Multipart};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::services::storage::{StorageError, Upload};
use crate::state::AppState;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the full application router.
///
/// `local_mount` is the `(url_prefix, directory)` pair to serve stored
/// objects from when the local storage backend is in use.
pub fn app(state: AppState, local_mount: Option<(String, PathBuf)>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES);

    let router = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/email/request-code", post(auth::request_email_code))
        .route("/api/auth/email/verify-code", post(auth::verify_email_code))
        .route("/api/profiles/me", get(profiles::get_my_profile).patch(profiles::update_my_profile))
        .route(
            "/api/profiles/me/avatar",
            put(profiles::upload_avatar).delete(profiles::delete_avatar),
        )
        .route("/api/profiles/{id}", get(profiles::get_profile).patch(profiles::update_profile))
        .route("/api/profiles/{id}/followers", get(profiles::list_followers))
        .route("/api/profiles/{id}/following", get(profiles::list_following))
        .route("/api/profiles/{id}/follow", post(profiles::toggle_follow))
        .route("/api/profiles/{id}/workouts", get(feed::profile_feed))
        .route("/api/feed", get(feed::feed))
        .route("/api/workouts", post(workouts::create_workout))
        .route(
            "/api/workouts/{id}",
            get(workouts::get_workout)
                .patch(workouts::update_workout)
                .delete(workouts::delete_workout),
        )
        .route("/api/workouts/{id}/attachment", put(workouts::upload_attachment))
        .route("/api/workouts/{id}/like", get(workouts::get_like).post(workouts::toggle_like))
        .route(
            "/api/workouts/{id}/comments",
            get(comments::list_comments).post(comments::add_comment),
        )
        .route("/api/comments/{id}", delete(comments::delete_comment))
        .route("/api/exercises", get(exercises::list_exercises))
        .route("/api/exercises/categories", get(exercises::list_categories))
        .route("/api/exercises/{id}", get(exercises::get_exercise))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    match local_mount {
        Some((prefix, dir)) => router.nest_service(&prefix, ServeDir::new(dir)),
        None => router,
    }
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

pub(crate) fn storage_error_to_status(err: StorageError) -> StatusCode {
    match err {
        StorageError::InvalidPath(_) | StorageError::Empty => StatusCode::BAD_REQUEST,
        StorageError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        StorageError::UnsupportedType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        StorageError::Backend(e) => {
            tracing::error!(error = %e, "storage backend failed");
            StatusCode::BAD_GATEWAY
        }
        StorageError::Io(e) => {
            tracing::error!(error = %e, "storage io failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        StorageError::Config(e) => {
            tracing::error!(error = %e, "storage misconfigured");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub(crate) fn database_error_to_status(err: &sqlx::Error) -> StatusCode {
    tracing::error!(error = %err, "database query failed");
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Read the `file` part of a multipart body (or the first part when none is
/// named `file`) into an `Upload`.
pub(crate) async fn read_upload(mut multipart: Multipart) -> Result<Upload, StatusCode> {
    let mut fallback = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| e.status())? {
        let is_file = field.name() == Some("file");
        if !is_file && fallback.is_some() {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_owned();
        let bytes = field.bytes().await.map_err(|e| e.status())?;
        let upload = Upload { bytes: bytes.to_vec(), content_type };
        if is_file {
            return Ok(upload);
        }
        fallback = Some(upload);
    }
    fallback.ok_or(StatusCode::BAD_REQUEST)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
