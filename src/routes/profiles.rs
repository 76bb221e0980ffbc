//! Profile routes: profile pages, edits, avatars and follow edges.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::routes::{database_error_to_status, read_upload, storage_error_to_status};
use crate::services::follow::{self, FollowState};
use crate::services::profile::{self, AuthorSummary, Profile, ProfilePage, ProfilePatch};
use crate::state::AppState;

pub(crate) fn profile_error_to_status(err: profile::ProfileError) -> StatusCode {
    match err {
        profile::ProfileError::NotFound(_) => StatusCode::NOT_FOUND,
        profile::ProfileError::Invalid(_) => StatusCode::BAD_REQUEST,
        profile::ProfileError::Storage(e) => storage_error_to_status(e),
        profile::ProfileError::Database(e) => database_error_to_status(&e),
    }
}

pub(crate) fn follow_error_to_status(err: follow::FollowError) -> StatusCode {
    match err {
        follow::FollowError::SelfFollow => StatusCode::BAD_REQUEST,
        follow::FollowError::NotFound(_) => StatusCode::NOT_FOUND,
        follow::FollowError::Database(e) => database_error_to_status(&e),
    }
}

/// `GET /api/profiles/me`: the caller's own profile page.
pub async fn get_my_profile(State(state): State<AppState>, auth: AuthUser) -> Result<Json<ProfilePage>, StatusCode> {
    let page = profile::profile_page(&state.pool, auth.user.id, auth.user.id)
        .await
        .map_err(profile_error_to_status)?;
    Ok(Json(page))
}

/// `GET /api/profiles/:id`: profile page as seen by the caller.
pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ProfilePage>, StatusCode> {
    let page = profile::profile_page(&state.pool, auth.user.id, user_id)
        .await
        .map_err(profile_error_to_status)?;
    Ok(Json(page))
}

/// `PATCH /api/profiles/me`: edit name, bio or fitness level.
pub async fn update_my_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<Profile>, StatusCode> {
    let updated = profile::update_profile(&state.pool, auth.user.id, &patch)
        .await
        .map_err(profile_error_to_status)?;
    Ok(Json(updated))
}

/// `PATCH /api/profiles/:id`: same as `/me`, but only for the caller's own id.
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<Profile>, StatusCode> {
    if user_id != auth.user.id {
        return Err(StatusCode::FORBIDDEN);
    }
    let updated = profile::update_profile(&state.pool, user_id, &patch)
        .await
        .map_err(profile_error_to_status)?;
    Ok(Json(updated))
}

/// `PUT /api/profiles/me/avatar`: multipart image upload.
pub async fn upload_avatar(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> Result<Json<Profile>, StatusCode> {
    let upload = read_upload(multipart).await?;
    let updated = profile::set_avatar(&state.pool, state.store.as_ref(), state.max_upload_bytes, auth.user.id, upload)
        .await
        .map_err(profile_error_to_status)?;
    Ok(Json(updated))
}

/// `DELETE /api/profiles/me/avatar`: remove the avatar.
pub async fn delete_avatar(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Profile>, StatusCode> {
    let updated = profile::clear_avatar(&state.pool, state.store.as_ref(), auth.user.id)
        .await
        .map_err(profile_error_to_status)?;
    Ok(Json(updated))
}

/// `GET /api/profiles/:id/followers`.
pub async fn list_followers(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<AuthorSummary>>, StatusCode> {
    let rows = profile::list_followers(&state.pool, user_id)
        .await
        .map_err(profile_error_to_status)?;
    Ok(Json(rows))
}

/// `GET /api/profiles/:id/following`.
pub async fn list_following(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<AuthorSummary>>, StatusCode> {
    let rows = profile::list_following(&state.pool, user_id)
        .await
        .map_err(profile_error_to_status)?;
    Ok(Json(rows))
}

/// `POST /api/profiles/:id/follow`: follow or unfollow.
pub async fn toggle_follow(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<FollowState>, StatusCode> {
    let follow_state = follow::toggle_follow(&state.pool, auth.user.id, user_id)
        .await
        .map_err(follow_error_to_status)?;
    Ok(Json(follow_state))
}

#[cfg(test)]
#[path = "profiles_test.rs"]
mod tests;
