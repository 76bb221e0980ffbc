//! Workout routes: CRUD, image attachment and likes.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::routes::{database_error_to_status, read_upload, storage_error_to_status};
use crate::services::like::{self, LikeState};
use crate::services::workout::{self, NewWorkout, WorkoutDetail, WorkoutPatch};
use crate::state::AppState;

pub(crate) fn workout_error_to_status(err: workout::WorkoutError) -> StatusCode {
    match err {
        workout::WorkoutError::NotFound(_) => StatusCode::NOT_FOUND,
        workout::WorkoutError::Forbidden(_) => StatusCode::FORBIDDEN,
        workout::WorkoutError::Invalid(_) | workout::WorkoutError::UnknownExercise(_) => StatusCode::BAD_REQUEST,
        workout::WorkoutError::Storage(e) => storage_error_to_status(e),
        workout::WorkoutError::Database(e) => database_error_to_status(&e),
    }
}

pub(crate) fn like_error_to_status(err: like::LikeError) -> StatusCode {
    match err {
        like::LikeError::NotFound(_) => StatusCode::NOT_FOUND,
        like::LikeError::Database(e) => database_error_to_status(&e),
    }
}

/// `POST /api/workouts`: create a workout with its exercise list.
pub async fn create_workout(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<NewWorkout>,
) -> Result<(StatusCode, Json<WorkoutDetail>), StatusCode> {
    let created = workout::create_workout(&state.pool, auth.user.id, &body)
        .await
        .map_err(workout_error_to_status)?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /api/workouts/:id`.
pub async fn get_workout(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(workout_id): Path<Uuid>,
) -> Result<Json<WorkoutDetail>, StatusCode> {
    let detail = workout::get_workout(&state.pool, auth.user.id, workout_id)
        .await
        .map_err(workout_error_to_status)?;
    Ok(Json(detail))
}

/// `PATCH /api/workouts/:id`: owner only.
pub async fn update_workout(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(workout_id): Path<Uuid>,
    Json(patch): Json<WorkoutPatch>,
) -> Result<Json<WorkoutDetail>, StatusCode> {
    let detail = workout::update_workout(&state.pool, auth.user.id, workout_id, &patch)
        .await
        .map_err(workout_error_to_status)?;
    Ok(Json(detail))
}

/// `DELETE /api/workouts/:id`: owner only.
pub async fn delete_workout(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(workout_id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    workout::delete_workout(&state.pool, state.store.as_ref(), auth.user.id, workout_id)
        .await
        .map_err(workout_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /api/workouts/:id/attachment`: multipart image upload, owner only.
pub async fn upload_attachment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(workout_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<WorkoutDetail>, StatusCode> {
    let upload = read_upload(multipart).await?;
    let detail = workout::set_attachment(
        &state.pool,
        state.store.as_ref(),
        state.max_upload_bytes,
        auth.user.id,
        workout_id,
        upload,
    )
    .await
    .map_err(workout_error_to_status)?;
    Ok(Json(detail))
}

/// `GET /api/workouts/:id/like`: whether the caller liked it, and the count.
pub async fn get_like(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(workout_id): Path<Uuid>,
) -> Result<Json<LikeState>, StatusCode> {
    let like_state = like::like_state(&state.pool, auth.user.id, workout_id)
        .await
        .map_err(like_error_to_status)?;
    Ok(Json(like_state))
}

/// `POST /api/workouts/:id/like`: like or unlike.
pub async fn toggle_like(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(workout_id): Path<Uuid>,
) -> Result<Json<LikeState>, StatusCode> {
    let like_state = like::toggle_like(&state.pool, auth.user.id, workout_id)
        .await
        .map_err(like_error_to_status)?;
    Ok(Json(like_state))
}

#[cfg(test)]
#[path = "workouts_test.rs"]
mod tests;
