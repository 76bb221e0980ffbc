//! Comment routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::routes::database_error_to_status;
use crate::services::comment::{self, Comment, NewComment};
use crate::state::AppState;

pub(crate) fn comment_error_to_status(err: comment::CommentError) -> StatusCode {
    match err {
        comment::CommentError::WorkoutNotFound(_) | comment::CommentError::NotFound(_) => StatusCode::NOT_FOUND,
        comment::CommentError::Forbidden(_) => StatusCode::FORBIDDEN,
        comment::CommentError::Invalid(_) => StatusCode::BAD_REQUEST,
        comment::CommentError::Database(e) => database_error_to_status(&e),
    }
}

/// `GET /api/workouts/:id/comments`: newest first.
pub async fn list_comments(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(workout_id): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, StatusCode> {
    let comments = comment::list_comments(&state.pool, auth.user.id, workout_id)
        .await
        .map_err(comment_error_to_status)?;
    Ok(Json(comments))
}

/// `POST /api/workouts/:id/comments`.
pub async fn add_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(workout_id): Path<Uuid>,
    Json(body): Json<NewComment>,
) -> Result<(StatusCode, Json<Comment>), StatusCode> {
    let created = comment::add_comment(&state.pool, auth.user.id, workout_id, &body.content)
        .await
        .map_err(comment_error_to_status)?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `DELETE /api/comments/:id`: comment author or workout owner.
pub async fn delete_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(comment_id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    comment::delete_comment(&state.pool, auth.user.id, comment_id)
        .await
        .map_err(comment_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "comments_test.rs"]
mod tests;
