//! Workout comments.
//!
//! Anyone who can see a workout can comment on it and read its comments.
//! A comment can be deleted by its author or by the owner of the workout.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::services::feed;
use crate::services::profile::AuthorSummary;

pub const MAX_COMMENT_LEN: usize = 2000;

#[derive(Debug, thiserror::Error)]
pub enum CommentError {
    #[error("workout not found: {0}")]
    WorkoutNotFound(Uuid),
    #[error("comment not found: {0}")]
    NotFound(Uuid),
    #[error("not allowed to delete comment {0}")]
    Forbidden(Uuid),
    #[error("invalid comment: {0}")]
    Invalid(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewComment {
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: Uuid,
    pub workout_id: Uuid,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub author: AuthorSummary,
}

/// Trim `raw` and check it is non-empty and within `MAX_COMMENT_LEN` chars.
///
/// # Errors
///
/// Returns `CommentError::Invalid` otherwise.
pub fn validate_content(raw: &str) -> Result<String, CommentError> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(CommentError::Invalid("content is required".into()));
    }
    if content.chars().count() > MAX_COMMENT_LEN {
        return Err(CommentError::Invalid(format!("content longer than {MAX_COMMENT_LEN} characters")));
    }
    Ok(content.to_owned())
}

const COMMENT_SELECT: &str = "SELECT c.id, c.workout_id, c.content, c.created_at,
        u.id AS author_id, u.full_name AS author_full_name, u.email AS author_email,
        u.avatar_url AS author_avatar_url
 FROM comments c
 JOIN users u ON u.id = c.user_id";

fn comment_from_row(row: &PgRow) -> Comment {
    Comment {
        id: row.get("id"),
        workout_id: row.get("workout_id"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        author: AuthorSummary::from_row(row, "author_"),
    }
}

async fn ensure_visible(pool: &PgPool, viewer_id: Uuid, workout_id: Uuid) -> Result<(), CommentError> {
    if feed::is_visible(pool, viewer_id, workout_id).await? {
        Ok(())
    } else {
        Err(CommentError::WorkoutNotFound(workout_id))
    }
}

/// Add a comment to a workout the caller can see.
///
/// # Errors
///
/// Returns `Invalid` for bad content and `WorkoutNotFound` when the workout
/// is missing or hidden from `user_id`.
pub async fn add_comment(pool: &PgPool, user_id: Uuid, workout_id: Uuid, content: &str) -> Result<Comment, CommentError> {
    let content = validate_content(content)?;
    ensure_visible(pool, user_id, workout_id).await?;

    let comment_id: Uuid = sqlx::query_scalar(
        "INSERT INTO comments (workout_id, user_id, content) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(workout_id)
    .bind(user_id)
    .bind(&content)
    .fetch_one(pool)
    .await?;

    let sql = format!("{COMMENT_SELECT} WHERE c.id = $1");
    let row = sqlx::query(&sql)
        .bind(comment_id)
        .fetch_optional(pool)
        .await?
        .ok_or(CommentError::NotFound(comment_id))?;

    tracing::debug!(%user_id, %workout_id, %comment_id, "comment added");
    Ok(comment_from_row(&row))
}

/// Comments on a visible workout, newest first.
///
/// # Errors
///
/// Returns `WorkoutNotFound` when the workout is missing or hidden.
pub async fn list_comments(pool: &PgPool, viewer_id: Uuid, workout_id: Uuid) -> Result<Vec<Comment>, CommentError> {
    ensure_visible(pool, viewer_id, workout_id).await?;
    let sql = format!("{COMMENT_SELECT} WHERE c.workout_id = $1 ORDER BY c.created_at DESC, c.id DESC");
    let rows = sqlx::query(&sql).bind(workout_id).fetch_all(pool).await?;
    Ok(rows.iter().map(comment_from_row).collect())
}

/// Delete a comment written by `user_id` or left on one of their workouts.
///
/// # Errors
///
/// Returns `NotFound` for an unknown comment and `Forbidden` otherwise.
pub async fn delete_comment(pool: &PgPool, user_id: Uuid, comment_id: Uuid) -> Result<(), CommentError> {
    let owners = sqlx::query_as::<_, (Uuid, Uuid)>(
        "SELECT c.user_id, w.user_id FROM comments c JOIN workouts w ON w.id = c.workout_id WHERE c.id = $1",
    )
    .bind(comment_id)
    .fetch_optional(pool)
    .await?;

    match owners {
        None => Err(CommentError::NotFound(comment_id)),
        Some((author, owner)) if author != user_id && owner != user_id => Err(CommentError::Forbidden(comment_id)),
        Some(_) => {
            sqlx::query("DELETE FROM comments WHERE id = $1")
                .bind(comment_id)
                .execute(pool)
                .await?;
            tracing::debug!(%user_id, %comment_id, "comment deleted");
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "comment_test.rs"]
mod tests;
