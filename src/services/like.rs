//! Workout likes.
//!
//! One like per `(user_id, workout_id)` pair, enforced by the primary key.
//! The toggle returns the count read after the write, so a client never has
//! to adjust a stale local counter.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::services::feed;

#[derive(Debug, thiserror::Error)]
pub enum LikeError {
    #[error("workout not found: {0}")]
    NotFound(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeState {
    pub liked: bool,
    pub like_count: i64,
}

/// Like `workout_id` if the caller has not yet, unlike it otherwise.
///
/// # Errors
///
/// Returns `NotFound` when the workout is missing or hidden from `user_id`.
pub async fn toggle_like(pool: &PgPool, user_id: Uuid, workout_id: Uuid) -> Result<LikeState, LikeError> {
    if !feed::is_visible(pool, user_id, workout_id).await? {
        return Err(LikeError::NotFound(workout_id));
    }

    let removed = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND workout_id = $2")
        .bind(user_id)
        .bind(workout_id)
        .execute(pool)
        .await?
        .rows_affected();

    let liked = if removed > 0 {
        false
    } else {
        sqlx::query(
            "INSERT INTO likes (user_id, workout_id) VALUES ($1, $2)
             ON CONFLICT (user_id, workout_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(workout_id)
        .execute(pool)
        .await?;
        true
    };

    let like_count = like_count(pool, workout_id).await?;
    tracing::debug!(%user_id, %workout_id, liked, like_count, "like toggled");
    Ok(LikeState { liked, like_count })
}

/// Current like state of a visible workout for `user_id`.
///
/// # Errors
///
/// Returns `NotFound` when the workout is missing or hidden from `user_id`.
pub async fn like_state(pool: &PgPool, user_id: Uuid, workout_id: Uuid) -> Result<LikeState, LikeError> {
    if !feed::is_visible(pool, user_id, workout_id).await? {
        return Err(LikeError::NotFound(workout_id));
    }
    let (liked, like_count) =
        futures::try_join!(is_liked_by(pool, user_id, workout_id), like_count(pool, workout_id))?;
    Ok(LikeState { liked, like_count })
}

pub async fn like_count(pool: &PgPool, workout_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE workout_id = $1")
        .bind(workout_id)
        .fetch_one(pool)
        .await
}

pub async fn is_liked_by(pool: &PgPool, user_id: Uuid, workout_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM likes WHERE user_id = $1 AND workout_id = $2)")
        .bind(user_id)
        .bind(workout_id)
        .fetch_one(pool)
        .await
}

#[cfg(test)]
#[path = "like_test.rs"]
mod tests;
