//! Follow edges between users.
//!
//! The `(follower_id, following_id)` primary key is the uniqueness guarantee.
//! Toggling deletes first and only inserts when nothing was deleted, with
//! `ON CONFLICT DO NOTHING` absorbing a concurrent duplicate insert.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum FollowError {
    #[error("cannot follow yourself")]
    SelfFollow,
    #[error("user not found: {0}")]
    NotFound(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// State after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FollowState {
    pub following: bool,
    pub followers: i64,
}

/// Follow `target_id` if not yet followed, unfollow otherwise.
///
/// # Errors
///
/// Returns `SelfFollow` when both ids match and `NotFound` for an unknown target.
pub async fn toggle_follow(pool: &PgPool, follower_id: Uuid, target_id: Uuid) -> Result<FollowState, FollowError> {
    if follower_id == target_id {
        return Err(FollowError::SelfFollow);
    }

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(target_id)
        .fetch_one(pool)
        .await?;
    if !exists {
        return Err(FollowError::NotFound(target_id));
    }

    let removed = sqlx::query("DELETE FROM following WHERE follower_id = $1 AND following_id = $2")
        .bind(follower_id)
        .bind(target_id)
        .execute(pool)
        .await?
        .rows_affected();

    let following = if removed > 0 {
        false
    } else {
        sqlx::query(
            "INSERT INTO following (follower_id, following_id) VALUES ($1, $2)
             ON CONFLICT (follower_id, following_id) DO NOTHING",
        )
        .bind(follower_id)
        .bind(target_id)
        .execute(pool)
        .await?;
        true
    };

    let followers = follower_count(pool, target_id).await?;
    tracing::debug!(%follower_id, %target_id, following, followers, "follow toggled");
    Ok(FollowState { following, followers })
}

/// Whether `follower_id` follows `target_id`.
pub async fn is_following(pool: &PgPool, follower_id: Uuid, target_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM following WHERE follower_id = $1 AND following_id = $2)")
        .bind(follower_id)
        .bind(target_id)
        .fetch_one(pool)
        .await
}

/// Number of accounts following `user_id`.
pub async fn follower_count(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM following WHERE following_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

/// Number of accounts `user_id` follows.
pub async fn following_count(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM following WHERE follower_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

#[cfg(test)]
#[path = "follow_test.rs"]
mod tests;
