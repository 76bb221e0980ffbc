//! Paginated workout feeds.
//!
//! DESIGN
//! ======
//! Every feed is one query over `workouts` joined to its author, with like
//! count, comment count and the viewer's like flag computed per row in the
//! same statement. Sources only differ in one extra `WHERE` predicate:
//!
//! - `for_you`: everything the viewer may see
//! - `following`: authors the viewer follows
//! - `liked`: workouts the viewer liked
//! - `profile`: one author's workouts
//!
//! PAGINATION
//! ==========
//! The cursor is a row offset. A page holds at most `PAGE_SIZE` rows
//! (`cursor..=cursor + PAGE_SIZE - 1`) and carries `next_cursor` only when it
//! came back full. Order is `created_at DESC, id DESC` so ties are stable.
//!
//! VISIBILITY
//! ==========
//! `public` rows are visible to all, `private` rows to their author only and
//! `friends` rows to the author plus users in a mutual follow with them.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::services::profile::AuthorSummary;
use crate::services::workout::Visibility;

pub const PAGE_SIZE: i64 = 25;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedSource {
    ForYou,
    Following,
    Liked,
}

impl std::str::FromStr for FeedSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "for_you" | "foryou" | "all" => Ok(Self::ForYou),
            "following" => Ok(Self::Following),
            "liked" | "likes" => Ok(Self::Liked),
            _ => Err(format!("unknown feed source: {s}")),
        }
    }
}

/// Which rows a query selects, before visibility is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Source(FeedSource),
    Author(Uuid),
    Workout(Uuid),
}

/// One hydrated workout as it appears in any feed.
#[derive(Debug, Clone, Serialize)]
pub struct FeedItem {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub duration_minutes: i32,
    pub visibility: Visibility,
    pub attachment_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub author: AuthorSummary,
    pub like_count: i64,
    pub comment_count: i64,
    pub liked_by_viewer: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub cursor: i64,
    pub next_cursor: Option<i64>,
}

impl<T> Page<T> {
    /// Wrap one fetched page; a full page implies there may be more.
    #[must_use]
    pub fn from_items(items: Vec<T>, cursor: i64) -> Self {
        let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
        let next_cursor = (len >= PAGE_SIZE).then(|| cursor.saturating_add(len));
        Self { items, cursor, next_cursor }
    }
}

/// Clamp a client-supplied cursor to a valid offset.
#[must_use]
pub fn normalize_cursor(cursor: Option<i64>) -> i64 {
    cursor.unwrap_or(0).max(0)
}

// =============================================================================
// QUERY BUILDING
// =============================================================================

const FEED_SELECT: &str = "SELECT w.id, w.title, w.description, w.duration_minutes, w.visibility,
        w.attachment_url, w.created_at,
        u.id AS author_id, u.full_name AS author_full_name, u.email AS author_email,
        u.avatar_url AS author_avatar_url,
        (SELECT COUNT(*) FROM likes l WHERE l.workout_id = w.id) AS like_count,
        (SELECT COUNT(*) FROM comments c WHERE c.workout_id = w.id) AS comment_count,
        EXISTS (SELECT 1 FROM likes l WHERE l.workout_id = w.id AND l.user_id = ";

/// Append the visibility predicate for `viewer_id` on alias `w`.
pub(crate) fn push_visible_to(builder: &mut QueryBuilder<'_, Postgres>, viewer_id: Uuid) {
    builder.push("(w.visibility = 'public' OR w.user_id = ");
    builder.push_bind(viewer_id);
    builder.push(" OR (w.visibility = 'friends' AND EXISTS (SELECT 1 FROM following f1 WHERE f1.follower_id = ");
    builder.push_bind(viewer_id);
    builder.push(" AND f1.following_id = w.user_id) AND EXISTS (SELECT 1 FROM following f2 WHERE f2.follower_id = w.user_id AND f2.following_id = ");
    builder.push_bind(viewer_id);
    builder.push(")))");
}

fn push_scope(builder: &mut QueryBuilder<'_, Postgres>, viewer_id: Uuid, scope: Scope) {
    match scope {
        Scope::Source(FeedSource::ForYou) => {}
        Scope::Source(FeedSource::Following) => {
            builder.push(" AND w.user_id IN (SELECT following_id FROM following WHERE follower_id = ");
            builder.push_bind(viewer_id);
            builder.push(")");
        }
        Scope::Source(FeedSource::Liked) => {
            builder.push(" AND EXISTS (SELECT 1 FROM likes lv WHERE lv.workout_id = w.id AND lv.user_id = ");
            builder.push_bind(viewer_id);
            builder.push(")");
        }
        Scope::Author(author_id) => {
            builder.push(" AND w.user_id = ");
            builder.push_bind(author_id);
        }
        Scope::Workout(workout_id) => {
            builder.push(" AND w.id = ");
            builder.push_bind(workout_id);
        }
    }
}

fn build_query(viewer_id: Uuid, scope: Scope, offset: i64, limit: i64) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(FEED_SELECT);
    builder.push_bind(viewer_id);
    builder.push(") AS liked_by_viewer FROM workouts w JOIN users u ON u.id = w.user_id WHERE ");
    push_visible_to(&mut builder, viewer_id);
    push_scope(&mut builder, viewer_id, scope);
    builder.push(" ORDER BY w.created_at DESC, w.id DESC OFFSET ");
    builder.push_bind(offset);
    builder.push(" LIMIT ");
    builder.push_bind(limit);
    builder
}

fn feed_item_from_row(row: &PgRow) -> FeedItem {
    let visibility: String = row.get("visibility");
    FeedItem {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        duration_minutes: row.get("duration_minutes"),
        visibility: visibility.parse().unwrap_or(Visibility::Private),
        attachment_url: row.get("attachment_url"),
        created_at: row.get("created_at"),
        author: AuthorSummary::from_row(row, "author_"),
        like_count: row.get("like_count"),
        comment_count: row.get("comment_count"),
        liked_by_viewer: row.get("liked_by_viewer"),
    }
}

async fn fetch(
    pool: &PgPool,
    viewer_id: Uuid,
    scope: Scope,
    offset: i64,
    limit: i64,
) -> Result<Vec<FeedItem>, sqlx::Error> {
    let mut builder = build_query(viewer_id, scope, offset, limit);
    let rows = builder.build().fetch_all(pool).await?;
    Ok(rows.iter().map(feed_item_from_row).collect())
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// One page of a feed source for `viewer_id`.
pub async fn load_feed(
    pool: &PgPool,
    viewer_id: Uuid,
    source: FeedSource,
    cursor: i64,
) -> Result<Page<FeedItem>, sqlx::Error> {
    let items = fetch(pool, viewer_id, Scope::Source(source), cursor, PAGE_SIZE).await?;
    Ok(Page::from_items(items, cursor))
}

/// One page of `author_id`'s workouts as visible to `viewer_id`.
pub async fn load_profile_feed(
    pool: &PgPool,
    viewer_id: Uuid,
    author_id: Uuid,
    cursor: i64,
) -> Result<Page<FeedItem>, sqlx::Error> {
    let items = fetch(pool, viewer_id, Scope::Author(author_id), cursor, PAGE_SIZE).await?;
    Ok(Page::from_items(items, cursor))
}

/// The `limit` newest workouts of `author_id` visible to `viewer_id`.
pub async fn recent_by_author(
    pool: &PgPool,
    viewer_id: Uuid,
    author_id: Uuid,
    limit: i64,
) -> Result<Vec<FeedItem>, sqlx::Error> {
    fetch(pool, viewer_id, Scope::Author(author_id), 0, limit).await
}

/// A single workout if it exists and `viewer_id` may see it.
pub async fn load_one(pool: &PgPool, viewer_id: Uuid, workout_id: Uuid) -> Result<Option<FeedItem>, sqlx::Error> {
    let mut items = fetch(pool, viewer_id, Scope::Workout(workout_id), 0, 1).await?;
    Ok(items.pop())
}

/// Whether `viewer_id` may see `workout_id`. Missing workouts are not visible.
pub async fn is_visible(pool: &PgPool, viewer_id: Uuid, workout_id: Uuid) -> Result<bool, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT EXISTS(SELECT 1 FROM workouts w WHERE w.id = ");
    builder.push_bind(workout_id);
    builder.push(" AND ");
    push_visible_to(&mut builder, viewer_id);
    builder.push(")");
    builder.build_query_scalar::<bool>().fetch_one(pool).await
}

#[cfg(test)]
#[path = "feed_test.rs"]
mod tests;
