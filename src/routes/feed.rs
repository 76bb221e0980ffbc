//! Feed routes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::routes::database_error_to_status;
use crate::services::feed::{self, FeedItem, FeedSource, Page};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub source: Option<String>,
    pub cursor: Option<i64>,
}

impl FeedQuery {
    /// Missing `source` means `for_you`; an unknown one is rejected.
    fn source(&self) -> Result<FeedSource, StatusCode> {
        match self.source.as_deref() {
            None | Some("") => Ok(FeedSource::ForYou),
            Some(raw) => raw.parse::<FeedSource>().map_err(|_| StatusCode::BAD_REQUEST),
        }
    }
}

/// `GET /api/feed?source=for_you|following|liked&cursor=N`.
pub async fn feed(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Page<FeedItem>>, StatusCode> {
    let source = query.source()?;
    let cursor = feed::normalize_cursor(query.cursor);
    let page = feed::load_feed(&state.pool, auth.user.id, source, cursor)
        .await
        .map_err(|e| database_error_to_status(&e))?;
    Ok(Json(page))
}

/// `GET /api/profiles/:id/workouts?cursor=N`.
pub async fn profile_feed(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(author_id): Path<Uuid>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Page<FeedItem>>, StatusCode> {
    let cursor = feed::normalize_cursor(query.cursor);
    let page = feed::load_profile_feed(&state.pool, auth.user.id, author_id, cursor)
        .await
        .map_err(|e| database_error_to_status(&e))?;
    Ok(Json(page))
}

#[cfg(test)]
#[path = "feed_test.rs"]
mod tests;
