//! Profile service: profile pages, edits, avatars, follower lists.
//!
//! DESIGN
//! ======
//! A profile page is assembled from independent reads (row, stats, counts,
//! recent workouts, photos). They run concurrently on the pool; none of them
//! depend on each other's results.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::services::feed::{self, FeedItem};
use crate::services::follow;
use crate::services::storage::{AVATARS_BUCKET, ObjectStore, StorageError, Upload};

const RECENT_WORKOUTS: i64 = 5;
const MAX_NAME_LEN: usize = 80;
const MAX_BIO_LEN: usize = 500;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("profile not found: {0}")]
    NotFound(Uuid),
    #[error("invalid profile update: {0}")]
    Invalid(String),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl FitnessLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl std::str::FromStr for FitnessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            _ => Err(format!("unknown fitness_level: {s}")),
        }
    }
}

/// Public author card embedded in feed items, comments and follower lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub full_name: String,
    pub handle: String,
    pub avatar_url: Option<String>,
}

/// `@` plus the email local part, or `@user` when there is none.
#[must_use]
pub fn handle_from_email(email: &str) -> String {
    match email.split('@').next().map(str::trim) {
        Some(local) if !local.is_empty() => format!("@{local}"),
        _ => "@user".to_owned(),
    }
}

impl AuthorSummary {
    /// Build from a row carrying `{prefix}id`, `{prefix}full_name`,
    /// `{prefix}email` and `{prefix}avatar_url` columns.
    pub(crate) fn from_row(row: &PgRow, prefix: &str) -> Self {
        let email: String = row.get(format!("{prefix}email").as_str());
        Self {
            id: row.get(format!("{prefix}id").as_str()),
            full_name: row.get(format!("{prefix}full_name").as_str()),
            handle: handle_from_email(&email),
            avatar_url: row.get(format!("{prefix}avatar_url").as_str()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: String,
    pub handle: String,
    pub bio: String,
    pub fitness_level: String,
    pub avatar_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProfileStats {
    pub total_workouts: i64,
    pub total_duration: i64,
    pub followers: i64,
    pub following: i64,
}

/// Everything a profile page shows.
#[derive(Debug, Clone, Serialize)]
pub struct ProfilePage {
    pub profile: Profile,
    pub stats: ProfileStats,
    pub is_self: bool,
    pub viewer_follows: bool,
    pub recent_workouts: Vec<FeedItem>,
    pub photos: Vec<String>,
}

/// Partial update of the caller's own profile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub fitness_level: Option<String>,
}

/// Validated form of `ProfilePatch`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidProfilePatch {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub fitness_level: Option<FitnessLevel>,
}

impl ProfilePatch {
    /// Trim and check every provided field.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::Invalid` for an empty or overlong name, an
    /// overlong bio, an unknown fitness level, or a patch with no fields.
    pub fn validate(&self) -> Result<ValidProfilePatch, ProfileError> {
        let full_name = match self.full_name.as_deref().map(str::trim) {
            Some("") => return Err(ProfileError::Invalid("full_name must not be empty".into())),
            Some(name) if name.chars().count() > MAX_NAME_LEN => {
                return Err(ProfileError::Invalid(format!("full_name longer than {MAX_NAME_LEN} characters")));
            }
            other => other.map(str::to_owned),
        };
        let bio = match self.bio.as_deref().map(str::trim) {
            Some(bio) if bio.chars().count() > MAX_BIO_LEN => {
                return Err(ProfileError::Invalid(format!("bio longer than {MAX_BIO_LEN} characters")));
            }
            other => other.map(str::to_owned),
        };
        let fitness_level = self
            .fitness_level
            .as_deref()
            .map(str::parse::<FitnessLevel>)
            .transpose()
            .map_err(ProfileError::Invalid)?;
        if full_name.is_none() && bio.is_none() && fitness_level.is_none() {
            return Err(ProfileError::Invalid("no fields to update".into()));
        }
        Ok(ValidProfilePatch { full_name, bio, fitness_level })
    }
}

// =============================================================================
// READS
// =============================================================================

fn profile_from_row(row: &PgRow) -> Profile {
    let email: String = row.get("email");
    Profile {
        id: row.get("id"),
        full_name: row.get("full_name"),
        handle: handle_from_email(&email),
        bio: row.get("bio"),
        fitness_level: row.get("fitness_level"),
        avatar_url: row.get("avatar_url"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Load one profile row.
///
/// # Errors
///
/// Returns `NotFound` if no such user exists.
pub async fn get_profile(pool: &PgPool, user_id: Uuid) -> Result<Profile, ProfileError> {
    let row = sqlx::query(
        "SELECT id, email, full_name, bio, fitness_level, avatar_url, created_at, updated_at
         FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(ProfileError::NotFound(user_id))?;
    Ok(profile_from_row(&row))
}

async fn workout_totals(pool: &PgPool, user_id: Uuid) -> Result<(i64, i64), sqlx::Error> {
    let totals = sqlx::query_as::<_, (i64, i64)>(
        "SELECT total_workouts, total_duration FROM user_stats WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(totals.unwrap_or((0, 0)))
}

/// Attachment URLs of the user's workouts that the viewer may see, newest first.
async fn photos(pool: &PgPool, viewer_id: Uuid, user_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
    let mut builder = sqlx::QueryBuilder::new(
        "SELECT w.attachment_url FROM workouts w
         WHERE w.attachment_url IS NOT NULL AND w.user_id = ",
    );
    builder.push_bind(user_id);
    builder.push(" AND ");
    feed::push_visible_to(&mut builder, viewer_id);
    builder.push(" ORDER BY w.created_at DESC, w.id DESC");
    builder.build_query_scalar::<String>().fetch_all(pool).await
}

/// Assemble the full profile page for `user_id` as seen by `viewer_id`.
///
/// # Errors
///
/// Returns `NotFound` if the profile does not exist.
pub async fn profile_page(pool: &PgPool, viewer_id: Uuid, user_id: Uuid) -> Result<ProfilePage, ProfileError> {
    let profile = get_profile(pool, user_id).await?;

    let (totals, followers, following, viewer_follows, recent, photos) = futures::try_join!(
        workout_totals(pool, user_id),
        follow::follower_count(pool, user_id),
        follow::following_count(pool, user_id),
        follow::is_following(pool, viewer_id, user_id),
        feed::recent_by_author(pool, viewer_id, user_id, RECENT_WORKOUTS),
        photos(pool, viewer_id, user_id),
    )?;

    Ok(ProfilePage {
        profile,
        stats: ProfileStats { total_workouts: totals.0, total_duration: totals.1, followers, following },
        is_self: viewer_id == user_id,
        viewer_follows: viewer_id != user_id && viewer_follows,
        recent_workouts: recent,
        photos,
    })
}

/// Accounts following `user_id`, newest edge first.
pub async fn list_followers(pool: &PgPool, user_id: Uuid) -> Result<Vec<AuthorSummary>, ProfileError> {
    ensure_exists(pool, user_id).await?;
    let rows = sqlx::query(
        "SELECT u.id, u.full_name, u.email, u.avatar_url
         FROM following f
         JOIN users u ON u.id = f.follower_id
         WHERE f.following_id = $1
         ORDER BY f.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(|r| AuthorSummary::from_row(r, "")).collect())
}

/// Accounts `user_id` follows, newest edge first.
pub async fn list_following(pool: &PgPool, user_id: Uuid) -> Result<Vec<AuthorSummary>, ProfileError> {
    ensure_exists(pool, user_id).await?;
    let rows = sqlx::query(
        "SELECT u.id, u.full_name, u.email, u.avatar_url
         FROM following f
         JOIN users u ON u.id = f.following_id
         WHERE f.follower_id = $1
         ORDER BY f.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(|r| AuthorSummary::from_row(r, "")).collect())
}

async fn ensure_exists(pool: &PgPool, user_id: Uuid) -> Result<(), ProfileError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    if exists { Ok(()) } else { Err(ProfileError::NotFound(user_id)) }
}

// =============================================================================
// WRITES
// =============================================================================

/// Apply a validated patch to the caller's own profile.
///
/// # Errors
///
/// Returns `Invalid` for a bad patch and `NotFound` if the user row is gone.
pub async fn update_profile(pool: &PgPool, user_id: Uuid, patch: &ProfilePatch) -> Result<Profile, ProfileError> {
    let valid = patch.validate()?;
    let row = sqlx::query(
        "UPDATE users
         SET full_name = COALESCE($2, full_name),
             bio = COALESCE($3, bio),
             fitness_level = COALESCE($4, fitness_level),
             updated_at = now()
         WHERE id = $1
         RETURNING id, email, full_name, bio, fitness_level, avatar_url, created_at, updated_at",
    )
    .bind(user_id)
    .bind(valid.full_name)
    .bind(valid.bio)
    .bind(valid.fitness_level.map(FitnessLevel::as_str))
    .fetch_optional(pool)
    .await?
    .ok_or(ProfileError::NotFound(user_id))?;
    Ok(profile_from_row(&row))
}

/// Replace the caller's avatar. The object is stored at `avatars/{user_id}`
/// so a new upload overwrites the old one.
///
/// # Errors
///
/// Returns a storage error for rejected or failed uploads.
pub async fn set_avatar(
    pool: &PgPool,
    store: &dyn ObjectStore,
    max_upload_bytes: usize,
    user_id: Uuid,
    upload: Upload,
) -> Result<Profile, ProfileError> {
    upload.validate_image(max_upload_bytes)?;
    let path = store
        .put(AVATARS_BUCKET, &user_id.to_string(), upload.bytes, &upload.content_type)
        .await?;
    let url = store.public_url(AVATARS_BUCKET, &path);

    let row = sqlx::query(
        "UPDATE users SET avatar_url = $2, updated_at = now()
         WHERE id = $1
         RETURNING id, email, full_name, bio, fitness_level, avatar_url, created_at, updated_at",
    )
    .bind(user_id)
    .bind(&url)
    .fetch_optional(pool)
    .await?
    .ok_or(ProfileError::NotFound(user_id))?;

    tracing::info!(%user_id, %url, "avatar updated");
    Ok(profile_from_row(&row))
}

/// Remove the caller's avatar object and clear the URL.
///
/// # Errors
///
/// Returns a storage or database error.
pub async fn clear_avatar(pool: &PgPool, store: &dyn ObjectStore, user_id: Uuid) -> Result<Profile, ProfileError> {
    store.remove(AVATARS_BUCKET, &user_id.to_string()).await?;
    let row = sqlx::query(
        "UPDATE users SET avatar_url = NULL, updated_at = now()
         WHERE id = $1
         RETURNING id, email, full_name, bio, fitness_level, avatar_url, created_at, updated_at",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(ProfileError::NotFound(user_id))?;
    Ok(profile_from_row(&row))
}

#[cfg(test)]
#[path = "profile_test.rs"]
mod tests;
