//! Workout service: create, read, update, delete and attachments.
//!
//! DESIGN
//! ======
//! A workout and its exercise list are inserted in one transaction so a
//! workout never appears in a feed with a partial exercise list. The image
//! attachment is uploaded afterwards, keyed by workout id in the `images`
//! bucket, and only then recorded on the row.
//!
//! Reads go through `feed::load_one` so a single workout is hydrated and
//! visibility-checked exactly like a feed item.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::services::exercise::{self, WorkoutExercise};
use crate::services::feed::{self, FeedItem};
use crate::services::storage::{IMAGES_BUCKET, ObjectStore, StorageError, Upload};

pub const DEFAULT_DURATION_MINUTES: i32 = 30;
const MAX_DURATION_MINUTES: i32 = 24 * 60;
const MAX_TITLE_LEN: usize = 120;
const MAX_DESCRIPTION_LEN: usize = 4000;
const MAX_EXERCISES: usize = 50;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum WorkoutError {
    #[error("workout not found: {0}")]
    NotFound(Uuid),
    #[error("not the owner of workout {0}")]
    Forbidden(Uuid),
    #[error("invalid workout: {0}")]
    Invalid(String),
    #[error("unknown exercise: {0}")]
    UnknownExercise(Uuid),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Friends,
    Private,
}

impl Visibility {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Friends => "friends",
            Self::Private => "private",
        }
    }
}

impl std::str::FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "friends" => Ok(Self::Friends),
            "private" => Ok(Self::Private),
            _ => Err(format!("unknown visibility: {s}")),
        }
    }
}

/// Request body for creating a workout.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewWorkout {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub duration_minutes: Option<i32>,
    pub visibility: Option<String>,
    #[serde(default)]
    pub exercise_ids: Vec<Uuid>,
}

/// `NewWorkout` after trimming, defaulting and checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidWorkout {
    pub title: String,
    pub description: String,
    pub duration_minutes: i32,
    pub visibility: Visibility,
    pub exercise_ids: Vec<Uuid>,
}

/// Partial update of an owned workout.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkoutPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration_minutes: Option<i32>,
    pub visibility: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidWorkoutPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration_minutes: Option<i32>,
    pub visibility: Option<Visibility>,
}

/// Single-workout view: feed item plus its ordered exercises.
#[derive(Debug, Clone, Serialize)]
pub struct WorkoutDetail {
    #[serde(flatten)]
    pub workout: FeedItem,
    pub exercises: Vec<WorkoutExercise>,
}

// =============================================================================
// VALIDATION
// =============================================================================

fn validate_title(raw: &str) -> Result<String, WorkoutError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(WorkoutError::Invalid("title is required".into()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(WorkoutError::Invalid(format!("title longer than {MAX_TITLE_LEN} characters")));
    }
    Ok(title.to_owned())
}

fn validate_description(raw: &str) -> Result<String, WorkoutError> {
    let description = raw.trim();
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(WorkoutError::Invalid(format!(
            "description longer than {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(description.to_owned())
}

fn validate_duration(minutes: i32) -> Result<i32, WorkoutError> {
    if minutes <= 0 || minutes > MAX_DURATION_MINUTES {
        return Err(WorkoutError::Invalid(format!(
            "duration_minutes must be between 1 and {MAX_DURATION_MINUTES}"
        )));
    }
    Ok(minutes)
}

fn validate_visibility(raw: &str) -> Result<Visibility, WorkoutError> {
    raw.parse().map_err(WorkoutError::Invalid)
}

/// Drop repeated exercise ids, keeping the first occurrence's position.
#[must_use]
pub fn dedupe_exercise_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

impl NewWorkout {
    /// # Errors
    ///
    /// Returns `WorkoutError::Invalid` describing the first bad field.
    pub fn validate(&self) -> Result<ValidWorkout, WorkoutError> {
        let exercise_ids = dedupe_exercise_ids(&self.exercise_ids);
        if exercise_ids.len() > MAX_EXERCISES {
            return Err(WorkoutError::Invalid(format!("more than {MAX_EXERCISES} exercises")));
        }
        Ok(ValidWorkout {
            title: validate_title(&self.title)?,
            description: validate_description(&self.description)?,
            duration_minutes: validate_duration(self.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES))?,
            visibility: match self.visibility.as_deref() {
                Some(raw) => validate_visibility(raw)?,
                None => Visibility::Public,
            },
            exercise_ids,
        })
    }
}

impl WorkoutPatch {
    /// # Errors
    ///
    /// Returns `WorkoutError::Invalid` for a bad field or an empty patch.
    pub fn validate(&self) -> Result<ValidWorkoutPatch, WorkoutError> {
        let valid = ValidWorkoutPatch {
            title: self.title.as_deref().map(validate_title).transpose()?,
            description: self.description.as_deref().map(validate_description).transpose()?,
            duration_minutes: self.duration_minutes.map(validate_duration).transpose()?,
            visibility: self.visibility.as_deref().map(validate_visibility).transpose()?,
        };
        if valid == ValidWorkoutPatch::default() {
            return Err(WorkoutError::Invalid("no fields to update".into()));
        }
        Ok(valid)
    }
}

// =============================================================================
// CRUD
// =============================================================================

/// Create a workout with its exercise list.
///
/// # Errors
///
/// Returns `Invalid` for bad input, `UnknownExercise` when an exercise id
/// does not exist, or a database error.
pub async fn create_workout(pool: &PgPool, user_id: Uuid, input: &NewWorkout) -> Result<WorkoutDetail, WorkoutError> {
    let valid = input.validate()?;

    let mut tx = pool.begin().await?;
    let workout_id: Uuid = sqlx::query_scalar(
        "INSERT INTO workouts (user_id, title, description, duration_minutes, visibility)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id",
    )
    .bind(user_id)
    .bind(&valid.title)
    .bind(&valid.description)
    .bind(valid.duration_minutes)
    .bind(valid.visibility.as_str())
    .fetch_one(&mut *tx)
    .await?;

    if let Some(missing) = exercise::first_missing(&mut tx, &valid.exercise_ids).await? {
        return Err(WorkoutError::UnknownExercise(missing));
    }
    exercise::attach_to_workout(&mut tx, workout_id, &valid.exercise_ids).await?;
    tx.commit().await?;

    tracing::info!(%user_id, %workout_id, exercises = valid.exercise_ids.len(), "workout created");
    get_workout(pool, user_id, workout_id).await
}

/// Load one workout as seen by `viewer_id`. Workouts the viewer may not see
/// are reported as not found.
///
/// # Errors
///
/// Returns `NotFound` or a database error.
pub async fn get_workout(pool: &PgPool, viewer_id: Uuid, workout_id: Uuid) -> Result<WorkoutDetail, WorkoutError> {
    let workout = feed::load_one(pool, viewer_id, workout_id)
        .await?
        .ok_or(WorkoutError::NotFound(workout_id))?;
    let exercises = exercise::workout_exercises(pool, workout_id).await?;
    Ok(WorkoutDetail { workout, exercises })
}

/// Check that `workout_id` exists and belongs to `user_id`. A workout the
/// caller cannot see is reported as `NotFound`, never `Forbidden`.
///
/// # Errors
///
/// Returns `NotFound` or `Forbidden`.
pub async fn ensure_owner(pool: &PgPool, user_id: Uuid, workout_id: Uuid) -> Result<(), WorkoutError> {
    let owner: Option<Uuid> = sqlx::query_scalar("SELECT user_id FROM workouts WHERE id = $1")
        .bind(workout_id)
        .fetch_optional(pool)
        .await?;
    match owner {
        None => Err(WorkoutError::NotFound(workout_id)),
        Some(owner) if owner == user_id => Ok(()),
        Some(_) => {
            if feed::is_visible(pool, user_id, workout_id).await? {
                Err(WorkoutError::Forbidden(workout_id))
            } else {
                Err(WorkoutError::NotFound(workout_id))
            }
        }
    }
}

/// Apply a patch to an owned workout.
///
/// # Errors
///
/// Returns `Invalid`, `NotFound`, `Forbidden` or a database error.
pub async fn update_workout(
    pool: &PgPool,
    user_id: Uuid,
    workout_id: Uuid,
    patch: &WorkoutPatch,
) -> Result<WorkoutDetail, WorkoutError> {
    let valid = patch.validate()?;
    ensure_owner(pool, user_id, workout_id).await?;

    sqlx::query(
        "UPDATE workouts
         SET title = COALESCE($2, title),
             description = COALESCE($3, description),
             duration_minutes = COALESCE($4, duration_minutes),
             visibility = COALESCE($5, visibility),
             updated_at = now()
         WHERE id = $1",
    )
    .bind(workout_id)
    .bind(valid.title)
    .bind(valid.description)
    .bind(valid.duration_minutes)
    .bind(valid.visibility.map(Visibility::as_str))
    .execute(pool)
    .await?;

    get_workout(pool, user_id, workout_id).await
}

/// Delete an owned workout and its attachment. Likes, comments and exercise
/// links go with it through `ON DELETE CASCADE`.
///
/// # Errors
///
/// Returns `NotFound`, `Forbidden` or a database error.
pub async fn delete_workout(
    pool: &PgPool,
    store: &dyn ObjectStore,
    user_id: Uuid,
    workout_id: Uuid,
) -> Result<(), WorkoutError> {
    ensure_owner(pool, user_id, workout_id).await?;

    let had_attachment: Option<Option<String>> =
        sqlx::query_scalar("DELETE FROM workouts WHERE id = $1 AND user_id = $2 RETURNING attachment_url")
            .bind(workout_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    match had_attachment {
        None => return Err(WorkoutError::NotFound(workout_id)),
        Some(Some(_)) => {
            // The row is already gone; a leftover object is harmless.
            if let Err(e) = store.remove(IMAGES_BUCKET, &workout_id.to_string()).await {
                tracing::warn!(%workout_id, error = %e, "attachment cleanup failed");
            }
        }
        Some(None) => {}
    }

    tracing::info!(%user_id, %workout_id, "workout deleted");
    Ok(())
}

/// Upload (or replace) the image attached to an owned workout.
///
/// # Errors
///
/// Returns `NotFound`, `Forbidden`, a storage error or a database error.
pub async fn set_attachment(
    pool: &PgPool,
    store: &dyn ObjectStore,
    max_upload_bytes: usize,
    user_id: Uuid,
    workout_id: Uuid,
    upload: Upload,
) -> Result<WorkoutDetail, WorkoutError> {
    upload.validate_image(max_upload_bytes)?;
    ensure_owner(pool, user_id, workout_id).await?;

    let path = store
        .put(IMAGES_BUCKET, &workout_id.to_string(), upload.bytes, &upload.content_type)
        .await?;
    let url = store.public_url(IMAGES_BUCKET, &path);

    sqlx::query("UPDATE workouts SET attachment_url = $2, updated_at = now() WHERE id = $1")
        .bind(workout_id)
        .bind(&url)
        .execute(pool)
        .await?;

    tracing::info!(%workout_id, %url, "workout attachment stored");
    get_workout(pool, user_id, workout_id).await
}

#[cfg(test)]
#[path = "workout_test.rs"]
mod tests;
