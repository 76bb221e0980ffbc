//! Exercise library and per-workout exercise lists.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ExerciseError {
    #[error("exercise not found: {0}")]
    NotFound(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exercise {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub muscle_group: String,
    pub description: String,
    pub equipment: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkoutExercise {
    pub id: Uuid,
    pub order_position: i32,
    pub exercise: Exercise,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

/// Library filters; both are exact, case-insensitive matches.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExerciseFilter {
    pub category: Option<String>,
    pub muscle_group: Option<String>,
}

impl ExerciseFilter {
    fn normalized(value: Option<&str>) -> Option<String> {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_ascii_lowercase)
    }
}

fn exercise_from_row(row: &PgRow) -> Exercise {
    Exercise {
        id: row.get("id"),
        name: row.get("name"),
        category: row.get("category"),
        muscle_group: row.get("muscle_group"),
        description: row.get("description"),
        equipment: row.get("equipment"),
        image_url: row.get("image_url"),
    }
}

/// List the library, ordered by name.
pub async fn list_exercises(pool: &PgPool, filter: &ExerciseFilter) -> Result<Vec<Exercise>, ExerciseError> {
    let rows = sqlx::query(
        "SELECT id, name, category, muscle_group, description, equipment, image_url
         FROM exercises
         WHERE ($1::text IS NULL OR lower(category) = $1)
           AND ($2::text IS NULL OR lower(muscle_group) = $2)
         ORDER BY name ASC",
    )
    .bind(ExerciseFilter::normalized(filter.category.as_deref()))
    .bind(ExerciseFilter::normalized(filter.muscle_group.as_deref()))
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(exercise_from_row).collect())
}

/// # Errors
///
/// Returns `NotFound` for an unknown id.
pub async fn get_exercise(pool: &PgPool, exercise_id: Uuid) -> Result<Exercise, ExerciseError> {
    let row = sqlx::query(
        "SELECT id, name, category, muscle_group, description, equipment, image_url
         FROM exercises WHERE id = $1",
    )
    .bind(exercise_id)
    .fetch_optional(pool)
    .await?
    .ok_or(ExerciseError::NotFound(exercise_id))?;
    Ok(exercise_from_row(&row))
}

/// Distinct categories with the number of exercises in each.
pub async fn list_categories(pool: &PgPool) -> Result<Vec<CategoryCount>, ExerciseError> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT category, COUNT(*) FROM exercises GROUP BY category ORDER BY category ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect())
}

/// Exercises of one workout in `order_position` order.
pub async fn workout_exercises(pool: &PgPool, workout_id: Uuid) -> Result<Vec<WorkoutExercise>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT we.id AS link_id, we.order_position,
                e.id, e.name, e.category, e.muscle_group, e.description, e.equipment, e.image_url
         FROM workout_exercises we
         JOIN exercises e ON e.id = we.exercise_id
         WHERE we.workout_id = $1
         ORDER BY we.order_position ASC",
    )
    .bind(workout_id)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .iter()
        .map(|r| WorkoutExercise {
            id: r.get("link_id"),
            order_position: r.get("order_position"),
            exercise: exercise_from_row(r),
        })
        .collect())
}

/// First id in `ids` with no matching exercise, if any.
pub(crate) async fn first_missing(
    tx: &mut Transaction<'_, Postgres>,
    ids: &[Uuid],
) -> Result<Option<Uuid>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(None);
    }
    let found: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM exercises WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(&mut **tx)
        .await?;
    Ok(ids.iter().copied().find(|id| !found.contains(id)))
}

/// Link `ids` to a workout with `order_position` 0..n in slice order.
pub(crate) async fn attach_to_workout(
    tx: &mut Transaction<'_, Postgres>,
    workout_id: Uuid,
    ids: &[Uuid],
) -> Result<(), sqlx::Error> {
    if ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        "INSERT INTO workout_exercises (workout_id, exercise_id, order_position)
         SELECT $1, e.id, (e.ord - 1)::int
         FROM UNNEST($2::uuid[]) WITH ORDINALITY AS e(id, ord)
         ON CONFLICT (workout_id, exercise_id) DO NOTHING",
    )
    .bind(workout_id)
    .bind(ids)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[cfg(test)]
#[path = "exercise_test.rs"]
mod tests;
