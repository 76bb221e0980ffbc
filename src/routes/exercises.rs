//! Exercise library routes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::routes::database_error_to_status;
use crate::services::exercise::{self, CategoryCount, Exercise, ExerciseFilter};
use crate::state::AppState;

pub(crate) fn exercise_error_to_status(err: exercise::ExerciseError) -> StatusCode {
    match err {
        exercise::ExerciseError::NotFound(_) => StatusCode::NOT_FOUND,
        exercise::ExerciseError::Database(e) => database_error_to_status(&e),
    }
}

/// `GET /api/exercises?category=&muscle_group=`.
pub async fn list_exercises(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(filter): Query<ExerciseFilter>,
) -> Result<Json<Vec<Exercise>>, StatusCode> {
    let rows = exercise::list_exercises(&state.pool, &filter)
        .await
        .map_err(exercise_error_to_status)?;
    Ok(Json(rows))
}

/// `GET /api/exercises/categories`.
pub async fn list_categories(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<Vec<CategoryCount>>, StatusCode> {
    let rows = exercise::list_categories(&state.pool)
        .await
        .map_err(exercise_error_to_status)?;
    Ok(Json(rows))
}

/// `GET /api/exercises/:id`.
pub async fn get_exercise(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(exercise_id): Path<Uuid>,
) -> Result<Json<Exercise>, StatusCode> {
    let row = exercise::get_exercise(&state.pool, exercise_id)
        .await
        .map_err(exercise_error_to_status)?;
    Ok(Json(row))
}

#[cfg(test)]
#[path = "exercises_test.rs"]
mod tests;
