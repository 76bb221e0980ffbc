use super::*;

#[test]
fn exercise_error_to_status_maps_variants() {
    assert_eq!(
        exercise_error_to_status(exercise::ExerciseError::NotFound(Uuid::nil())),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        exercise_error_to_status(exercise::ExerciseError::Database(sqlx::Error::RowNotFound)),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}
