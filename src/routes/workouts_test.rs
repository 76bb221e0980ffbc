use super::*;

use crate::services::storage::StorageError;

#[test]
fn workout_error_to_status_maps_variants() {
    let id = Uuid::nil();
    assert_eq!(workout_error_to_status(workout::WorkoutError::NotFound(id)), StatusCode::NOT_FOUND);
    assert_eq!(workout_error_to_status(workout::WorkoutError::Forbidden(id)), StatusCode::FORBIDDEN);
    assert_eq!(
        workout_error_to_status(workout::WorkoutError::Invalid("title".into())),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(workout_error_to_status(workout::WorkoutError::UnknownExercise(id)), StatusCode::BAD_REQUEST);
    assert_eq!(
        workout_error_to_status(workout::WorkoutError::Storage(StorageError::UnsupportedType("text/html".into()))),
        StatusCode::UNSUPPORTED_MEDIA_TYPE
    );
    assert_eq!(
        workout_error_to_status(workout::WorkoutError::Database(sqlx::Error::PoolTimedOut)),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn like_error_to_status_maps_variants() {
    assert_eq!(like_error_to_status(like::LikeError::NotFound(Uuid::nil())), StatusCode::NOT_FOUND);
    assert_eq!(
        like_error_to_status(like::LikeError::Database(sqlx::Error::PoolClosed)),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}
