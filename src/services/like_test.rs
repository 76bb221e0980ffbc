use super::*;

#[test]
fn like_state_serializes() {
    let json = serde_json::to_value(LikeState { liked: true, like_count: 7 }).unwrap();
    assert_eq!(json, serde_json::json!({ "liked": true, "like_count": 7 }));
}

#[test]
fn not_found_message_names_workout() {
    let id = Uuid::nil();
    assert_eq!(LikeError::NotFound(id).to_string(), format!("workout not found: {id}"));
}

#[cfg(feature = "live-db-tests")]
mod live {
    use super::*;
    use crate::services::workout;
    use crate::state::test_helpers;

    async fn post(pool: &PgPool, user: Uuid, visibility: &str) -> Uuid {
        let input = workout::NewWorkout {
            title: "Tempo run".into(),
            visibility: Some(visibility.into()),
            ..workout::NewWorkout::default()
        };
        workout::create_workout(pool, user, &input).await.unwrap().workout.id
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL/live Postgres"]
    async fn toggle_like_twice_restores_count() {
        let pool = test_helpers::integration_pool().await;
        let author = test_helpers::seed_user(&pool, "author@example.com").await;
        let fan = test_helpers::seed_user(&pool, "fan@example.com").await;
        let workout_id = post(&pool, author, "public").await;

        let first = toggle_like(&pool, fan, workout_id).await.unwrap();
        assert_eq!(first, LikeState { liked: true, like_count: 1 });
        assert!(is_liked_by(&pool, fan, workout_id).await.unwrap());

        let own = toggle_like(&pool, author, workout_id).await.unwrap();
        assert_eq!(own.like_count, 2);

        assert_eq!(like_state(&pool, fan, workout_id).await.unwrap(), LikeState { liked: true, like_count: 2 });

        let second = toggle_like(&pool, fan, workout_id).await.unwrap();
        assert_eq!(second, LikeState { liked: false, like_count: 1 });
        assert!(!is_liked_by(&pool, fan, workout_id).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL/live Postgres"]
    async fn hidden_or_missing_workout_cannot_be_liked() {
        let pool = test_helpers::integration_pool().await;
        let author = test_helpers::seed_user(&pool, "author@example.com").await;
        let stranger = test_helpers::seed_user(&pool, "stranger@example.com").await;
        let private = post(&pool, author, "private").await;

        let err = toggle_like(&pool, stranger, private).await.unwrap_err();
        assert!(matches!(err, LikeError::NotFound(_)));
        assert!(matches!(like_state(&pool, stranger, private).await, Err(LikeError::NotFound(_))));
        let err = toggle_like(&pool, stranger, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, LikeError::NotFound(_)));
        assert_eq!(like_count(&pool, private).await.unwrap(), 0);
    }
}
