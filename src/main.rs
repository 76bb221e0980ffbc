mod db;
mod routes;
mod services;
mod state;

use std::time::Duration;

const SESSION_REAPER_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()
        .expect("invalid PORT");

    let pool = db::init_pool(&database_url)
        .await
        .expect("database init failed");

    let storage = services::storage::StorageConfig::from_env().expect("invalid storage config");
    let store = services::storage::build_store(&storage).expect("storage init failed");

    // Email delivery is optional: without it login codes go to the log.
    let email = services::email_auth::EmailConfig::from_env();
    if email.is_none() {
        tracing::warn!("RESEND_API_KEY/RESEND_FROM not set; login codes will be logged");
    }

    let state = state::AppState::new(pool.clone(), store, storage.max_upload_bytes, email);

    let _reaper = services::session::spawn_session_reaper(pool, SESSION_REAPER_INTERVAL);

    let app = routes::app(state, storage.local_mount());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "liftfeed listening");
    axum::serve(listener, app).await.expect("server failed");
}
