//! Database initialization and migration runner.
//!
//! SYSTEM CONTEXT
//! ==============
//! Startup uses this module to create the shared SQLx pool and apply the
//! schema (profiles, workouts, social edges, exercise library) before the
//! router starts accepting API traffic.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

fn db_max_connections() -> u32 {
    std::env::var("DB_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
}

/// Initialize the `PostgreSQL` connection pool and run migrations.
///
/// # Errors
///
/// Returns an error if the connection or migrations fail.
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(db_max_connections())
        .connect(database_url)
        .await?;

    sqlx::migrate!("src/db/migrations").run(&pool).await?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_max_connections_defaults_when_unset_or_invalid() {
        // Single test touches DB_MAX_CONNECTIONS to avoid parallel env races.
        unsafe { std::env::remove_var("DB_MAX_CONNECTIONS") };
        assert_eq!(db_max_connections(), DEFAULT_DB_MAX_CONNECTIONS);

        unsafe { std::env::set_var("DB_MAX_CONNECTIONS", "not-a-number") };
        assert_eq!(db_max_connections(), DEFAULT_DB_MAX_CONNECTIONS);

        unsafe { std::env::set_var("DB_MAX_CONNECTIONS", "0") };
        assert_eq!(db_max_connections(), DEFAULT_DB_MAX_CONNECTIONS);

        unsafe { std::env::set_var("DB_MAX_CONNECTIONS", "12") };
        assert_eq!(db_max_connections(), 12);

        unsafe { std::env::remove_var("DB_MAX_CONNECTIONS") };
    }
}
