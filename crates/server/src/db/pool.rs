use sqlx::postgres::{PgPool, PgPoolOptions};

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Run the Postgres schema migration inline.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- One row per game session, keyed by the client-chosen game id
CREATE TABLE IF NOT EXISTS game_sessions (
    game_id          TEXT PRIMARY KEY,
    fen              TEXT NOT NULL,
    move_record      JSONB NOT NULL DEFAULT '[]'::jsonb,
    position_history JSONB NOT NULL DEFAULT '[]'::jsonb,
    status           TEXT NOT NULL,
    end_reason       TEXT,
    created_at       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at       TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_game_sessions_status
    ON game_sessions (status);
"#;
