use std::sync::Arc;

use server::config;
use server::db;
use server::orchestrator::Orchestrator;
use server::routes;
use server::session::SessionManager;

use anyhow::Context;
use axum::{routing::{get, post}, Extension, Router};
use chess_opponent::{OpponentConfig, Recommender};
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env();
    let opponent_config = OpponentConfig::from_env();

    let recommender = Recommender::from_config(&opponent_config)
        .context("Failed to configure the completion client")?;
    let mut sessions = SessionManager::new(Arc::new(recommender)).with_hint_limit(config.hint_limit);

    // Postgres is optional; without it sessions live in memory only
    match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pool = db::pool::create_pool(url)
                .await
                .context("Failed to connect to database")?;

            tracing::info!("Running migrations...");
            db::pool::run_migrations(&pool)
                .await
                .context("Failed to run migrations")?;
            sessions = sessions.with_pool(pool);
        }
        None => tracing::info!("DATABASE_URL not set - sessions are kept in memory only"),
    }

    let orchestrator = Arc::new(
        Orchestrator::new(Arc::new(sessions)).with_human_color(config.human_color),
    );
    tracing::info!("Human plays {}", config.human_color.as_str());

    // CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        // Health
        .route("/health", get(routes::health::health_check))
        // Games
        .route(
            "/api/games/{game_id}",
            get(routes::games::get_game).post(routes::games::new_game),
        )
        .route("/api/games/{game_id}/move", post(routes::games::make_move))
        .route("/api/games/{game_id}/reply", post(routes::games::reply))
        .route("/api/games/{game_id}/analyze", post(routes::games::analyze))
        .route("/api/games/{game_id}/chat", post(routes::games::chat))
        .route("/api/games/{game_id}/hint", get(routes::games::hint))
        .route("/api/games/{game_id}/pgn", get(routes::games::export_pgn))
        .route("/api/games/{game_id}/import", post(routes::games::import_pgn))
        // Duplex gateway
        .route("/ws/game", get(routes::game_ws::ws_handler))
        // Shared state
        .layer(Extension(orchestrator))
        .layer(cors);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind")?;

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
