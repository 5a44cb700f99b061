use std::sync::Arc;

use axum::{extract::Path, extract::Query, Extension, Json};
use chess_core::GameSnapshot;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use crate::commands::Analysis;
use crate::error::AppError;
use crate::orchestrator::{Orchestrator, TurnOutcome};

#[derive(Deserialize)]
pub struct MoveRequest {
    #[serde(rename = "move")]
    pub mv: String,
    pub fen: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct PositionRequest {
    pub fen: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub question: String,
    pub fen: Option<String>,
}

#[derive(Deserialize)]
pub struct ImportRequest {
    pub pgn: String,
}

#[derive(Deserialize)]
pub struct HintQuery {
    pub fen: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct PgnQuery {
    pub white: Option<String>,
    pub black: Option<String>,
}

/// POST /api/games/{game_id}
pub async fn new_game(
    Extension(orchestrator): Extension<Arc<Orchestrator>>,
    Path(game_id): Path<String>,
) -> Result<Json<TurnOutcome>, AppError> {
    Ok(Json(orchestrator.start_game(&game_id).await?))
}

/// GET /api/games/{game_id}
pub async fn get_game(
    Extension(orchestrator): Extension<Arc<Orchestrator>>,
    Path(game_id): Path<String>,
) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(orchestrator.sessions().snapshot(&game_id).await?))
}

/// POST /api/games/{game_id}/move
pub async fn make_move(
    Extension(orchestrator): Extension<Arc<Orchestrator>>,
    Path(game_id): Path<String>,
    Json(body): Json<MoveRequest>,
) -> Result<Json<TurnOutcome>, AppError> {
    let outcome = orchestrator
        .play_turn(&game_id, &body.mv, body.fen.as_deref())
        .await?;
    Ok(Json(outcome))
}

/// POST /api/games/{game_id}/reply
///
/// Asks the opponent to move when it is its turn, e.g. after a failed reply.
pub async fn reply(
    Extension(orchestrator): Extension<Arc<Orchestrator>>,
    Path(game_id): Path<String>,
) -> Result<Json<TurnOutcome>, AppError> {
    Ok(Json(orchestrator.automated_turn(&game_id).await?))
}

/// POST /api/games/{game_id}/analyze
pub async fn analyze(
    Extension(orchestrator): Extension<Arc<Orchestrator>>,
    Path(game_id): Path<String>,
    Json(body): Json<PositionRequest>,
) -> Result<Json<Analysis>, AppError> {
    let analysis = orchestrator
        .sessions()
        .analyze(&game_id, body.fen.as_deref())
        .await?;
    Ok(Json(analysis))
}

/// POST /api/games/{game_id}/chat
pub async fn chat(
    Extension(orchestrator): Extension<Arc<Orchestrator>>,
    Path(game_id): Path<String>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<JsonValue>, AppError> {
    let reply = orchestrator
        .sessions()
        .chat(&game_id, &body.question, body.fen.as_deref())
        .await?;
    Ok(Json(json!({ "gameId": game_id, "reply": reply })))
}

/// GET /api/games/{game_id}/hint
pub async fn hint(
    Extension(orchestrator): Extension<Arc<Orchestrator>>,
    Path(game_id): Path<String>,
    Query(q): Query<HintQuery>,
) -> Result<Json<JsonValue>, AppError> {
    let hints = orchestrator
        .sessions()
        .hint(&game_id, q.fen.as_deref(), q.limit)
        .await?;
    Ok(Json(json!({ "gameId": game_id, "hints": hints })))
}

/// GET /api/games/{game_id}/pgn
pub async fn export_pgn(
    Extension(orchestrator): Extension<Arc<Orchestrator>>,
    Path(game_id): Path<String>,
    Query(q): Query<PgnQuery>,
) -> Result<Json<JsonValue>, AppError> {
    let (white, black) = match orchestrator.human_color() {
        crate::config::HumanColor::White => ("Human", "Opponent"),
        crate::config::HumanColor::Black => ("Opponent", "Human"),
    };
    let pgn = orchestrator
        .sessions()
        .export_pgn(
            &game_id,
            q.white.as_deref().unwrap_or(white),
            q.black.as_deref().unwrap_or(black),
        )
        .await?;
    Ok(Json(json!({ "gameId": game_id, "pgn": pgn })))
}

/// POST /api/games/{game_id}/import
pub async fn import_pgn(
    Extension(orchestrator): Extension<Arc<Orchestrator>>,
    Path(game_id): Path<String>,
    Json(body): Json<ImportRequest>,
) -> Result<Json<TurnOutcome>, AppError> {
    Ok(Json(orchestrator.import_game(&game_id, &body.pgn).await?))
}
