use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chess_core::{GameError, GameStatus, OracleError};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Game '{0}' not found")]
    SessionNotFound(String),

    #[error("{0}")]
    IllegalMove(String),

    #[error("{0}")]
    InvalidPosition(String),

    #[error("Game is over ({0})")]
    GameFinished(GameStatus),

    #[error("It is {0}'s turn to move")]
    NotYourTurn(String),

    #[error("Could not determine a move: {0}")]
    NoMoveDecided(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::SessionNotFound(_) => "session_not_found",
            AppError::IllegalMove(_) => "illegal_move",
            AppError::InvalidPosition(_) => "invalid_position",
            AppError::GameFinished(_) => "game_finished",
            AppError::NotYourTurn(_) => "not_your_turn",
            AppError::NoMoveDecided(_) => "no_move_decided",
            AppError::Internal(_) | AppError::Sqlx(_) | AppError::Anyhow(_) => "internal",
        }
    }

    /// Message safe to show a client. Internal details only go to the log.
    pub fn client_message(&self) -> String {
        match self {
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                "Internal server error".to_string()
            }
            AppError::Sqlx(e) => {
                tracing::error!("Database error: {e}");
                "Database error".to_string()
            }
            AppError::Anyhow(e) => {
                tracing::error!("Unexpected error: {e}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<OracleError> for AppError {
    fn from(e: OracleError) -> Self {
        match e {
            OracleError::InvalidPosition(msg) => AppError::InvalidPosition(msg),
            illegal @ OracleError::IllegalMove { .. } => AppError::IllegalMove(illegal.to_string()),
        }
    }
}

impl From<GameError> for AppError {
    fn from(e: GameError) -> Self {
        match e {
            GameError::Oracle(inner) => inner.into(),
            GameError::GameFinished(status) => AppError::GameFinished(status),
            GameError::InvalidStatus(s) => AppError::Internal(format!("invalid stored status '{s}'")),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) | AppError::IllegalMove(_) | AppError::InvalidPosition(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::GameFinished(_) | AppError::NotYourTurn(_) => StatusCode::CONFLICT,
            AppError::NoMoveDecided(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Internal(_) | AppError::Sqlx(_) | AppError::Anyhow(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (
            status,
            Json(json!({ "detail": self.client_message(), "code": self.code() })),
        )
            .into_response()
    }
}
