//! Error types for board and game state operations

use thiserror::Error;

use crate::game_data::GameStatus;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("{0}")]
    InvalidPosition(String),

    #[error("Illegal move '{mv}': {reason}")]
    IllegalMove { mv: String, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("Game is over ({0})")]
    GameFinished(GameStatus),

    #[error("Invalid status '{0}'")]
    InvalidStatus(String),
}
