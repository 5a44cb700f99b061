//! Turn orchestration: a human move followed by the automated reply, with the
//! guards that keep the automated side from looping.

use std::sync::Arc;

use chess_core::{GameSnapshot, GameState, GameStatus};
use chess_opponent::{AnalysisContext, MoveSource, PromptShape};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::HumanColor;
use crate::error::AppError;
use crate::session::SessionManager;

/// Trailing window of the move record checked for repetition.
const REPETITION_WINDOW: usize = 6;
/// Occurrences inside the window that make a move repetitive.
const REPETITION_LIMIT: usize = 2;

pub const DEADLOCK_REASON: &str = "repetition deadlock";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomatedMove {
    #[serde(rename = "move")]
    pub mv: String,
    pub commentary: String,
    pub source: MoveSource,
    /// True when the recommended move was replaced by the repetition guard or the retry
    pub substituted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOver {
    pub status: GameStatus,
    pub reason: String,
    pub winner: Option<String>,
}

impl GameOver {
    fn from_state(state: &GameState) -> Option<Self> {
        if !state.status().is_terminal() {
            return None;
        }
        Some(Self {
            status: state.status(),
            reason: state
                .end_reason()
                .unwrap_or(state.status().as_str())
                .to_string(),
            winner: state.winner().map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    pub human_move: Option<String>,
    pub reply: Option<AutomatedMove>,
    pub state: GameSnapshot,
    pub game_over: Option<GameOver>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TurnError {
    #[error("no alternative to repeating {mv}")]
    RepetitionDeadlock { mv: String },

    #[error("{0}")]
    NoMoveDecided(String),
}

pub struct Orchestrator {
    sessions: Arc<SessionManager>,
    human_color: HumanColor,
}

impl Orchestrator {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self {
            sessions,
            human_color: HumanColor::White,
        }
    }

    pub fn with_human_color(mut self, color: HumanColor) -> Self {
        self.human_color = color;
        self
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn human_color(&self) -> HumanColor {
        self.human_color
    }

    /// Start a game. When the human plays black the opponent opens.
    pub async fn start_game(&self, game_id: &str) -> Result<TurnOutcome, AppError> {
        let state = self.sessions.new_game(game_id).await?;
        if self.human_color == HumanColor::Black {
            return self.automated_turn(&state.game_id).await;
        }
        Ok(TurnOutcome {
            human_move: None,
            reply: None,
            state,
            game_over: None,
        })
    }

    /// Apply the human's move, then let the opponent answer. The game stays locked
    /// for the whole turn.
    pub async fn play_turn(&self, game_id: &str, mv: &str, fen: Option<&str>) -> Result<TurnOutcome, AppError> {
        let mut game = self.sessions.lock(game_id).await?;
        if game.status().accepts_moves() && !self.human_to_move(&game) {
            return Err(AppError::NotYourTurn(game.turn().to_string()));
        }
        let human_move = self.sessions.apply_move(&mut game, mv, fen)?;
        self.sessions.persist(&game).await;

        if game.status().is_terminal() {
            info!(game_id, status = %game.status(), "game over after human move");
            return Ok(TurnOutcome {
                human_move: Some(human_move),
                reply: None,
                state: game.snapshot(),
                game_over: GameOver::from_state(&game),
            });
        }

        let reply = self.reply(&mut game).await?;
        Ok(TurnOutcome {
            human_move: Some(human_move),
            reply,
            state: game.snapshot(),
            game_over: GameOver::from_state(&game),
        })
    }

    /// Let the opponent move in the current position.
    pub async fn automated_turn(&self, game_id: &str) -> Result<TurnOutcome, AppError> {
        let mut game = self.sessions.lock(game_id).await?;
        if game.status().is_terminal() {
            return Err(AppError::GameFinished(game.status()));
        }
        if self.human_to_move(&game) {
            return Err(AppError::NotYourTurn(game.turn().to_string()));
        }
        let reply = self.reply(&mut game).await?;
        Ok(TurnOutcome {
            human_move: None,
            reply,
            state: game.snapshot(),
            game_over: GameOver::from_state(&game),
        })
    }

    /// Replace a game with one replayed from PGN. If the import leaves the
    /// opponent to move, it answers before the game is unlocked.
    pub async fn import_game(&self, game_id: &str, pgn_text: &str) -> Result<TurnOutcome, AppError> {
        let mut game = self.sessions.import_locked(game_id, pgn_text).await?;
        let reply = if game.status().accepts_moves() && !self.human_to_move(&game) {
            self.reply(&mut game).await?
        } else {
            None
        };
        Ok(TurnOutcome {
            human_move: None,
            reply,
            state: game.snapshot(),
            game_over: GameOver::from_state(&game),
        })
    }

    fn human_to_move(&self, game: &GameState) -> bool {
        game.turn() == self.human_color.as_str()
    }

    /// Decide and apply the automated move. A repetition deadlock ends the game
    /// and yields no move; a failure to decide leaves the game as it was.
    async fn reply(&self, game: &mut GameState) -> Result<Option<AutomatedMove>, AppError> {
        match self.decide(game).await {
            Ok(automated) => {
                self.sessions.persist(game).await;
                Ok(Some(automated))
            }
            Err(TurnError::RepetitionDeadlock { mv }) => {
                warn!(game_id = %game.game_id, mv = %mv, "repetition deadlock, ending game");
                game.force_end(DEADLOCK_REASON);
                self.sessions.persist(game).await;
                Ok(None)
            }
            Err(TurnError::NoMoveDecided(reason)) => {
                warn!(game_id = %game.game_id, reason = %reason, "automated side could not move");
                Err(AppError::NoMoveDecided(reason))
            }
        }
    }

    async fn decide(&self, game: &mut GameState) -> Result<AutomatedMove, TurnError> {
        let legal = game.legal_moves();
        let recommender = self.sessions.recommender();
        let ctx = AnalysisContext::from_state(game, recommender.style());
        let rec = recommender
            .recommend(game.position(), &legal, &ctx, PromptShape::Structured)
            .await;

        let Some(mut candidate) = rec.mv else {
            return Err(TurnError::NoMoveDecided("no legal move was recommended".into()));
        };
        let mut substituted = false;

        if is_repetitive(game.move_record(), &candidate) {
            let alt = alternative(&legal, &candidate)
                .ok_or_else(|| TurnError::RepetitionDeadlock { mv: candidate.clone() })?;
            info!(game_id = %game.game_id, repeated = %candidate, alternative = %alt, "avoiding repetition");
            candidate = alt;
            substituted = true;
        }

        let applied = match game.apply_move(&candidate) {
            Ok(san) => san,
            Err(e) => {
                warn!(game_id = %game.game_id, mv = %candidate, error = %e, "automated move rejected, retrying");
                let retry = alternative(&legal, &candidate)
                    .ok_or_else(|| TurnError::NoMoveDecided(e.to_string()))?;
                substituted = true;
                game.apply_move(&retry)
                    .map_err(|e| TurnError::NoMoveDecided(e.to_string()))?
            }
        };

        info!(game_id = %game.game_id, mv = %applied, source = ?rec.source, substituted, "automated move");
        Ok(AutomatedMove {
            mv: applied,
            commentary: rec.commentary,
            source: rec.source,
            substituted,
        })
    }
}

/// True if `mv` already appears `REPETITION_LIMIT` times in the recent record.
pub fn is_repetitive(record: &[String], mv: &str) -> bool {
    let start = record.len().saturating_sub(REPETITION_WINDOW);
    record[start..].iter().filter(|m| *m == mv).count() >= REPETITION_LIMIT
}

/// First legal move other than `avoid`.
pub fn alternative(legal: &[String], avoid: &str) -> Option<String> {
    legal.iter().find(|m| *m != avoid).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moves(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_repetition_window() {
        let record = moves(&["Nf3", "Nf6", "Ng1", "Ng8", "Nf3", "Nf6", "Ng1", "Ng8"]);
        assert!(is_repetitive(&record, "Ng1"));
        assert!(is_repetitive(&record, "Ng8"));
        // Only one Nf3 left inside the last six
        assert!(!is_repetitive(&record, "Nf3"));
        assert!(!is_repetitive(&[], "e4"));
    }

    #[test]
    fn test_alternative() {
        let legal = moves(&["Kb8", "Ka7"]);
        assert_eq!(alternative(&legal, "Kb8").as_deref(), Some("Ka7"));
        assert_eq!(alternative(&moves(&["Kb8"]), "Kb8"), None);
        assert_eq!(alternative(&[], "Kb8"), None);
    }
}
