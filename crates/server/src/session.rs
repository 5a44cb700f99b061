//! Game session manager: owns every game's authoritative state and runs the
//! command surface against it.

use std::sync::Arc;

use chess_core::oracle::{self, normalize_fen};
use chess_core::{pgn, GameRecord, GameSnapshot, GameState};
use chess_opponent::fallback::DEVELOPMENT_MOVES;
use chess_opponent::{AnalysisContext, PromptShape, Recommender};
use shakmaty::Chess;
use sqlx::PgPool;
use tokio::sync::OwnedMutexGuard;
use tracing::{error, info, warn};

use crate::commands::{Analysis, Command, CommandOutcome, Hint};
use crate::db;
use crate::error::AppError;
use crate::store::{SessionStore, SharedGame};

pub const DEFAULT_HINT_LIMIT: usize = 5;

pub struct SessionManager {
    store: SessionStore,
    recommender: Arc<Recommender>,
    pool: Option<PgPool>,
    hint_limit: usize,
}

impl SessionManager {
    pub fn new(recommender: Arc<Recommender>) -> Self {
        Self {
            store: SessionStore::new(),
            recommender,
            pool: None,
            hint_limit: DEFAULT_HINT_LIMIT,
        }
    }

    /// Write every change through to Postgres and load unknown games from it.
    pub fn with_pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn with_hint_limit(mut self, limit: usize) -> Self {
        self.hint_limit = limit.max(1);
        self
    }

    pub fn recommender(&self) -> &Recommender {
        &self.recommender
    }

    pub async fn execute(&self, command: Command) -> Result<CommandOutcome, AppError> {
        info!(command = command.name(), game_id = command.game_id(), "executing command");
        match command {
            Command::New { game_id } => Ok(CommandOutcome::State {
                state: self.new_game(&game_id).await?,
            }),
            Command::Move { game_id, mv, fen } => Ok(CommandOutcome::State {
                state: self.make_move(&game_id, &mv, fen.as_deref()).await?,
            }),
            Command::Analyze { game_id, fen } => Ok(CommandOutcome::Analysis {
                analysis: self.analyze(&game_id, fen.as_deref()).await?,
            }),
            Command::Chat {
                game_id,
                question,
                fen,
            } => Ok(CommandOutcome::Reply {
                text: self.chat(&game_id, &question, fen.as_deref()).await?,
            }),
            Command::Hint {
                game_id,
                fen,
                limit,
            } => Ok(CommandOutcome::Hints {
                hints: self.hint(&game_id, fen.as_deref(), limit).await?,
            }),
        }
    }

    /// Start a game at the initial position, replacing any game with this id.
    /// Waits for a command already running on that game to finish.
    pub async fn new_game(&self, game_id: &str) -> Result<GameSnapshot, AppError> {
        let game_id = validate_game_id(game_id)?;
        let game = self.store.replace(GameState::new(game_id)).await;
        self.persist(&game).await;
        info!(game_id, "new game");
        Ok(game.snapshot())
    }

    /// Install a game from its persisted form, replacing any game with this id.
    pub async fn restore(&self, record: GameRecord) -> Result<GameSnapshot, AppError> {
        validate_game_id(&record.game_id)?;
        let state = GameState::from_record(record)?;
        Ok(self.store.replace(state).await.snapshot())
    }

    pub async fn import_pgn(&self, game_id: &str, pgn_text: &str) -> Result<GameSnapshot, AppError> {
        Ok(self.import_locked(game_id, pgn_text).await?.snapshot())
    }

    /// Replace a game with one replayed from PGN and keep it locked.
    pub async fn import_locked(
        &self,
        game_id: &str,
        pgn_text: &str,
    ) -> Result<OwnedMutexGuard<GameState>, AppError> {
        let game_id = validate_game_id(game_id)?;
        let state = pgn::import_pgn(game_id, pgn_text)?;
        let game = self.store.replace(state).await;
        self.persist(&game).await;
        info!(game_id, moves = game.move_record().len(), "imported game from PGN");
        Ok(game)
    }

    pub async fn export_pgn(&self, game_id: &str, white: &str, black: &str) -> Result<String, AppError> {
        let game = self.lock(game_id).await?;
        Ok(pgn::export_pgn(&game, white, black))
    }

    pub async fn contains(&self, game_id: &str) -> bool {
        self.store.contains(game_id).await
    }

    async fn find(&self, game_id: &str) -> Result<SharedGame, AppError> {
        if let Some(game) = self.store.get(game_id).await {
            return Ok(game);
        }
        if let Some(pool) = &self.pool {
            if let Some(record) = db::games::load_game(pool, game_id).await? {
                let state = GameState::from_record(record)?;
                info!(game_id, "restored game from database");
                return Ok(self.store.get_or_insert(state).await);
            }
        }
        Err(AppError::SessionNotFound(game_id.to_string()))
    }

    /// Exclusive access to one game. Held for the whole of a command.
    pub async fn lock(&self, game_id: &str) -> Result<OwnedMutexGuard<GameState>, AppError> {
        Ok(self.find(game_id).await?.lock_owned().await)
    }

    /// Write-through to the database. Memory stays authoritative if this fails.
    pub async fn persist(&self, state: &GameState) {
        if let Some(pool) = &self.pool {
            if let Err(e) = db::games::save_game(pool, &state.to_record()).await {
                error!(game_id = %state.game_id, error = %e, "failed to persist game");
            }
        }
    }

    /// Validate and apply a move on a game the caller has locked.
    /// `fen` is the client's view of the position and only advisory.
    pub fn apply_move(&self, game: &mut GameState, mv: &str, fen: Option<&str>) -> Result<String, AppError> {
        if let Some(fen) = fen {
            if normalize_fen(fen) != normalize_fen(&game.fen()) {
                warn!(game_id = %game.game_id, client_fen = fen, "client position is stale, using session position");
            }
        }
        let san = game.apply_move(mv)?;
        info!(game_id = %game.game_id, mv = %san, status = %game.status(), "move applied");
        Ok(san)
    }

    pub async fn make_move(&self, game_id: &str, mv: &str, fen: Option<&str>) -> Result<GameSnapshot, AppError> {
        let mut game = self.lock(game_id).await?;
        self.apply_move(&mut game, mv, fen)?;
        self.persist(&game).await;
        Ok(game.snapshot())
    }

    pub async fn snapshot(&self, game_id: &str) -> Result<GameSnapshot, AppError> {
        Ok(self.lock(game_id).await?.snapshot())
    }

    /// Position to inspect for a read-only command, with the moves that led to it.
    fn inspect(game: &GameState, fen: Option<&str>) -> Result<(Chess, Vec<String>), AppError> {
        match fen {
            Some(fen) if normalize_fen(fen) != normalize_fen(&game.fen()) => {
                Ok((oracle::parse_fen(fen)?, Vec::new()))
            }
            _ => Ok((game.position().clone(), game.move_record().to_vec())),
        }
    }

    pub async fn analyze(&self, game_id: &str, fen: Option<&str>) -> Result<Analysis, AppError> {
        let game = self.lock(game_id).await?;
        let (pos, history) = Self::inspect(&game, fen)?;
        let legal = oracle::legal_moves(&pos);
        let ctx = AnalysisContext::for_position(&pos, &history, self.recommender.style());
        let rec = self
            .recommender
            .recommend(&pos, &legal, &ctx, PromptShape::Analyze)
            .await;
        Ok(Analysis {
            commentary: rec.commentary,
            recommended_move: rec.mv,
            source: rec.source,
        })
    }

    pub async fn chat(&self, game_id: &str, question: &str, fen: Option<&str>) -> Result<String, AppError> {
        if question.trim().is_empty() {
            return Err(AppError::BadRequest("question must not be empty".into()));
        }
        let game = self.lock(game_id).await?;
        let (pos, history) = Self::inspect(&game, fen)?;
        let legal = oracle::legal_moves(&pos);
        let ctx = AnalysisContext::for_position(&pos, &history, self.recommender.style())
            .with_question(question.trim());
        Ok(self.recommender.chat(&pos, &legal, &ctx).await)
    }

    /// Up to `limit` legal moves, development moves first.
    pub async fn hint(&self, game_id: &str, fen: Option<&str>, limit: Option<usize>) -> Result<Vec<Hint>, AppError> {
        let game = self.lock(game_id).await?;
        if game.status().is_terminal() {
            return Ok(Vec::new());
        }
        let (pos, _) = Self::inspect(&game, fen)?;
        let limit = limit.unwrap_or(self.hint_limit).max(1);

        let mut labelled = oracle::labelled_moves(&pos);
        labelled.sort_by_key(|(san, _)| {
            DEVELOPMENT_MOVES
                .iter()
                .position(|m| m == san)
                .unwrap_or(DEVELOPMENT_MOVES.len())
        });

        Ok(labelled
            .into_iter()
            .take(limit)
            .map(|(mv, label)| Hint { mv, label })
            .collect())
    }
}

fn validate_game_id(game_id: &str) -> Result<&str, AppError> {
    let trimmed = game_id.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest("gameId must not be empty".into()));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chess_core::GameStatus;
    use chess_opponent::OfflineCompletion;

    fn manager() -> SessionManager {
        let recommender = Recommender::new(Arc::new(OfflineCompletion), Duration::from_secs(1));
        SessionManager::new(Arc::new(recommender))
    }

    #[tokio::test]
    async fn test_new_game_and_move() {
        let sessions = manager();
        let state = sessions.new_game("g1").await.unwrap();
        assert_eq!(state.status, GameStatus::Ongoing);
        assert_eq!(state.legal_moves.len(), 20);

        let state = sessions.make_move("g1", "e4", None).await.unwrap();
        assert_eq!(state.turn, "black");
        assert_eq!(state.move_record, vec!["e4"]);
    }

    #[tokio::test]
    async fn test_unknown_game_is_not_created() {
        let sessions = manager();
        let err = sessions.make_move("missing", "e4", None).await.unwrap_err();
        assert!(matches!(err, AppError::SessionNotFound(_)));
        assert!(!sessions.contains("missing").await);
    }

    #[tokio::test]
    async fn test_illegal_move_is_rejected() {
        let sessions = manager();
        sessions.new_game("g1").await.unwrap();
        let err = sessions.make_move("g1", "Ke2", None).await.unwrap_err();
        assert_eq!(err.code(), "illegal_move");
        assert!(sessions.snapshot("g1").await.unwrap().move_record.is_empty());
    }

    #[tokio::test]
    async fn test_empty_game_id() {
        let err = manager().new_game("  ").await.unwrap_err();
        assert_eq!(err.code(), "bad_request");
    }

    #[tokio::test]
    async fn test_hint_orders_development_moves_first() {
        let sessions = manager();
        sessions.new_game("g1").await.unwrap();
        let hints = sessions.hint("g1", None, Some(3)).await.unwrap();
        let moves: Vec<_> = hints.iter().map(|h| h.mv.as_str()).collect();
        assert_eq!(moves, vec!["e4", "d4", "Nf3"]);
        assert_eq!(hints[0].label, "Pawn to e4");
    }

    #[tokio::test]
    async fn test_analyze_offline_uses_default_move() {
        let sessions = manager();
        sessions.new_game("g1").await.unwrap();
        let analysis = sessions.analyze("g1", None).await.unwrap();
        assert_eq!(analysis.recommended_move.as_deref(), Some("e4"));
    }

    #[tokio::test]
    async fn test_inspect_rejects_bad_fen() {
        let sessions = manager();
        sessions.new_game("g1").await.unwrap();
        let err = sessions.analyze("g1", Some("not a fen")).await.unwrap_err();
        assert_eq!(err.code(), "invalid_position");
    }

    #[tokio::test]
    async fn test_chat_requires_question() {
        let sessions = manager();
        sessions.new_game("g1").await.unwrap();
        let err = sessions.chat("g1", " ", None).await.unwrap_err();
        assert_eq!(err.code(), "bad_request");
    }

    #[tokio::test]
    async fn test_execute_dispatches() {
        let sessions = manager();
        sessions
            .execute(Command::New { game_id: "g1".into() })
            .await
            .unwrap();
        let outcome = sessions
            .execute(Command::Move {
                game_id: "g1".into(),
                mv: "d2d4".into(),
                fen: None,
            })
            .await
            .unwrap();
        match outcome {
            CommandOutcome::State { state } => assert_eq!(state.move_record, vec!["d4"]),
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
