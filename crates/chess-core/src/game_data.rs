use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shakmaty::Chess;

use crate::error::{GameError, OracleError};
use crate::oracle::{self, TerminalState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    New,
    Ongoing,
    Checkmate,
    Stalemate,
    Draw,
    Ended,
}

impl GameStatus {
    pub fn is_terminal(&self) -> bool {
        !self.accepts_moves()
    }

    pub fn accepts_moves(&self) -> bool {
        matches!(self, GameStatus::New | GameStatus::Ongoing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::New => "new",
            GameStatus::Ongoing => "ongoing",
            GameStatus::Checkmate => "checkmate",
            GameStatus::Stalemate => "stalemate",
            GameStatus::Draw => "draw",
            GameStatus::Ended => "ended",
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameStatus {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(GameStatus::New),
            "ongoing" => Ok(GameStatus::Ongoing),
            "checkmate" => Ok(GameStatus::Checkmate),
            "stalemate" => Ok(GameStatus::Stalemate),
            "draw" => Ok(GameStatus::Draw),
            "ended" => Ok(GameStatus::Ended),
            other => Err(GameError::InvalidStatus(other.to_string())),
        }
    }
}

/// Authoritative state of one game.
#[derive(Debug, Clone)]
pub struct GameState {
    pub game_id: String,
    position: Chess,
    move_record: Vec<String>,
    /// Repetition keys of every position reached, starting position included
    position_history: Vec<String>,
    status: GameStatus,
    in_check: bool,
    end_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persisted form of a game, one per `game_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: String,
    pub fen: String,
    pub move_record: Vec<String>,
    pub position_history: Vec<String>,
    pub status: GameStatus,
    pub end_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Wire view of a game sent to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub game_id: String,
    pub fen: String,
    pub turn: String,
    pub move_record: Vec<String>,
    pub legal_moves: Vec<String>,
    pub status: GameStatus,
    pub in_check: bool,
    pub end_reason: Option<String>,
}

impl GameState {
    /// Fresh game at the starting position, ready for moves.
    pub fn new(game_id: impl Into<String>) -> Self {
        let position = Chess::default();
        let now = Utc::now();
        Self {
            game_id: game_id.into(),
            position_history: vec![oracle::position_key(&position)],
            position,
            move_record: Vec::new(),
            status: GameStatus::Ongoing,
            in_check: false,
            end_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replay a move list from the starting position.
    pub fn from_moves<S: AsRef<str>>(game_id: impl Into<String>, moves: &[S]) -> Result<Self, GameError> {
        let mut state = Self::new(game_id);
        for mv in moves {
            state.apply_move(mv.as_ref())?;
        }
        Ok(state)
    }

    pub fn position(&self) -> &Chess {
        &self.position
    }

    pub fn fen(&self) -> String {
        oracle::to_fen(&self.position)
    }

    pub fn turn(&self) -> &'static str {
        oracle::turn_name(&self.position)
    }

    pub fn move_record(&self) -> &[String] {
        &self.move_record
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn in_check(&self) -> bool {
        self.in_check
    }

    pub fn end_reason(&self) -> Option<&str> {
        self.end_reason.as_deref()
    }

    /// Recomputed from the position on every call.
    pub fn legal_moves(&self) -> Vec<String> {
        oracle::legal_moves(&self.position)
    }

    /// Validate and apply a move. Returns the SAN that was recorded.
    /// On any error the state is left untouched.
    pub fn apply_move(&mut self, text: &str) -> Result<String, GameError> {
        if !self.status.accepts_moves() {
            return Err(GameError::GameFinished(self.status));
        }

        let (next, san) = oracle::play(&self.position, text)?;

        self.position = next;
        self.move_record.push(san.clone());
        self.position_history.push(oracle::position_key(&self.position));
        self.refresh_status();
        self.updated_at = Utc::now();
        Ok(san)
    }

    fn refresh_status(&mut self) {
        self.in_check = false;
        match oracle::terminal_state(&self.position, &self.position_history) {
            TerminalState::Checkmate => {
                self.in_check = true;
                self.finish(GameStatus::Checkmate, "checkmate");
            }
            TerminalState::Stalemate => self.finish(GameStatus::Stalemate, "stalemate"),
            TerminalState::Draw(reason) => self.finish(GameStatus::Draw, reason.as_str()),
            TerminalState::Check => {
                self.in_check = true;
                self.status = GameStatus::Ongoing;
            }
            TerminalState::Ongoing => self.status = GameStatus::Ongoing,
        }
    }

    fn finish(&mut self, status: GameStatus, reason: &str) {
        self.status = status;
        self.end_reason = Some(reason.to_string());
    }

    /// Stop a game outside the rules of chess. No-op on a finished game.
    pub fn force_end(&mut self, reason: &str) {
        if self.status.is_terminal() {
            return;
        }
        self.finish(GameStatus::Ended, reason);
        self.updated_at = Utc::now();
    }

    /// Side that delivered mate, if the game ended in checkmate.
    pub fn winner(&self) -> Option<&'static str> {
        if self.status != GameStatus::Checkmate {
            return None;
        }
        // The side to move is the side that got mated
        match self.turn() {
            "white" => Some("black"),
            _ => Some("white"),
        }
    }

    pub fn to_record(&self) -> GameRecord {
        GameRecord {
            game_id: self.game_id.clone(),
            fen: self.fen(),
            move_record: self.move_record.clone(),
            position_history: self.position_history.clone(),
            status: self.status,
            end_reason: self.end_reason.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn from_record(record: GameRecord) -> Result<Self, OracleError> {
        let position = oracle::parse_fen(&record.fen)?;
        let position_history = if record.position_history.is_empty() {
            vec![oracle::position_key(&position)]
        } else {
            record.position_history
        };
        let in_check = shakmaty::Position::is_check(&position);
        Ok(Self {
            game_id: record.game_id,
            position,
            move_record: record.move_record,
            position_history,
            status: record.status,
            in_check,
            end_reason: record.end_reason,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            game_id: self.game_id.clone(),
            fen: self.fen(),
            turn: self.turn().to_string(),
            move_record: self.move_record.clone(),
            legal_moves: if self.status.accepts_moves() {
                self.legal_moves()
            } else {
                Vec::new()
            },
            status: self.status,
            in_check: self.in_check,
            end_reason: self.end_reason.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_game() {
        let game = GameState::new("g1");
        assert_eq!(game.status(), GameStatus::Ongoing);
        assert!(game.move_record().is_empty());
        assert_eq!(game.legal_moves().len(), 20);
        assert_eq!(game.turn(), "white");
    }

    #[test]
    fn test_illegal_move_leaves_state_untouched() {
        let mut game = GameState::new("g1");
        let before = game.fen();
        assert!(matches!(game.apply_move("e5"), Err(GameError::Oracle(_))));
        assert_eq!(game.fen(), before);
        assert!(game.move_record().is_empty());
    }

    #[test]
    fn test_checkmate_is_terminal() {
        let mut game = GameState::from_moves("g1", &["f3", "e5", "g4"]).unwrap();
        assert_eq!(game.apply_move("Qh4#").unwrap(), "Qh4");
        assert_eq!(game.status(), GameStatus::Checkmate);
        assert_eq!(game.winner(), Some("black"));
        assert!(game.in_check());
        assert!(matches!(
            game.apply_move("a3"),
            Err(GameError::GameFinished(GameStatus::Checkmate))
        ));
        assert!(game.snapshot().legal_moves.is_empty());
    }

    #[test]
    fn test_threefold_repetition_draw() {
        let shuffle = ["Nf3", "Nf6", "Ng1", "Ng8", "Nf3", "Nf6", "Ng1", "Ng8"];
        let game = GameState::from_moves("g1", &shuffle).unwrap();
        assert_eq!(game.status(), GameStatus::Draw);
        assert_eq!(game.end_reason(), Some("threefold repetition"));
    }

    #[test]
    fn test_force_end_does_not_override_terminal() {
        let mut game = GameState::from_moves("g1", &["f3", "e5", "g4", "Qh4"]).unwrap();
        game.force_end("repetition deadlock");
        assert_eq!(game.status(), GameStatus::Checkmate);

        let mut live = GameState::new("g2");
        live.force_end("repetition deadlock");
        assert_eq!(live.status(), GameStatus::Ended);
        assert_eq!(live.end_reason(), Some("repetition deadlock"));
    }

    #[test]
    fn test_record_round_trip() {
        let game = GameState::from_moves("g1", &["e4", "c5", "Nf3", "d6", "d4"]).unwrap();
        let json = serde_json::to_string(&game.to_record()).unwrap();
        let record: GameRecord = serde_json::from_str(&json).unwrap();
        let restored = GameState::from_record(record).unwrap();

        assert_eq!(restored.fen(), game.fen());
        assert_eq!(restored.move_record(), game.move_record());
        assert_eq!(restored.legal_moves(), game.legal_moves());
        assert_eq!(restored.status(), game.status());
    }

    #[test]
    fn test_status_strings() {
        assert_eq!("stalemate".parse::<GameStatus>().unwrap(), GameStatus::Stalemate);
        assert!("resigned".parse::<GameStatus>().is_err());
        assert_eq!(serde_json::to_string(&GameStatus::Ongoing).unwrap(), "\"ongoing\"");
    }
}
