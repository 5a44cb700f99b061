//! Closed command surface shared by the CLI, HTTP routes and the gateway.

use chess_core::GameSnapshot;
use chess_opponent::MoveSource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Command {
    New {
        game_id: String,
    },
    Move {
        game_id: String,
        #[serde(rename = "move")]
        mv: String,
        fen: Option<String>,
    },
    Analyze {
        game_id: String,
        fen: Option<String>,
    },
    Chat {
        game_id: String,
        question: String,
        fen: Option<String>,
    },
    Hint {
        game_id: String,
        fen: Option<String>,
        limit: Option<usize>,
    },
}

impl Command {
    pub fn game_id(&self) -> &str {
        match self {
            Command::New { game_id }
            | Command::Move { game_id, .. }
            | Command::Analyze { game_id, .. }
            | Command::Chat { game_id, .. }
            | Command::Hint { game_id, .. } => game_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::New { .. } => "new",
            Command::Move { .. } => "move",
            Command::Analyze { .. } => "analyze",
            Command::Chat { .. } => "chat",
            Command::Hint { .. } => "hint",
        }
    }
}

/// A legal move with a human-readable label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    #[serde(rename = "move")]
    pub mv: String,
    pub label: String,
}

/// Read-only analysis of a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub commentary: String,
    pub recommended_move: Option<String>,
    pub source: MoveSource,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandOutcome {
    State { state: GameSnapshot },
    Analysis { analysis: Analysis },
    Reply { text: String },
    Hints { hints: Vec<Hint> },
}
