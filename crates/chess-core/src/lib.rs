pub mod error;
pub mod game_data;
pub mod oracle;
pub mod pgn;

pub use error::{GameError, OracleError};
pub use game_data::{GameRecord, GameSnapshot, GameState, GameStatus};
