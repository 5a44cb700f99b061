pub mod game_ws;
pub mod games;
pub mod health;
