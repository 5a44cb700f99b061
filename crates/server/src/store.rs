//! In-memory session store: `game_id -> GameState`.
//!
//! The map lock is only held for lookup and insertion. Each game sits behind its
//! own mutex, which serializes every command for that game (including the time
//! spent waiting on the completion service) while leaving other games free. A
//! game id keeps the same mutex for the life of the process.

use std::collections::HashMap;
use std::sync::Arc;

use chess_core::GameState;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

pub type SharedGame = Arc<Mutex<GameState>>;

#[derive(Default)]
pub struct SessionStore {
    games: RwLock<HashMap<String, SharedGame>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, game_id: &str) -> Option<SharedGame> {
        self.games.read().await.get(game_id).cloned()
    }

    /// Install `state` under its id and return it locked. An existing game is
    /// overwritten in place once the command holding it has finished.
    pub async fn replace(&self, state: GameState) -> OwnedMutexGuard<GameState> {
        let existing = {
            let mut games = self.games.write().await;
            match games.get(&state.game_id).cloned() {
                Some(game) => game,
                None => {
                    let game_id = state.game_id.clone();
                    let shared = Arc::new(Mutex::new(state));
                    games.insert(game_id, shared.clone());
                    // Nobody else can hold the fresh mutex yet
                    return shared.lock_owned().await;
                }
            }
        };
        let mut guard = existing.lock_owned().await;
        *guard = state;
        guard
    }

    /// Insert only if absent; returns whichever game ends up stored.
    pub async fn get_or_insert(&self, state: GameState) -> SharedGame {
        let mut games = self.games.write().await;
        games
            .entry(state.game_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(state)))
            .clone()
    }

    pub async fn contains(&self, game_id: &str) -> bool {
        self.games.read().await.contains_key(game_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replace_overwrites_in_place() {
        let store = SessionStore::new();
        drop(store.replace(GameState::from_moves("g1", &["e4"]).unwrap()).await);
        let before = store.get("g1").await.unwrap();

        drop(store.replace(GameState::new("g1")).await);
        let after = store.get("g1").await.unwrap();

        assert!(Arc::ptr_eq(&before, &after));
        assert!(after.lock().await.move_record().is_empty());
    }

    #[tokio::test]
    async fn test_replace_waits_for_holder() {
        let store = Arc::new(SessionStore::new());
        drop(store.replace(GameState::new("g1")).await);

        let mut held = store.get("g1").await.unwrap().lock_owned().await;
        let replacing = {
            let store = store.clone();
            tokio::spawn(async move {
                let game = store.replace(GameState::new("g1")).await;
                game.move_record().len()
            })
        };
        tokio::task::yield_now().await;
        assert!(!replacing.is_finished());

        held.apply_move("d4").unwrap();
        drop(held);
        assert_eq!(replacing.await.unwrap(), 0);
        assert!(store.get("g1").await.unwrap().lock().await.move_record().is_empty());
    }

    #[tokio::test]
    async fn test_get_or_insert_keeps_existing() {
        let store = SessionStore::new();
        drop(store.replace(GameState::from_moves("g1", &["d4"]).unwrap()).await);
        let kept = store.get_or_insert(GameState::new("g1")).await;
        assert_eq!(kept.lock().await.move_record(), &["d4"]);
        assert!(store.contains("g1").await);
        assert!(!store.contains("g2").await);
    }
}
