use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::{
    error::AppResult,
    models::{Game, Rating, User},
    store::Store,
};

/// In-memory store used by the binary and by tests
///
/// Users and games live in maps, ratings in an append-only log, all behind
/// a single `RwLock` so aggregate updates and appends stay consistent with
/// each other.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    users: HashMap<i64, User>,
    games: HashMap<i64, Game>,
    ratings: Vec<Rating>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn get_user(&self, user_id: i64) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&user_id).cloned())
    }

    async fn create_user(&self, user: User) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.users.contains_key(&user.user_id) {
            return Ok(false);
        }
        inner.users.insert(user.user_id, user);
        Ok(true)
    }

    async fn update_user(&self, user: User) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&user.user_id) {
            return Ok(false);
        }
        inner.users.insert(user.user_id, user);
        Ok(true)
    }

    async fn get_game(&self, game_id: i64) -> AppResult<Option<Game>> {
        let inner = self.inner.read().await;
        Ok(inner.games.get(&game_id).cloned())
    }

    async fn list_games(&self) -> AppResult<Vec<Game>> {
        let inner = self.inner.read().await;
        Ok(inner.games.values().cloned().collect())
    }

    async fn create_game(&self, game: Game) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.games.contains_key(&game.game_id) {
            return Ok(false);
        }
        inner.games.insert(game.game_id, game);
        Ok(true)
    }

    async fn apply_rating(&self, game_id: i64, value: f64) -> AppResult<Option<Game>> {
        let mut inner = self.inner.write().await;
        Ok(inner.games.get_mut(&game_id).map(|game| {
            game.apply_rating(value);
            game.clone()
        }))
    }

    async fn append_rating(&self, rating: Rating) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.ratings.push(rating);
        Ok(())
    }

    async fn all_ratings(&self) -> AppResult<Vec<Rating>> {
        let inner = self.inner.read().await;
        Ok(inner.ratings.clone())
    }

    async fn count_ratings_for_user(&self, user_id: i64) -> AppResult<usize> {
        let inner = self.inner.read().await;
        Ok(inner.ratings.iter().filter(|r| r.user_id == user_id).count())
    }

    async fn rated_game_ids(&self, user_id: i64) -> AppResult<Vec<i64>> {
        let inner = self.inner.read().await;
        Ok(inner
            .ratings
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.game_id)
            .collect())
    }
}
