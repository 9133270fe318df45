use crate::{
    error::AppResult,
    models::{Game, Rating, User},
};

pub mod memory;

pub use memory::MemoryStore;

/// Durable catalog and rating log abstraction
///
/// The recommendation core only touches users, games and ratings through
/// this contract, so the backing store can be swapped without touching the
/// engine. Absence is reported as `Ok(None)` (or an empty collection), never
/// as an error; callers translate absence into their own `NotFound`.
///
/// Ratings are append-only facts: there is no update or delete operation,
/// by contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Look up a user by id
    async fn get_user(&self, user_id: i64) -> AppResult<Option<User>>;

    /// Insert a new user; returns false when the id is already taken
    async fn create_user(&self, user: User) -> AppResult<bool>;

    /// Replace an existing user's mutable fields; returns false when absent
    async fn update_user(&self, user: User) -> AppResult<bool>;

    /// Look up a game by id
    async fn get_game(&self, game_id: i64) -> AppResult<Option<Game>>;

    /// All games in the catalog
    async fn list_games(&self) -> AppResult<Vec<Game>>;

    /// Insert a new game; returns false when the id is already taken
    async fn create_game(&self, game: Game) -> AppResult<bool>;

    /// Fold a new rating value into a game's running aggregates
    ///
    /// The read-modify-write happens inside the store's critical section,
    /// so concurrent ratings for the same game never lose an update.
    /// Returns the updated game, or `None` when the game does not exist.
    async fn apply_rating(&self, game_id: i64, value: f64) -> AppResult<Option<Game>>;

    /// Append an immutable rating fact
    async fn append_rating(&self, rating: Rating) -> AppResult<()>;

    /// Full rating log, in append order
    async fn all_ratings(&self) -> AppResult<Vec<Rating>>;

    /// Number of ratings authored by a user
    async fn count_ratings_for_user(&self, user_id: i64) -> AppResult<usize>;

    /// Ids of games the user has already rated
    async fn rated_game_ids(&self, user_id: i64) -> AppResult<Vec<i64>>;
}
