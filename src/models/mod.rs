use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered user of the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    /// Games the user already owns; never recommended back to them
    #[serde(default)]
    pub owned_games: Vec<i64>,
}

/// A game in the catalog with its running rating aggregates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Game {
    pub game_id: i64,
    pub name: String,
    /// Arithmetic mean of all ratings; None until the first rating arrives
    pub rating_avg: Option<f64>,
    /// Number of ratings referencing this game
    #[serde(default)]
    pub rating_count: u32,
    pub price: Option<f64>,
}

impl Game {
    pub fn new(game_id: i64, name: String, price: Option<f64>) -> Self {
        Self {
            game_id,
            name,
            rating_avg: None,
            rating_count: 0,
            price,
        }
    }

    /// Folds a new rating into the running mean without rescanning history
    pub fn apply_rating(&mut self, value: f64) {
        let count = self.rating_count as f64;
        let avg = self.rating_avg.unwrap_or(0.0);
        self.rating_avg = Some((avg * count + value) / (count + 1.0));
        self.rating_count += 1;
    }
}

/// An immutable rating fact; the append-only training corpus
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    pub user_id: i64,
    pub game_id: i64,
    pub value: f64,
    pub rated_at: DateTime<Utc>,
}

impl Rating {
    pub fn new(user_id: i64, game_id: i64, value: f64) -> Self {
        Self {
            user_id,
            game_id,
            value,
            rated_at: Utc::now(),
        }
    }
}

/// How a recommendation list was produced
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationMethod {
    /// Too little history for personalization; ranked by average rating
    ColdStart,
    /// Ranked by the latent-factor model's predicted ratings
    CollaborativeFiltering,
    /// Enough history, but no trained model was available
    PopularityFallback,
}

/// A single ranked recommendation entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub game_id: i64,
    pub name: String,
    /// The score the entry was ranked by: a predicted rating for
    /// collaborative results, the average rating otherwise (None when the
    /// game has never been rated)
    pub score: Option<f64>,
    pub method: RecommendationMethod,
    /// The user's rating count at decision time
    pub user_ratings_count: usize,
}

/// Acknowledgment for a submitted rating
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatingAck {
    /// Whether the retrain triggered by this rating produced a model.
    /// The rating itself is durable regardless.
    pub retrain_succeeded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_serializes_snake_case() {
        let json = serde_json::to_string(&RecommendationMethod::ColdStart).unwrap();
        assert_eq!(json, r#""cold_start""#);

        let json = serde_json::to_string(&RecommendationMethod::CollaborativeFiltering).unwrap();
        assert_eq!(json, r#""collaborative_filtering""#);

        let json = serde_json::to_string(&RecommendationMethod::PopularityFallback).unwrap();
        assert_eq!(json, r#""popularity_fallback""#);
    }

    #[test]
    fn test_apply_rating_first_rating() {
        let mut game = Game::new(1, "Portal 2".to_string(), Some(9.99));
        assert_eq!(game.rating_avg, None);
        assert_eq!(game.rating_count, 0);

        game.apply_rating(4.0);
        assert_eq!(game.rating_avg, Some(4.0));
        assert_eq!(game.rating_count, 1);
    }

    #[test]
    fn test_apply_rating_incremental_mean() {
        let mut game = Game::new(1, "Hades".to_string(), None);
        game.apply_rating(4.0);
        game.apply_rating(2.0);

        assert_eq!(game.rating_avg, Some(3.0));
        assert_eq!(game.rating_count, 2);
    }

    #[test]
    fn test_apply_rating_running_mean_many() {
        let mut game = Game::new(1, "Celeste".to_string(), None);
        for value in [5.0, 4.0, 3.0, 4.0] {
            game.apply_rating(value);
        }

        assert_eq!(game.rating_count, 4);
        let avg = game.rating_avg.unwrap();
        assert!((avg - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_recommendation_serializes_null_score() {
        let rec = Recommendation {
            game_id: 7,
            name: "Outer Wilds".to_string(),
            score: None,
            method: RecommendationMethod::ColdStart,
            user_ratings_count: 0,
        };

        let json = serde_json::to_value(&rec).unwrap();
        assert!(json["score"].is_null());
        assert_eq!(json["method"], "cold_start");
        assert_eq!(json["user_ratings_count"], 0);
    }
}
