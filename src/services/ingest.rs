use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{Rating, RatingAck},
    services::lifecycle::ModelLifecycle,
    store::Store,
};

/// Validates and records feedback, then triggers retraining
///
/// The rating write is durable before training starts; a failed retrain is
/// reported on the ack, never as a request failure.
pub struct FeedbackIngestor {
    store: Arc<dyn Store>,
    lifecycle: Arc<ModelLifecycle>,
    scale_min: f64,
    scale_max: f64,
}

impl FeedbackIngestor {
    pub fn new(
        store: Arc<dyn Store>,
        lifecycle: Arc<ModelLifecycle>,
        scale_min: f64,
        scale_max: f64,
    ) -> Self {
        Self {
            store,
            lifecycle,
            scale_min,
            scale_max,
        }
    }

    /// Records one rating and updates the game's running aggregates
    pub async fn submit_rating(
        &self,
        user_id: i64,
        game_id: i64,
        value: f64,
    ) -> AppResult<RatingAck> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        self.store
            .get_game(game_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Game {} not found", game_id)))?;

        if !value.is_finite() || value < self.scale_min || value > self.scale_max {
            return Err(AppError::Validation(format!(
                "Rating {} outside accepted scale {}..={}",
                value, self.scale_min, self.scale_max
            )));
        }

        self.store
            .append_rating(Rating::new(user_id, game_id, value))
            .await?;

        // The store folds the value into the aggregates in one critical
        // section; games are never deleted, so a missing game here means the
        // store itself is inconsistent.
        let game = self
            .store
            .apply_rating(game_id, value)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Game {} vanished mid-rating", game_id)))?;

        tracing::info!(
            user_id,
            game_id,
            value,
            rating_avg = game.rating_avg,
            rating_count = game.rating_count,
            "Rating recorded"
        );

        let retrain_succeeded = self.lifecycle.retrain_and_swap().await;

        Ok(RatingAck { retrain_succeeded })
    }
}
