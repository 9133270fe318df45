use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{Game, Recommendation, RecommendationMethod},
    services::lifecycle::ModelLifecycle,
    store::Store,
};

/// Per-user strategy selection and ranking
///
/// Read-only: resolves the user, picks cold-start vs. collaborative per
/// call, excludes owned and already-rated games, and returns a bounded,
/// deterministically ordered page. Model unavailability is never an error
/// here; the engine degrades to popularity ranking.
pub struct RecommendationEngine {
    store: Arc<dyn Store>,
    lifecycle: Arc<ModelLifecycle>,
    page_size: usize,
    cold_start_threshold: usize,
}

impl RecommendationEngine {
    pub fn new(
        store: Arc<dyn Store>,
        lifecycle: Arc<ModelLifecycle>,
        page_size: usize,
        cold_start_threshold: usize,
    ) -> Self {
        Self {
            store,
            lifecycle,
            page_size,
            cold_start_threshold,
        }
    }

    /// Produces at most `page_size` ranked recommendations for a user
    pub async fn recommend(&self, user_id: i64) -> AppResult<Vec<Recommendation>> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        let rating_count = self.store.count_ratings_for_user(user_id).await?;

        // Owned and already-rated games are unioned into one exclusion set
        let mut excluded: HashSet<i64> = user.owned_games.iter().copied().collect();
        excluded.extend(self.store.rated_game_ids(user_id).await?);

        let candidates: Vec<Game> = self
            .store
            .list_games()
            .await?
            .into_iter()
            .filter(|g| !excluded.contains(&g.game_id))
            .collect();

        let (method, mut ranked) = if rating_count < self.cold_start_threshold {
            (
                RecommendationMethod::ColdStart,
                rank_by_popularity(candidates),
            )
        } else if let Some(model) = self.lifecycle.current().await {
            let mut scored: Vec<(Game, f64)> = candidates
                .into_iter()
                .map(|game| {
                    let estimate = model.predict(user_id, game.game_id);
                    (game, estimate)
                })
                .collect();
            scored.sort_by(|a, b| {
                b.1.partial_cmp(&a.1)
                    .unwrap_or(Ordering::Equal)
                    .then(a.0.game_id.cmp(&b.0.game_id))
            });
            (
                RecommendationMethod::CollaborativeFiltering,
                scored
                    .into_iter()
                    .map(|(game, estimate)| (game, Some(estimate)))
                    .collect(),
            )
        } else {
            // Enough history but no model: same ranking as cold start, the
            // tag tells the caller why personalization was skipped
            (
                RecommendationMethod::PopularityFallback,
                rank_by_popularity(candidates),
            )
        };

        ranked.truncate(self.page_size);

        tracing::info!(
            user_id,
            rating_count,
            method = ?method,
            returned = ranked.len(),
            "Serving recommendations"
        );

        Ok(ranked
            .into_iter()
            .map(|(game, score)| Recommendation {
                game_id: game.game_id,
                name: game.name,
                score,
                method,
                user_ratings_count: rating_count,
            })
            .collect())
    }
}

/// Average rating descending, unrated games last, ties by ascending id
fn rank_by_popularity(mut candidates: Vec<Game>) -> Vec<(Game, Option<f64>)> {
    candidates.sort_by(|a, b| match (a.rating_avg, b.rating_avg) {
        (Some(x), Some(y)) => y
            .partial_cmp(&x)
            .unwrap_or(Ordering::Equal)
            .then(a.game_id.cmp(&b.game_id)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.game_id.cmp(&b.game_id),
    });
    candidates
        .into_iter()
        .map(|game| {
            let score = game.rating_avg;
            (game, score)
        })
        .collect()
}
