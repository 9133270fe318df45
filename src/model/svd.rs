use std::collections::HashMap;

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Rating;

/// Error types for model training
#[derive(Debug, Error)]
pub enum TrainError {
    #[error(
        "insufficient data: {ratings} ratings over {users} users and {games} games \
         (need at least {min_users} users and {min_games} games)"
    )]
    InsufficientData {
        ratings: usize,
        users: usize,
        games: usize,
        min_users: usize,
        min_games: usize,
    },
    #[error("corpus of {ratings} ratings cannot be split into train and test sets")]
    UnsplittableCorpus { ratings: usize },
}

/// Hyperparameters for SVD training
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvdParams {
    /// Number of latent factors per user/game vector
    pub factors: usize,
    /// SGD passes over the corpus
    pub epochs: usize,
    pub learning_rate: f64,
    pub regularization: f64,
    /// Seed for factor initialization; fixed so retrains are reproducible
    pub seed: u64,
}

impl Default for SvdParams {
    fn default() -> Self {
        Self {
            factors: 20,
            epochs: 20,
            learning_rate: 0.005,
            regularization: 0.02,
            seed: 42,
        }
    }
}

/// Minimum distinct users and games a corpus must contain before a
/// factorization has anything to factor
const MIN_DISTINCT_USERS: usize = 2;
const MIN_DISTINCT_GAMES: usize = 2;

/// Biased matrix factorization trained by stochastic gradient descent
///
/// Estimates a rating as `μ + b_u + b_i + p_u · q_i`. The rating scale is
/// learned from the corpus at training time and every prediction is clamped
/// to it. A trained model is an immutable snapshot: retraining always builds
/// a fresh one from the full corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvdModel {
    global_mean: f64,
    scale_min: f64,
    scale_max: f64,
    user_index: HashMap<i64, usize>,
    game_index: HashMap<i64, usize>,
    user_bias: Vec<f64>,
    game_bias: Vec<f64>,
    user_factors: Vec<Vec<f64>>,
    game_factors: Vec<Vec<f64>>,
}

impl SvdModel {
    /// Trains a model from the full rating corpus
    ///
    /// Pure function of the corpus snapshot: no incremental update path
    /// exists. Fails with `InsufficientData` when the corpus is too small
    /// to support a factorization.
    pub fn train(corpus: &[Rating], params: &SvdParams) -> Result<Self, TrainError> {
        let mut user_index: HashMap<i64, usize> = HashMap::new();
        let mut game_index: HashMap<i64, usize> = HashMap::new();

        for rating in corpus {
            let next = user_index.len();
            user_index.entry(rating.user_id).or_insert(next);
            let next = game_index.len();
            game_index.entry(rating.game_id).or_insert(next);
        }

        if corpus.is_empty()
            || user_index.len() < MIN_DISTINCT_USERS
            || game_index.len() < MIN_DISTINCT_GAMES
        {
            return Err(TrainError::InsufficientData {
                ratings: corpus.len(),
                users: user_index.len(),
                games: game_index.len(),
                min_users: MIN_DISTINCT_USERS,
                min_games: MIN_DISTINCT_GAMES,
            });
        }

        // Scale bounds come from the observed corpus, not a hard-coded range
        let mut scale_min = f64::INFINITY;
        let mut scale_max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for rating in corpus {
            scale_min = scale_min.min(rating.value);
            scale_max = scale_max.max(rating.value);
            sum += rating.value;
        }
        let global_mean = sum / corpus.len() as f64;

        let num_users = user_index.len();
        let num_games = game_index.len();
        let k = params.factors;

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut init = |rows: usize| -> Vec<Vec<f64>> {
            (0..rows)
                .map(|_| (0..k).map(|_| rng.gen_range(-0.1..0.1)).collect())
                .collect()
        };
        let mut user_factors = init(num_users);
        let mut game_factors = init(num_games);
        let mut user_bias = vec![0.0; num_users];
        let mut game_bias = vec![0.0; num_games];

        let lr = params.learning_rate;
        let reg = params.regularization;

        for _ in 0..params.epochs {
            for rating in corpus {
                let u = user_index[&rating.user_id];
                let g = game_index[&rating.game_id];

                let dot: f64 = user_factors[u]
                    .iter()
                    .zip(game_factors[g].iter())
                    .map(|(p, q)| p * q)
                    .sum();
                let predicted = global_mean + user_bias[u] + game_bias[g] + dot;
                let err = rating.value - predicted;

                user_bias[u] += lr * (err - reg * user_bias[u]);
                game_bias[g] += lr * (err - reg * game_bias[g]);

                for f in 0..k {
                    let p = user_factors[u][f];
                    let q = game_factors[g][f];
                    user_factors[u][f] += lr * (err * q - reg * p);
                    game_factors[g][f] += lr * (err * p - reg * q);
                }
            }
        }

        Ok(Self {
            global_mean,
            scale_min,
            scale_max,
            user_index,
            game_index,
            user_bias,
            game_bias,
            user_factors,
            game_factors,
        })
    }

    /// Estimates the rating a user would give a game
    ///
    /// Total over all inputs: a user or game unseen at training time simply
    /// contributes no bias or factor term, so the estimate degrades to the
    /// global mean plus whatever is known. Results are clamped to the scale
    /// observed at training time.
    pub fn predict(&self, user_id: i64, game_id: i64) -> f64 {
        let user = self.user_index.get(&user_id);
        let game = self.game_index.get(&game_id);

        let mut estimate = self.global_mean;
        if let Some(&u) = user {
            estimate += self.user_bias[u];
        }
        if let Some(&g) = game {
            estimate += self.game_bias[g];
        }
        if let (Some(&u), Some(&g)) = (user, game) {
            estimate += self.user_factors[u]
                .iter()
                .zip(self.game_factors[g].iter())
                .map(|(p, q)| p * q)
                .sum::<f64>();
        }

        estimate.clamp(self.scale_min, self.scale_max)
    }

    /// Number of distinct users seen at training time
    pub fn num_users(&self) -> usize {
        self.user_index.len()
    }

    /// Number of distinct games seen at training time
    pub fn num_games(&self) -> usize {
        self.game_index.len()
    }
}
