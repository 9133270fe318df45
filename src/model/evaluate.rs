use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::Serialize;

use crate::model::{SvdModel, SvdParams, TrainError};
use crate::models::Rating;

/// Settings for an offline evaluation run
#[derive(Debug, Clone)]
pub struct EvalParams {
    /// Share of the corpus held out as the test set
    pub test_fraction: f64,
    /// Recommendation list depth for the ranking metrics
    pub k: usize,
    /// True ratings at or above this value count as relevant
    pub relevance_threshold: f64,
    /// Seed for the train/test shuffle; fixed so runs are reproducible
    pub seed: u64,
}

impl Default for EvalParams {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            k: 10,
            relevance_threshold: 3.5,
            seed: 42,
        }
    }
}

/// Quality metrics for one model trained on a held-out split
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvalReport {
    pub train_size: usize,
    pub test_size: usize,
    pub rmse: f64,
    pub mae: f64,
    /// Mean share of the top-k that the user actually found relevant
    pub precision_at_k: f64,
    /// Mean share of a user's relevant items that made the top-k
    pub recall_at_k: f64,
    /// Distinct games recommended above the threshold, over the catalog
    pub coverage: f64,
}

/// Measures model quality on a seeded train/test split of the corpus
///
/// Trains a fresh model on the training share, then scores the held-out
/// ratings: RMSE and MAE over all test predictions, precision and recall
/// at `k` per user against the relevance threshold, and catalog coverage.
/// The deployed model is untouched; this only ever trains a throwaway one.
pub fn evaluate(
    corpus: &[Rating],
    params: &SvdParams,
    eval: &EvalParams,
) -> Result<EvalReport, TrainError> {
    let mut indices: Vec<usize> = (0..corpus.len()).collect();
    let mut rng = StdRng::seed_from_u64(eval.seed);
    indices.shuffle(&mut rng);

    let test_size = (corpus.len() as f64 * eval.test_fraction).round() as usize;
    if test_size == 0 || test_size == corpus.len() {
        return Err(TrainError::UnsplittableCorpus {
            ratings: corpus.len(),
        });
    }

    let (test_idx, train_idx) = indices.split_at(test_size);
    let train: Vec<Rating> = train_idx.iter().map(|&i| corpus[i].clone()).collect();
    let model = SvdModel::train(&train, params)?;

    let mut squared_sum = 0.0;
    let mut abs_sum = 0.0;
    let mut per_user: BTreeMap<i64, Vec<(i64, f64, f64)>> = BTreeMap::new();
    for &i in test_idx {
        let rating = &corpus[i];
        let estimate = model.predict(rating.user_id, rating.game_id);
        let err = rating.value - estimate;
        squared_sum += err * err;
        abs_sum += err.abs();
        per_user
            .entry(rating.user_id)
            .or_default()
            .push((rating.game_id, estimate, rating.value));
    }
    let n = test_idx.len() as f64;
    let rmse = (squared_sum / n).sqrt();
    let mae = abs_sum / n;

    let mut precisions = Vec::new();
    let mut recalls = Vec::new();
    let mut recommended: HashSet<i64> = HashSet::new();
    for predictions in per_user.values_mut() {
        // Rank by estimate, game id breaking ties for a stable ordering
        predictions.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        let top_k = &predictions[..predictions.len().min(eval.k)];

        let hits = top_k
            .iter()
            .filter(|(_, _, truth)| *truth >= eval.relevance_threshold)
            .count();
        let relevant = predictions
            .iter()
            .filter(|(_, _, truth)| *truth >= eval.relevance_threshold)
            .count();

        precisions.push(hits as f64 / eval.k as f64);
        if relevant > 0 {
            recalls.push(hits as f64 / relevant as f64);
        }
        for (game_id, estimate, _) in top_k {
            if *estimate >= eval.relevance_threshold {
                recommended.insert(*game_id);
            }
        }
    }

    let catalog: HashSet<i64> = corpus.iter().map(|r| r.game_id).collect();
    let coverage = recommended.len() as f64 / catalog.len() as f64;
    let mean = |values: &[f64]| {
        if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        }
    };

    Ok(EvalReport {
        train_size: train.len(),
        test_size: test_idx.len(),
        rmse,
        mae,
        precision_at_k: mean(&precisions),
        recall_at_k: mean(&recalls),
        coverage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_corpus() -> Vec<Rating> {
        let mut out = Vec::new();
        for user in 1..=6 {
            for game in 10..=17 {
                let value = 1.0 + ((user * 3 + game) % 9) as f64 / 2.0;
                out.push(Rating::new(user, game, value));
            }
        }
        out
    }

    #[test]
    fn test_report_metrics_are_well_formed() {
        let corpus = synthetic_corpus();
        let report = evaluate(&corpus, &SvdParams::default(), &EvalParams::default()).unwrap();

        assert_eq!(report.train_size + report.test_size, corpus.len());
        assert_eq!(report.test_size, (corpus.len() as f64 * 0.2).round() as usize);
        assert!(report.rmse.is_finite() && report.rmse >= 0.0);
        assert!(report.mae.is_finite() && report.mae >= 0.0);
        assert!(report.mae <= report.rmse + 1e-9);
        assert!((0.0..=1.0).contains(&report.precision_at_k));
        assert!((0.0..=1.0).contains(&report.recall_at_k));
        assert!((0.0..=1.0).contains(&report.coverage));
    }

    #[test]
    fn test_same_seed_yields_same_report() {
        let corpus = synthetic_corpus();
        let first = evaluate(&corpus, &SvdParams::default(), &EvalParams::default()).unwrap();
        let second = evaluate(&corpus, &SvdParams::default(), &EvalParams::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_deeper_list_never_lowers_recall() {
        let corpus = synthetic_corpus();
        let shallow = EvalParams {
            k: 1,
            ..EvalParams::default()
        };
        let deep = EvalParams {
            k: 10,
            ..EvalParams::default()
        };
        let at_1 = evaluate(&corpus, &SvdParams::default(), &shallow).unwrap();
        let at_10 = evaluate(&corpus, &SvdParams::default(), &deep).unwrap();
        assert!(at_10.recall_at_k >= at_1.recall_at_k - 1e-9);
    }

    #[test]
    fn test_tiny_corpus_cannot_be_split() {
        let corpus = vec![Rating::new(1, 10, 4.0), Rating::new(2, 11, 2.0)];
        let result = evaluate(&corpus, &SvdParams::default(), &EvalParams::default());
        assert!(matches!(
            result,
            Err(TrainError::UnsplittableCorpus { ratings: 2 })
        ));
    }

    #[test]
    fn test_empty_corpus_cannot_be_split() {
        let result = evaluate(&[], &SvdParams::default(), &EvalParams::default());
        assert!(matches!(
            result,
            Err(TrainError::UnsplittableCorpus { ratings: 0 })
        ));
    }
}
