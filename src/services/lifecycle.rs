use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, RwLock};

use crate::{
    error::AppResult,
    model::{SvdModel, SvdParams},
    store::Store,
};

/// Owns the currently served model and the retrain/swap lifecycle
///
/// The served model sits behind an `RwLock<Option<Arc<_>>>`: readers clone
/// the `Arc` and drop the lock immediately, so a retrain in progress never
/// blocks recommendation traffic and a swap is all-or-nothing.
///
/// Retraining is coalesced. Each trigger sets a dirty flag before waiting
/// on the single retrain mutex; whoever holds the mutex consumes the flag,
/// so one retrain covers every piece of feedback that arrived before its
/// corpus snapshot and the callers it covered simply report its outcome.
pub struct ModelLifecycle {
    store: Arc<dyn Store>,
    params: SvdParams,
    model_path: PathBuf,
    current: RwLock<Option<Arc<SvdModel>>>,
    retrain_lock: Mutex<()>,
    dirty: AtomicBool,
    last_outcome: AtomicBool,
}

impl ModelLifecycle {
    pub fn new(store: Arc<dyn Store>, params: SvdParams, model_path: impl Into<PathBuf>) -> Self {
        Self {
            store,
            params,
            model_path: model_path.into(),
            current: RwLock::new(None),
            retrain_lock: Mutex::new(()),
            dirty: AtomicBool::new(false),
            last_outcome: AtomicBool::new(false),
        }
    }

    /// The model currently being served, if any
    pub async fn current(&self) -> Option<Arc<SvdModel>> {
        self.current.read().await.clone()
    }

    /// Startup path: restore the persisted model, or train an initial one
    ///
    /// Both paths are allowed to come up empty (fresh deployment, corpus
    /// still too small); the engine degrades to popularity ranking until a
    /// retrain succeeds.
    pub async fn init(&self) {
        match self.load_persisted().await {
            Ok(Some(model)) => {
                tracing::info!(
                    path = %self.model_path.display(),
                    users = model.num_users(),
                    games = model.num_games(),
                    "Restored persisted model"
                );
                *self.current.write().await = Some(Arc::new(model));
                self.last_outcome.store(true, Ordering::SeqCst);
            }
            Ok(None) => {
                tracing::info!(
                    path = %self.model_path.display(),
                    "No persisted model, attempting initial training"
                );
                self.retrain_and_swap().await;
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %self.model_path.display(),
                    "Failed to restore persisted model, attempting initial training"
                );
                self.retrain_and_swap().await;
            }
        }
    }

    /// Rebuilds the model from the full corpus and swaps it in on success
    ///
    /// Returns whether a model was produced (by this call or by the
    /// coalescing retrain that covered it). Failure leaves the previously
    /// served model untouched; it is logged, never raised.
    pub async fn retrain_and_swap(&self) -> bool {
        self.dirty.store(true, Ordering::SeqCst);
        let _guard = self.retrain_lock.lock().await;
        if !self.dirty.swap(false, Ordering::SeqCst) {
            // A retrain that started after our trigger already consumed it
            return self.last_outcome.load(Ordering::SeqCst);
        }

        let outcome = self.retrain_once().await;
        self.last_outcome.store(outcome, Ordering::SeqCst);
        outcome
    }

    async fn retrain_once(&self) -> bool {
        let corpus = match self.store.all_ratings().await {
            Ok(corpus) => corpus,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read rating corpus");
                return false;
            }
        };

        let started = Instant::now();
        let params = self.params.clone();
        let trained =
            tokio::task::spawn_blocking(move || SvdModel::train(&corpus, &params)).await;

        let model = match trained {
            Ok(Ok(model)) => Arc::new(model),
            Ok(Err(e)) => {
                // Corpus too small: keep serving whatever we have
                tracing::warn!(error = %e, "Skipping model swap");
                return false;
            }
            Err(e) => {
                tracing::error!(error = %e, "Training task failed");
                return false;
            }
        };

        tracing::info!(
            users = model.num_users(),
            games = model.num_games(),
            elapsed_ms = started.elapsed().as_millis(),
            "Model trained"
        );

        if let Err(e) = self.persist(&model).await {
            // Serving state wins over durable state; the next successful
            // retrain repairs the artifact on disk
            tracing::warn!(
                error = %e,
                path = %self.model_path.display(),
                "Failed to persist model, serving it anyway"
            );
        }

        *self.current.write().await = Some(model);
        true
    }

    async fn persist(&self, model: &SvdModel) -> AppResult<()> {
        if let Some(parent) = self.model_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let blob = serde_json::to_vec(model)?;
        tokio::fs::write(&self.model_path, blob).await?;
        Ok(())
    }

    async fn load_persisted(&self) -> AppResult<Option<SvdModel>> {
        if !self.model_path.exists() {
            return Ok(None);
        }
        let blob = tokio::fs::read(&self.model_path).await?;
        let model = serde_json::from_slice(&blob)?;
        Ok(Some(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Rating;
    use crate::store::MemoryStore;

    fn temp_model_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("gamerec-model-{}-{}.json", std::process::id(), tag))
    }

    async fn seeded_store(entries: &[(i64, i64, f64)]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for &(u, g, v) in entries {
            store.append_rating(Rating::new(u, g, v)).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_retrain_with_small_corpus_keeps_absence() {
        let store = seeded_store(&[(1, 10, 4.0)]).await;
        let lifecycle = ModelLifecycle::new(store, SvdParams::default(), temp_model_path("small"));

        assert!(!lifecycle.retrain_and_swap().await);
        assert!(lifecycle.current().await.is_none());
    }

    #[tokio::test]
    async fn test_retrain_swaps_and_persists() {
        let path = temp_model_path("swap");
        let _ = std::fs::remove_file(&path);

        let store = seeded_store(&[(1, 10, 4.0), (1, 11, 2.0), (2, 10, 5.0)]).await;
        let lifecycle = ModelLifecycle::new(store, SvdParams::default(), path.clone());

        assert!(lifecycle.retrain_and_swap().await);
        assert!(lifecycle.current().await.is_some());
        assert!(path.exists());

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_init_restores_persisted_model() {
        let path = temp_model_path("restore");
        let _ = std::fs::remove_file(&path);

        let store = seeded_store(&[(1, 10, 4.0), (1, 11, 2.0), (2, 10, 5.0)]).await;
        let first = ModelLifecycle::new(store, SvdParams::default(), path.clone());
        assert!(first.retrain_and_swap().await);

        // A fresh process with an empty store should come up serving the
        // persisted model rather than retraining from nothing
        let empty_store = Arc::new(MemoryStore::new());
        let second = ModelLifecycle::new(empty_store, SvdParams::default(), path.clone());
        second.init().await;
        assert!(second.current().await.is_some());

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_init_without_artifact_or_corpus_serves_nothing() {
        let path = temp_model_path("absent");
        let _ = std::fs::remove_file(&path);

        let store = Arc::new(MemoryStore::new());
        let lifecycle = ModelLifecycle::new(store, SvdParams::default(), path);
        lifecycle.init().await;

        assert!(lifecycle.current().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_retrain_keeps_previous_model() {
        let path = temp_model_path("keep");
        let _ = std::fs::remove_file(&path);

        let store = seeded_store(&[(1, 10, 4.0), (1, 11, 2.0), (2, 10, 5.0)]).await;
        let lifecycle = ModelLifecycle::new(store, SvdParams::default(), path.clone());
        assert!(lifecycle.retrain_and_swap().await);
        let served = lifecycle.current().await.unwrap();

        // Swap the store out from under the lifecycle via a new instance
        // sharing the path: a failing retrain must not clear the model
        let starved = ModelLifecycle::new(
            Arc::new(MemoryStore::new()),
            SvdParams::default(),
            path.clone(),
        );
        starved.init().await;
        assert!(starved.current().await.is_some());
        assert!(!starved.retrain_and_swap().await);
        assert!(starved.current().await.is_some());

        drop(served);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_concurrent_readers_see_coherent_models() {
        let path = temp_model_path("concurrent");
        let _ = std::fs::remove_file(&path);

        let store = seeded_store(&[(1, 10, 4.0), (1, 11, 2.0), (2, 10, 5.0), (2, 11, 3.0)]).await;
        let lifecycle = Arc::new(ModelLifecycle::new(
            store.clone(),
            SvdParams::default(),
            path.clone(),
        ));
        assert!(lifecycle.retrain_and_swap().await);

        let mut readers = Vec::new();
        for _ in 0..16 {
            let lifecycle = lifecycle.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..50 {
                    if let Some(model) = lifecycle.current().await {
                        // A coherent snapshot always predicts within scale
                        let est = model.predict(1, 11);
                        assert!((2.0..=5.0).contains(&est));
                    }
                }
            }));
        }

        for round in 0..5 {
            store
                .append_rating(Rating::new(3, 10, 3.0 + 0.1 * round as f64))
                .await
                .unwrap();
            lifecycle.retrain_and_swap().await;
        }

        for reader in readers {
            reader.await.unwrap();
        }

        let _ = std::fs::remove_file(&path);
    }
}
