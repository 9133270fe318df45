use std::sync::Arc;

use crate::{
    config::Config,
    services::{FeedbackIngestor, ModelLifecycle, RecommendationEngine},
    store::{MemoryStore, Store},
};

/// Shared application state
///
/// Wires the store, the model lifecycle and the two services together;
/// everything is behind an `Arc` so the state clones cheaply per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub lifecycle: Arc<ModelLifecycle>,
    pub engine: Arc<RecommendationEngine>,
    pub ingestor: Arc<FeedbackIngestor>,
}

impl AppState {
    /// Builds state over the in-memory store
    pub fn new(config: &Config) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), config)
    }

    /// Builds state over any store implementation
    pub fn with_store(store: Arc<dyn Store>, config: &Config) -> Self {
        let lifecycle = Arc::new(ModelLifecycle::new(
            store.clone(),
            Default::default(),
            config.model_path.clone(),
        ));
        let engine = Arc::new(RecommendationEngine::new(
            store.clone(),
            lifecycle.clone(),
            config.page_size,
            config.cold_start_threshold,
        ));
        let ingestor = Arc::new(FeedbackIngestor::new(
            store.clone(),
            lifecycle.clone(),
            config.rating_scale_min,
            config.rating_scale_max,
        ));

        Self {
            store,
            lifecycle,
            engine,
            ingestor,
        }
    }
}
