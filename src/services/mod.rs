pub mod engine;
pub mod ingest;
pub mod lifecycle;

pub use engine::RecommendationEngine;
pub use ingest::FeedbackIngestor;
pub use lifecycle::ModelLifecycle;
