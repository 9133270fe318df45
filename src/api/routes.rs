use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Users
        .route("/users", post(handlers::create_user))
        .route("/users/:id", put(handlers::update_user))
        // Catalog
        .route("/games", get(handlers::get_games))
        .route("/games", post(handlers::create_game))
        // Recommendations & feedback
        .route("/users/:id/recommend", get(handlers::recommend))
        .route("/users/:id/rate", post(handlers::rate_game))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
