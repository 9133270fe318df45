use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    models::{Game, RatingAck, Recommendation, User},
};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub user_id: i64,
    pub username: String,
    #[serde(default)]
    pub owned_games: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: String,
    #[serde(default)]
    pub owned_games: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGameRequest {
    pub game_id: i64,
    pub name: String,
    pub price: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub game_id: i64,
    pub rating: f64,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub recommendations: Vec<Recommendation>,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Create a new user
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = User {
        user_id: request.user_id,
        username: request.username,
        owned_games: request.owned_games,
    };

    if !state.store.create_user(user.clone()).await? {
        return Err(AppError::Conflict(format!(
            "User {} already exists",
            user.user_id
        )));
    }

    Ok((StatusCode::CREATED, Json(user)))
}

/// Update an existing user's name and ownership set
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(request): Json<UpdateUserRequest>,
) -> AppResult<Json<User>> {
    let user = User {
        user_id,
        username: request.username,
        owned_games: request.owned_games,
    };

    if !state.store.update_user(user.clone()).await? {
        return Err(AppError::NotFound(format!("User {} not found", user_id)));
    }

    Ok(Json(user))
}

/// Add a game to the catalog
pub async fn create_game(
    State(state): State<AppState>,
    Json(request): Json<CreateGameRequest>,
) -> AppResult<(StatusCode, Json<Game>)> {
    let game = Game::new(request.game_id, request.name, request.price);

    if !state.store.create_game(game.clone()).await? {
        return Err(AppError::Conflict(format!(
            "Game {} already exists",
            game.game_id
        )));
    }

    Ok((StatusCode::CREATED, Json(game)))
}

/// Get the full catalog
pub async fn get_games(State(state): State<AppState>) -> AppResult<Json<Vec<Game>>> {
    let mut games = state.store.list_games().await?;
    games.sort_by_key(|g| g.game_id);
    Ok(Json(games))
}

/// Ranked recommendations for a user
pub async fn recommend(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<RecommendResponse>> {
    let recommendations = state.engine.recommend(user_id).await?;
    Ok(Json(RecommendResponse { recommendations }))
}

/// Submit a rating for a game
pub async fn rate_game(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(request): Json<RateRequest>,
) -> AppResult<Json<RatingAck>> {
    let ack = state
        .ingestor
        .submit_rating(user_id, request.game_id, request.rating)
        .await?;
    Ok(Json(ack))
}
