//! HTTP API module - health endpoints and the match WebSocket

mod websocket;

use std::collections::HashMap;
use std::sync::Arc;

use axum::{response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::engine::{InMemoryCharacters, MatchEngine};
use crate::rulesets::RulesetId;
pub use websocket::{ClientMessage, ConnectionManager, PlayerSession, ServerMessage};

/// A created match waiting for a second player
#[derive(Debug, Clone)]
pub struct OpenChallenge {
    pub ruleset: RulesetId,
    pub host_player_id: String,
    pub host_name: String,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<MatchEngine>,
    pub characters: Arc<InMemoryCharacters>,
    pub connections: Arc<ConnectionManager>,
    pub challenges: Arc<RwLock<HashMap<String, OpenChallenge>>>,
}

/// Build the API router
pub fn router(engine: Arc<MatchEngine>, characters: Arc<InMemoryCharacters>) -> Router {
    let state = AppState {
        engine,
        characters,
        connections: Arc::new(ConnectionManager::new()),
        challenges: Arc::new(RwLock::new(HashMap::new())),
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/", get(root))
        .route("/ws", get(websocket::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Root endpoint
async fn root() -> impl IntoResponse {
    Json(RootResponse {
        name: "arenad",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct RootResponse {
    name: &'static str,
    version: &'static str,
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse { status: "healthy" })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}
