pub mod health;
pub mod webhook;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(webhook::receive))
        .route("/health", get(health::check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
