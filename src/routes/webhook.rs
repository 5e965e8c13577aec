use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;

use crate::state::AppState;

/// LINE webhook callback. Always answers 200: replies travel through the
/// reply API, and a non-2xx here would only make the platform redeliver.
/// Failures and panics end in the pipeline's error log, never here.
pub async fn receive(State(state): State<AppState>, body: Bytes) -> StatusCode {
    state.pipeline.process(&body).await;
    StatusCode::OK
}
