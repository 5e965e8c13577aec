use axum::extract::State;
use axum::Json;

use crate::error::AppResult;
use crate::state::AppState;

pub async fn check(State(state): State<AppState>) -> AppResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    let interactions: i64 =
        conn.query_row("SELECT COUNT(*) FROM interactions", [], |row| row.get(0))?;
    Ok(Json(serde_json::json!({
        "status": "ok",
        "interactions": interactions,
        "usage_limit": state.config.limits.usage_limit,
    })))
}
