// handlers/public/health.rs - GET /health

use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::app::AppState;

/// Liveness probe. Reports whether the database handle has been established
/// but never connects itself.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "success",
        "message": "Foundation API running",
        "timestamp": chrono::Utc::now(),
        "database": if state.db.is_connected() { "connected" } else { "idle" },
    }))
}
