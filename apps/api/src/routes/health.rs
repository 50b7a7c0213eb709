use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status plus the outcome of the startup store check.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "benelinc-api",
        "store": {
            "backend": state.store.backend_name(),
            "ready": state.store_check_error.is_none(),
            "error": state.store_check_error,
        },
        "model": state.advisor.model_id(),
        "region": state.config.aws_region,
    }))
}
