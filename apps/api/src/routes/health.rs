use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status, the active rubric version and which collaborators are wired.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let collaborators = &state.scoring.collaborators;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "resumai",
        "rubric_version": state.scoring.rubric.version,
        "persistence": state.db.is_some(),
        "collaborators": {
            "similarity": collaborators.similarity.name(),
            "cluster": collaborators.cluster.name(),
            "classifier": collaborators.classifier.name(),
        }
    }))
}
