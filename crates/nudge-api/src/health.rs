use axum::{Json, extract::State};

use nudge_types::api::HealthResponse;

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        pending: state.store.len(),
        subscribers: state.registry.len().await,
    })
}
