pub mod gateway;
pub mod health;
pub mod pages;
pub mod reminders;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Every route the server exposes. Paths keep the trailing slashes that
/// existing pages post to.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/add_reminder/", post(reminders::add_reminder))
        .route("/get_reminders/", get(reminders::get_reminders))
        .route("/ws", get(gateway::ws_upgrade))
        .route("/health", get(health::health))
        .with_state(state)
}
