use axum::{
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
};

use nudge_gateway::connection;

use crate::state::AppState;

pub async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let registry = state.registry.clone();
    let shutdown = state.shutdown.clone();
    let write_timeout = state.write_timeout;
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, registry, shutdown, write_timeout)
    })
}
