use std::collections::BTreeMap;

use axum::{Json, extract::State};
use tracing::info;

use nudge_types::api::SubmitReminderResponse;
use nudge_types::models::{Reminder, ReminderId};

use crate::state::AppState;

/// Malformed bodies never reach here: axum's `Json` extractor rejects them
/// with 400/415/422 before the store is touched.
pub async fn add_reminder(
    State(state): State<AppState>,
    Json(reminder): Json<Reminder>,
) -> Json<SubmitReminderResponse> {
    let title = reminder.title.clone();
    let trigger_time = reminder.trigger_time;
    let id = state.store.add(reminder);
    info!("Reminder {} '{}' added, fires at {}", id, title, trigger_time);

    Json(SubmitReminderResponse::added(id))
}

/// Every pending reminder, keyed by id.
pub async fn get_reminders(State(state): State<AppState>) -> Json<BTreeMap<ReminderId, Reminder>> {
    Json(state.store.list_all())
}
