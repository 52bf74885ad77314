use serde::{Deserialize, Serialize};

use crate::models::ReminderId;

// -- Reminders --

pub const REMINDER_ADDED: &str = "Reminder added successfully";

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitReminderResponse {
    pub message: String,
    pub id: ReminderId,
}

impl SubmitReminderResponse {
    pub fn added(id: ReminderId) -> Self {
        Self {
            message: REMINDER_ADDED.to_string(),
            id,
        }
    }
}

// -- Health --

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub pending: usize,
    pub subscribers: usize,
}
