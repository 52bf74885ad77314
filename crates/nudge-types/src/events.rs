use crate::models::{Reminder, ReminderId};

/// Text pushed to every subscriber when a reminder fires.
///
/// The format is consumed verbatim by existing pages: real newlines, each
/// followed by a single space, title and description interpolated as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub reminder_id: ReminderId,
    pub text: String,
}

impl Notification {
    pub fn for_reminder(reminder_id: ReminderId, reminder: &Reminder) -> Self {
        Self {
            reminder_id,
            text: notification_text(&reminder.title, &reminder.description),
        }
    }
}

pub fn notification_text(title: &str, description: &str) -> String {
    format!("Reminder Triggered! \n Title: {title} \n Description: {description}")
}
