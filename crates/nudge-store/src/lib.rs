use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::debug;

use nudge_types::models::{Reminder, ReminderId};

/// In-memory set of pending reminders, shared by the HTTP handlers and the
/// scanner. Every operation takes the lock once, so callers never see a
/// half-applied `take_due`.
pub struct ReminderStore {
    inner: Mutex<StoreInner>,
}

struct StoreInner {
    /// Last id handed out. Only ever increments.
    last_id: u64,
    pending: BTreeMap<ReminderId, Reminder>,
}

impl ReminderStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                last_id: 0,
                pending: BTreeMap::new(),
            }),
        }
    }

    /// Store a reminder under the next id. Ids start at 1.
    pub fn add(&self, reminder: Reminder) -> ReminderId {
        let mut inner = self.lock();
        inner.last_id += 1;
        let id = ReminderId(inner.last_id);

        debug!("Storing reminder {} due at {}", id, reminder.trigger_time);
        let previous = inner.pending.insert(id, reminder);
        assert!(previous.is_none(), "reminder id {} assigned twice", id);

        id
    }

    /// Snapshot of every pending reminder, keyed by id.
    pub fn list_all(&self) -> BTreeMap<ReminderId, Reminder> {
        self.lock().pending.clone()
    }

    /// Remove and return every reminder due at `now`, in ascending id order.
    pub fn take_due(&self, now: DateTime<Utc>) -> Vec<(ReminderId, Reminder)> {
        let mut inner = self.lock();
        if !inner.pending.values().any(|r| r.is_due(now)) {
            return Vec::new();
        }

        let (due, pending): (BTreeMap<_, _>, BTreeMap<_, _>) = std::mem::take(&mut inner.pending)
            .into_iter()
            .partition(|(_, reminder)| reminder.is_due(now));
        inner.pending = pending;

        due.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        // A panic while holding this lock means an invariant already broke.
        self.inner.lock().expect("reminder store lock poisoned")
    }
}

impl Default for ReminderStore {
    fn default() -> Self {
        Self::new()
    }
}
