use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use nudge_gateway::registry::SubscriberRegistry;
use nudge_store::ReminderStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: Arc<ReminderStore>,
    pub registry: SubscriberRegistry,
    /// Cancelled at shutdown; connection tasks close their sockets on it.
    pub shutdown: CancellationToken,
    /// Per-frame socket write bound for notification channels.
    pub write_timeout: Duration,
}
