use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

/// Outbound queue depth per subscriber.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 64;

pub type SubscriberId = Uuid;

/// Why a message did not reach one subscriber. Either way the subscriber
/// is unregistered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The connection task is gone.
    #[error("subscriber channel closed")]
    Closed,

    /// The subscriber's queue is full: its socket is not keeping up.
    #[error("subscriber queue full")]
    Lagged,
}

/// Per-subscriber outcome of one broadcast.
#[derive(Debug, Default)]
pub struct BroadcastReport {
    pub outcomes: Vec<(SubscriberId, Result<(), DeliveryError>)>,
}

impl BroadcastReport {
    pub fn delivered(&self) -> usize {
        self.outcomes.iter().filter(|(_, r)| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.delivered()
    }

    pub fn outcome(&self, id: SubscriberId) -> Option<Result<(), DeliveryError>> {
        self.outcomes
            .iter()
            .find(|(sid, _)| *sid == id)
            .map(|(_, r)| *r)
    }
}

/// Tracks every connected notification channel.
///
/// Each subscriber is a bounded queue drained by its connection task.
/// Broadcast never waits: a subscriber whose queue is full is evicted, and
/// its connection closes once the queued messages are written.
#[derive(Clone)]
pub struct SubscriberRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    subscribers: RwLock<HashMap<SubscriberId, mpsc::Sender<Arc<str>>>>,
    buffer: usize,
}

impl SubscriberRegistry {
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                subscribers: RwLock::new(HashMap::new()),
                buffer: buffer.max(1),
            }),
        }
    }

    /// Add a subscriber. Call once the connection is ready to receive.
    /// Returns its id and the queue its connection task should drain.
    pub async fn register(&self) -> (SubscriberId, mpsc::Receiver<Arc<str>>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.inner.buffer);
        self.inner.subscribers.write().await.insert(id, tx);
        debug!("Registered subscriber {}", id);
        (id, rx)
    }

    /// Remove a subscriber. Returns false if it was already gone.
    pub async fn unregister(&self, id: SubscriberId) -> bool {
        let removed = self.inner.subscribers.write().await.remove(&id).is_some();
        if removed {
            debug!("Unregistered subscriber {}", id);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.inner.subscribers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Queue `message` for every subscriber registered when the call starts.
    ///
    /// Failures are reported, never returned as an error. Closed or lagging
    /// subscribers are unregistered before this returns.
    pub async fn broadcast(&self, message: &str) -> BroadcastReport {
        let message: Arc<str> = Arc::from(message);

        let outcomes: Vec<(SubscriberId, Result<(), DeliveryError>)> = self
            .inner
            .subscribers
            .read()
            .await
            .iter()
            .map(|(id, tx)| {
                let outcome = tx.try_send(message.clone()).map_err(|e| match e {
                    mpsc::error::TrySendError::Full(_) => DeliveryError::Lagged,
                    mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
                });
                (*id, outcome)
            })
            .collect();

        for (id, outcome) in &outcomes {
            if let Err(e) = outcome {
                warn!("Dropping subscriber {}: {}", id, e);
                self.unregister(*id).await;
            }
        }

        BroadcastReport { outcomes }
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}
