use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::trace;

use super::types::WorkflowEvent;

/// Broadcast publisher for workflow lifecycle events
///
/// Publishing never blocks and never fails for lack of subscribers; slow
/// subscribers observe `RecvError::Lagged` instead of slowing the engine.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<WorkflowEvent>,
    stats: Arc<PublisherCounters>,
}

#[derive(Debug, Default)]
struct PublisherCounters {
    published: AtomicU64,
    unobserved: AtomicU64,
}

/// Snapshot of publisher activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventPublisherStats {
    pub published: u64,
    /// Events published while nobody was subscribed
    pub unobserved: u64,
    pub subscribers: usize,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            stats: Arc::new(PublisherCounters::default()),
        }
    }

    pub fn publish(&self, event: WorkflowEvent) -> Result<(), PublishError> {
        if event.name.is_empty() {
            return Err(PublishError::UnnamedEvent);
        }
        trace!(event = %event.name, document_id = %event.document_id, "Publishing lifecycle event");

        self.stats.published.fetch_add(1, Ordering::Relaxed);
        // No subscribers is acceptable for event publishing
        if self.sender.send(event).is_err() {
            self.stats.unobserved.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn stats(&self) -> EventPublisherStats {
        EventPublisherStats {
            published: self.stats.published.load(Ordering::Relaxed),
            unobserved: self.stats.unobserved.load(Ordering::Relaxed),
            subscribers: self.subscriber_count(),
        }
    }
}

/// Error types for event publishing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    #[error("Lifecycle event has no name")]
    UnnamedEvent,
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(1024)
    }
}
