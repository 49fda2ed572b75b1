//! # Change Feed
//!
//! Every committed write publishes a [`ChangeEvent`]. Live list streams in
//! the API subscribe here and re-read their snapshot when an event for
//! their owner and entity arrives.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SaleRepository::create ──commit──► ChangeFeed::publish                 │
//! │                                         │ tokio broadcast               │
//! │                     ┌───────────────────┼───────────────────┐           │
//! │                     ▼                   ▼                   ▼           │
//! │              /api/live/sales     /api/live/sales     /api/live/flours   │
//! │              (owner A)           (owner B: ignores)  (ignores sales)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Events carry no row data, only what changed. A subscriber that lags
//! behind loses events, which is harmless: its next snapshot is complete.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use moinho_core::EntityKind;

/// Default number of buffered events per subscriber.
pub const DEFAULT_FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Created,
    Updated,
    Deleted,
}

/// One committed write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub owner_id: String,
    pub entity: EntityKind,
    pub id: String,
    pub op: ChangeOp,
}

impl ChangeEvent {
    /// True when a live list of `entity` owned by `owner_id` must refresh.
    pub fn affects(&self, owner_id: &str, entity: EntityKind) -> bool {
        self.owner_id == owner_id && self.entity == entity
    }
}

/// Broadcast channel of committed writes.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        ChangeFeed { sender }
    }

    /// Starts receiving events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event. Having no subscribers is not an error.
    pub fn publish(&self, event: ChangeEvent) {
        trace!(
            owner_id = %event.owner_id,
            entity = %event.entity,
            id = %event.id,
            op = ?event.op,
            "Publishing change"
        );
        let _ = self.sender.send(event);
    }

    pub(crate) fn emit(&self, owner_id: &str, entity: EntityKind, id: &str, op: ChangeOp) {
        self.publish(ChangeEvent {
            owner_id: owner_id.to_string(),
            entity,
            id: id.to_string(),
            op,
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        ChangeFeed::new(DEFAULT_FEED_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_published_events() {
        let feed = ChangeFeed::default();
        let mut rx = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 1);

        feed.emit("u1", EntityKind::Sale, "s1", ChangeOp::Created);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.id, "s1");
        assert!(event.affects("u1", EntityKind::Sale));
        assert!(!event.affects("u2", EntityKind::Sale));
        assert!(!event.affects("u1", EntityKind::Flour));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let feed = ChangeFeed::new(4);
        feed.emit("u1", EntityKind::Flour, "f1", ChangeOp::Deleted);
        assert_eq!(feed.subscriber_count(), 0);
    }
}
