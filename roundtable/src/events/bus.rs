//! Event bus for a single refinement session.
//!
//! Grounded on the teacher's `events/bus.rs`: a `tokio::sync::broadcast`
//! channel wrapped in a small API, bounded capacity, and "no receivers"
//! treated as success rather than an error. Unlike the teacher's bus,
//! this one never persists events — the `Store` is the source of
//! truth for anything that must survive past the live broadcast, and
//! there is no replay.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use super::types::{LogLevel, RoundtableEvent};

/// Default per-subscriber channel capacity, matching the teacher's
/// `CHANNEL_CAPACITY` constant and the spec's recommended queue depth.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

pub type SharedEventBus = Arc<EventBus>;

/// Broadcast bus for one session's [`RoundtableEvent`] stream.
pub struct EventBus {
    sender: broadcast::Sender<RoundtableEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn shared(self) -> SharedEventBus {
        Arc::new(self)
    }

    /// Publish an event to all subscribers. A `SendError` (no
    /// receivers) is not an error at this layer.
    pub fn publish(&self, event: RoundtableEvent) {
        let event_type = event.event_type();
        match self.sender.send(event) {
            Ok(count) => debug!(event_type, receivers = count, "event published"),
            Err(_) => debug!(event_type, "event published (no subscribers)"),
        }
    }

    /// Subscribe to this session's event stream. The returned
    /// [`Subscription`] transparently converts a lagged receiver into
    /// a synthetic `log` event rather than surfacing the lag as an
    /// error to callers.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

/// A live subscription to a session's event stream.
pub struct Subscription {
    receiver: broadcast::Receiver<RoundtableEvent>,
}

impl Subscription {
    /// Receive the next event. Returns `None` once the bus has been
    /// dropped and no further events will arrive. A lag (the
    /// subscriber fell behind and events were dropped) is surfaced as
    /// a synthetic `Log { level: Warn, .. }` event rather than an
    /// error, per the bounded per-subscriber queue policy.
    pub async fn recv(&mut self) -> Option<RoundtableEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    return Some(RoundtableEvent::log(
                        None,
                        LogLevel::Warn,
                        "event_bus",
                        format!("subscriber lagged, {skipped} event(s) dropped"),
                    ));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Selective subscription filter, kept for callers (e.g. a CLI) that
/// only care about a subset of event kinds.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub event_types: Option<Vec<String>>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn types(mut self, event_types: Vec<&str>) -> Self {
        self.event_types = Some(event_types.into_iter().map(String::from).collect());
        self
    }

    pub fn matches(&self, event: &RoundtableEvent) -> bool {
        match &self.event_types {
            Some(types) => types.iter().any(|t| t == event.event_type()),
            None => true,
        }
    }
}

/// A [`Subscription`] that only yields events matching an [`EventFilter`].
pub struct FilteredReceiver {
    subscription: Subscription,
    filter: EventFilter,
}

impl FilteredReceiver {
    pub fn new(subscription: Subscription, filter: EventFilter) -> Self {
        Self { subscription, filter }
    }

    pub async fn recv(&mut self) -> Option<RoundtableEvent> {
        loop {
            let event = self.subscription.recv().await?;
            if self.filter.matches(&event) {
                return Some(event);
            }
        }
    }
}

/// Extension trait for subscribing with a filter applied.
pub trait EventBusExt {
    fn subscribe_filtered(&self, filter: EventFilter) -> FilteredReceiver;
}

impl EventBusExt for EventBus {
    fn subscribe_filtered(&self, filter: EventFilter) -> FilteredReceiver {
        FilteredReceiver::new(self.subscribe(), filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SessionId;
    use chrono::Utc;

    fn sample_event() -> RoundtableEvent {
        RoundtableEvent::SessionCreated {
            session_id: SessionId::new(),
            title: None,
            max_iterations: 5,
            num_participants: 3,
            domain_hint: None,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn publish_then_subscribe_receives_event() {
        let bus = EventBus::default();
        let mut sub = bus.subscribe();
        bus.publish(sample_event());
        let received = sub.recv().await.unwrap();
        assert_eq!(received.event_type(), "session_created");
    }

    #[tokio::test]
    async fn multiple_subscribers_all_receive() {
        let bus = EventBus::default().shared();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(sample_event());

        let e1 = rx1.recv().await.unwrap();
        let e2 = rx2.recv().await.unwrap();
        assert_eq!(e1.event_type(), e2.event_type());
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_block_or_panic() {
        let bus = EventBus::default();
        bus.publish(sample_event());
    }

    #[test]
    fn filter_matches_only_listed_types() {
        let filter = EventFilter::new().types(vec!["session_created"]);
        assert!(filter.matches(&sample_event()));
        let other = RoundtableEvent::IterationStart {
            session_id: SessionId::new(),
            iteration: 1,
            max_iterations: 5,
            timestamp: Utc::now(),
        };
        assert!(!filter.matches(&other));
    }

    #[tokio::test]
    async fn filtered_receiver_skips_non_matching_events() {
        let bus = EventBus::default();
        let filter = EventFilter::new().types(vec!["iteration_start"]);
        let mut filtered = bus.subscribe_filtered(filter);

        bus.publish(sample_event());
        bus.publish(RoundtableEvent::IterationStart {
            session_id: SessionId::new(),
            iteration: 1,
            max_iterations: 5,
            timestamp: Utc::now(),
        });

        let event = filtered.recv().await.unwrap();
        assert_eq!(event.event_type(), "iteration_start");
    }

    #[tokio::test]
    async fn lagged_subscriber_gets_synthetic_log_event() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();
        for _ in 0..5 {
            bus.publish(sample_event());
        }
        let event = sub.recv().await.unwrap();
        assert_eq!(event.event_type(), "log");
    }
}
