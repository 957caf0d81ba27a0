//! Event Bus implementation.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::events::{EventCategory, MotorEvent};

/// Subscription handle for unsubscribing from events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", &self.0.to_string()[..8])
    }
}

/// Filter to receive only specific event types
#[derive(Debug, Clone, Default)]
pub enum EventFilter {
    /// Receive all events.
    #[default]
    All,
    /// Receive events matching any of these categories.
    Categories(Vec<EventCategory>),
}

impl EventFilter {
    /// Check if an event matches this filter
    pub fn matches(&self, event: &MotorEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Categories(categories) => categories.contains(&event.category()),
        }
    }
}

type EventHandler = Arc<dyn Fn(MotorEvent) + Send + Sync>;

/// Publish/subscribe hub for one motor's events
///
/// Synchronous handlers run on the publishing thread, which may be the
/// heartbeat worker. Async consumers use [`EventBus::receiver`].
pub struct EventBus {
    sender: broadcast::Sender<MotorEvent>,
    handlers: Arc<RwLock<HashMap<SubscriptionId, (EventFilter, EventHandler)>>>,
}

impl EventBus {
    /// Create a new event bus with the default channel capacity
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a new event bus with a custom broadcast capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Publish an event to every matching handler and async receiver
    ///
    /// Returns the number of handlers and receivers that saw the event.
    pub fn publish(&self, event: MotorEvent) -> usize {
        // handlers run without the lock so they can subscribe or unsubscribe
        let matching: Vec<EventHandler> = self
            .handlers
            .read()
            .values()
            .filter(|(filter, _)| filter.matches(&event))
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        let delivered = matching.len();
        for handler in matching {
            handler(event.clone());
        }

        // no async receivers is not an error
        delivered + self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe with a synchronous handler
    ///
    /// Handlers may use the bus themselves. A handler running on the
    /// heartbeat thread must not stop that heartbeat.
    pub fn subscribe<F>(&self, filter: EventFilter, handler: F) -> SubscriptionId
    where
        F: Fn(MotorEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        self.handlers.write().insert(id, (filter, Arc::new(handler)));
        tracing::debug!("Subscription {} added", id);
        id
    }

    /// Get a receiver for async event polling
    pub fn receiver(&self) -> broadcast::Receiver<MotorEvent> {
        self.sender.subscribe()
    }

    /// Unsubscribe a handler
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.handlers.write().remove(&id).is_some();
        if removed {
            tracing::debug!("Subscription {} removed", id);
        }
        removed
    }

    /// Get the number of active handler subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{ConnectionState, MotorStatus, StatusField};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn status_event() -> MotorEvent {
        MotorEvent::StatusChanged {
            motor: "x".into(),
            changed: vec![StatusField::Moving],
            status: MotorStatus {
                moving: true,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let bus = EventBus::new();

        let id = bus.subscribe(EventFilter::All, |_| {});
        assert_eq!(bus.subscriber_count(), 1);

        assert!(bus.unsubscribe(id));
        assert_eq!(bus.subscriber_count(), 0);

        // Double unsubscribe should return false
        assert!(!bus.unsubscribe(id));
    }

    #[test]
    fn test_event_filtering() {
        let bus = EventBus::new();
        let status_count = Arc::new(AtomicUsize::new(0));
        let connection_count = Arc::new(AtomicUsize::new(0));

        let sc = status_count.clone();
        bus.subscribe(
            EventFilter::Categories(vec![EventCategory::Status]),
            move |_| {
                sc.fetch_add(1, Ordering::SeqCst);
            },
        );
        let cc = connection_count.clone();
        bus.subscribe(
            EventFilter::Categories(vec![EventCategory::Connection]),
            move |_| {
                cc.fetch_add(1, Ordering::SeqCst);
            },
        );

        bus.publish(status_event());
        bus.publish(MotorEvent::ConnectionChanged {
            motor: "x".into(),
            state: ConnectionState::Connected,
        });
        bus.publish(status_event());

        assert_eq!(status_count.load(Ordering::SeqCst), 2);
        assert_eq!(connection_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribed_handler_not_called() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let id = bus.subscribe(EventFilter::All, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(bus.publish(status_event()), 1);
        bus.unsubscribe(id);
        assert_eq!(bus.publish(status_event()), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_can_unsubscribe_itself() {
        let bus = Arc::new(EventBus::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let own_id = Arc::new(RwLock::new(None::<SubscriptionId>));

        let weak_bus = Arc::downgrade(&bus);
        let c = calls.clone();
        let slot = own_id.clone();
        let id = bus.subscribe(EventFilter::All, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            if let (Some(bus), Some(id)) = (weak_bus.upgrade(), *slot.read()) {
                assert!(bus.unsubscribe(id));
            }
        });
        *own_id.write() = Some(id);

        assert_eq!(
            bus.publish(MotorEvent::ConnectionChanged {
                motor: "x".into(),
                state: ConnectionState::Disconnected,
            }),
            1
        );
        assert_eq!(bus.subscriber_count(), 0);

        assert_eq!(bus.publish(status_event()), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_async_receiver() {
        let bus = EventBus::new();
        let mut rx = bus.receiver();

        bus.publish(status_event());

        let event = rx.recv().await.unwrap();
        assert_eq!(event.motor(), "x");
        assert_eq!(event.category(), EventCategory::Status);
    }
}
