// In-process synchronous event dispatcher
// emit() calls every subscriber in registration order before returning, so
// each subscriber sees events in emission order. The subscriber list is
// copied out before dispatch and no lock is held while handlers run.

use super::event::SyncEvent;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error};

/// Receives run lifecycle events
///
/// Called on whichever thread emitted the event (the one driving
/// `SyncRunner::run`). Implementations must not block for long; forward to a
/// channel (see [`EventBus::channel`]) for anything slow.
pub trait EventSubscriber: Send + Sync {
    fn on_event(&self, event: &SyncEvent);

    /// Name used in logs when the subscriber misbehaves
    fn name(&self) -> &str {
        "subscriber"
    }
}

impl<F> EventSubscriber for F
where
    F: Fn(&SyncEvent) + Send + Sync,
{
    fn on_event(&self, event: &SyncEvent) {
        self(event)
    }
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct ChannelSubscriber {
    sender: mpsc::UnboundedSender<SyncEvent>,
}

impl EventSubscriber for ChannelSubscriber {
    fn on_event(&self, event: &SyncEvent) {
        // A dropped receiver just stops listening.
        let _ = self.sender.send(event.clone());
    }

    fn name(&self) -> &str {
        "channel"
    }
}

type SubscriberList = Vec<(SubscriptionId, Arc<dyn EventSubscriber>)>;

/// Multi-subscriber synchronous dispatcher for [`SyncEvent`]s
///
/// Shared as `Arc<EventBus>` between the orchestrator and the runner.
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<SubscriberList>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber; it receives every event emitted from now on
    pub fn subscribe<S>(&self, subscriber: S) -> SubscriptionId
    where
        S: EventSubscriber + 'static,
    {
        self.subscribe_arc(Arc::new(subscriber))
    }

    pub fn subscribe_arc(&self, subscriber: Arc<dyn EventSubscriber>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(
            subscription = id.0,
            subscriber = subscriber.name(),
            "Subscribed to sync events"
        );
        self.subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((id, subscriber));
        id
    }

    /// Remove a subscriber; returns whether it was registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        before != subscribers.len()
    }

    /// Subscribe through an unbounded channel, for async observers
    pub fn channel(&self) -> (SubscriptionId, mpsc::UnboundedReceiver<SyncEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.subscribe(ChannelSubscriber { sender });
        (id, receiver)
    }

    /// Same as [`EventBus::channel`], wrapped as a `Stream`
    pub fn stream(&self) -> (SubscriptionId, UnboundedReceiverStream<SyncEvent>) {
        let (id, receiver) = self.channel();
        (id, UnboundedReceiverStream::new(receiver))
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Deliver an event to every current subscriber, in registration order
    ///
    /// A panicking subscriber is logged and skipped; the remaining
    /// subscribers still receive the event.
    pub fn emit(&self, event: SyncEvent) {
        let subscribers: SubscriberList = self
            .subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        for (id, subscriber) in &subscribers {
            let delivered = catch_unwind(AssertUnwindSafe(|| subscriber.on_event(&event)));
            if delivered.is_err() {
                error!(
                    subscription = id.0,
                    subscriber = subscriber.name(),
                    event = event.kind(),
                    job_name = %event.job(),
                    "Event subscriber panicked"
                );
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
