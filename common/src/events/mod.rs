// Run lifecycle events and their synchronous dispatcher

pub mod bus;
pub mod event;
pub mod subscribers;

pub use bus::{EventBus, EventSubscriber, SubscriptionId};
pub use event::SyncEvent;
pub use subscribers::{LogSubscriber, MetricsSubscriber};
