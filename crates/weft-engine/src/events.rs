//! Lifecycle event bus
//!
//! An explicit publish/subscribe channel between the lifecycle side
//! (exporters finishing activation, the context closing) and the binder.
//! Subscribers are plain closures; delivery is synchronous on the
//! publishing thread.

use parking_lot::RwLock;

/// Signals published by lifecycle participants
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// An exporter completed activation
    ServiceExported { name: String },
    /// The wiring context is being torn down
    ContextClosed,
}

type Subscriber = Box<dyn Fn(&LifecycleEvent) + Send + Sync>;

/// Synchronous publish/subscribe channel for lifecycle events
#[derive(Default)]
pub struct LifecycleBus {
    subscribers: RwLock<Vec<Subscriber>>,
}

impl LifecycleBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, subscriber: F)
    where
        F: Fn(&LifecycleEvent) + Send + Sync + 'static,
    {
        self.subscribers.write().push(Box::new(subscriber));
    }

    pub fn publish(&self, event: &LifecycleEvent) {
        tracing::debug!(?event, "publishing lifecycle event");
        for subscriber in self.subscribers.read().iter() {
            subscriber(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_publish_reaches_every_subscriber() {
        let bus = LifecycleBus::new();
        let seen = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let seen = seen.clone();
            bus.subscribe(move |event| {
                if matches!(event, LifecycleEvent::ServiceExported { name } if name == "greeter") {
                    seen.fetch_add(1, Ordering::SeqCst);
                }
            });
        }

        bus.publish(&LifecycleEvent::ServiceExported {
            name: "greeter".to_string(),
        });
        bus.publish(&LifecycleEvent::ContextClosed);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
