//! In-process publish/subscribe hub for domain events.
//!
//! Observers subscribe per [`EventType`]. `publish` runs every observer of
//! the event's type concurrently and waits for all of them; an observer that
//! errors or panics is logged and counted but never fails the publishing
//! workflow.
//!
//! # Usage
//!
//! ```rust,ignore
//! let publisher = Arc::new(EventPublisher::with_default_observers(
//!     Arc::new(NotificationObserver::new(store.clone())),
//! ));
//! let report = publisher.publish(Event::new(EventType::ResultPublished, payload)).await;
//! ```

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use futures::FutureExt;
use tokio::sync::RwLock;
use tracing::instrument;

use super::types::{Event, EventType};
use crate::metrics::METRICS;
use crate::obs;

/// Reacts to published events.
#[async_trait]
pub trait EventObserver: Send + Sync {
    /// Name used in logs when the observer fails.
    fn name(&self) -> &str {
        "observer"
    }

    async fn handle(&self, event: &Event) -> anyhow::Result<()>;
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Per-event-type ordered observer lists.
#[derive(Default)]
pub struct EventPublisher {
    observers: RwLock<HashMap<EventType, Vec<Arc<dyn EventObserver>>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher with `observer` subscribed to every event type.
    pub fn with_default_observers(observer: Arc<dyn EventObserver>) -> Self {
        let observers = EventType::ALL
            .iter()
            .map(|event_type| (*event_type, vec![Arc::clone(&observer)]))
            .collect();
        Self {
            observers: RwLock::new(observers),
        }
    }

    /// Append an observer to the list for `event_type`.
    pub async fn subscribe(&self, event_type: EventType, observer: Arc<dyn EventObserver>) {
        self.observers
            .write()
            .await
            .entry(event_type)
            .or_default()
            .push(observer);
    }

    /// Remove an observer (matched by identity) from the list for `event_type`.
    /// Returns whether it was subscribed.
    pub async fn unsubscribe(&self, event_type: EventType, observer: &Arc<dyn EventObserver>) -> bool {
        let mut observers = self.observers.write().await;
        let Some(list) = observers.get_mut(&event_type) else {
            return false;
        };
        match list.iter().position(|o| Arc::ptr_eq(o, observer)) {
            Some(index) => {
                list.remove(index);
                true
            }
            None => false,
        }
    }

    /// Number of observers subscribed to `event_type`.
    pub async fn observer_count(&self, event_type: EventType) -> usize {
        self.observers
            .read()
            .await
            .get(&event_type)
            .map_or(0, Vec::len)
    }

    /// Deliver `event` to every observer of its type and wait for all of them.
    #[instrument(skip(self, event), fields(event_type = %event.event_type))]
    pub async fn publish(&self, event: Event) -> PublishReport {
        // Snapshot so observers may (un)subscribe while handling.
        let observers: Vec<Arc<dyn EventObserver>> = self
            .observers
            .read()
            .await
            .get(&event.event_type)
            .cloned()
            .unwrap_or_default();

        let outcomes = join_all(observers.iter().map(|observer| {
            AssertUnwindSafe(observer.handle(&event)).catch_unwind()
        }))
        .await;

        let mut report = PublishReport::default();
        for (observer, outcome) in observers.iter().zip(outcomes) {
            match outcome {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    METRICS.inc_observer_failures();
                    obs::emit_observer_failed(event.event_type.as_str(), observer.name(), &e);
                }
                Err(panic) => {
                    report.failed += 1;
                    METRICS.inc_observer_failures();
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "observer panicked".to_string());
                    obs::emit_observer_failed(
                        event.event_type.as_str(),
                        observer.name(),
                        &format!("panic: {message}"),
                    );
                }
            }
        }

        METRICS.inc_events_published();
        obs::emit_event_published(event.event_type.as_str(), report.delivered, report.failed);
        report
    }
}
