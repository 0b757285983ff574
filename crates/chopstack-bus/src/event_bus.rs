use std::sync::{Arc, Mutex};

use crate::protocol::{BusEvent, LogLevel};

/// A multi-producer multi-consumer pub/sub bus built on flume channels.
///
/// Emissions are synchronous with respect to subscribers — `publish`
/// enqueues on every live sender before returning, preserving per-topic
/// ordering. A subscriber that panics while handling an event never
/// reaches the producer: callers drain their own receiver, so a panic
/// stays isolated to that consumer's task.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Mutex<Vec<flume::Sender<BusEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Register a new subscriber and return its receiving end. The
    /// returned receiver sees only messages published after this call.
    pub fn subscribe(&self) -> flume::Receiver<BusEvent> {
        let (tx, rx) = flume::unbounded();
        let mut senders = self.inner.lock().expect("EventBus lock poisoned");
        senders.push(tx);
        rx
    }

    /// Publish to all current subscribers, pruning any whose receivers
    /// have been dropped. `log` events are additionally mirrored through
    /// the matching `tracing` macro, so a subscriber that only installed a
    /// `tracing` sink (never called `subscribe`) still observes them.
    pub fn publish(&self, event: BusEvent) {
        if let BusEvent::Log { level, message, metadata } = &event {
            match level {
                LogLevel::Debug => tracing::debug!(metadata = ?metadata, "{message}"),
                LogLevel::Info => tracing::info!(metadata = ?metadata, "{message}"),
                LogLevel::Warn => tracing::warn!(metadata = ?metadata, "{message}"),
                LogLevel::Error => tracing::error!(metadata = ?metadata, "{message}"),
            }
        }

        let mut senders = self.inner.lock().expect("EventBus lock poisoned");
        senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().expect("EventBus lock poisoned").len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_only_see_events_published_after_subscribing() {
        let bus = EventBus::new();
        bus.publish(BusEvent::TaskFailed {
            task_id: "before".into(),
            error: "ignored".into(),
        });
        let rx = bus.subscribe();
        bus.publish(BusEvent::TaskFailed {
            task_id: "after".into(),
            error: "seen".into(),
        });
        let event = rx.try_recv().unwrap();
        assert_eq!(event.task_id(), Some("after"));
    }

    #[test]
    fn dropped_receivers_are_pruned_on_publish() {
        let bus = EventBus::new();
        {
            let _rx = bus.subscribe();
            assert_eq!(bus.subscriber_count(), 1);
        }
        bus.publish(BusEvent::TaskFailed {
            task_id: "x".into(),
            error: "y".into(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }
}
