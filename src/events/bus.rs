//! # Event bus for broadcasting job events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`] so that the supervisor and the dispatcher
//! can publish without ever waiting on observers.
//!
//! ## Architecture
//! ```text
//! Publishers:                          Consumers:
//!   JobSupervisor::run_once ──┐
//!   Dispatcher              ──┼──► Bus ──► subscriber listener ──► SubscriberSet
//!   SubscriberSet workers   ──┘        └─► Bus::subscribe() (tests, custom tooling)
//! ```
//!
//! ## Rules
//! - `publish()` never blocks.
//! - Events sent while nobody listens are dropped; the bus is not a durable log.
//! - Slow receivers observe `RecvError::Lagged(n)` and skip the `n` oldest events.
//!
//! Cross-invocation state never travels over the bus: each invocation may run in a
//! different process, so durable progress lives in the job record only.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for job events.
///
/// Cheap to clone; every clone publishes into the same ring buffer.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given ring buffer capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to every active receiver.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver that observes events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of receivers currently attached.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn subscribers_only_see_later_events() {
        let bus = Bus::new(8);
        bus.publish(Event::new(EventKind::InvocationStarted));

        let mut rx = bus.subscribe();
        assert_eq!(bus.receiver_count(), 1);
        bus.publish(Event::new(EventKind::ContinuationRequested).with_invocation(2));

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::ContinuationRequested);
        assert_eq!(ev.invocation, Some(2));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::InvocationStarted));
    }
}
