//! # Event subscriber trait.
//!
//! Each subscriber gets a dedicated worker task and its own bounded queue
//! (capacity via [`Subscribe::queue_capacity`]). Panics are caught and reported as
//! `EventKind::SubscriberPanicked`; a full queue drops the event for that subscriber only
//! and reports `EventKind::SubscriberOverflow`.

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber for job observability.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
/// - Slow processing affects only this subscriber's queue.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event, in FIFO order per subscriber.
    async fn on_event(&self, event: &Event);

    /// Name used in overflow/panic events.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred queue capacity (clamped to a minimum of 1). Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
