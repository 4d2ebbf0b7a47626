//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`] fan-out used by
//! the [`JobSupervisor`](crate::JobSupervisor) to deliver [`Event`](crate::Event)s
//! without ever blocking an invocation.
//!
//! ## Architecture
//! ```text
//! JobSupervisor ── publish(Event) ──► Bus ──► subscriber listener ──► SubscriberSet
//!                                                                 ┌───────┼───────┐
//!                                                                 ▼       ▼       ▼
//!                                                             LogWriter Metrics Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use async_trait::async_trait;
//! use jobvisor::{Event, EventKind, Subscribe};
//!
//! struct MaxInvocationAlert;
//!
//! #[async_trait]
//! impl Subscribe for MaxInvocationAlert {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::MaxInvocationsReached {
//!             // page someone
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "max-invocation-alert" }
//! }
//! ```

mod set;
mod subscriber;

#[cfg(feature = "logging")]
mod log;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
