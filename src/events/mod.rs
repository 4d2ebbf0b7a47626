//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the job supervisor, the dispatcher
//! and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `JobSupervisor::run_once`, `Dispatcher`, `SubscriberSet` workers.
//! - **Consumers**: the supervisor's subscriber listener (fans out to `SubscriberSet`)
//!   and anything that calls [`Bus::subscribe`] directly.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
