//! # Async operations and the call coordinator.
//!
//! This module provides:
//! - [`Call`] - trait for an outbound call that can be issued repeatedly
//! - [`CallFn`] - closure-backed call
//! - [`HttpCall`] - `reqwest`-backed call (feature `http-call`)
//! - [`Completion`] - single-writer completion cell resolved by `on_success`/`on_failure`
//! - [`AsyncOp`] - one outstanding call with start/cancel/complete semantics
//! - [`CallCoordinator`] - starts and awaits groups of operations with a deadline
//!
//! ## Lifecycle
//! ```text
//! AsyncOp::new(id, call) ──► start() ──► call.issue(token) on a tokio task
//!                              │              │
//!                              │              ├─ Ok(resp)  ─► completion.on_success(status, value)
//!                              │              └─ Err(fail) ─► completion.on_failure(status, msg)
//!                              │
//!                              └─ start() again: cancel old signal + token, abort task,
//!                                 fresh completion, issue again
//!
//! CallCoordinator::await_all(ops, timeout)
//!   ├─ any op not started ─► CallError::NotStarted (fail fast)
//!   ├─ all signals resolved ─► Ok(())
//!   ├─ deadline elapsed     ─► CallError::Timeout { pending }
//!   └─ wait cancelled       ─► CallError::Interrupted
//! ```

mod call;
mod call_fn;
mod completion;
mod coordinator;
mod op;

#[cfg(feature = "http-call")]
mod http_call;

pub use call::{BoxCallFuture, Call, CallFailure, CallRef, CallResponse};
pub use call_fn::CallFn;
pub use completion::{Completion, Outcome, Signal, SignalState};
pub use coordinator::CallCoordinator;
#[cfg(feature = "http-call")]
pub use http_call::HttpCall;
pub use op::{AsyncOp, Awaitable};
