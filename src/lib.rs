//! # jobvisor
//!
//! **Jobvisor** runs long jobs as a chain of short, bounded invocations, and coordinates
//! groups of outbound async calls.
//!
//! Each invocation processes at most `max_batch_size` items. If work remains, it hands
//! the next invocation to a continuation starter and returns; the chain ends when the
//! work completes, an external service fails, or the invocation ceiling is reached.
//! Progress between invocations lives only in the external job record and in the
//! invocation number, so each invocation may run in a different process.
//!
//! ## Architecture
//! ### Job continuation
//! ```text
//!   Invocation { n, correlation_id, job_id?, send_notifications, args }
//!        │
//!        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  JobSupervisor::run_once                                          │
//! │    outcome = BatchProcessor::process(args, max_batch_size)        │
//! └──────┬────────────────────────────────────────────────────────────┘
//!        ▼
//!   Incomplete, n <  max      ─► ContinuationStarter::fire_and_forget(n + 1)
//!   Incomplete, n >= max      ─► tracked: FINISHED_FAILURE_MAX_INVOCATIONS │ untracked: stop
//!   CompleteSuccess           ─► tracked: [FinalizeSuccess] FINISHED_SUCCESS │ untracked: stop
//!   CompleteExternalFailure   ─► tracked: UNKNOWN_FAILURE │ untracked: stop
//!
//!   Every decision ──► Bus ──► subscriber listener ──► SubscriberSet ──► LogWriter, custom...
//! ```
//!
//! ### Continuation delivery
//! ```text
//! ChannelStarter ──► continuation channel ──► Dispatcher ──► run_once(n + 1) ──► ...
//! LazyStarter    ──► supplier() ──► tokio::spawn(run_once(n + 1)) ──► ...
//! Invocation::to_payload() ──► your queue / function trigger ──► Invocation::from_payload()
//! ```
//!
//! ### Async calls
//! ```text
//! AsyncOp::start() ──► Call::issue(token) on a tokio task ──► Completion (first write wins)
//! CallCoordinator::await_all(ops, timeout) ──► Ok | NotStarted | Timeout { pending } | Interrupted
//! ```
//!
//! ## Features
//! | Area              | Description                                                        | Key types / traits                                   |
//! |-------------------|--------------------------------------------------------------------|------------------------------------------------------|
//! | **Supervision**   | One bounded invocation, then continue, finalize or stop.           | [`JobSupervisor`], [`Invocation`], [`InvocationReport`] |
//! | **Collaborators** | Processor, continuation, status store, notifications.              | [`BatchProcessor`], [`ContinuationStarter`], [`StatusStore`], [`Notifier`] |
//! | **Delivery**      | In-process continuation channel and lazy in-process starter.       | [`ChannelStarter`], [`LazyStarter`], [`Dispatcher`]  |
//! | **Async calls**   | Restartable calls with a single-writer completion cell.            | [`AsyncOp`], [`Call`], [`CallFn`], [`CallCoordinator`] |
//! | **Subscriber API**| Hook into job events (logging, metrics, alerting).                 | [`Subscribe`], [`Event`], [`EventKind`]              |
//! | **Errors**        | Typed errors for calls, invocations and configuration.             | [`CallError`], [`JobError`], [`ConfigError`]         |
//! | **Configuration** | Per-job-type limits and call deadlines.                            | [`JobConfig`], [`CallConfig`]                        |
//!
//! ## Optional features
//! - `http-call` (default): [`HttpCall`], a `reqwest`-backed [`Call`].
//! - `logging` (default): exports the built-in [`LogWriter`] subscriber.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use jobvisor::{
//!     BatchOutcome, BatchProcessor, ChargeCalculationArgs, Dispatcher, Invocation, JobConfig,
//!     JobSupervisor, continuation_channel,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! struct OneShot;
//!
//! #[async_trait]
//! impl BatchProcessor<ChargeCalculationArgs> for OneShot {
//!     async fn process(&self, _args: &ChargeCalculationArgs, _max: usize) -> BatchOutcome {
//!         BatchOutcome::CompleteSuccess
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (starter, rx) = continuation_channel::<ChargeCalculationArgs>();
//!     let sup = JobSupervisor::<ChargeCalculationArgs>::builder(JobConfig::charge_calculation())
//!         .name("charge-calculation")
//!         .processor(Arc::new(OneShot))
//!         .continuation(Arc::new(starter))
//!         .build()?;
//!
//!     let report = sup
//!         .run_once(&Invocation::first(ChargeCalculationArgs::new("acc-1")))
//!         .await?;
//!     assert!(report.is_final());
//!
//!     // Continuations would arrive on `rx`; a service runs them with a dispatcher.
//!     let token = CancellationToken::new();
//!     token.cancel();
//!     Dispatcher::new(sup, rx).run(token).await;
//!     Ok(())
//! }
//! ```
mod calls;
mod config;
mod error;
mod events;
mod jobs;
mod subscribers;

// ---- Public re-exports ----

pub use calls::{
    AsyncOp, Awaitable, BoxCallFuture, Call, CallCoordinator, CallFailure, CallFn, CallRef,
    CallResponse, Completion, Outcome, Signal, SignalState,
};
pub use config::{CallConfig, JobConfig};
pub use error::{CallError, ConfigError, JobError, NotifyError, StoreError};
pub use events::{Bus, Event, EventKind};
pub use jobs::{
    BatchOutcome, BatchProcessor, CacheRefreshArgs, CacheRefreshSupervisor, ChannelStarter,
    ChargeCalculationArgs, ChargeCalculationSupervisor, ContinuationReceiver, ContinuationStarter,
    DispatchSummary, Dispatcher, FinalizeSuccess, Invocation, InvocationReport, JobId, JobStatus,
    JobSupervisor, JobSupervisorBuilder, LazyStarter, Notifier, NotifyRecipients, Recipient,
    RecipientDirectory, RegistrationArgs, RegistrationSupervisor, StatusStore, StopReason,
    SupervisorSlot, continuation_channel,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: HTTP-backed async calls.
// Enable with: `--features http-call`
#[cfg(feature = "http-call")]
pub use calls::HttpCall;

// Optional: built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
