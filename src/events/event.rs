//! # Events emitted while supervising job invocations.
//!
//! The [`EventKind`] enum classifies events across three categories:
//! - **Invocation events**: what a single `run_once` observed and decided
//! - **Terminal events**: the job reached (or was stopped at) a terminal state
//! - **Runtime events**: subscriber and dispatcher housekeeping
//!
//! The [`Event`] struct carries the job coordinates (job id, correlation id,
//! invocation number) plus optional details.
//!
//! ## Ordering guarantees
//! Each event has a process-wide unique sequence number (`seq`) that increases
//! monotonically. It orders events of **one process** only; invocations of the same
//! job in other processes keep their own counters.
//!
//! ## Example
//! ```rust
//! use jobvisor::{Event, EventKind, JobStatus};
//!
//! let ev = Event::new(EventKind::JobFinalized)
//!     .with_correlation("corr-1")
//!     .with_invocation(3)
//!     .with_status(JobStatus::FinishedSuccess);
//!
//! assert_eq!(ev.kind, EventKind::JobFinalized);
//! assert_eq!(ev.correlation_id.as_deref(), Some("corr-1"));
//! assert_eq!(ev.status, Some(JobStatus::FinishedSuccess));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::jobs::{BatchOutcome, JobId, JobStatus};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of job events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Invocation events ===
    /// An invocation is about to call the batch processor.
    ///
    /// Sets: `job_id` (if tracked), `correlation_id`, `invocation`, `batch_size`.
    InvocationStarted,

    /// The batch processor returned.
    ///
    /// Sets: `job_id`, `correlation_id`, `invocation`, `outcome`.
    BatchProcessed,

    /// Work remains and the next invocation was handed to the continuation starter.
    ///
    /// Sets: `job_id`, `correlation_id`, `invocation` (the **next** number), `max_invocations`.
    ContinuationRequested,

    /// Work remains but the invocation ceiling was reached; the chain stops here.
    ///
    /// Sets: `job_id`, `correlation_id`, `invocation`, `max_invocations`.
    MaxInvocationsReached,

    /// The processor reported a failed external call; the chain stops here.
    ///
    /// Sets: `job_id`, `correlation_id`, `invocation`.
    ExternalFailure,

    /// One completion notification was delivered.
    ///
    /// Sets: `job_id`, `correlation_id`, `reason` (recipient address).
    NotificationSent,

    // === Terminal events ===
    /// A terminal status was written for a tracked job.
    ///
    /// Sets: `job_id`, `correlation_id`, `invocation`, `status`.
    JobFinalized,

    /// An untracked job reached the end of its chain; there is nothing to record.
    ///
    /// Sets: `correlation_id`, `invocation`, `outcome`.
    UntrackedJobStopped,

    // === Runtime events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `reason` (subscriber name and panic info).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `reason` (subscriber name and cause).
    SubscriberOverflow,

    /// The continuation dispatcher stopped consuming.
    ///
    /// Sets: `reason` (`channel_closed`, `cancelled`, `signal`).
    DispatcherStopped,
}

/// Job event with optional metadata.
///
/// - `seq`: monotonic sequence for ordering within this process
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Process-wide unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Tracked job, if any.
    pub job_id: Option<JobId>,
    /// Correlation id propagated through the whole chain.
    pub correlation_id: Option<Arc<str>>,
    /// Invocation number the event refers to.
    pub invocation: Option<u32>,
    /// Configured invocation ceiling.
    pub max_invocations: Option<u32>,
    /// Items handed to the processor.
    pub batch_size: Option<usize>,
    /// Outcome reported by the processor.
    pub outcome: Option<BatchOutcome>,
    /// Terminal status written to the store.
    pub status: Option<JobStatus>,
    /// Human-readable detail (recipient, overflow cause, stop reason).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            job_id: None,
            correlation_id: None,
            invocation: None,
            max_invocations: None,
            batch_size: None,
            outcome: None,
            status: None,
            reason: None,
        }
    }

    /// Attaches a job id (no-op for `None`, so untracked jobs read naturally).
    #[inline]
    pub fn with_job(mut self, job_id: Option<JobId>) -> Self {
        self.job_id = job_id;
        self
    }

    /// Attaches the correlation id.
    #[inline]
    pub fn with_correlation(mut self, correlation_id: impl Into<Arc<str>>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Attaches an invocation number.
    #[inline]
    pub fn with_invocation(mut self, n: u32) -> Self {
        self.invocation = Some(n);
        self
    }

    /// Attaches the invocation ceiling.
    #[inline]
    pub fn with_max_invocations(mut self, n: u32) -> Self {
        self.max_invocations = Some(n);
        self
    }

    /// Attaches the batch size handed to the processor.
    #[inline]
    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = Some(n);
        self
    }

    /// Attaches the processor outcome.
    #[inline]
    pub fn with_outcome(mut self, outcome: BatchOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Attaches the terminal status.
    #[inline]
    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} info={info}"))
    }

    /// True for events produced by the subscriber machinery itself.
    #[inline]
    pub fn is_subscriber_internal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Event::new(EventKind::InvocationStarted);
        let b = Event::new(EventKind::InvocationStarted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn untracked_job_keeps_job_id_empty() {
        let ev = Event::new(EventKind::UntrackedJobStopped)
            .with_job(None)
            .with_outcome(BatchOutcome::CompleteSuccess);
        assert!(ev.job_id.is_none());
        assert_eq!(ev.outcome, Some(BatchOutcome::CompleteSuccess));
    }

    #[test]
    fn subscriber_events_are_flagged() {
        assert!(Event::subscriber_overflow("log", "full").is_subscriber_internal());
        assert!(Event::subscriber_panicked("log", "boom".into()).is_subscriber_internal());
        assert!(!Event::new(EventKind::JobFinalized).is_subscriber_internal());
    }
}
