//! # External collaborators of the job supervisor.
//!
//! The supervisor owns none of the real work. It drives these traits:
//!
//! | Trait                      | Called                               | Blocking? |
//! |----------------------------|--------------------------------------|-----------|
//! | [`BatchProcessor`]         | once per invocation                  | awaited   |
//! | [`ContinuationStarter`]    | when work remains below the ceiling  | never     |
//! | [`StatusStore`]            | once, when a tracked job ends        | awaited   |
//! | [`FinalizeSuccess`]        | on tracked success with notifications| awaited   |
//! | [`RecipientDirectory`]     | by [`NotifyRecipients`](crate::NotifyRecipients) | awaited |
//! | [`Notifier`]               | once per eligible recipient          | awaited   |
//!
//! Processors must be idempotent: nothing prevents two continuations of the same job
//! from running at the same time.

use async_trait::async_trait;

use crate::error::{JobError, NotifyError, StoreError};
use crate::jobs::invocation::Invocation;
use crate::jobs::model::{BatchOutcome, JobId, JobStatus};

/// Processes up to a bounded number of outstanding items for one job.
#[async_trait]
pub trait BatchProcessor<A>: Send + Sync + 'static {
    /// Processes at most `max_items` items (`0` = no limit) and reports whether work remains.
    async fn process(&self, args: &A, max_items: usize) -> BatchOutcome;
}

/// Causes another invocation to run later, somewhere.
///
/// Implementations must return immediately and never fail the caller; delivery is best
/// effort and may happen zero, one or several times.
pub trait ContinuationStarter<A>: Send + Sync + 'static {
    /// Hands `next` off for execution.
    fn fire_and_forget(&self, next: Invocation<A>);
}

/// Durable job record store.
#[async_trait]
pub trait StatusStore: Send + Sync + 'static {
    /// Writes the job status. Durable once this returns `Ok`.
    async fn update_status(&self, job_id: JobId, status: JobStatus) -> Result<(), StoreError>;
}

/// Side effect run before a tracked job is marked successful.
#[async_trait]
pub trait FinalizeSuccess<A>: Send + Sync + 'static {
    /// Runs the side effect and returns the addresses that were notified.
    async fn finalize(&self, invocation: &Invocation<A>) -> Result<Vec<String>, JobError>;
}

/// Someone who may receive a completion notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    /// Delivery address.
    pub address: String,
    /// Account membership was removed.
    pub removed: bool,
    /// Holds the permission that entitles them to job notifications.
    pub permitted: bool,
}

impl Recipient {
    /// An active, permitted recipient.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            removed: false,
            permitted: true,
        }
    }

    /// Only active recipients holding the permission are notified.
    pub fn is_eligible(&self) -> bool {
        !self.removed && self.permitted
    }
}

/// Looks up the candidate recipients for a job.
#[async_trait]
pub trait RecipientDirectory<A>: Send + Sync + 'static {
    /// Returns every candidate; eligibility is filtered by the caller.
    async fn recipients(&self, args: &A) -> Result<Vec<Recipient>, NotifyError>;
}

/// Sends one completion notification.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Delivers a notification to `address`.
    async fn send(&self, address: &str) -> Result<(), NotifyError>;
}
