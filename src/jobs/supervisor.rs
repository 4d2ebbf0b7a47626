//! # JobSupervisor: bounded-time invocations of a long-running job.
//!
//! A [`JobSupervisor`] runs **one invocation** of a job per [`run_once`](JobSupervisor::run_once)
//! call. It asks the [`BatchProcessor`] to handle at most `max_batch_size` items and then
//! decides what happens next. It holds no state between invocations: every decision is
//! derived from the [`Invocation`] it is handed.
//!
//! ## Decision table
//! ```text
//! outcome                    tracked (job_id)                        untracked
//! ─────────────────────────  ──────────────────────────────────────  ─────────────────────────
//! Incomplete, n <  max       fire_and_forget(n + 1)                  fire_and_forget(n + 1)
//! Incomplete, n >= max       status FINISHED_FAILURE_MAX_INVOCATIONS stop
//! CompleteSuccess            [finalize if notify] → FINISHED_SUCCESS stop
//! CompleteExternalFailure    status UNKNOWN_FAILURE                  stop
//! ```
//!
//! The continuation is handed off and never awaited. Notifications and status writes
//! only happen in the invocation that observes a terminal outcome.
//!
//! ## Concurrent continuations
//! Nothing prevents two invocations of the same job from running at the same time (a
//! starter may deliver a continuation twice). Correctness relies on the processor being
//! idempotent; the supervisor takes no locks and reads no prior status.
//!
//! ## Events
//! Every decision is published on the supervisor's [`Bus`]; see [`EventKind`] for the
//! fields each kind carries.

use std::borrow::Cow;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span, warn};

use crate::config::JobConfig;
use crate::error::JobError;
use crate::events::{Bus, Event, EventKind};
use crate::jobs::builder::JobSupervisorBuilder;
use crate::jobs::invocation::Invocation;
use crate::jobs::model::{BatchOutcome, InvocationReport, JobId, JobStatus, StopReason};
use crate::jobs::ports::{BatchProcessor, ContinuationStarter, FinalizeSuccess, StatusStore};
use crate::subscribers::SubscriberSet;

pub(crate) struct Parts<A> {
    pub(crate) name: Cow<'static, str>,
    pub(crate) cfg: JobConfig,
    pub(crate) processor: Arc<dyn BatchProcessor<A>>,
    pub(crate) starter: Arc<dyn ContinuationStarter<A>>,
    pub(crate) store: Option<Arc<dyn StatusStore>>,
    pub(crate) finalizer: Option<Arc<dyn FinalizeSuccess<A>>>,
    pub(crate) bus: Bus,
    pub(crate) subs: Arc<SubscriberSet>,
    pub(crate) listener: CancellationToken,
}

/// Drives one job type, one invocation at a time.
pub struct JobSupervisor<A> {
    name: Cow<'static, str>,
    cfg: JobConfig,
    processor: Arc<dyn BatchProcessor<A>>,
    starter: Arc<dyn ContinuationStarter<A>>,
    store: Option<Arc<dyn StatusStore>>,
    finalizer: Option<Arc<dyn FinalizeSuccess<A>>>,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    listener: CancellationToken,
}

impl<A> JobSupervisor<A>
where
    A: Clone + Send + Sync + 'static,
{
    /// Returns a builder for a supervisor with the given configuration.
    pub fn builder(cfg: JobConfig) -> JobSupervisorBuilder<A> {
        JobSupervisorBuilder::new(cfg)
    }

    pub(crate) fn from_parts(parts: Parts<A>) -> Self {
        Self {
            name: parts.name,
            cfg: parts.cfg,
            processor: parts.processor,
            starter: parts.starter,
            store: parts.store,
            finalizer: parts.finalizer,
            bus: parts.bus,
            subs: parts.subs,
            listener: parts.listener,
        }
    }

    /// Runs one invocation and reports the decision taken.
    ///
    /// Collaborator failures (status store, finalizer) are returned as-is and are not
    /// retried. Reaching the invocation ceiling or an external failure are reported as
    /// regular [`InvocationReport`]s.
    pub async fn run_once(&self, invocation: &Invocation<A>) -> Result<InvocationReport, JobError> {
        let span = info_span!(
            "run_once",
            job = %self.name,
            correlation_id = %invocation.correlation_id,
            invocation = invocation.invocation_number,
            job_id = invocation.job_id.map(|id| id.0),
            tracked = invocation.is_tracked(),
            batch_limit = ?self.cfg.batch_limit(),
        );
        self.drive(invocation).instrument(span).await
    }

    async fn drive(&self, invocation: &Invocation<A>) -> Result<InvocationReport, JobError> {
        self.bus.publish(
            self.event(invocation, EventKind::InvocationStarted)
                .with_batch_size(self.cfg.max_batch_size),
        );

        let outcome = self
            .processor
            .process(&invocation.args, self.cfg.max_batch_size)
            .await;
        self.bus.publish(
            self.event(invocation, EventKind::BatchProcessed)
                .with_outcome(outcome),
        );

        match outcome {
            BatchOutcome::Incomplete => self.on_incomplete(invocation).await,
            BatchOutcome::CompleteSuccess => self.on_success(invocation).await,
            BatchOutcome::CompleteExternalFailure => self.on_external_failure(invocation).await,
        }
    }

    async fn on_incomplete(&self, invocation: &Invocation<A>) -> Result<InvocationReport, JobError> {
        let max = self.cfg.max_invocations;
        if invocation.invocation_number >= max {
            self.bus.publish(
                self.event(invocation, EventKind::MaxInvocationsReached)
                    .with_max_invocations(max),
            );
            return match invocation.job_id {
                Some(job_id) => {
                    self.write_status(invocation, job_id, JobStatus::FinishedFailureMaxInvocations)
                        .await
                }
                None => Ok(self.stop_untracked(
                    invocation,
                    BatchOutcome::Incomplete,
                    StopReason::MaxInvocationsReached,
                )),
            };
        }

        let next = invocation.next();
        let next_invocation = next.invocation_number;
        self.starter.fire_and_forget(next);
        self.bus.publish(
            self.event(invocation, EventKind::ContinuationRequested)
                .with_invocation(next_invocation)
                .with_max_invocations(max),
        );
        Ok(InvocationReport::ContinuationRequested { next_invocation })
    }

    async fn on_success(&self, invocation: &Invocation<A>) -> Result<InvocationReport, JobError> {
        let Some(job_id) = invocation.job_id else {
            return Ok(self.stop_untracked(
                invocation,
                BatchOutcome::CompleteSuccess,
                StopReason::Completed,
            ));
        };

        match (&self.finalizer, invocation.send_notifications) {
            (Some(finalizer), true) => {
                for recipient in finalizer.finalize(invocation).await? {
                    self.bus.publish(
                        self.event(invocation, EventKind::NotificationSent)
                            .with_reason(recipient),
                    );
                }
            }
            (None, true) => debug!("notifications requested but no finalizer is configured"),
            (_, false) => debug!("notifications disabled for this job"),
        }

        self.write_status(invocation, job_id, JobStatus::FinishedSuccess)
            .await
    }

    async fn on_external_failure(
        &self,
        invocation: &Invocation<A>,
    ) -> Result<InvocationReport, JobError> {
        self.bus
            .publish(self.event(invocation, EventKind::ExternalFailure));

        match invocation.job_id {
            Some(job_id) => {
                self.write_status(invocation, job_id, JobStatus::UnknownFailure)
                    .await
            }
            None => Ok(self.stop_untracked(
                invocation,
                BatchOutcome::CompleteExternalFailure,
                StopReason::ExternalFailure,
            )),
        }
    }

    async fn write_status(
        &self,
        invocation: &Invocation<A>,
        job_id: JobId,
        status: JobStatus,
    ) -> Result<InvocationReport, JobError> {
        let store = self
            .store
            .as_ref()
            .ok_or(JobError::StatusStoreMissing { job_id })?;
        store
            .update_status(job_id, status)
            .await
            .map_err(|source| JobError::Store { job_id, source })?;

        self.bus.publish(
            self.event(invocation, EventKind::JobFinalized)
                .with_status(status),
        );
        Ok(InvocationReport::Finalized { job_id, status })
    }

    fn stop_untracked(
        &self,
        invocation: &Invocation<A>,
        outcome: BatchOutcome,
        reason: StopReason,
    ) -> InvocationReport {
        self.bus.publish(
            self.event(invocation, EventKind::UntrackedJobStopped)
                .with_outcome(outcome),
        );
        InvocationReport::Stopped(reason)
    }

    fn event(&self, invocation: &Invocation<A>, kind: EventKind) -> Event {
        Event::new(kind)
            .with_job(invocation.job_id)
            .with_correlation(invocation.correlation_id.as_str())
            .with_invocation(invocation.invocation_number)
    }
}

impl<A> JobSupervisor<A> {
    /// Job type name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Active configuration.
    pub fn config(&self) -> &JobConfig {
        &self.cfg
    }

    /// Event bus the supervisor publishes to.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Number of configured subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subs.len()
    }
}

impl<A> Drop for JobSupervisor<A> {
    fn drop(&mut self) {
        self.listener.cancel();
    }
}

/// Subscribes to the bus and forwards events to the subscriber set until `token` is
/// cancelled.
pub(crate) fn subscriber_listener(bus: &Bus, subs: Arc<SubscriberSet>, token: CancellationToken) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(ev) => subs.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "subscriber listener lagged behind the bus");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
    });
}
