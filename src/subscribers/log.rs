//! # LogWriter: renders job events through `tracing`
//!
//! Install a `tracing` subscriber in the host (e.g. `tracing_subscriber::fmt()`) to see
//! the output.
//!
//! ## Example output
//! ```text
//! INFO  invocation started job_id=97244 correlation_id="c-1" invocation=4 batch_size=20
//! INFO  work remains, continuation requested job_id=97244 correlation_id="c-1" next_invocation=5 max_invocations=10
//! WARN  invocation ceiling reached, stopping job_id=97244 correlation_id="c-1" invocation=10 max_invocations=10
//! INFO  job finalized job_id=97244 correlation_id="c-1" status=FINISHED_SUCCESS
//! ```

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let job_id = e.job_id.map(|id| id.0);
        let correlation_id = e.correlation_id.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::InvocationStarted => {
                info!(?job_id, correlation_id, invocation = e.invocation, batch_size = e.batch_size, "invocation started");
            }
            EventKind::BatchProcessed => {
                info!(?job_id, correlation_id, invocation = e.invocation, outcome = ?e.outcome, "batch processed");
            }
            EventKind::ContinuationRequested => {
                info!(
                    ?job_id,
                    correlation_id,
                    next_invocation = e.invocation,
                    max_invocations = e.max_invocations,
                    "work remains, continuation requested"
                );
            }
            EventKind::MaxInvocationsReached => {
                warn!(
                    ?job_id,
                    correlation_id,
                    invocation = e.invocation,
                    max_invocations = e.max_invocations,
                    "invocation ceiling reached, stopping"
                );
            }
            EventKind::ExternalFailure => {
                warn!(?job_id, correlation_id, invocation = e.invocation, "external service call failed, stopping");
            }
            EventKind::NotificationSent => {
                info!(?job_id, correlation_id, recipient = e.reason.as_deref(), "completion notification sent");
            }
            EventKind::JobFinalized => {
                info!(?job_id, correlation_id, status = e.status.map(|s| s.as_label()), "job finalized");
            }
            EventKind::UntrackedJobStopped => {
                info!(correlation_id, invocation = e.invocation, outcome = ?e.outcome, "untracked job stopped, nothing to record");
            }
            EventKind::DispatcherStopped => {
                info!(reason = e.reason.as_deref(), "continuation dispatcher stopped");
            }
            EventKind::SubscriberOverflow => {
                warn!(reason = e.reason.as_deref(), "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                error!(reason = e.reason.as_deref(), "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{BatchOutcome, JobId, JobStatus};

    #[tokio::test]
    async fn renders_every_kind_without_panicking() {
        let writer = LogWriter::new();
        for kind in [
            EventKind::InvocationStarted,
            EventKind::BatchProcessed,
            EventKind::ContinuationRequested,
            EventKind::MaxInvocationsReached,
            EventKind::ExternalFailure,
            EventKind::NotificationSent,
            EventKind::JobFinalized,
            EventKind::UntrackedJobStopped,
            EventKind::DispatcherStopped,
            EventKind::SubscriberOverflow,
            EventKind::SubscriberPanicked,
        ] {
            let ev = Event::new(kind)
                .with_job(Some(JobId(1)))
                .with_correlation("c")
                .with_outcome(BatchOutcome::Incomplete)
                .with_status(JobStatus::FinishedSuccess);
            writer.on_event(&ev).await;
        }
        assert_eq!(writer.name(), "log-writer");
    }
}
