//! # Dispatcher: runs continuations posted to a continuation channel.
//!
//! ```text
//! loop:
//!   ├─ token cancelled      ─► stop ("cancelled")
//!   ├─ termination signal   ─► stop ("signal")         (serve_until_signal only)
//!   └─ channel.recv()
//!        ├─ Some(invocation) ─► supervisor.run_once(&invocation)   (one at a time)
//!        └─ None             ─► stop ("channel_closed")
//! ```
//!
//! An invocation that is already running is always finished before a stop request is
//! observed. On exit a [`EventKind::DispatcherStopped`] event is published.
//!
//! The supervisor keeps a [`ChannelStarter`](crate::ChannelStarter) to its own channel,
//! so the channel only closes once the supervisor (and every other starter clone) is
//! gone; long-running services stop through the token or a signal.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::events::{Event, EventKind};
use crate::jobs::invocation::Invocation;
use crate::jobs::shutdown::ShutdownSignal;
use crate::jobs::starter::ContinuationReceiver;
use crate::jobs::supervisor::JobSupervisor;

/// What a dispatcher did before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Invocations handed to `run_once`.
    pub processed: usize,
    /// Invocations whose chain ended (terminal status written or untracked stop).
    pub finished: usize,
    /// Invocations that returned an error.
    pub failed: usize,
}

/// Consumes a continuation channel and runs each invocation on a supervisor.
pub struct Dispatcher<A> {
    supervisor: Arc<JobSupervisor<A>>,
    rx: ContinuationReceiver<A>,
}

impl<A> Dispatcher<A>
where
    A: Clone + Send + Sync + 'static,
{
    /// Creates a dispatcher.
    pub fn new(supervisor: Arc<JobSupervisor<A>>, rx: ContinuationReceiver<A>) -> Self {
        Self { supervisor, rx }
    }

    /// Runs until the channel closes or `token` is cancelled.
    pub async fn run(self, token: CancellationToken) -> DispatchSummary {
        self.drive(token, std::future::pending()).await
    }

    /// Runs until the channel closes or a termination signal arrives.
    ///
    /// Fails only if the signal listeners cannot be registered.
    pub async fn serve_until_signal(self) -> std::io::Result<DispatchSummary> {
        let mut signal = ShutdownSignal::register()?;
        let received = async move {
            let name = signal.recv().await;
            info!(signal = name, "termination signal received");
        };
        Ok(self.drive(CancellationToken::new(), received).await)
    }

    async fn drive<S>(mut self, token: CancellationToken, signal: S) -> DispatchSummary
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(signal);
        let mut summary = DispatchSummary::default();

        let reason = loop {
            tokio::select! {
                _ = token.cancelled() => break "cancelled",
                _ = &mut signal => break "signal",
                msg = self.rx.recv() => match msg {
                    Some(invocation) => self.dispatch(&invocation, &mut summary).await,
                    None => break "channel_closed",
                },
            }
        };

        info!(
            reason,
            processed = summary.processed,
            finished = summary.finished,
            failed = summary.failed,
            "dispatcher stopped"
        );
        self.supervisor
            .bus()
            .publish(Event::new(EventKind::DispatcherStopped).with_reason(reason));
        summary
    }

    async fn dispatch(&self, invocation: &Invocation<A>, summary: &mut DispatchSummary) {
        summary.processed += 1;
        match self.supervisor.run_once(invocation).await {
            Ok(report) if report.is_final() => summary.finished += 1,
            Ok(_) => {}
            Err(e) => {
                summary.failed += 1;
                error!(
                    correlation_id = %invocation.correlation_id,
                    invocation = invocation.invocation_number,
                    error = %e.as_message(),
                    label = e.as_label(),
                    "invocation failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JobConfig;
    use crate::jobs::args::RegistrationArgs;
    use crate::jobs::model::{BatchOutcome, JobId};
    use crate::jobs::ports::{BatchProcessor, ContinuationStarter};
    use crate::jobs::starter::continuation_channel;
    use async_trait::async_trait;

    struct Always(BatchOutcome);

    #[async_trait]
    impl BatchProcessor<RegistrationArgs> for Always {
        async fn process(&self, _args: &RegistrationArgs, _max: usize) -> BatchOutcome {
            self.0
        }
    }

    fn args() -> RegistrationArgs {
        RegistrationArgs::new("uploads", "fleet.csv")
    }

    #[tokio::test]
    async fn stops_when_channel_closes() {
        let (starter, rx) = continuation_channel::<RegistrationArgs>();
        let (unused, _unused_rx) = continuation_channel::<RegistrationArgs>();
        let sup = JobSupervisor::<RegistrationArgs>::builder(JobConfig::registration())
            .processor(Arc::new(Always(BatchOutcome::CompleteSuccess)))
            .continuation(Arc::new(unused))
            .build()
            .unwrap();
        let mut events = sup.bus().subscribe();

        starter.fire_and_forget(Invocation::first(args()));
        starter.fire_and_forget(Invocation::first(args()));
        drop(starter);

        let summary = Dispatcher::new(sup, rx).run(CancellationToken::new()).await;
        assert_eq!(
            summary,
            DispatchSummary {
                processed: 2,
                finished: 2,
                failed: 0
            }
        );

        let mut stopped = None;
        while let Ok(ev) = events.try_recv() {
            if ev.kind == EventKind::DispatcherStopped {
                stopped = ev.reason.clone();
            }
        }
        assert_eq!(stopped.as_deref(), Some("channel_closed"));
    }

    #[tokio::test]
    async fn follows_chain_until_ceiling_then_cancel() {
        let (starter, rx) = continuation_channel::<RegistrationArgs>();
        let sup = JobSupervisor::<RegistrationArgs>::builder(JobConfig {
            max_invocations: 3,
            ..JobConfig::registration()
        })
        .processor(Arc::new(Always(BatchOutcome::Incomplete)))
        .continuation(Arc::new(starter.clone()))
        .build()
        .unwrap();

        let mut events = sup.bus().subscribe();
        starter.fire_and_forget(Invocation::first(args()));
        let token = CancellationToken::new();
        let handle = tokio::spawn(Dispatcher::new(sup.clone(), rx).run(token.clone()));

        loop {
            let ev = events.recv().await.unwrap();
            if ev.kind == EventKind::UntrackedJobStopped {
                assert_eq!(ev.invocation, Some(3));
                break;
            }
        }
        token.cancel();

        let summary = handle.await.unwrap();
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.finished, 1);
        assert_eq!(summary.processed, 3);
    }

    #[tokio::test]
    async fn errors_are_counted_not_fatal() {
        let (starter, rx) = continuation_channel::<RegistrationArgs>();
        let (unused, _unused_rx) = continuation_channel::<RegistrationArgs>();
        let sup = JobSupervisor::<RegistrationArgs>::builder(JobConfig::registration())
            .processor(Arc::new(Always(BatchOutcome::CompleteExternalFailure)))
            .continuation(Arc::new(unused))
            .build()
            .unwrap();

        // Tracked, but no status store is configured.
        starter.fire_and_forget(Invocation::first(args()).tracked(JobId(5)));
        starter.fire_and_forget(Invocation::first(args()));
        drop(starter);

        let summary = Dispatcher::new(sup, rx).run(CancellationToken::new()).await;
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.finished, 1);
    }
}
