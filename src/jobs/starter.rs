//! # Continuation starters.
//!
//! Two in-process implementations of [`ContinuationStarter`]:
//!
//! - [`ChannelStarter`]: sends the next [`Invocation`] into a continuation channel that a
//!   [`Dispatcher`](crate::Dispatcher) consumes. This is the outbound-message form.
//! - [`LazyStarter`]: spawns `run_once` directly on a supervisor obtained from a lazy
//!   supplier. The supplier breaks the construction cycle
//!   (supervisor → starter → supervisor).
//!
//! ```text
//! ChannelStarter ── send(next) ──► [unbounded channel] ──► Dispatcher ──► run_once(next)
//!
//! LazyStarter ── supplier() ──► Arc<JobSupervisor> ──► tokio::spawn(run_once(next))
//! ```
//!
//! Neither starter blocks or fails the caller; delivery problems are logged and the
//! continuation is dropped.

use std::sync::{Arc, OnceLock, Weak};

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::jobs::invocation::Invocation;
use crate::jobs::ports::ContinuationStarter;
use crate::jobs::supervisor::JobSupervisor;

/// Receiving half of a continuation channel.
pub type ContinuationReceiver<A> = mpsc::UnboundedReceiver<Invocation<A>>;

/// Creates a continuation channel.
///
/// The channel is unbounded so that `fire_and_forget` never waits.
pub fn continuation_channel<A>() -> (ChannelStarter<A>, ContinuationReceiver<A>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelStarter { tx }, rx)
}

/// Starter that posts continuations to a channel.
pub struct ChannelStarter<A> {
    tx: mpsc::UnboundedSender<Invocation<A>>,
}

impl<A> Clone for ChannelStarter<A> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<A> ChannelStarter<A> {
    /// True once the receiving side was dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<A: Send + Sync + 'static> ContinuationStarter<A> for ChannelStarter<A> {
    fn fire_and_forget(&self, next: Invocation<A>) {
        let invocation = next.invocation_number;
        if let Err(mpsc::error::SendError(lost)) = self.tx.send(next) {
            error!(
                correlation_id = %lost.correlation_id,
                invocation,
                "continuation channel closed; continuation dropped"
            );
        }
    }
}

type Supplier<A> = dyn Fn() -> Option<Arc<JobSupervisor<A>>> + Send + Sync;

/// Starter that runs the continuation in-process on a lazily supplied supervisor.
pub struct LazyStarter<A> {
    supplier: Arc<Supplier<A>>,
}

impl<A> LazyStarter<A> {
    /// Creates a starter from a supplier that is consulted on every continuation.
    pub fn new<F>(supplier: F) -> Self
    where
        F: Fn() -> Option<Arc<JobSupervisor<A>>> + Send + Sync + 'static,
    {
        Self {
            supplier: Arc::new(supplier),
        }
    }

    /// Creates a starter backed by an empty slot, to be filled once the supervisor exists.
    ///
    /// The slot keeps a weak reference, so the starter never keeps its own supervisor alive.
    pub fn with_slot() -> (Self, SupervisorSlot<A>)
    where
        A: 'static,
    {
        let slot = SupervisorSlot {
            inner: Arc::new(OnceLock::new()),
        };
        let reader = Arc::clone(&slot.inner);
        let starter = Self::new(move || reader.get().and_then(Weak::upgrade));
        (starter, slot)
    }
}

impl<A> ContinuationStarter<A> for LazyStarter<A>
where
    A: Clone + Send + Sync + 'static,
{
    fn fire_and_forget(&self, next: Invocation<A>) {
        let Some(supervisor) = (self.supplier)() else {
            error!(
                correlation_id = %next.correlation_id,
                invocation = next.invocation_number,
                "supervisor not available; continuation dropped"
            );
            return;
        };
        let Ok(runtime) = Handle::try_current() else {
            error!(
                correlation_id = %next.correlation_id,
                invocation = next.invocation_number,
                "no tokio runtime; continuation dropped"
            );
            return;
        };

        runtime.spawn(async move {
            match supervisor.run_once(&next).await {
                Ok(report) => debug!(?report, "continuation finished"),
                Err(e) => error!(error = %e.as_message(), label = e.as_label(), "continuation failed"),
            }
        });
    }
}

/// Write-once slot holding the supervisor a [`LazyStarter`] resolves.
pub struct SupervisorSlot<A> {
    inner: Arc<OnceLock<Weak<JobSupervisor<A>>>>,
}

impl<A> SupervisorSlot<A> {
    /// Stores the supervisor. Returns `false` if the slot was already filled.
    pub fn fill(&self, supervisor: &Arc<JobSupervisor<A>>) -> bool {
        self.inner.set(Arc::downgrade(supervisor)).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JobConfig;
    use crate::error::StoreError;
    use crate::jobs::args::CacheRefreshArgs;
    use crate::jobs::model::{BatchOutcome, JobId, JobStatus};
    use crate::jobs::ports::{BatchProcessor, StatusStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    #[tokio::test]
    async fn channel_starter_delivers_in_order() {
        let (starter, mut rx) = continuation_channel::<CacheRefreshArgs>();
        let first = Invocation::first_with_correlation("c", CacheRefreshArgs::default());
        starter.fire_and_forget(first.next());
        starter.fire_and_forget(first.next().next());

        assert_eq!(rx.recv().await.unwrap().invocation_number, 2);
        assert_eq!(rx.recv().await.unwrap().invocation_number, 3);
    }

    #[test]
    fn channel_starter_survives_closed_channel() {
        let (starter, rx) = continuation_channel::<CacheRefreshArgs>();
        drop(rx);
        assert!(starter.is_closed());
        starter.fire_and_forget(Invocation::first(CacheRefreshArgs::default()));
    }

    #[test]
    fn lazy_starter_without_supervisor_drops_continuation() {
        let (starter, _slot) = LazyStarter::<CacheRefreshArgs>::with_slot();
        starter.fire_and_forget(Invocation::first(CacheRefreshArgs::default()));
    }

    /// Incomplete until the third run.
    struct Countdown(AtomicU32);

    #[async_trait]
    impl BatchProcessor<CacheRefreshArgs> for Countdown {
        async fn process(&self, _args: &CacheRefreshArgs, _max: usize) -> BatchOutcome {
            if self.0.fetch_add(1, Ordering::SeqCst) + 1 < 3 {
                BatchOutcome::Incomplete
            } else {
                BatchOutcome::CompleteSuccess
            }
        }
    }

    struct SignalStore(Arc<Notify>);

    #[async_trait]
    impl StatusStore for SignalStore {
        async fn update_status(&self, _job: JobId, status: JobStatus) -> Result<(), StoreError> {
            assert_eq!(status, JobStatus::FinishedSuccess);
            self.0.notify_one();
            Ok(())
        }
    }

    #[tokio::test]
    async fn lazy_starter_runs_chain_in_process() {
        let done = Arc::new(Notify::new());
        let (starter, slot) = LazyStarter::<CacheRefreshArgs>::with_slot();
        let sup = JobSupervisor::<CacheRefreshArgs>::builder(JobConfig::cache_refresh())
            .processor(Arc::new(Countdown(AtomicU32::new(0))))
            .continuation(Arc::new(starter))
            .status_store(Arc::new(SignalStore(done.clone())))
            .build()
            .unwrap();
        assert!(slot.fill(&sup));
        assert!(!slot.fill(&sup));

        let first = Invocation::first(CacheRefreshArgs::default()).tracked(JobId(1));
        sup.run_once(&first).await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), done.notified())
            .await
            .unwrap();
    }
}
