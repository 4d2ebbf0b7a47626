use std::borrow::Cow;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::JobConfig;
use crate::error::ConfigError;
use crate::events::Bus;
use crate::jobs::ports::{BatchProcessor, ContinuationStarter, FinalizeSuccess, StatusStore};
use crate::jobs::supervisor::{JobSupervisor, Parts, subscriber_listener};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for a [`JobSupervisor`].
///
/// A processor and a continuation starter are required; the status store and the
/// success finalizer are optional.
pub struct JobSupervisorBuilder<A> {
    cfg: JobConfig,
    name: Cow<'static, str>,
    processor: Option<Arc<dyn BatchProcessor<A>>>,
    starter: Option<Arc<dyn ContinuationStarter<A>>>,
    store: Option<Arc<dyn StatusStore>>,
    finalizer: Option<Arc<dyn FinalizeSuccess<A>>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl<A> JobSupervisorBuilder<A>
where
    A: Clone + Send + Sync + 'static,
{
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: JobConfig) -> Self {
        Self {
            cfg,
            name: Cow::Borrowed("job"),
            processor: None,
            starter: None,
            store: None,
            finalizer: None,
            subscribers: Vec::new(),
        }
    }

    /// Names the job type in logs (e.g. `"charge-calculation"`).
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the batch processor.
    pub fn processor(mut self, processor: Arc<dyn BatchProcessor<A>>) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Sets the continuation starter.
    pub fn continuation(mut self, starter: Arc<dyn ContinuationStarter<A>>) -> Self {
        self.starter = Some(starter);
        self
    }

    /// Sets the status store. Required for tracked jobs.
    pub fn status_store(mut self, store: Arc<dyn StatusStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the side effect run before a tracked job is marked successful.
    pub fn finalize_success(mut self, finalizer: Arc<dyn FinalizeSuccess<A>>) -> Self {
        self.finalizer = Some(finalizer);
        self
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive job events through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the supervisor.
    ///
    /// Spawns the subscriber workers, so a tokio runtime is required when subscribers
    /// were configured.
    pub fn build(self) -> Result<Arc<JobSupervisor<A>>, ConfigError> {
        self.cfg.validate()?;
        let processor = self
            .processor
            .ok_or(ConfigError::MissingCollaborator("batch processor"))?;
        let starter = self
            .starter
            .ok_or(ConfigError::MissingCollaborator("continuation starter"))?;

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let listener = CancellationToken::new();
        let has_subscribers = !self.subscribers.is_empty();
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        if has_subscribers {
            subscriber_listener(&bus, Arc::clone(&subs), listener.clone());
        }

        Ok(Arc::new(JobSupervisor::from_parts(Parts {
            name: self.name,
            cfg: self.cfg,
            processor,
            starter,
            store: self.store,
            finalizer: self.finalizer,
            bus,
            subs,
            listener,
        })))
    }
}
