//! # Job continuation: bounded invocations chained into one long-running job.
//!
//! - [`JobSupervisor`] runs one invocation and decides: continue, finalize or stop
//! - [`Invocation`] carries the coordinates from one invocation to the next
//! - [`BatchProcessor`], [`StatusStore`], [`Notifier`] and friends describe the external collaborators
//! - [`ChannelStarter`] / [`LazyStarter`] hand continuations off in-process
//! - [`Dispatcher`] consumes a continuation channel
//! - [`NotifyRecipients`] notifies eligible recipients before success is recorded

mod args;
mod builder;
mod dispatch;
mod finalize;
mod invocation;
mod model;
mod ports;
mod shutdown;
mod starter;
mod supervisor;

pub use args::{
    CacheRefreshArgs, CacheRefreshSupervisor, ChargeCalculationArgs, ChargeCalculationSupervisor,
    RegistrationArgs, RegistrationSupervisor,
};
pub use builder::JobSupervisorBuilder;
pub use dispatch::{DispatchSummary, Dispatcher};
pub use finalize::NotifyRecipients;
pub use invocation::Invocation;
pub use model::{BatchOutcome, InvocationReport, JobId, JobStatus, StopReason};
pub use ports::{
    BatchProcessor, ContinuationStarter, FinalizeSuccess, Notifier, Recipient, RecipientDirectory,
    StatusStore,
};
pub use starter::{
    ChannelStarter, ContinuationReceiver, LazyStarter, SupervisorSlot, continuation_channel,
};
pub use supervisor::JobSupervisor;
