//! Error types used by async operations, the call coordinator and the job supervisor.
//!
//! This module defines the following error enums:
//!
//! - [`CallError`]: errors raised by [`AsyncOp`](crate::AsyncOp) accessors and the
//!   [`CallCoordinator`](crate::CallCoordinator).
//! - [`JobError`]: errors raised while running one supervisor invocation.
//! - [`StoreError`] / [`NotifyError`]: errors reported by external collaborators.
//! - [`ConfigError`]: invalid configuration values.
//!
//! Reaching the invocation ceiling and a processor-reported external failure are **not**
//! errors: they are deliberate stop conditions reported through
//! [`InvocationReport`](crate::InvocationReport).
//!
//! [`CallError`] and [`JobError`] provide `as_label` and `as_message` helpers for logging.

use std::time::Duration;
use thiserror::Error;

use crate::jobs::JobId;

/// # Errors produced by async operations and the call coordinator.
///
/// `NotStarted` is a programmer error and fails fast. `Timeout` and `Interrupted` are
/// detected only at the coordinator boundary and are never retried automatically.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// An operation was created with a blank identifier.
    #[error("async operation identifier must not be empty")]
    EmptyIdentifier,

    /// The operation was awaited before it was started.
    #[error("async operation '{identifier}' has not been started; call start() first")]
    NotStarted {
        /// Identifier of the offending operation.
        identifier: String,
    },

    /// A completion-dependent value was queried before the operation finished.
    #[error("async operation '{identifier}' did not finish yet; {what} is not available")]
    NotFinished {
        /// Identifier of the operation.
        identifier: String,
        /// Which value was requested (`result`, `error`, `status code`).
        what: &'static str,
    },

    /// The result was requested but the operation finished with a failure.
    #[error("async operation '{identifier}' finished with failure: {error}")]
    FailedResult {
        /// Identifier of the operation.
        identifier: String,
        /// The recorded failure message.
        error: String,
    },

    /// The error was requested but the operation finished successfully.
    #[error("async operation '{identifier}' finished successfully; there is no error")]
    NoError {
        /// Identifier of the operation.
        identifier: String,
    },

    /// Not every operation completed within the deadline.
    #[error("timeout after {timeout:?}; pending operations: {pending:?}")]
    Timeout {
        /// The deadline that elapsed.
        timeout: Duration,
        /// Identifiers of the operations that were still pending.
        pending: Vec<String>,
    },

    /// The wait itself was cancelled, or the awaited attempt was superseded by a restart.
    #[error("waiting for async operations was interrupted{}", fmt_identifier(.identifier))]
    Interrupted {
        /// Identifier of the cancelled attempt, if a restart caused the interruption.
        identifier: Option<String>,
    },
}

fn fmt_identifier(identifier: &Option<String>) -> String {
    match identifier {
        Some(id) => format!(" (operation '{id}' was restarted)"),
        None => String::new(),
    }
}

impl CallError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use jobvisor::CallError;
    /// use std::time::Duration;
    ///
    /// let err = CallError::Timeout { timeout: Duration::from_secs(1), pending: vec![] };
    /// assert_eq!(err.as_label(), "call_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            CallError::EmptyIdentifier => "call_empty_identifier",
            CallError::NotStarted { .. } => "call_not_started",
            CallError::NotFinished { .. } => "call_not_finished",
            CallError::FailedResult { .. } => "call_failed_result",
            CallError::NoError { .. } => "call_no_error",
            CallError::Timeout { .. } => "call_timeout",
            CallError::Interrupted { .. } => "call_interrupted",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            CallError::EmptyIdentifier => "empty identifier".to_string(),
            CallError::NotStarted { identifier } => format!("not started: {identifier}"),
            CallError::NotFinished { identifier, what } => {
                format!("not finished: {identifier} ({what} unavailable)")
            }
            CallError::FailedResult { identifier, error } => format!("failed: {identifier}: {error}"),
            CallError::NoError { identifier } => format!("no error: {identifier} succeeded"),
            CallError::Timeout { timeout, pending } => {
                format!("timeout after {timeout:?}; pending={pending:?}")
            }
            CallError::Interrupted { identifier: Some(id) } => format!("interrupted: {id} restarted"),
            CallError::Interrupted { identifier: None } => "interrupted".to_string(),
        }
    }

    /// Indicates whether the caller may reasonably retry.
    ///
    /// Only [`CallError::Timeout`] qualifies; nothing in this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CallError::Timeout { .. })
    }
}

/// Failure reported by a [`StatusStore`](crate::StatusStore).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("status store failure: {0}")]
pub struct StoreError(pub String);

/// Failure reported by a [`Notifier`](crate::Notifier) or [`RecipientDirectory`](crate::RecipientDirectory).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("notification failure: {0}")]
pub struct NotifyError(pub String);

/// # Errors produced while running one supervisor invocation.
///
/// Collaborator failures are not caught: they surface to whatever dispatched the
/// invocation.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum JobError {
    /// Writing the job status failed.
    #[error("failed to update status of job {job_id}: {source}")]
    Store {
        /// Job being updated.
        job_id: JobId,
        /// Underlying store failure.
        #[source]
        source: StoreError,
    },

    /// Sending a completion notification failed.
    #[error("failed to notify '{recipient}': {source}")]
    Notify {
        /// Recipient address.
        recipient: String,
        /// Underlying notifier failure.
        #[source]
        source: NotifyError,
    },

    /// Looking up notification recipients failed.
    #[error("failed to look up recipients: {source}")]
    Recipients {
        /// Underlying lookup failure.
        #[source]
        source: NotifyError,
    },

    /// A tracked job was run by a supervisor that has no status store.
    #[error("job {job_id} is tracked but no status store is configured")]
    StatusStoreMissing {
        /// The tracked job.
        job_id: JobId,
    },

    /// An invocation payload could not be encoded or decoded.
    #[error("invalid invocation payload: {source}")]
    Payload {
        /// Underlying serde failure.
        #[from]
        source: serde_json::Error,
    },
}

impl JobError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            JobError::Store { .. } => "job_store_failed",
            JobError::Notify { .. } => "job_notify_failed",
            JobError::Recipients { .. } => "job_recipients_failed",
            JobError::StatusStoreMissing { .. } => "job_status_store_missing",
            JobError::Payload { .. } => "job_payload_invalid",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            JobError::Store { job_id, source } => format!("store: job={job_id} {}", source.0),
            JobError::Notify { recipient, source } => {
                format!("notify: recipient={recipient} {}", source.0)
            }
            JobError::Recipients { source } => format!("recipients: {}", source.0),
            JobError::StatusStoreMissing { job_id } => format!("no status store: job={job_id}"),
            JobError::Payload { source } => format!("payload: {source}"),
        }
    }
}

/// Invalid configuration value.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("invalid value {value:?} for {key}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Raw value.
        value: String,
    },

    /// `max_invocations` must allow at least one invocation.
    #[error("max_invocations must be at least 1")]
    ZeroInvocations,

    /// A required collaborator was not supplied to a builder.
    #[error("missing required collaborator: {0}")]
    MissingCollaborator(&'static str),
}
