//! Core job types: identifiers, statuses, batch outcomes and invocation reports.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a tracked job record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Status of a job record.
///
/// Transitions are one-directional: once a terminal status is written the job is done.
/// The supervisor only ever writes terminal statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Record created, nothing processed yet.
    Starting,
    /// At least one invocation ran.
    Running,
    /// All work completed.
    FinishedSuccess,
    /// The invocation ceiling was reached with work remaining.
    FinishedFailureMaxInvocations,
    /// The job stopped for a reason not covered above (e.g. an external service failure).
    UnknownFailure,
}

impl JobStatus {
    /// Stable label, matching the serialized form.
    pub fn as_label(&self) -> &'static str {
        match self {
            JobStatus::Starting => "STARTING",
            JobStatus::Running => "RUNNING",
            JobStatus::FinishedSuccess => "FINISHED_SUCCESS",
            JobStatus::FinishedFailureMaxInvocations => "FINISHED_FAILURE_MAX_INVOCATIONS",
            JobStatus::UnknownFailure => "UNKNOWN_FAILURE",
        }
    }

    /// True for statuses that end a job.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::FinishedSuccess
                | JobStatus::FinishedFailureMaxInvocations
                | JobStatus::UnknownFailure
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// What one batch processor run reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchOutcome {
    /// Items remain; another invocation is needed.
    Incomplete,
    /// All items were processed.
    CompleteSuccess,
    /// Processing stopped because an external service call failed.
    CompleteExternalFailure,
}

impl BatchOutcome {
    /// True unless work remains.
    pub fn is_complete(&self) -> bool {
        !matches!(self, BatchOutcome::Incomplete)
    }
}

/// Why an untracked chain stopped without writing a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Work remained but the invocation ceiling was reached.
    MaxInvocationsReached,
    /// All work completed.
    Completed,
    /// The processor reported an external failure.
    ExternalFailure,
}

/// Decision taken by one `run_once` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationReport {
    /// Work remains and invocation `next_invocation` was requested.
    ContinuationRequested {
        /// Number of the requested invocation.
        next_invocation: u32,
    },
    /// A terminal status was written for a tracked job.
    Finalized {
        /// Job that was finalized.
        job_id: JobId,
        /// Status written.
        status: JobStatus,
    },
    /// An untracked chain ended.
    Stopped(StopReason),
}

impl InvocationReport {
    /// True if the chain ends with this invocation.
    pub fn is_final(&self) -> bool {
        !matches!(self, InvocationReport::ContinuationRequested { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(!JobStatus::Starting.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::FinishedSuccess.is_terminal());
        assert!(JobStatus::FinishedFailureMaxInvocations.is_terminal());
        assert!(JobStatus::UnknownFailure.is_terminal());
    }

    #[test]
    fn status_labels_match_serialized_form() {
        for status in [
            JobStatus::Starting,
            JobStatus::Running,
            JobStatus::FinishedSuccess,
            JobStatus::FinishedFailureMaxInvocations,
            JobStatus::UnknownFailure,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_label()));
        }
    }

    #[test]
    fn job_id_is_transparent() {
        assert_eq!(serde_json::to_string(&JobId(97244)).unwrap(), "97244");
        assert_eq!(JobId(97244).to_string(), "97244");
    }

    #[test]
    fn only_incomplete_is_not_complete() {
        assert!(!BatchOutcome::Incomplete.is_complete());
        assert!(BatchOutcome::CompleteSuccess.is_complete());
        assert!(BatchOutcome::CompleteExternalFailure.is_complete());
    }
}
