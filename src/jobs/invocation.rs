//! # Invocation: the parameters carried from one invocation to the next.
//!
//! An [`Invocation`] is everything a continuation needs to resume a job in a fresh
//! execution context. Its payload form is camelCase JSON with the job arguments
//! flattened next to the coordinates:
//!
//! ```text
//! {"invocationNumber":5,"correlationId":"c-1","jobId":97244,"sendNotifications":true,"accountId":"acc-9"}
//! ```
//!
//! `A` must serialize as a JSON object for the payload helpers to work.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::JobError;
use crate::jobs::model::JobId;

/// Coordinates and arguments of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invocation<A> {
    /// Invocation number; starts at 1 and only ever grows.
    pub invocation_number: u32,
    /// Opaque id propagated through every invocation of the chain.
    pub correlation_id: String,
    /// Tracked job, or `None` for untracked jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    /// Whether completion notifications should be sent on success.
    #[serde(default)]
    pub send_notifications: bool,
    /// Job-type specific arguments.
    #[serde(flatten)]
    pub args: A,
}

impl<A> Invocation<A> {
    /// First invocation of a new chain with a freshly generated correlation id.
    pub fn first(args: A) -> Self {
        Self::first_with_correlation(Uuid::new_v4().to_string(), args)
    }

    /// First invocation of a new chain with a caller-supplied correlation id.
    pub fn first_with_correlation(correlation_id: impl Into<String>, args: A) -> Self {
        Self {
            invocation_number: 1,
            correlation_id: correlation_id.into(),
            job_id: None,
            send_notifications: false,
            args,
        }
    }

    /// Marks the chain as tracked by `job_id`.
    pub fn tracked(mut self, job_id: JobId) -> Self {
        self.job_id = Some(job_id);
        self
    }

    /// Sets the notification flag.
    pub fn notify(mut self, send: bool) -> Self {
        self.send_notifications = send;
        self
    }

    /// Overrides the invocation number.
    pub fn at(mut self, invocation_number: u32) -> Self {
        self.invocation_number = invocation_number;
        self
    }

    /// True if a job record tracks this chain.
    pub fn is_tracked(&self) -> bool {
        self.job_id.is_some()
    }
}

impl<A: Clone> Invocation<A> {
    /// The continuation of this invocation: same coordinates, number incremented.
    pub fn next(&self) -> Self {
        Self {
            invocation_number: self.invocation_number.saturating_add(1),
            ..self.clone()
        }
    }
}

impl<A: Serialize> Invocation<A> {
    /// Encodes the invocation as a JSON payload for out-of-process starters.
    pub fn to_payload(&self) -> Result<String, JobError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<A: DeserializeOwned> Invocation<A> {
    /// Decodes an invocation from a JSON payload.
    pub fn from_payload(payload: &str) -> Result<Self, JobError> {
        Ok(serde_json::from_str(payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::args::ChargeCalculationArgs;

    #[test]
    fn next_increments_and_keeps_coordinates() {
        let inv = Invocation::first_with_correlation("c-1", ChargeCalculationArgs::new("acc-9"))
            .tracked(JobId(97244))
            .notify(true)
            .at(4);

        let next = inv.next();
        assert_eq!(next.invocation_number, 5);
        assert_eq!(next.correlation_id, "c-1");
        assert_eq!(next.job_id, Some(JobId(97244)));
        assert!(next.send_notifications);
        assert!(next.is_tracked());
        assert_eq!(next.args, inv.args);
    }

    #[test]
    fn payload_is_flat_camel_case() {
        let inv = Invocation::first_with_correlation("c-1", ChargeCalculationArgs::new("acc-9"))
            .tracked(JobId(97244))
            .notify(true)
            .at(5);

        let json: serde_json::Value = serde_json::from_str(&inv.to_payload().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "invocationNumber": 5,
                "correlationId": "c-1",
                "jobId": 97244,
                "sendNotifications": true,
                "accountId": "acc-9"
            })
        );
    }

    #[test]
    fn untracked_payload_omits_job_id() {
        let inv = Invocation::first_with_correlation("c-2", ChargeCalculationArgs::new("a"));
        let payload = inv.to_payload().unwrap();
        assert!(!payload.contains("jobId"));
        assert!(!inv.is_tracked());

        let back: Invocation<ChargeCalculationArgs> = Invocation::from_payload(&payload).unwrap();
        assert_eq!(back, inv);
    }

    #[test]
    fn malformed_payload_is_a_payload_error() {
        let err = Invocation::<ChargeCalculationArgs>::from_payload("{\"invocationNumber\":1}")
            .unwrap_err();
        assert_eq!(err.as_label(), "job_payload_invalid");
    }

    #[test]
    fn first_generates_distinct_correlation_ids() {
        let a = Invocation::first(ChargeCalculationArgs::new("x"));
        let b = Invocation::first(ChargeCalculationArgs::new("x"));
        assert_eq!(a.invocation_number, 1);
        assert_ne!(a.correlation_id, b.correlation_id);
    }
}
