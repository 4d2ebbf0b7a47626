//! # Outbound call abstraction.
//!
//! A [`Call`] is the handle an [`AsyncOp`](crate::AsyncOp) re-issues on every start.
//! Each [`Call::issue`] must produce a **fresh** future that owns its own state, so a
//! restarted operation never shares an in-flight request with the attempt it replaced.
//!
//! The future receives a [`CancellationToken`] that is cancelled when the attempt is
//! superseded or the operation is dropped. The runtime also aborts the attempt's task,
//! so checking the token is only needed to release external resources early.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::StatusCode;
use tokio_util::sync::CancellationToken;

/// Successful response of one call attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallResponse<V> {
    /// Status code reported by the transport.
    pub status: StatusCode,
    /// Decoded response value.
    pub value: V,
}

impl<V> CallResponse<V> {
    /// Creates a response.
    pub fn new(status: StatusCode, value: V) -> Self {
        Self { status, value }
    }

    /// Shorthand for a `200 OK` response.
    pub fn ok(value: V) -> Self {
        Self::new(StatusCode::OK, value)
    }
}

/// Failed call attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFailure {
    /// Status code reported by the transport (or synthesized for transport errors).
    pub status: StatusCode,
    /// Failure details.
    pub message: String,
}

impl CallFailure {
    /// Creates a failure.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Boxed future produced by [`Call::issue`].
pub type BoxCallFuture<V> =
    Pin<Box<dyn Future<Output = Result<CallResponse<V>, CallFailure>> + Send + 'static>>;

/// An outbound call that can be issued any number of times.
pub trait Call<V>: Send + Sync + 'static {
    /// Issues a fresh attempt of the call.
    fn issue(&self, ctx: CancellationToken) -> BoxCallFuture<V>;
}

/// Shared handle to a call.
pub type CallRef<V> = Arc<dyn Call<V>>;
