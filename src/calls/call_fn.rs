//! # Function-backed call (`CallFn`)
//!
//! [`CallFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`, producing a fresh
//! future per issue. Shared state across attempts has to be captured explicitly
//! (e.g. `Arc<...>`).
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use jobvisor::{CallFn, CallRef, CallResponse, CallFailure};
//!
//! let call: CallRef<u32> = CallFn::arc(|_ctx: CancellationToken| async move {
//!     Ok::<_, CallFailure>(CallResponse::ok(42))
//! });
//! # let _ = call;
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::calls::call::{BoxCallFuture, Call, CallFailure, CallResponse};

/// Function-backed call implementation.
#[derive(Debug)]
pub struct CallFn<F> {
    f: F,
}

impl<F> CallFn<F> {
    /// Creates a new function-backed call.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the call and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<V, F, Fut> Call<V> for CallFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<CallResponse<V>, CallFailure>> + Send + 'static,
{
    fn issue(&self, ctx: CancellationToken) -> BoxCallFuture<V> {
        Box::pin((self.f)(ctx))
    }
}
