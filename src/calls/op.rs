//! # AsyncOp: one outstanding call with start/cancel/complete semantics.
//!
//! An [`AsyncOp`] pairs an identifier with a [`Call`](crate::Call) and tracks the **current attempt**:
//! its completion cell, its cancellation token and the tokio task driving it.
//!
//! ## Restart rules
//! - `start()` on a fresh op issues the call.
//! - `start()` on a dispatched op cancels the current attempt first (completion signal,
//!   token, task), then issues a fresh call with a fresh completion cell. Waiters of the
//!   old attempt observe [`CallError::Interrupted`].
//! - `start()` on an op created already completed is a no-op.
//!
//! ## Accessors
//! `result`, `error` and `status_code` read the current attempt only. Querying them
//! before the attempt resolved fails with [`CallError::NotFinished`].
//!
//! `start()` spawns onto the ambient tokio runtime. Outside of one, the attempt resolves
//! immediately with a `500 Internal Server Error` failure and the call is not issued.

use std::sync::{Mutex, MutexGuard, PoisonError};

use http::StatusCode;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::calls::call::{CallFailure, CallRef, CallResponse};
use crate::calls::call_fn::CallFn;
use crate::calls::completion::{Completion, Outcome, Signal};
use crate::error::CallError;

/// Object-safe view of an operation, used by the coordinator to start and await
/// operations of different value types together.
pub trait Awaitable: Send + Sync {
    /// Operation identifier (used in logs and error messages).
    fn identifier(&self) -> &str;

    /// Starts (or restarts) the operation.
    fn start(&self);

    /// True once the operation was dispatched or if it was created completed.
    fn has_started(&self) -> bool;

    /// Waiter bound to the current attempt.
    fn signal(&self) -> Signal;
}

struct Attempt<V> {
    completion: Completion<V>,
    dispatched: bool,
    token: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

impl<V> Attempt<V> {
    fn idle() -> Self {
        Self {
            completion: Completion::new(),
            dispatched: false,
            token: None,
            handle: None,
        }
    }

    fn cancel(&mut self) {
        self.completion.cancel();
        if let Some(token) = self.token.take() {
            token.cancel();
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// A single outstanding call.
pub struct AsyncOp<V> {
    identifier: String,
    call: Option<CallRef<V>>,
    attempt: Mutex<Attempt<V>>,
}

impl<V: Send + 'static> AsyncOp<V> {
    /// Creates an operation that will issue `call` when started.
    ///
    /// Fails with [`CallError::EmptyIdentifier`] for a blank identifier.
    pub fn new(identifier: impl Into<String>, call: CallRef<V>) -> Result<Self, CallError> {
        let identifier = identifier.into();
        if identifier.trim().is_empty() {
            return Err(CallError::EmptyIdentifier);
        }
        Ok(Self {
            identifier,
            call: Some(call),
            attempt: Mutex::new(Attempt::idle()),
        })
    }

    /// Creates an operation from a closure; see [`CallFn`].
    pub fn from_fn<F, Fut>(identifier: impl Into<String>, f: F) -> Result<Self, CallError>
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<CallResponse<V>, CallFailure>> + Send + 'static,
    {
        Self::new(identifier, CallFn::arc(f))
    }

    /// Creates an operation that is already completed successfully.
    ///
    /// Such an operation counts as started, and `start()` leaves it untouched.
    pub fn completed_success(identifier: impl Into<String>, status: StatusCode, value: V) -> Self {
        Self::completed(identifier.into(), Outcome::Success { status, value })
    }

    /// Creates an operation that is already completed with a failure.
    pub fn completed_failure(
        identifier: impl Into<String>,
        status: StatusCode,
        error: impl Into<String>,
    ) -> Self {
        Self::completed(
            identifier.into(),
            Outcome::Failure {
                status,
                error: error.into(),
            },
        )
    }

    fn completed(identifier: String, outcome: Outcome<V>) -> Self {
        Self {
            identifier,
            call: None,
            attempt: Mutex::new(Attempt {
                completion: Completion::resolved(outcome),
                dispatched: true,
                token: None,
                handle: None,
            }),
        }
    }

    /// Starts the operation, cancelling the current attempt if one is in flight.
    pub fn start(&self) {
        let Some(call) = &self.call else {
            return;
        };

        let mut attempt = self.lock();
        if attempt.dispatched {
            debug!(identifier = %self.identifier, "restarting async operation");
            attempt.cancel();
        }

        let completion = Completion::new();
        let Ok(runtime) = Handle::try_current() else {
            error!(identifier = %self.identifier, "no tokio runtime; async operation not issued");
            completion.on_failure(StatusCode::INTERNAL_SERVER_ERROR, "no tokio runtime");
            *attempt = Attempt {
                completion,
                dispatched: true,
                token: None,
                handle: None,
            };
            return;
        };

        let token = CancellationToken::new();
        let fut = call.issue(token.clone());
        let sink = completion.clone();
        let stop = token.clone();

        let handle = runtime.spawn(async move {
            tokio::select! {
                _ = stop.cancelled() => {}
                res = fut => match res {
                    Ok(resp) => {
                        sink.on_success(resp.status, resp.value);
                    }
                    Err(fail) => {
                        sink.on_failure(fail.status, fail.message);
                    }
                },
            }
        });

        *attempt = Attempt {
            completion,
            dispatched: true,
            token: Some(token),
            handle: Some(handle),
        };
    }

    /// Resolves the current attempt with a success.
    ///
    /// Returns `false` if the attempt was already resolved or cancelled.
    pub fn on_success(&self, status: StatusCode, value: V) -> bool {
        self.lock().completion.on_success(status, value)
    }

    /// Resolves the current attempt with a failure.
    ///
    /// Returns `false` if the attempt was already resolved or cancelled.
    pub fn on_failure(&self, status: StatusCode, error: impl Into<String>) -> bool {
        self.lock().completion.on_failure(status, error)
    }
}

impl<V> AsyncOp<V> {
    /// Operation identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// True once dispatched, or when created already completed.
    pub fn has_started(&self) -> bool {
        self.lock().dispatched
    }

    /// True if the current attempt resolved with a failure.
    pub fn has_error(&self) -> bool {
        self.lock()
            .completion
            .with_outcome(Outcome::is_failure)
            .unwrap_or(false)
    }

    /// Status code of the resolved attempt.
    pub fn status_code(&self) -> Result<StatusCode, CallError> {
        self.lock()
            .completion
            .with_outcome(Outcome::status)
            .ok_or_else(|| self.not_finished("status code"))
    }

    /// Failure message of the resolved attempt.
    ///
    /// Fails with [`CallError::NoError`] if the attempt succeeded.
    pub fn error(&self) -> Result<String, CallError> {
        let read = self.lock().completion.with_outcome(|o| match o {
            Outcome::Failure { error, .. } => Some(error.clone()),
            Outcome::Success { .. } => None,
        });
        match read {
            Some(Some(error)) => Ok(error),
            Some(None) => Err(CallError::NoError {
                identifier: self.identifier.clone(),
            }),
            None => Err(self.not_finished("error")),
        }
    }

    /// Waiter bound to the current attempt.
    pub fn signal(&self) -> Signal {
        self.lock().completion.signal()
    }

    fn not_finished(&self, what: &'static str) -> CallError {
        CallError::NotFinished {
            identifier: self.identifier.clone(),
            what,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Attempt<V>> {
        self.attempt.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V: Clone> AsyncOp<V> {
    /// Value of the resolved attempt.
    ///
    /// Fails with [`CallError::FailedResult`] if the attempt failed.
    pub fn result(&self) -> Result<V, CallError> {
        let read = self.lock().completion.with_outcome(|o| match o {
            Outcome::Success { value, .. } => Ok(value.clone()),
            Outcome::Failure { error, .. } => Err(error.clone()),
        });
        match read {
            Some(Ok(value)) => Ok(value),
            Some(Err(error)) => Err(CallError::FailedResult {
                identifier: self.identifier.clone(),
                error,
            }),
            None => Err(self.not_finished("result")),
        }
    }
}

impl<V> Drop for AsyncOp<V> {
    fn drop(&mut self) {
        let attempt = self
            .attempt
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = attempt.token.take() {
            token.cancel();
        }
        if let Some(handle) = attempt.handle.take() {
            handle.abort();
        }
    }
}

impl<V> std::fmt::Debug for AsyncOp<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let attempt = self.lock();
        f.debug_struct("AsyncOp")
            .field("identifier", &self.identifier)
            .field("dispatched", &attempt.dispatched)
            .field("state", &attempt.completion.state())
            .finish()
    }
}

impl<V: Send + 'static> Awaitable for AsyncOp<V> {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn start(&self) {
        AsyncOp::start(self);
    }

    fn has_started(&self) -> bool {
        AsyncOp::has_started(self)
    }

    fn signal(&self) -> Signal {
        AsyncOp::signal(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calls::SignalState;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn counting_op(
        issued: Arc<AtomicU32>,
        tokens: Arc<Mutex<Vec<CancellationToken>>>,
    ) -> AsyncOp<u32> {
        AsyncOp::from_fn("counting", move |ctx: CancellationToken| {
            let n = issued.fetch_add(1, Ordering::SeqCst) + 1;
            tokens.lock().unwrap().push(ctx);
            async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok::<_, CallFailure>(CallResponse::ok(n))
            }
        })
        .unwrap()
    }

    #[test]
    fn blank_identifier_is_rejected() {
        let err = AsyncOp::<u8>::from_fn("  ", |_ctx| async { Ok::<_, CallFailure>(CallResponse::ok(1)) })
            .unwrap_err();
        assert_eq!(err, CallError::EmptyIdentifier);
    }

    #[tokio::test]
    async fn not_started_until_start() {
        let op = AsyncOp::from_fn("x", |_ctx| async { Ok::<_, CallFailure>(CallResponse::ok(5u8)) }).unwrap();
        assert!(!op.has_started());
        assert_eq!(
            op.result().unwrap_err(),
            CallError::NotFinished {
                identifier: "x".into(),
                what: "result"
            }
        );

        op.start();
        assert!(op.has_started());
        assert_eq!(op.signal().settled().await, SignalState::Resolved);
        assert_eq!(op.result().unwrap(), 5);
        assert_eq!(op.status_code().unwrap(), StatusCode::OK);
        assert!(!op.has_error());
        assert_eq!(
            op.error().unwrap_err(),
            CallError::NoError {
                identifier: "x".into()
            }
        );
    }

    #[tokio::test]
    async fn failure_is_recorded_with_status() {
        let op = AsyncOp::<String>::from_fn("fails", |_ctx| async {
            Err::<CallResponse<String>, _>(CallFailure::new(StatusCode::BAD_GATEWAY, "upstream down"))
        })
        .unwrap();
        op.start();
        op.signal().settled().await;

        assert!(op.has_error());
        assert_eq!(op.status_code().unwrap(), StatusCode::BAD_GATEWAY);
        assert_eq!(op.error().unwrap(), "upstream down");
        assert_eq!(
            op.result().unwrap_err(),
            CallError::FailedResult {
                identifier: "fails".into(),
                error: "upstream down".into()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn restart_cancels_previous_attempt() {
        let issued = Arc::new(AtomicU32::new(0));
        let tokens = Arc::new(Mutex::new(Vec::new()));
        let op = counting_op(issued.clone(), tokens.clone());

        op.start();
        let first = op.signal();
        op.start();
        let second = op.signal();

        assert_eq!(first.settled().await, SignalState::Cancelled);
        assert_eq!(second.settled().await, SignalState::Resolved);

        assert_eq!(issued.load(Ordering::SeqCst), 2);
        let tokens = tokens.lock().unwrap();
        assert!(tokens[0].is_cancelled());
        assert!(!tokens[1].is_cancelled());
        assert_eq!(op.result().unwrap(), 2);
    }

    #[tokio::test]
    async fn completed_op_ignores_start() {
        let op = AsyncOp::completed_success("cached", StatusCode::OK, 7u32);
        assert!(op.has_started());
        op.start();
        assert_eq!(op.result().unwrap(), 7);

        let failed = AsyncOp::<u32>::completed_failure("gone", StatusCode::NOT_FOUND, "missing");
        assert!(failed.has_error());
        assert_eq!(failed.status_code().unwrap(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_resolution_beats_the_call() {
        let op = AsyncOp::from_fn("slow", |_ctx| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, CallFailure>(CallResponse::ok(1u8))
        })
        .unwrap();
        op.start();

        assert!(op.on_success(StatusCode::ACCEPTED, 9));
        assert!(!op.on_failure(StatusCode::INTERNAL_SERVER_ERROR, "late"));
        assert_eq!(op.result().unwrap(), 9);
        assert_eq!(op.status_code().unwrap(), StatusCode::ACCEPTED);
    }

    #[tokio::test(start_paused = true)]
    async fn accessors_fail_while_in_flight() {
        let op = counting_op(Arc::new(AtomicU32::new(0)), Arc::new(Mutex::new(Vec::new())));
        let not_finished = |what| CallError::NotFinished {
            identifier: "counting".into(),
            what,
        };

        assert_eq!(op.error().unwrap_err(), not_finished("error"));
        assert_eq!(op.status_code().unwrap_err(), not_finished("status code"));

        op.start();
        let signal = op.signal();
        assert_eq!(signal.state(), SignalState::Pending);
        assert_eq!(op.result().unwrap_err(), not_finished("result"));
        assert_eq!(op.error().unwrap_err(), not_finished("error"));
        assert_eq!(op.status_code().unwrap_err(), not_finished("status code"));
        assert!(!op.has_error());

        assert_eq!(signal.settled().await, SignalState::Resolved);
        assert_eq!(op.result().unwrap(), 1);
    }

    #[test]
    fn start_outside_runtime_fails_the_attempt() {
        let issued = Arc::new(AtomicU32::new(0));
        let op = counting_op(issued.clone(), Arc::new(Mutex::new(Vec::new())));

        op.start();

        assert!(op.has_started());
        assert_eq!(issued.load(Ordering::SeqCst), 0);
        assert_eq!(op.status_code().unwrap(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(op.error().unwrap(), "no tokio runtime");
    }

    #[tokio::test]
    async fn drop_cancels_in_flight_attempt() {
        let tokens = Arc::new(Mutex::new(Vec::new()));
        let op = counting_op(Arc::new(AtomicU32::new(0)), tokens.clone());
        op.start();
        drop(op);
        assert!(tokens.lock().unwrap()[0].is_cancelled());
    }
}
