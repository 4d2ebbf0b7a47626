//! # Single-writer completion cell.
//!
//! A [`Completion`] holds the outcome of exactly one call attempt. The first of
//! `on_success`, `on_failure` or `cancel` wins; every later write is ignored and reported
//! as `false`.
//!
//! Waiters do not need the value type: they hold a [`Signal`], which only observes the
//! [`SignalState`]. This lets the coordinator await operations of different value types
//! together.
//!
//! ```text
//!            on_success / on_failure
//!   Pending ─────────────────────────► Resolved   (outcome stored)
//!      │
//!      └──────── cancel() ───────────► Cancelled  (attempt superseded)
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use http::StatusCode;
use tokio::sync::watch;

/// Observable state of a completion signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalState {
    /// No outcome recorded yet.
    Pending,
    /// An outcome was recorded.
    Resolved,
    /// The attempt was superseded before it resolved.
    Cancelled,
}

/// Recorded outcome of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<V> {
    /// The call succeeded.
    Success {
        /// Transport status code.
        status: StatusCode,
        /// Response value.
        value: V,
    },
    /// The call failed.
    Failure {
        /// Transport status code.
        status: StatusCode,
        /// Failure details.
        error: String,
    },
}

impl<V> Outcome<V> {
    /// Status code of either variant.
    pub fn status(&self) -> StatusCode {
        match self {
            Outcome::Success { status, .. } | Outcome::Failure { status, .. } => *status,
        }
    }

    /// True for [`Outcome::Failure`].
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure { .. })
    }
}

enum Slot<V> {
    Pending,
    Done(Outcome<V>),
    Cancelled,
}

struct Inner<V> {
    slot: Mutex<Slot<V>>,
    signal: watch::Sender<SignalState>,
}

/// Shared handle to a single-writer completion cell.
///
/// Cloning the handle does not create a new cell.
pub struct Completion<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for Completion<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Default for Completion<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for Completion<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("state", &self.state())
            .finish()
    }
}

impl<V> Completion<V> {
    /// Creates a pending cell.
    pub fn new() -> Self {
        let (signal, _rx) = watch::channel(SignalState::Pending);
        Self {
            inner: Arc::new(Inner {
                slot: Mutex::new(Slot::Pending),
                signal,
            }),
        }
    }

    /// Creates a cell that is already resolved with `outcome`.
    pub fn resolved(outcome: Outcome<V>) -> Self {
        let cell = Self::new();
        cell.settle(Slot::Done(outcome), SignalState::Resolved);
        cell
    }

    /// Records a success. Returns `false` if the cell was already settled.
    pub fn on_success(&self, status: StatusCode, value: V) -> bool {
        self.settle(
            Slot::Done(Outcome::Success { status, value }),
            SignalState::Resolved,
        )
    }

    /// Records a failure. Returns `false` if the cell was already settled.
    pub fn on_failure(&self, status: StatusCode, error: impl Into<String>) -> bool {
        self.settle(
            Slot::Done(Outcome::Failure {
                status,
                error: error.into(),
            }),
            SignalState::Resolved,
        )
    }

    /// Cancels a pending cell. Returns `false` if the cell was already settled.
    pub fn cancel(&self) -> bool {
        self.settle(Slot::Cancelled, SignalState::Cancelled)
    }

    /// Current state of the cell.
    pub fn state(&self) -> SignalState {
        *self.inner.signal.borrow()
    }

    /// Runs `f` on the recorded outcome, if any.
    pub fn with_outcome<R>(&self, f: impl FnOnce(&Outcome<V>) -> R) -> Option<R> {
        match &*self.lock() {
            Slot::Done(outcome) => Some(f(outcome)),
            Slot::Pending | Slot::Cancelled => None,
        }
    }

    /// Returns a waiter for this cell.
    pub fn signal(&self) -> Signal {
        Signal {
            rx: self.inner.signal.subscribe(),
        }
    }

    fn settle(&self, next: Slot<V>, state: SignalState) -> bool {
        let mut slot = self.lock();
        if !matches!(*slot, Slot::Pending) {
            return false;
        }
        *slot = next;
        self.inner.signal.send_replace(state);
        true
    }

    fn lock(&self) -> MutexGuard<'_, Slot<V>> {
        self.inner
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Type-erased waiter for a [`Completion`].
#[derive(Debug, Clone)]
pub struct Signal {
    rx: watch::Receiver<SignalState>,
}

impl Signal {
    /// Current state without waiting.
    pub fn state(&self) -> SignalState {
        *self.rx.borrow()
    }

    /// Waits until the cell leaves [`SignalState::Pending`].
    ///
    /// A cell dropped while still pending is reported as [`SignalState::Cancelled`].
    pub async fn settled(mut self) -> SignalState {
        match self.rx.wait_for(|s| *s != SignalState::Pending).await {
            Ok(state) => *state,
            Err(_) => SignalState::Cancelled,
        }
    }
}
