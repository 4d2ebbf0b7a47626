//! # CallCoordinator: start and await groups of async operations.
//!
//! The coordinator owns no operations. It starts the ones it is handed and waits on
//! their current attempts, converting the ways a wait can end into [`CallError`]s:
//!
//! ```text
//! await_all_until(ops, timeout, interrupt)
//!   1. every op started?        no ─► NotStarted { first offender }
//!   2. race:
//!        all signals settled    ─► Ok(()) or Interrupted { Some(id) } if an attempt was cancelled
//!        timeout elapsed        ─► Timeout { pending ids }
//!        interrupt cancelled    ─► Interrupted { None }
//! ```
//!
//! Operations are passed as `&[&dyn Awaitable]`, so values of different types can be
//! awaited together:
//!
//! ```rust
//! use std::time::Duration;
//! use jobvisor::{AsyncOp, CallCoordinator, CallFailure, CallResponse};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), jobvisor::CallError> {
//! let count = AsyncOp::from_fn("count", |_ctx| async {
//!     Ok::<_, CallFailure>(CallResponse::ok(3u32))
//! })?;
//! let name = AsyncOp::from_fn("name", |_ctx| async {
//!     Ok::<_, CallFailure>(CallResponse::ok(String::from("fleet")))
//! })?;
//!
//! let coordinator = CallCoordinator::default();
//! coordinator
//!     .start_and_await_all(&[&count, &name], Duration::from_secs(1))
//!     .await?;
//!
//! assert_eq!(count.result()?, 3);
//! assert_eq!(name.result()?, "fleet");
//! # Ok(())
//! # }
//! ```
//!
//! An interrupt token is never reset by the coordinator; callers further up still see
//! it cancelled after an [`CallError::Interrupted`] is returned.

use std::time::Duration;

use futures::future::try_join_all;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::calls::completion::SignalState;
use crate::calls::op::Awaitable;
use crate::config::CallConfig;
use crate::error::CallError;

/// Starts and awaits async operations with a deadline.
#[derive(Debug, Clone, Default)]
pub struct CallCoordinator {
    cfg: CallConfig,
}

impl CallCoordinator {
    /// Creates a coordinator with the given configuration.
    pub fn new(cfg: CallConfig) -> Self {
        Self { cfg }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CallConfig {
        &self.cfg
    }

    /// Starts one operation.
    pub fn start(&self, op: &dyn Awaitable) {
        info!(identifier = op.identifier(), "starting async request");
        op.start();
    }

    /// Starts every operation in order.
    pub fn start_all(&self, ops: &[&dyn Awaitable]) {
        info!(count = ops.len(), "starting async requests");
        for op in ops {
            op.start();
        }
    }

    /// Waits for one started operation.
    pub async fn await_one(&self, op: &dyn Awaitable, timeout: Duration) -> Result<(), CallError> {
        self.await_all(&[op], timeout).await
    }

    /// Waits for every operation to resolve within `timeout`.
    pub async fn await_all(&self, ops: &[&dyn Awaitable], timeout: Duration) -> Result<(), CallError> {
        self.await_all_until(ops, timeout, &CancellationToken::new())
            .await
    }

    /// Waits using the configured default deadline (no deadline if it is zero).
    pub async fn await_all_default(&self, ops: &[&dyn Awaitable]) -> Result<(), CallError> {
        match self.cfg.deadline() {
            Some(timeout) => self.await_all(ops, timeout).await,
            None => {
                let interrupt = CancellationToken::new();
                ensure_started(ops)?;
                wait_settled(ops, &interrupt).await
            }
        }
    }

    /// Waits for every operation to resolve within `timeout`, giving up early when
    /// `interrupt` is cancelled.
    ///
    /// Fails fast with [`CallError::NotStarted`] before waiting if any operation was
    /// never started.
    pub async fn await_all_until(
        &self,
        ops: &[&dyn Awaitable],
        timeout: Duration,
        interrupt: &CancellationToken,
    ) -> Result<(), CallError> {
        ensure_started(ops)?;

        match tokio::time::timeout(timeout, wait_settled(ops, interrupt)).await {
            Ok(res) => res,
            Err(_elapsed) => {
                let pending: Vec<String> = ops
                    .iter()
                    .filter(|op| op.signal().state() == SignalState::Pending)
                    .map(|op| op.identifier().to_string())
                    .collect();
                warn!(?timeout, ?pending, "timeout waiting for async requests");
                Err(CallError::Timeout { timeout, pending })
            }
        }
    }

    /// Starts every operation, then waits for all of them.
    pub async fn start_and_await_all(
        &self,
        ops: &[&dyn Awaitable],
        timeout: Duration,
    ) -> Result<(), CallError> {
        self.start_all(ops);
        self.await_all(ops, timeout).await
    }
}

fn ensure_started(ops: &[&dyn Awaitable]) -> Result<(), CallError> {
    match ops.iter().find(|op| !op.has_started()) {
        Some(op) => Err(CallError::NotStarted {
            identifier: op.identifier().to_string(),
        }),
        None => Ok(()),
    }
}

async fn wait_settled(
    ops: &[&dyn Awaitable],
    interrupt: &CancellationToken,
) -> Result<(), CallError> {
    let waits = ops.iter().map(|op| {
        let identifier = op.identifier().to_string();
        let signal = op.signal();
        async move {
            match signal.settled().await {
                SignalState::Cancelled => Err(CallError::Interrupted {
                    identifier: Some(identifier),
                }),
                SignalState::Resolved | SignalState::Pending => Ok(()),
            }
        }
    });

    tokio::select! {
        biased;
        _ = interrupt.cancelled() => {
            warn!("interrupted while waiting for async requests");
            Err(CallError::Interrupted { identifier: None })
        }
        res = try_join_all(waits) => res.map(|_| ()),
    }
}
