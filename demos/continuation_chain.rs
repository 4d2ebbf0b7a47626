//! # Demo: continuation_chain
//!
//! Runs a charge calculation job over a simulated fleet of 47 vehicles, 20 per
//! invocation, until it completes; then notifies the account members and records
//! `FINISHED_SUCCESS`.
//!
//! ## Flow
//! ```text
//! Invocation #1 ──► JobSupervisor::run_once ──► Incomplete ──► ChannelStarter(#2)
//!                                                                   │
//! Dispatcher ◄──────────────────────────────────────────────────────┘
//!     └─► run_once(#2) ──► Incomplete ──► ChannelStarter(#3)
//!     └─► run_once(#3) ──► CompleteSuccess ──► NotifyRecipients ──► FINISHED_SUCCESS
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example continuation_chain
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use jobvisor::{
    BatchOutcome, BatchProcessor, ChargeCalculationArgs, ContinuationStarter, Dispatcher,
    Invocation, JobConfig, JobId, JobStatus, JobSupervisor, LogWriter, Notifier, NotifyError,
    NotifyRecipients, Recipient, RecipientDirectory, StatusStore, StoreError, Subscribe,
    continuation_channel,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

struct SimulatedFleet {
    vehicles: usize,
    charged: AtomicUsize,
}

#[async_trait]
impl BatchProcessor<ChargeCalculationArgs> for SimulatedFleet {
    async fn process(&self, args: &ChargeCalculationArgs, max_items: usize) -> BatchOutcome {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let before = self.charged.load(Ordering::SeqCst);
        let after = (before + max_items).min(self.vehicles);
        self.charged.store(after, Ordering::SeqCst);
        tracing::info!(account = %args.account_id, before, after, "charged vehicles");

        if after < self.vehicles {
            BatchOutcome::Incomplete
        } else {
            BatchOutcome::CompleteSuccess
        }
    }
}

struct ConsoleStore(CancellationToken);

#[async_trait]
impl StatusStore for ConsoleStore {
    async fn update_status(&self, job_id: JobId, status: JobStatus) -> Result<(), StoreError> {
        println!("[store] job {job_id} -> {status}");
        if status.is_terminal() {
            self.0.cancel();
        }
        Ok(())
    }
}

struct AccountMembers;

#[async_trait]
impl RecipientDirectory<ChargeCalculationArgs> for AccountMembers {
    async fn recipients(&self, _args: &ChargeCalculationArgs) -> Result<Vec<Recipient>, NotifyError> {
        Ok(vec![
            Recipient::new("fleet-manager@example.com"),
            Recipient {
                permitted: false,
                ..Recipient::new("driver@example.com")
            },
        ])
    }
}

struct ConsoleMailer;

#[async_trait]
impl Notifier for ConsoleMailer {
    async fn send(&self, address: &str) -> Result<(), NotifyError> {
        println!("[mail] charge calculation finished -> {address}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let done = CancellationToken::new();
    let (starter, rx) = continuation_channel::<ChargeCalculationArgs>();
    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];

    let cfg = JobConfig {
        max_batch_size: 20,
        max_invocations: 10,
        ..JobConfig::charge_calculation()
    };
    let sup = JobSupervisor::<ChargeCalculationArgs>::builder(cfg)
        .name("charge-calculation")
        .processor(Arc::new(SimulatedFleet {
            vehicles: 47,
            charged: AtomicUsize::new(0),
        }))
        .continuation(Arc::new(starter.clone()))
        .status_store(Arc::new(ConsoleStore(done.clone())))
        .finalize_success(Arc::new(NotifyRecipients::<ChargeCalculationArgs>::new(
            Arc::new(AccountMembers),
            Arc::new(ConsoleMailer),
        )))
        .with_subscribers(subscribers)
        .build()?;

    starter.fire_and_forget(
        Invocation::first(ChargeCalculationArgs::new("acc-42"))
            .tracked(JobId(97244))
            .notify(true),
    );

    let summary = Dispatcher::new(sup, rx).run(done).await;
    println!("[demo] {summary:?}");

    // Let the log writer drain.
    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(())
}
