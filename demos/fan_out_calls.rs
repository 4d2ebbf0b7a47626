//! # Demo: fan_out_calls
//!
//! Starts three async operations of different value types, restarts one of them, and
//! awaits them all with a deadline. A fourth, slow operation shows the timeout path.
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example fan_out_calls
//! ```

use std::time::Duration;

use jobvisor::{AsyncOp, CallCoordinator, CallError, CallFailure, CallResponse};
use http::StatusCode;
use tracing_subscriber::EnvFilter;

fn delayed<V: Clone + Send + Sync + 'static>(
    identifier: &str,
    delay: Duration,
    value: V,
) -> Result<AsyncOp<V>, CallError> {
    AsyncOp::from_fn(identifier, move |_ctx| {
        let value = value.clone();
        async move {
            tokio::time::sleep(delay).await;
            Ok::<_, CallFailure>(CallResponse::ok(value))
        }
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let coordinator = CallCoordinator::default();

    let vehicles = delayed("vehicle-count", Duration::from_millis(150), 47u32)?;
    let account = delayed("account-name", Duration::from_millis(80), String::from("acc-42"))?;
    let tariff = AsyncOp::<f64>::from_fn("tariff", |_ctx| async {
        Err::<CallResponse<f64>, _>(CallFailure::new(StatusCode::BAD_GATEWAY, "tariff service down"))
    })?;
    let cached = AsyncOp::completed_success("region", StatusCode::OK, "eu-west");

    coordinator.start_all(&[&vehicles, &account, &tariff]);
    // Restarting cancels the first attempt; only the second result is observable.
    coordinator.start(&vehicles);

    coordinator
        .await_all(&[&vehicles, &account, &tariff, &cached], Duration::from_secs(1))
        .await?;

    println!("vehicles = {}", vehicles.result()?);
    println!("account  = {}", account.result()?);
    println!("region   = {}", cached.result()?);
    println!(
        "tariff   = error {} ({})",
        tariff.status_code()?,
        tariff.error()?
    );

    let slow = delayed("slow-report", Duration::from_secs(5), ())?;
    let err = coordinator
        .start_and_await_all(&[&slow], Duration::from_millis(200))
        .await
        .unwrap_err();
    println!("slow     = {err} [{}]", err.as_label());
    Ok(())
}
