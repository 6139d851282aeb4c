//! Periodic sweep that skips lapsed Pending offers.
//!
//! There is no per-booking timer: expiry is enforced lazily by comparing
//! `expires_at` against the clock on a fixed interval and applying the same
//! `skip` transition a customer could. A sweep racing a late workshop
//! response resolves through the ledger's conditional updates; exactly one
//! side wins.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::engine::DispatchController;

/// Run the offer expiry sweep loop.
///
/// Scans every `interval` for bookings whose Pending offer has lapsed and
/// cascades each one. Runs until `cancel` is triggered.
pub async fn run(engine: Arc<DispatchController>, interval: Duration, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        "Offer expiry sweep started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Offer expiry sweep stopping");
                break;
            }
            _ = ticker.tick() => {
                match engine.expire_lapsed().await {
                    Ok(advanced) => {
                        if advanced > 0 {
                            tracing::info!(advanced, "Offer expiry sweep: cascaded lapsed offers");
                        } else {
                            tracing::debug!("Offer expiry sweep: nothing lapsed");
                        }
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "Offer expiry sweep: cycle failed");
                    }
                }
            }
        }
    }
}
