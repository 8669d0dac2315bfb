use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use marquee_core::ReleaseJob;

use crate::engine::ReservationEngine;

/// Drain due release jobs from the scheduler and hand them to the engine.
///
/// Runs until the job channel closes. Handler errors are logged and the
/// loop keeps going; the job can be re-delivered and the handler is
/// idempotent.
pub async fn run_expiry_worker(
    engine: Arc<ReservationEngine>,
    mut jobs: mpsc::UnboundedReceiver<ReleaseJob>,
) {
    info!("Expiry worker started, waiting for due release jobs...");

    while let Some(job) = jobs.recv().await {
        let booking_id = job.booking_id;
        if let Err(err) = engine.handle_expiry(job).await {
            error!("Failed to release hold for booking {}: {}", booking_id, err);
        }
    }

    info!("Expiry worker stopped: job channel closed");
}
