use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use marquee_core::{ExpiryScheduler, ReleaseJob};

/// In-process delayed-job queue for hold expiry.
///
/// One spawned task per scheduled job: sleep for the delay, then deliver
/// the payload over the channel to the expiry worker. Cancellation aborts
/// the task; cancelling after delivery is a no-op, which the idempotent
/// handler tolerates.
pub struct DelayedJobQueue {
    jobs: Mutex<HashMap<Uuid, JoinHandle<()>>>,
    tx: mpsc::UnboundedSender<ReleaseJob>,
}

impl DelayedJobQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ReleaseJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                jobs: Mutex::new(HashMap::new()),
                tx,
            },
            rx,
        )
    }

    /// Jobs scheduled and not yet fired or cancelled.
    pub fn pending_jobs(&self) -> usize {
        match self.jobs.lock() {
            Ok(mut jobs) => {
                jobs.retain(|_, handle| !handle.is_finished());
                jobs.len()
            }
            Err(_) => 0,
        }
    }
}

#[async_trait]
impl ExpiryScheduler for DelayedJobQueue {
    async fn schedule(
        &self,
        job: ReleaseJob,
        delay: Duration,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let booking_id = job.booking_id;
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(job).is_err() {
                warn!("Release job fired but no expiry worker is listening");
            }
        });

        let mut jobs = self
            .jobs
            .lock()
            .map_err(|_| "expiry queue mutex poisoned")?;
        jobs.retain(|_, handle| !handle.is_finished());
        // One outstanding job per hold: a reschedule replaces the old timer.
        if let Some(old) = jobs.insert(booking_id, handle) {
            old.abort();
        }

        debug!(
            "Scheduled release job for booking {} in {}s",
            booking_id,
            delay.as_secs()
        );
        Ok(())
    }

    async fn cancel(
        &self,
        booking_id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut jobs = self
            .jobs
            .lock()
            .map_err(|_| "expiry queue mutex poisoned")?;
        if let Some(handle) = jobs.remove(&booking_id) {
            handle.abort();
            debug!("Cancelled release job for booking {}", booking_id);
        }
        Ok(())
    }
}
