//! Expiration Sweeper Task
//!
//! Background task that walks the slots round robin and purges expired
//! entries from one shard per wake-up. A full pass over the cache takes
//! `MAX_SLOT` wake-ups.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::Engine;
use crate::slot::Slot;

/// Spawns the expiration sweeper.
///
/// Every `frequency` the next slot is swept with a `DeleteExpired` command,
/// issued through the same path as foreground operations. Failures are
/// logged and counted; the sweep moves on at the next wake-up.
///
/// # Arguments
/// * `engine` - Shared command engine
/// * `frequency` - Wait between consecutive slot sweeps
/// * `cancel` - Stops the task at its next wake-up
pub fn spawn_expiration_task(
    engine: Arc<Engine>,
    frequency: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting expiration sweeper with interval of {:?}",
            frequency
        );

        let mut slot = Slot::default();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(frequency) => {}
            }

            match engine.delete_expired(slot).await {
                Ok(0) => {}
                Ok(removed) => {
                    debug!("Expiration sweep: removed {} keys from slot {}", removed, slot);
                }
                Err(err) => {
                    engine.metrics().record_background_error();
                    warn!("Expiration sweep of slot {} failed: {}", slot, err);
                }
            }
            engine.metrics().record_expiration_sweep();

            slot = slot.next();
        }

        info!("Expiration sweeper stopped");
    })
}
