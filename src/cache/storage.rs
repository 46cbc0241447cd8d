//! Cache Storage Module
//!
//! Owns every shard and routes commands to them. Each shard sits behind its
//! own lock, so commands for one slot run strictly one at a time while
//! different slots proceed in parallel. When configured with a concurrency
//! limit above one, a semaphore caps how many shard commands are in flight
//! across the whole cache.

use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tracing::error;

use crate::cache::command::Command;
use crate::cache::shard::Shard;
use crate::slot::Slot;

// == Cache Storage ==
#[derive(Debug)]
pub struct CacheStorage {
    shards: Box<[Mutex<Shard>]>,
    /// Admission control, present only when max_concurrency > 1
    workers: Option<Arc<Semaphore>>,
}

impl CacheStorage {
    // == Constructor ==
    /// Allocates one empty shard per slot.
    ///
    /// # Arguments
    /// * `max_concurrency` - Cap on in-flight shard commands; 1 or less
    ///   means commands run as soon as their shard is free
    pub fn new(max_concurrency: usize) -> Self {
        let shards = Slot::all().map(|slot| Mutex::new(Shard::new(slot))).collect();
        let workers = (max_concurrency > 1).then(|| Arc::new(Semaphore::new(max_concurrency)));

        Self { shards, workers }
    }

    // == Dispatch ==
    /// Runs `command` on a separate task.
    ///
    /// The command completes even if whoever is waiting for its result has
    /// stopped waiting.
    pub fn dispatch(self: &Arc<Self>, slot: Slot, command: Command) {
        let storage = Arc::clone(self);
        tokio::spawn(async move {
            storage.run_command(slot, command).await;
        });
    }

    // == Run Command ==
    /// Executes `command` against the shard owning `slot`, waiting for an
    /// admission permit first when concurrency is bounded.
    ///
    /// The command's result has been deposited when this returns. If the
    /// command cannot run its responder is dropped, which the waiting side
    /// reports as an internal failure.
    pub async fn run_command(&self, slot: Slot, command: Command) {
        let _permit = match &self.workers {
            Some(workers) => match workers.acquire().await {
                Ok(permit) => Some(permit),
                Err(_) => {
                    error!("Worker pool closed, dropping {} command", command.name());
                    return;
                }
            },
            None => None,
        };

        let Some(shard) = self.shards.get(slot.index()) else {
            error!("Slot {} out of range, dropping {} command", slot, command.name());
            return;
        };

        let mut shard = shard.lock().await;
        debug_assert_eq!(shard.slot(), slot);
        shard.process(command);
    }

    /// Number of shards.
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    /// Permits currently free in the worker pool, if bounded.
    #[cfg(test)]
    pub fn available_workers(&self) -> Option<usize> {
        self.workers.as_ref().map(|workers| workers.available_permits())
    }

    /// Locks a shard directly, bypassing the command path.
    #[cfg(test)]
    pub(crate) async fn lock_shard(&self, slot: Slot) -> tokio::sync::MutexGuard<'_, Shard> {
        self.shards[slot.index()].lock().await
    }
}
