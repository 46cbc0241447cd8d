//! Response Module
//!
//! Single-slot rendezvous used by every command: the shard deposits exactly
//! one result, the caller waits for it or for its deadline.
//!
//! Rendezvous objects are recycled through per-result-type pools owned by
//! the cache. An object is returned to its pool only after its wait observed
//! the shard's notification and the shard side has let go of it. After a
//! timeout, or if the caller gave up before waiting, the object is discarded
//! since the shard may still write to it.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::cache::command::{ShardStats, TtlResult, ValueResult};
use crate::slot::MAX_SLOT;

/// Upper bound on idle objects kept per pool.
const MAX_IDLE: usize = MAX_SLOT as usize;

// == Rendezvous ==
#[derive(Debug)]
struct Rendezvous<T> {
    value: Mutex<Option<T>>,
    ready: Notify,
}

impl<T> Rendezvous<T> {
    fn new() -> Self {
        Self {
            value: Mutex::new(None),
            ready: Notify::new(),
        }
    }
}

// == Responder ==
/// Shard-side handle. Depositing never blocks, even if the caller is gone.
///
/// Dropping a responder without sending wakes the caller, which then
/// reports an internal failure instead of waiting out its deadline.
#[derive(Debug)]
pub struct Responder<T> {
    rendezvous: Arc<Rendezvous<T>>,
}

impl<T> Responder<T> {
    /// Deposits the result.
    pub fn send(self, value: T) {
        *self.rendezvous.value.lock() = Some(value);
    }
}

impl<T> Drop for Responder<T> {
    fn drop(&mut self) {
        // notify_one stores a permit when no one is waiting yet.
        self.rendezvous.ready.notify_one();
    }
}

// == Wait Error ==
/// Why a wait produced no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    /// The deadline elapsed first.
    Elapsed,
    /// The responder was dropped without a value.
    Dropped,
}

// == Pooled Response ==
/// Caller-side guard over a pooled rendezvous.
#[derive(Debug)]
pub struct PooledResponse<'a, T> {
    pool: &'a ResponsePool<T>,
    rendezvous: Arc<Rendezvous<T>>,
    notified: bool,
}

impl<T> PooledResponse<'_, T> {
    /// Creates the shard-side handle. Call once per command.
    pub fn responder(&self) -> Responder<T> {
        Responder {
            rendezvous: Arc::clone(&self.rendezvous),
        }
    }

    /// Waits for the shard result or for `timeout` to elapse.
    pub async fn wait(mut self, timeout: Duration) -> Result<T, WaitError> {
        match tokio::time::timeout(timeout, self.rendezvous.ready.notified()).await {
            Ok(()) => {
                self.notified = true;
                self.rendezvous.value.lock().take().ok_or(WaitError::Dropped)
            }
            Err(_) => Err(WaitError::Elapsed),
        }
    }
}

impl<T> Drop for PooledResponse<'_, T> {
    fn drop(&mut self) {
        if self.notified {
            self.pool.release(&self.rendezvous);
        }
    }
}

// == Response Pool ==
/// Free list of rendezvous objects for one result type.
#[derive(Debug)]
pub struct ResponsePool<T> {
    free: Mutex<Vec<Arc<Rendezvous<T>>>>,
}

impl<T> Default for ResponsePool<T> {
    fn default() -> Self {
        Self {
            free: Mutex::new(Vec::new()),
        }
    }
}

impl<T> ResponsePool<T> {
    /// Takes an idle rendezvous or allocates a new one.
    pub fn acquire(&self) -> PooledResponse<'_, T> {
        let rendezvous = self
            .free
            .lock()
            .pop()
            .unwrap_or_else(|| Arc::new(Rendezvous::new()));

        PooledResponse {
            pool: self,
            rendezvous,
            notified: false,
        }
    }

    /// Number of idle objects ready for reuse.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    fn release(&self, rendezvous: &Arc<Rendezvous<T>>) {
        // Only the guard may still hold it; a live responder could write later.
        if Arc::strong_count(rendezvous) != 1 {
            return;
        }
        *rendezvous.value.lock() = None;

        let mut free = self.free.lock();
        if free.len() < MAX_IDLE {
            free.push(Arc::clone(rendezvous));
        }
    }
}

// == Response Pools ==
/// One pool per result type, owned by the cache instance.
#[derive(Debug, Default)]
pub struct ResponsePools {
    pub value: ResponsePool<ValueResult>,
    pub ttl: ResponsePool<TtlResult>,
    pub stats: ResponsePool<ShardStats>,
    pub count: ResponsePool<usize>,
    pub ack: ResponsePool<()>,
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_before_wait() {
        let pool = ResponsePool::<u32>::default();
        let response = pool.acquire();
        response.responder().send(7);

        assert_eq!(response.wait(Duration::from_secs(1)).await, Ok(7));
        assert_eq!(pool.idle(), 1);
    }

    #[tokio::test]
    async fn test_send_from_task() {
        let pool = ResponsePool::<String>::default();
        let response = pool.acquire();
        let responder = response.responder();

        tokio::spawn(async move {
            tokio::task::yield_now().await;
            responder.send("done".to_string());
        });

        assert_eq!(
            response.wait(Duration::from_secs(1)).await,
            Ok("done".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_abandons_object() {
        let pool = ResponsePool::<u32>::default();
        let response = pool.acquire();
        let responder = response.responder();

        assert_eq!(
            response.wait(Duration::from_millis(10)).await,
            Err(WaitError::Elapsed)
        );

        // A late result must not block or panic.
        responder.send(1);
        assert_eq!(pool.idle(), 0);
    }

    #[tokio::test]
    async fn test_dropped_responder_reports_dropped() {
        let pool = ResponsePool::<u32>::default();
        let response = pool.acquire();
        drop(response.responder());

        assert_eq!(
            response.wait(Duration::from_secs(1)).await,
            Err(WaitError::Dropped)
        );
    }

    #[tokio::test]
    async fn test_pool_reuses_objects() {
        let pool = ResponsePool::<u32>::default();

        for i in 0..3 {
            let response = pool.acquire();
            assert_eq!(pool.idle(), 0);
            response.responder().send(i);
            assert_eq!(response.wait(Duration::from_secs(1)).await, Ok(i));
            assert_eq!(pool.idle(), 1);
        }
    }

    #[tokio::test]
    async fn test_guard_dropped_before_wait_is_discarded() {
        let pool = ResponsePool::<u32>::default();
        let response = pool.acquire();
        response.responder().send(3);
        drop(response);
        assert_eq!(pool.idle(), 0);
    }
}
