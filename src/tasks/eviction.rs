//! Eviction Controller Task
//!
//! Background task that keeps the total stored bytes under the configured
//! threshold by evicting the least recently used key of every shard.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::Engine;
use crate::config::{Config, EvictStrategy};

/// Spawns the eviction controller, if the config asks for one.
///
/// Returns `None` when the threshold is not positive or the strategy is
/// [`EvictStrategy::Disabled`].
///
/// # Panics
/// Selecting [`EvictStrategy::Ttl`] together with a positive threshold.
pub fn spawn_eviction_task(
    engine: Arc<Engine>,
    config: &Config,
    cancel: CancellationToken,
) -> Option<JoinHandle<()>> {
    let threshold = config.db_bytes_evict_threshold;
    if threshold <= 0 {
        return None;
    }

    match config.evict_strategy {
        EvictStrategy::Disabled => None,
        EvictStrategy::Lru => Some(spawn_lru_task(
            engine,
            threshold,
            config.eviction_frequency,
            cancel,
        )),
        EvictStrategy::Ttl => panic!("TTL eviction strategy is not implemented"),
    }
}

fn spawn_lru_task(
    engine: Arc<Engine>,
    threshold: i64,
    frequency: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting LRU eviction with threshold of {} bytes, checked every {:?}",
            threshold, frequency
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(frequency) => {}
            }

            // Keep evicting without waiting for the next tick while over budget.
            while !cancel.is_cancelled() {
                let stats = match engine.stats().await {
                    Ok(stats) => stats,
                    Err(err) => {
                        engine.metrics().record_background_error();
                        warn!("Eviction size check failed: {}", err);
                        break;
                    }
                };

                if stats.db_size_in_bytes <= threshold {
                    break;
                }

                match engine.delete_lru_all().await {
                    Ok(evicted) => {
                        engine.metrics().record_eviction_round();
                        debug!(
                            "LRU eviction: {} bytes over threshold, evicted {} keys",
                            stats.db_size_in_bytes - threshold,
                            evicted
                        );
                    }
                    Err(err) => {
                        engine.metrics().record_background_error();
                        warn!("LRU eviction round failed: {}", err);
                        break;
                    }
                }
            }
        }

        info!("Eviction controller stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::slot_of;

    fn engine() -> Arc<Engine> {
        Arc::new(Engine::new(1, Duration::from_secs(1)))
    }

    fn lru_config(threshold: i64) -> Config {
        Config {
            evict_strategy: EvictStrategy::Lru,
            db_bytes_evict_threshold: threshold,
            eviction_frequency: Duration::from_secs(1),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_no_task_without_threshold() {
        let cancel = CancellationToken::new();
        assert!(spawn_eviction_task(engine(), &lru_config(0), cancel.clone()).is_none());
        assert!(spawn_eviction_task(engine(), &lru_config(-5), cancel.clone()).is_none());

        let disabled = Config {
            evict_strategy: EvictStrategy::Disabled,
            ..lru_config(50)
        };
        assert!(spawn_eviction_task(engine(), &disabled, cancel).is_none());
    }

    #[tokio::test]
    async fn test_ttl_strategy_ignored_without_threshold() {
        let config = Config {
            evict_strategy: EvictStrategy::Ttl,
            ..lru_config(0)
        };
        assert!(spawn_eviction_task(engine(), &config, CancellationToken::new()).is_none());
    }

    #[tokio::test]
    #[should_panic(expected = "TTL eviction strategy is not implemented")]
    async fn test_ttl_strategy_panics() {
        let config = Config {
            evict_strategy: EvictStrategy::Ttl,
            ..lru_config(50)
        };
        spawn_eviction_task(engine(), &config, CancellationToken::new());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lru_eviction_brings_size_under_threshold() {
        let engine = engine();
        for i in 0..10 {
            engine
                .set(&format!("test{i}"), vec![b'x'; 10], Duration::ZERO)
                .await
                .unwrap();
        }
        assert_eq!(engine.stats().await.unwrap().db_size_in_bytes, 100);

        let cancel = CancellationToken::new();
        let handle = spawn_eviction_task(engine.clone(), &lru_config(50), cancel.clone()).unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;

        let stats = engine.stats().await.unwrap();
        assert!(stats.db_size_in_bytes <= 50, "size {}", stats.db_size_in_bytes);
        assert!(stats.evictions >= 5);
        assert!(engine.metrics().eviction_rounds() >= 1);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_size_check_retries_next_tick() {
        let engine = Arc::new(Engine::new(1, Duration::from_millis(10)));
        engine.set("key", vec![0; 10], Duration::ZERO).await.unwrap();
        let guard = engine.storage().lock_shard(slot_of("held")).await;

        let cancel = CancellationToken::new();
        let handle = spawn_eviction_task(engine.clone(), &lru_config(5), cancel.clone()).unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(engine.metrics().background_errors(), 1);
        assert_eq!(engine.metrics().eviction_rounds(), 0);

        drop(guard);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(engine.metrics().background_errors(), 1);
        assert!(engine.metrics().eviction_rounds() >= 1);
        assert_eq!(engine.stats().await.unwrap().db_size_in_bytes, 0);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_under_threshold_evicts_nothing() {
        let engine = engine();
        engine.set("key", vec![0; 10], Duration::ZERO).await.unwrap();

        let cancel = CancellationToken::new();
        let handle = spawn_eviction_task(engine.clone(), &lru_config(50), cancel.clone()).unwrap();

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(engine.stats().await.unwrap().db_size_in_bytes, 10);
        assert_eq!(engine.metrics().eviction_rounds(), 0);

        cancel.cancel();
        handle.await.unwrap();
    }
}
