//! Shard Module
//!
//! One partition of the key space: a key-to-entry table, a running byte
//! counter and per-shard counters. A shard is only ever touched through
//! [`Shard::process`], under the lock held by the dispatcher.
//!
//! Expired entries are treated as absent the moment they expire. They keep
//! counting toward `size_in_bytes` until a command or a sweep removes them.

use std::collections::HashMap;

use tokio::time::Instant;

use crate::cache::command::{Command, ShardStats, TtlResult, ValueResult};
use crate::cache::entry::Entry;
use crate::slot::Slot;

// == Shard ==
/// Storage for a single hash slot.
#[derive(Debug)]
pub struct Shard {
    slot: Slot,
    entries: HashMap<String, Entry>,
    /// Sum of value lengths of every entry in `entries`
    size_in_bytes: i64,
    stats: ShardStats,
}

impl Shard {
    // == Constructor ==
    pub fn new(slot: Slot) -> Self {
        Self {
            slot,
            entries: HashMap::new(),
            size_in_bytes: 0,
            stats: ShardStats::default(),
        }
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    // == Process ==
    /// Executes one command and deposits its result.
    ///
    /// The match is exhaustive: a command the shard does not understand
    /// cannot be constructed.
    pub fn process(&mut self, command: Command) {
        let now = Instant::now();
        match command {
            Command::Set {
                key,
                value,
                expires_at,
                resp,
            } => resp.send(self.set(key, value, expires_at, now)),
            Command::Get { key, resp } => resp.send(self.get(&key, now)),
            Command::Delete { key, resp } => resp.send(self.delete(&key, now)),
            Command::Expire {
                key,
                expires_at,
                resp,
            } => resp.send(self.expire(&key, expires_at, now)),
            Command::Persist { key, resp } => resp.send(self.persist(&key, now)),
            Command::Ttl { key, resp } => resp.send(self.ttl(&key, now)),
            Command::Stats { resp } => resp.send(self.stats()),
            Command::DeleteExpired { resp } => resp.send(self.delete_expired(now)),
            Command::DeleteLru { resp } => resp.send(self.delete_lru(now)),
            Command::Ping { resp } => resp.send(()),
        }
    }

    // == Set ==
    /// Stores `value`, returning the previous live value if any.
    pub fn set(
        &mut self,
        key: String,
        value: Vec<u8>,
        expires_at: Option<Instant>,
        now: Instant,
    ) -> ValueResult {
        let entry = Entry::new(value, now, expires_at);
        self.size_in_bytes += entry.size();

        let previous = self.entries.insert(key, entry);
        self.detach(previous, now)
    }

    // == Get ==
    /// Returns the live value and marks it recently used.
    pub fn get(&mut self, key: &str, now: Instant) -> ValueResult {
        if self.purge_if_expired(key, now) {
            self.stats.misses += 1;
            return ValueResult::not_found();
        }

        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.last_access = now;
                self.stats.hits += 1;
                ValueResult::found(entry.value.clone())
            }
            None => {
                self.stats.misses += 1;
                ValueResult::not_found()
            }
        }
    }

    // == Delete ==
    /// Removes `key`, returning its value if it was live.
    pub fn delete(&mut self, key: &str, now: Instant) -> ValueResult {
        let removed = self.entries.remove(key);
        self.detach(removed, now)
    }

    // == Expire ==
    /// Sets a new expiration instant on a live key.
    pub fn expire(&mut self, key: &str, expires_at: Option<Instant>, now: Instant) -> ValueResult {
        if self.purge_if_expired(key, now) {
            return ValueResult::not_found();
        }

        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at = expires_at;
                ValueResult::found(entry.value.clone())
            }
            None => ValueResult::not_found(),
        }
    }

    // == Persist ==
    /// Clears the expiration of a live key.
    pub fn persist(&mut self, key: &str, now: Instant) -> ValueResult {
        if self.purge_if_expired(key, now) {
            return ValueResult::not_found();
        }

        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at = None;
                ValueResult::found(entry.value.clone())
            }
            None => ValueResult::not_found(),
        }
    }

    // == Ttl ==
    /// Remaining time to live of a live key.
    pub fn ttl(&mut self, key: &str, now: Instant) -> TtlResult {
        if self.purge_if_expired(key, now) {
            return TtlResult::default();
        }

        match self.entries.get(key) {
            Some(entry) => TtlResult {
                ttl: entry.ttl_remaining_at(now),
                exists: true,
            },
            None => TtlResult::default(),
        }
    }

    // == Stats ==
    /// Snapshot of the byte counter and shard counters.
    pub fn stats(&self) -> ShardStats {
        ShardStats {
            size_in_bytes: self.size_in_bytes,
            keys: self.entries.len(),
            ..self.stats
        }
    }

    // == Delete Expired ==
    /// Removes every expired entry. Returns the number removed.
    ///
    /// This scans the whole table, so its cost grows with the shard.
    pub fn delete_expired(&mut self, now: Instant) -> usize {
        let before = self.len();
        let mut freed = 0;
        self.entries.retain(|_, entry| {
            if entry.is_expired_at(now) {
                freed += entry.size();
                false
            } else {
                true
            }
        });

        let removed = before - self.len();
        self.size_in_bytes -= freed;
        self.stats.expirations += removed as u64;
        removed
    }

    // == Delete LRU ==
    /// Removes the entry with the oldest access time.
    ///
    /// Among entries with equal access times the first one seen wins; since
    /// table iteration order is unspecified, which key that is is undefined.
    pub fn delete_lru(&mut self, now: Instant) -> ValueResult {
        let Some(key) = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone())
        else {
            return ValueResult::not_found();
        };

        let result = self.delete(&key, now);
        if result.exists {
            self.stats.evictions += 1;
        }
        result
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes `key` if it is present but expired. Returns true if it did.
    fn purge_if_expired(&mut self, key: &str, now: Instant) -> bool {
        if !self
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired_at(now))
        {
            return false;
        }

        let removed = self.entries.remove(key);
        self.detach(removed, now);
        true
    }

    /// Accounts for an entry that left the table and reports it if it was live.
    fn detach(&mut self, entry: Option<Entry>, now: Instant) -> ValueResult {
        let Some(entry) = entry else {
            return ValueResult::not_found();
        };

        self.size_in_bytes -= entry.size();
        if entry.is_expired_at(now) {
            self.stats.expirations += 1;
            ValueResult::not_found()
        } else {
            ValueResult::found(entry.value)
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::response::ResponsePool;
    use std::time::Duration;

    fn shard() -> Shard {
        Shard::new(Slot(0))
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_shard_new() {
        let shard = Shard::new(Slot(9));
        assert_eq!(shard.slot(), Slot(9));
        assert!(shard.is_empty());
        assert_eq!(shard.stats(), ShardStats::default());
    }

    #[test]
    fn test_set_and_get() {
        let mut shard = shard();
        let now = Instant::now();

        let result = shard.set("key1".to_string(), b"value1".to_vec(), None, now);
        assert_eq!(result, ValueResult::not_found());

        let result = shard.get("key1", now);
        assert_eq!(result, ValueResult::found(b"value1".to_vec()));
        assert_eq!(shard.len(), 1);
        assert_eq!(shard.stats().size_in_bytes, 6);
    }

    #[test]
    fn test_get_nonexistent() {
        let mut shard = shard();
        assert_eq!(shard.get("missing", Instant::now()), ValueResult::not_found());
        assert_eq!(shard.stats().misses, 1);
    }

    #[test]
    fn test_overwrite_returns_previous_and_tracks_size() {
        let mut shard = shard();
        let now = Instant::now();

        shard.set("test".to_string(), b"value".to_vec(), None, now);
        assert_eq!(shard.stats().size_in_bytes, 5);

        let result = shard.set("test".to_string(), b"updatedValue".to_vec(), None, now);
        assert_eq!(result, ValueResult::found(b"value".to_vec()));
        assert_eq!(shard.stats().size_in_bytes, 12);
        assert_eq!(shard.len(), 1);
    }

    #[test]
    fn test_set_over_expired_hides_previous() {
        let mut shard = shard();
        let now = Instant::now();

        shard.set("k".to_string(), b"old".to_vec(), Some(now + secs(1)), now);
        let later = now + secs(2);
        let result = shard.set("k".to_string(), b"new!".to_vec(), None, later);

        assert_eq!(result, ValueResult::not_found());
        assert_eq!(shard.stats().size_in_bytes, 4);
        assert_eq!(shard.stats().expirations, 1);
    }

    #[test]
    fn test_get_expired_purges() {
        let mut shard = shard();
        let now = Instant::now();

        shard.set("k".to_string(), b"value".to_vec(), Some(now + secs(1)), now);
        assert!(shard.get("k", now).exists);

        assert_eq!(shard.get("k", now + secs(1)), ValueResult::not_found());
        assert!(shard.is_empty());
        assert_eq!(shard.stats().size_in_bytes, 0);
    }

    #[test]
    fn test_get_updates_last_access() {
        let mut shard = shard();
        let now = Instant::now();

        shard.set("k".to_string(), b"v".to_vec(), None, now);
        shard.get("k", now + secs(5));
        assert_eq!(shard.entries["k"].last_access, now + secs(5));
    }

    #[test]
    fn test_delete() {
        let mut shard = shard();
        let now = Instant::now();

        assert_eq!(shard.delete("k", now), ValueResult::not_found());

        shard.set("k".to_string(), b"value".to_vec(), None, now);
        assert_eq!(shard.delete("k", now), ValueResult::found(b"value".to_vec()));
        assert_eq!(shard.delete("k", now), ValueResult::not_found());
        assert_eq!(shard.stats().size_in_bytes, 0);
    }

    #[test]
    fn test_delete_expired_key_reports_absent() {
        let mut shard = shard();
        let now = Instant::now();

        shard.set("k".to_string(), b"value".to_vec(), Some(now + secs(1)), now);
        assert_eq!(shard.delete("k", now + secs(1)), ValueResult::not_found());
        assert!(shard.is_empty());
        assert_eq!(shard.stats().size_in_bytes, 0);
    }

    #[test]
    fn test_expire_and_persist() {
        let mut shard = shard();
        let now = Instant::now();

        shard.set("k".to_string(), b"value".to_vec(), None, now);

        let result = shard.expire("k", Some(now + secs(10)), now);
        assert_eq!(result, ValueResult::found(b"value".to_vec()));
        assert_eq!(shard.ttl("k", now).ttl, secs(10));

        assert!(shard.persist("k", now).exists);
        assert_eq!(
            shard.ttl("k", now),
            TtlResult {
                ttl: Duration::ZERO,
                exists: true
            }
        );
        assert!(shard.get("k", now + secs(3600)).exists);
    }

    #[test]
    fn test_expire_now_hides_key() {
        let mut shard = shard();
        let now = Instant::now();

        shard.set("k".to_string(), b"value".to_vec(), None, now);
        assert!(shard.expire("k", Some(now), now).exists);
        assert_eq!(shard.get("k", now), ValueResult::not_found());
    }

    #[test]
    fn test_commands_on_expired_key_purge() {
        let now = Instant::now();
        let later = now + secs(2);

        let mut shard = shard();
        shard.set("k".to_string(), b"value".to_vec(), Some(now + secs(1)), now);
        assert!(!shard.expire("k", Some(later + secs(5)), later).exists);
        assert!(shard.is_empty());

        shard.set("k".to_string(), b"value".to_vec(), Some(now + secs(1)), now);
        assert!(!shard.persist("k", later).exists);
        assert!(shard.is_empty());

        shard.set("k".to_string(), b"value".to_vec(), Some(now + secs(1)), now);
        assert_eq!(shard.ttl("k", later), TtlResult::default());
        assert!(shard.is_empty());

        assert_eq!(shard.stats().size_in_bytes, 0);
        assert_eq!(shard.stats().expirations, 3);
    }

    #[test]
    fn test_delete_expired_sweeps_only_expired() {
        let mut shard = shard();
        let now = Instant::now();

        shard.set("a".to_string(), b"111".to_vec(), Some(now + secs(1)), now);
        shard.set("b".to_string(), b"22".to_vec(), Some(now + secs(10)), now);
        shard.set("c".to_string(), b"3".to_vec(), None, now);

        assert_eq!(shard.delete_expired(now + secs(2)), 1);
        assert_eq!(shard.len(), 2);
        assert_eq!(shard.stats().size_in_bytes, 3);
        assert_eq!(shard.delete_expired(now + secs(2)), 0);
    }

    #[test]
    fn test_delete_lru_removes_oldest_access() {
        let mut shard = shard();
        let now = Instant::now();

        shard.set("key1".to_string(), b"v1".to_vec(), None, now);
        shard.set("key2".to_string(), b"v2".to_vec(), None, now + secs(1));
        shard.set("key3".to_string(), b"v3".to_vec(), None, now + secs(2));

        // Touch key1 so key2 becomes the oldest
        shard.get("key1", now + secs(3));

        let evicted = shard.delete_lru(now + secs(4));
        assert_eq!(evicted, ValueResult::found(b"v2".to_vec()));
        assert_eq!(shard.len(), 2);
        assert_eq!(shard.stats().evictions, 1);
        assert_eq!(shard.stats().size_in_bytes, 4);
    }

    #[test]
    fn test_delete_lru_empty_shard() {
        let mut shard = shard();
        assert_eq!(shard.delete_lru(Instant::now()), ValueResult::not_found());
        assert_eq!(shard.stats().evictions, 0);
    }

    #[tokio::test]
    async fn test_process_deposits_result() {
        let mut shard = shard();
        let values = ResponsePool::<ValueResult>::default();
        let stats = ResponsePool::<ShardStats>::default();

        let response = values.acquire();
        shard.process(Command::Set {
            key: "k".to_string(),
            value: b"value".to_vec(),
            expires_at: None,
            resp: response.responder(),
        });
        assert_eq!(
            response.wait(Duration::from_secs(1)).await,
            Ok(ValueResult::not_found())
        );

        let response = values.acquire();
        shard.process(Command::Get {
            key: "k".to_string(),
            resp: response.responder(),
        });
        assert_eq!(
            response.wait(Duration::from_secs(1)).await,
            Ok(ValueResult::found(b"value".to_vec()))
        );

        let response = stats.acquire();
        shard.process(Command::Stats {
            resp: response.responder(),
        });
        let snapshot = response.wait(Duration::from_secs(1)).await.unwrap();
        assert_eq!(snapshot.size_in_bytes, 5);
        assert_eq!(snapshot.keys, 1);
        assert_eq!(snapshot.hits, 1);
    }
}
