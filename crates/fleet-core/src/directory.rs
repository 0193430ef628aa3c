//! Live Directory (§4.4): in-memory `host_id -> HostScore` map with a
//! single exclusive lock, matching the teacher's preference for a plain
//! `Mutex` over fine-grained sharding when contention is expected to be low.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use crate::model::{HostScore, MonitorInfo};

pub struct LiveDirectory {
    inner: Mutex<HashMap<String, HostScore>>,
}

impl Default for LiveDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveDirectory {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub fn upsert_from_sample(&self, host_id: &str, info: MonitorInfo, score: f64, now: SystemTime) {
        let mut guard = self.inner.lock().expect("live directory mutex poisoned");
        guard.insert(
            host_id.to_string(),
            HostScore {
                info,
                score,
                timestamp: now,
            },
        );
    }

    /// Snapshot copy — callers never observe a partially-updated map.
    pub fn get_all(&self) -> HashMap<String, HostScore> {
        let guard = self.inner.lock().expect("live directory mutex poisoned");
        guard.clone()
    }

    /// Host id with the maximum score, ties broken by first-seen iteration
    /// order. Empty string if the directory is empty.
    pub fn get_best(&self) -> String {
        let guard = self.inner.lock().expect("live directory mutex poisoned");
        let mut best: Option<(&str, f64)> = None;
        for (host_id, entry) in guard.iter() {
            match best {
                Some((_, best_score)) if entry.score <= best_score => {}
                _ => best = Some((host_id.as_str(), entry.score)),
            }
        }
        best.map(|(h, _)| h.to_string()).unwrap_or_default()
    }

    /// Evicts entries older than `age` and returns the evicted host ids so
    /// the caller (the Staleness Sweeper) can also discard their per-shard
    /// derived state — per §9's recommended fix for the source's "stale
    /// baseline on host reappearance" defect.
    pub fn evict_older_than(&self, age: Duration, now: SystemTime) -> Vec<String> {
        let mut guard = self.inner.lock().expect("live directory mutex poisoned");
        let stale: Vec<String> = guard
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.timestamp).map(|e| e > age).unwrap_or(false))
            .map(|(host_id, _)| host_id.clone())
            .collect();
        for host_id in &stale {
            guard.remove(host_id);
        }
        stale
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("live directory mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_best_returns_empty_string_when_empty() {
        let dir = LiveDirectory::new();
        assert_eq!(dir.get_best(), "");
    }

    #[test]
    fn get_best_returns_highest_scoring_host() {
        let dir = LiveDirectory::new();
        let now = SystemTime::now();
        dir.upsert_from_sample("a", MonitorInfo::default(), 40.0, now);
        dir.upsert_from_sample("b", MonitorInfo::default(), 90.0, now);
        dir.upsert_from_sample("c", MonitorInfo::default(), 90.0, now);
        assert!(["b", "c"].contains(&dir.get_best().as_str()));
    }

    #[test]
    fn evict_older_than_removes_stale_entries() {
        let dir = LiveDirectory::new();
        let old = SystemTime::now() - Duration::from_secs(120);
        let fresh = SystemTime::now();
        dir.upsert_from_sample("stale", MonitorInfo::default(), 50.0, old);
        dir.upsert_from_sample("live", MonitorInfo::default(), 50.0, fresh);
        let evicted = dir.evict_older_than(Duration::from_secs(60), SystemTime::now());
        let snapshot = dir.get_all();
        assert!(!snapshot.contains_key("stale"));
        assert!(snapshot.contains_key("live"));
        assert_eq!(evicted, vec!["stale".to_string()]);
    }

    #[test]
    fn get_all_is_a_snapshot_copy() {
        let dir = LiveDirectory::new();
        dir.upsert_from_sample("a", MonitorInfo::default(), 10.0, SystemTime::now());
        let snapshot = dir.get_all();
        dir.upsert_from_sample("b", MonitorInfo::default(), 20.0, SystemTime::now());
        assert_eq!(snapshot.len(), 1);
    }
}
