//! Staleness Sweeper (§4.5): the only path by which entries leave the Live
//! Directory. Runs as its own thread, matching the teacher's
//! thread-plus-running-flag shutdown idiom in `rpglotd`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

use crate::directory::LiveDirectory;
use crate::router::ShardRouter;

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
pub const STALE_AGE: Duration = Duration::from_secs(60);

/// Spawns the sweeper thread. It wakes every [`SWEEP_INTERVAL`], in short
/// slices so it notices `running` going false promptly rather than only at
/// the end of a 60s sleep. Each evicted directory entry also clears its
/// owning shard's derived state (§9's recommended fix).
pub fn spawn(
    directory: Arc<LiveDirectory>,
    router: Arc<ShardRouter>,
    running: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let slice = Duration::from_millis(500);
        while running.load(Ordering::Acquire) {
            let mut slept = Duration::ZERO;
            while slept < SWEEP_INTERVAL && running.load(Ordering::Acquire) {
                thread::sleep(slice.min(SWEEP_INTERVAL - slept));
                slept += slice;
            }
            if !running.load(Ordering::Acquire) {
                break;
            }
            let evicted = directory.evict_older_than(STALE_AGE, SystemTime::now());
            for host_id in &evicted {
                router.evict(host_id);
            }
            tracing::debug!(
                evicted = evicted.len(),
                "staleness sweep complete, {} hosts live",
                directory.len()
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MonitorInfo;
    use std::time::Duration as StdDuration;

    #[test]
    fn evicts_entries_older_than_sweep_threshold_directly() {
        let dir = LiveDirectory::new();
        let old = SystemTime::now() - StdDuration::from_secs(90);
        dir.upsert_from_sample("stale", MonitorInfo::default(), 10.0, old);
        let evicted = dir.evict_older_than(STALE_AGE, SystemTime::now());
        assert!(dir.is_empty());
        assert_eq!(evicted, vec!["stale".to_string()]);
    }
}
