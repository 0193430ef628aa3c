//! Shard Router (§4.2). A pure mapping from host identity to shard index,
//! reusing the teacher's `xxhash-rust` dependency (there used for string
//! interning) for a new purpose: a stable, non-cryptographic hash of the
//! host id.

use xxhash_rust::xxh3::xxh3_64;

use crate::identity::derive_host_id;
use crate::model::{MonitorInfo, ShardCommand};
use crate::queue::QueueProducer;

/// `stable_hash(host_id) mod shard_count`. Falls back to shard 0 for an
/// empty `host_id` rather than dropping the sample (§4.2 defensive
/// compatibility behavior).
pub fn shard_for_host(host_id: &str, shard_count: usize) -> usize {
    debug_assert!(shard_count > 0, "shard_count must be positive");
    if host_id.is_empty() {
        return 0;
    }
    (xxh3_64(host_id.as_bytes()) % shard_count as u64) as usize
}

/// Routes inbound samples onto one of `N` shard queues. Holds only
/// producer handles — enqueue never blocks (§4.2).
pub struct ShardRouter {
    producers: Vec<QueueProducer<ShardCommand>>,
}

impl ShardRouter {
    pub fn new(producers: Vec<QueueProducer<ShardCommand>>) -> Self {
        assert!(!producers.is_empty(), "router needs at least one shard");
        Self { producers }
    }

    pub fn shard_count(&self) -> usize {
        self.producers.len()
    }

    /// Derives host identity and enqueues onto the owning shard. Identity
    /// derivation failures are the Ingest Endpoint's concern (§4.1
    /// rejects them before they reach the router); this is a defensive
    /// fallback for any other caller, routing to shard 0 per §4.2.
    pub fn route(&self, info: MonitorInfo) {
        let host_id = derive_host_id(&info).unwrap_or_default();
        let shard = shard_for_host(&host_id, self.producers.len());
        self.producers[shard].push(ShardCommand::Sample(info));
    }

    /// Tells the owning shard to drop its per-shard derived state for
    /// `host_id`. Called by the Staleness Sweeper after a Live Directory
    /// eviction (§9).
    pub fn evict(&self, host_id: &str) {
        let shard = shard_for_host(host_id, self.producers.len());
        self.producers[shard].push(ShardCommand::EvictHost(host_id.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_host_id_routes_to_shard_zero() {
        assert_eq!(shard_for_host("", 4), 0);
    }

    #[test]
    fn same_host_id_always_routes_to_same_shard() {
        let a = shard_for_host("web-01_10.0.0.5", 8);
        let b = shard_for_host("web-01_10.0.0.5", 8);
        assert_eq!(a, b);
    }

    #[test]
    fn result_is_within_shard_range() {
        for host in ["a", "b", "web-01", "10.0.0.7", "long-hostname-example"] {
            let shard = shard_for_host(host, 4);
            assert!(shard < 4);
        }
    }

    #[test]
    fn all_samples_for_one_host_land_on_the_same_queue() {
        use crate::model::HostInfo;
        use crate::queue::closable_queue;
        use std::time::Duration;

        let mut producers = Vec::new();
        let mut consumers = Vec::new();
        for _ in 0..4 {
            let (p, c, _closed) = closable_queue();
            producers.push(p);
            consumers.push(c);
        }
        let router = ShardRouter::new(producers);

        let make = || MonitorInfo {
            host_info: Some(HostInfo {
                hostname: "web-01".to_string(),
                ip_address: "10.0.0.5".to_string(),
            }),
            ..Default::default()
        };
        for _ in 0..10 {
            router.route(make());
        }

        let host_id = "web-01_10.0.0.5";
        let shard = shard_for_host(host_id, router.shard_count());
        let mut count = 0;
        while consumers[shard].pop(Duration::from_millis(10)).is_some() {
            count += 1;
        }
        assert_eq!(count, 10);
        for (i, c) in consumers.iter().enumerate() {
            if i != shard {
                assert_eq!(c.pop(Duration::from_millis(10)), None);
            }
        }
    }

    #[test]
    fn evict_targets_the_same_shard_the_host_would_route_to() {
        use crate::queue::closable_queue;
        use std::time::Duration;

        let mut producers = Vec::new();
        let mut consumers = Vec::new();
        for _ in 0..4 {
            let (p, c, _closed) = closable_queue();
            producers.push(p);
            consumers.push(c);
        }
        let router = ShardRouter::new(producers);

        router.evict("web-01_10.0.0.5");
        let shard = shard_for_host("web-01_10.0.0.5", router.shard_count());
        match consumers[shard].pop(Duration::from_millis(10)) {
            Some(ShardCommand::EvictHost(h)) => assert_eq!(h, "web-01_10.0.0.5"),
            other => panic!("expected EvictHost command, got {:?}", other),
        }
    }
}
