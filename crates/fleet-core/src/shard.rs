//! Shard Worker (§4.3): dequeues samples for its shard and executes the
//! Process-Sample protocol. Per-shard derived state is a plain
//! (non-`Mutex`) `HashMap` owned by the worker thread — I1 (shard
//! locality) is enforced structurally: nothing outside this struct ever
//! touches these tables.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

use tokio::runtime::Handle;

use crate::directory::LiveDirectory;
use crate::identity::derive_host_id;
use crate::model::{
    DiskDetailRow, DiskInfo, MemDetailRow, MemInfo, MonitorInfo, NetDetailRow, NetInfo,
    PerfSample, PerformanceRow, ShardCommand, SoftIrq, SoftIrqDetailRow,
};
use crate::queue::QueueConsumer;
use crate::rates::df64;
use crate::router::shard_for_host;
use crate::scorer;
use crate::store::HistoricalStore;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Default)]
struct ShardState {
    last_perf_sample: HashMap<String, PerfSample>,
    last_net_sample: HashMap<String, HashMap<String, NetInfo>>,
    last_softirq_sample: HashMap<String, HashMap<String, SoftIrq>>,
    last_mem_sample: HashMap<String, MemInfo>,
    last_disk_sample: HashMap<String, HashMap<String, DiskInfo>>,
    last_disk_util: HashMap<String, f64>,
}

pub struct ShardWorker {
    shard_idx: usize,
    shard_count: usize,
    consumer: QueueConsumer<ShardCommand>,
    directory: Arc<LiveDirectory>,
    store: Arc<dyn HistoricalStore>,
    rt: Handle,
    state: ShardState,
}

impl ShardWorker {
    pub fn new(
        shard_idx: usize,
        shard_count: usize,
        consumer: QueueConsumer<ShardCommand>,
        directory: Arc<LiveDirectory>,
        store: Arc<dyn HistoricalStore>,
        rt: Handle,
    ) -> Self {
        Self {
            shard_idx,
            shard_count,
            consumer,
            directory,
            store,
            rt,
            state: ShardState::default(),
        }
    }

    /// Spawns the worker on its own OS thread. The queue's close signal (not
    /// `running` directly) drives shutdown: the worker exits once `pop`
    /// reports the queue closed and drained (§4.3 `Stopped` state).
    pub fn spawn(mut self) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            while let Some(cmd) = self.consumer.pop(POLL_INTERVAL) {
                match cmd {
                    ShardCommand::Sample(info) => self.process_sample(info),
                    ShardCommand::EvictHost(host_id) => self.evict_host(&host_id),
                }
            }
        })
    }

    /// Discards per-shard derived state for a host the Staleness Sweeper
    /// just evicted from the Live Directory (§9). Without this, a host
    /// reappearing after a long gap would compute its first rate against a
    /// stale baseline.
    fn evict_host(&mut self, host_id: &str) {
        self.state.last_perf_sample.remove(host_id);
        self.state.last_net_sample.remove(host_id);
        self.state.last_softirq_sample.remove(host_id);
        self.state.last_mem_sample.remove(host_id);
        self.state.last_disk_sample.remove(host_id);
        self.state.last_disk_util.remove(host_id);
        tracing::debug!(host = %host_id, shard = self.shard_idx, "evicted per-shard state");
    }

    fn process_sample(&mut self, info: MonitorInfo) {
        let host_id = match derive_host_id(&info) {
            Ok(id) => id,
            Err(_) => return,
        };

        let expected_shard = shard_for_host(&host_id, self.shard_count);
        if expected_shard != self.shard_idx {
            tracing::debug!(
                host = %host_id,
                shard = self.shard_idx,
                expected = expected_shard,
                "processing mis-routed sample under owning worker's shard_idx"
            );
        }

        let score = scorer::score(&info);
        let now = SystemTime::now();
        let timestamp = chrono::Utc::now().naive_utc();

        let sample = PerfSample::from_monitor_info(&info);
        let last = self
            .state
            .last_perf_sample
            .get(&host_id)
            .cloned()
            .unwrap_or_default();
        let rates = crate::rates::sample_rates(&sample, &last);
        self.state.last_perf_sample.insert(host_id.clone(), sample.clone());

        self.directory.upsert_from_sample(&host_id, info.clone(), score, now);

        let perf_row = PerformanceRow {
            host: host_id.clone(),
            timestamp,
            sample,
            rates,
            score,
        };

        let store = self.store.clone();
        let net_rows = self.build_net_rows(&host_id, &info, timestamp);
        let disk_rows = self.build_disk_rows(&host_id, &info, timestamp);
        let softirq_rows = self.build_softirq_rows(&host_id, &info, timestamp);
        let mem_row = self.build_mem_row(&host_id, &info, timestamp);

        self.rt.block_on(async {
            if let Err(e) = store.write_performance(&perf_row).await {
                tracing::warn!(host = %host_id, error = %e, "dropping sample: performance write failed");
            }
            for row in &net_rows {
                if let Err(e) = store.write_net_detail(row).await {
                    tracing::warn!(host = %host_id, error = %e, "net-detail write failed");
                }
            }
            for row in &disk_rows {
                if let Err(e) = store.write_disk_detail(row).await {
                    tracing::warn!(host = %host_id, error = %e, "disk-detail write failed");
                }
            }
            for row in &softirq_rows {
                if let Err(e) = store.write_softirq_detail(row).await {
                    tracing::warn!(host = %host_id, error = %e, "softirq-detail write failed");
                }
            }
            if let Some(row) = &mem_row {
                if let Err(e) = store.write_mem_detail(row).await {
                    tracing::warn!(host = %host_id, error = %e, "mem-detail write failed");
                }
            }
        });
    }

    fn build_net_rows(
        &mut self,
        host_id: &str,
        info: &MonitorInfo,
        timestamp: chrono::NaiveDateTime,
    ) -> Vec<NetDetailRow> {
        let table = self.state.last_net_sample.entry(host_id.to_string()).or_default();
        info.net_info
            .iter()
            .map(|nic| {
                let last = table.get(&nic.name).cloned().unwrap_or_default();
                let row = NetDetailRow {
                    host: host_id.to_string(),
                    timestamp,
                    nic: nic.name.clone(),
                    sample: nic.clone(),
                    rcv_rate_change: df64(nic.rcv_rate, last.rcv_rate),
                    send_rate_change: df64(nic.send_rate, last.send_rate),
                };
                table.insert(nic.name.clone(), nic.clone());
                row
            })
            .collect()
    }

    fn build_disk_rows(
        &mut self,
        host_id: &str,
        info: &MonitorInfo,
        timestamp: chrono::NaiveDateTime,
    ) -> Vec<DiskDetailRow> {
        let table = self.state.last_disk_sample.entry(host_id.to_string()).or_default();
        let rows: Vec<DiskDetailRow> = info
            .disk_info
            .iter()
            .map(|disk| {
                let last = table.get(&disk.name).cloned().unwrap_or_default();
                let row = DiskDetailRow {
                    host: host_id.to_string(),
                    timestamp,
                    disk: disk.name.clone(),
                    sample: disk.clone(),
                    util_change: df64(disk.util_percent, last.util_percent),
                };
                table.insert(disk.name.clone(), disk.clone());
                row
            })
            .collect();
        let composite_util = info.max_disk_util();
        self.state.last_disk_util.insert(host_id.to_string(), composite_util);
        rows
    }

    fn build_softirq_rows(
        &mut self,
        host_id: &str,
        info: &MonitorInfo,
        timestamp: chrono::NaiveDateTime,
    ) -> Vec<SoftIrqDetailRow> {
        let table = self
            .state
            .last_softirq_sample
            .entry(host_id.to_string())
            .or_default();
        info.soft_irq
            .iter()
            .map(|irq| {
                let last = table.get(&irq.cpu_name).cloned().unwrap_or_default();
                let row = SoftIrqDetailRow {
                    host: host_id.to_string(),
                    timestamp,
                    sample: irq.clone(),
                    net_rx_change: df64(irq.net_rx as f64, last.net_rx as f64),
                };
                table.insert(irq.cpu_name.clone(), irq.clone());
                row
            })
            .collect()
    }

    fn build_mem_row(
        &mut self,
        host_id: &str,
        info: &MonitorInfo,
        timestamp: chrono::NaiveDateTime,
    ) -> Option<MemDetailRow> {
        let mem = info.mem_info.as_ref()?;
        let last = self
            .state
            .last_mem_sample
            .get(host_id)
            .cloned()
            .unwrap_or_default();
        let row = MemDetailRow {
            host: host_id.to_string(),
            timestamp,
            sample: mem.clone(),
            used_percent_change: df64(mem.used_percent, last.used_percent),
        };
        self.state.last_mem_sample.insert(host_id.to_string(), mem.clone());
        Some(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::LiveDirectory;
    use crate::model::{CpuStat, HostInfo};
    use crate::queue::closable_queue;
    use crate::store::memory::MemoryStore;

    fn sample_info(hostname: &str) -> MonitorInfo {
        MonitorInfo {
            host_info: Some(HostInfo {
                hostname: hostname.to_string(),
                ip_address: String::new(),
            }),
            cpu_stat: vec![CpuStat {
                cpu_percent: 40.0,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn pop_sample(worker: &mut ShardWorker) -> MonitorInfo {
        match worker.consumer.pop(Duration::from_millis(100)).unwrap() {
            ShardCommand::Sample(info) => info,
            ShardCommand::EvictHost(_) => panic!("expected a sample command"),
        }
    }

    #[test]
    fn process_sample_populates_directory_and_store() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (tx, rx, _closed) = closable_queue::<ShardCommand>();
        let directory = Arc::new(LiveDirectory::new());
        let store: Arc<dyn HistoricalStore> = Arc::new(MemoryStore::new());

        let mut worker = ShardWorker::new(0, 4, rx, directory.clone(), store.clone(), rt.handle().clone());
        tx.push(ShardCommand::Sample(sample_info("web-01")));
        let sample = pop_sample(&mut worker);
        worker.process_sample(sample);

        assert_eq!(directory.len(), 1);
        let snapshot = directory.get_all();
        assert!(snapshot.contains_key("web-01"));
    }

    #[test]
    fn second_sample_produces_nonzero_rate_after_change() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (tx, rx, _closed) = closable_queue::<ShardCommand>();
        let directory = Arc::new(LiveDirectory::new());
        let store: Arc<dyn HistoricalStore> = Arc::new(MemoryStore::new());
        let mut worker = ShardWorker::new(0, 4, rx, directory, store, rt.handle().clone());

        tx.push(ShardCommand::Sample(sample_info("web-01")));
        let s1 = pop_sample(&mut worker);
        worker.process_sample(s1);

        let mut second = sample_info("web-01");
        second.cpu_stat[0].cpu_percent = 80.0;
        tx.push(ShardCommand::Sample(second));
        let s2 = pop_sample(&mut worker);
        worker.process_sample(s2);

        let last = worker.state.last_perf_sample.get("web-01").unwrap();
        assert_eq!(last.cpu_percent, 80.0);
    }

    #[test]
    fn evict_host_clears_all_per_shard_tables() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (tx, rx, _closed) = closable_queue::<ShardCommand>();
        let directory = Arc::new(LiveDirectory::new());
        let store: Arc<dyn HistoricalStore> = Arc::new(MemoryStore::new());
        let mut worker = ShardWorker::new(0, 4, rx, directory, store, rt.handle().clone());

        tx.push(ShardCommand::Sample(sample_info("web-01")));
        let s1 = pop_sample(&mut worker);
        worker.process_sample(s1);
        assert!(worker.state.last_perf_sample.contains_key("web-01"));

        worker.evict_host("web-01");
        assert!(!worker.state.last_perf_sample.contains_key("web-01"));
        assert!(!worker.state.last_disk_util.contains_key("web-01"));
    }
}
