//! Domain types for the ingest-and-scoring pipeline (§3).
//!
//! These are deliberately decoupled from the generated `fleet_proto` wire
//! types — `fleet-manager` converts at the RPC boundary. Keeping the core
//! free of `tonic`/`prost` mirrors the teacher's split between
//! `rpglot-core`'s storage models and the wire-facing `api` conversions in
//! `rpglot-web`.

use std::time::SystemTime;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostInfo {
    pub hostname: String,
    pub ip_address: String,
}

/// One line of `/proc/stat`-shaped CPU utilization. Index 0 in a sample's
/// `cpu_stat` vector is the aggregate "cpu" line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuStat {
    pub cpu_percent: f64,
    pub usr_percent: f64,
    pub system_percent: f64,
    pub nice_percent: f64,
    pub idle_percent: f64,
    pub io_wait_percent: f64,
    pub irq_percent: f64,
    pub soft_irq_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuLoad {
    pub load_avg_1: f64,
    pub load_avg_3: f64,
    pub load_avg_15: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemInfo {
    pub total: u64,
    pub free: u64,
    pub avail: u64,
    pub used_percent: f64,
    pub buffers: u64,
    pub cached: u64,
    pub swap_cached: u64,
    pub active: u64,
    pub inactive: u64,
    pub active_anon: u64,
    pub inactive_anon: u64,
    pub active_file: u64,
    pub inactive_file: u64,
    pub dirty: u64,
    pub writeback: u64,
    pub anon_pages: u64,
    pub mapped: u64,
    pub kreclaimable: u64,
    pub sreclaimable: u64,
    pub sunreclaim: u64,
    pub swap_total: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetInfo {
    pub name: String,
    pub rcv_rate: f64,
    pub send_rate: f64,
    pub rcv_packets_rate: f64,
    pub send_packets_rate: f64,
    pub err_in: u64,
    pub err_out: u64,
    pub drop_in: u64,
    pub drop_out: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiskInfo {
    pub name: String,
    pub read_bytes_per_sec: f64,
    pub write_bytes_per_sec: f64,
    pub read_iops: f64,
    pub write_iops: f64,
    pub avg_read_latency_ms: f64,
    pub avg_write_latency_ms: f64,
    pub util_percent: f64,
    pub reads: u64,
    pub writes: u64,
    pub sectors_read: u64,
    pub sectors_written: u64,
    pub read_time_ms: u64,
    pub write_time_ms: u64,
    pub io_in_progress: u64,
    pub io_time_ms: u64,
    pub weighted_io_time_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoftIrq {
    pub cpu_name: String,
    pub hi: u64,
    pub timer: u64,
    pub net_tx: u64,
    pub net_rx: u64,
    pub block: u64,
    pub irq_poll: u64,
    pub tasklet: u64,
    pub sched: u64,
    pub hrtimer: u64,
    pub rcu: u64,
}

/// Time-less bundle pushed by a worker (§3).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorInfo {
    pub name: String,
    pub host_info: Option<HostInfo>,
    pub cpu_stat: Vec<CpuStat>,
    pub cpu_load: Option<CpuLoad>,
    pub mem_info: Option<MemInfo>,
    pub net_info: Vec<NetInfo>,
    pub disk_info: Vec<DiskInfo>,
    pub soft_irq: Vec<SoftIrq>,
}

impl MonitorInfo {
    /// Number of cores backing this sample, used for load-average scoring.
    /// `cpu_stat.len()` includes the aggregate line at index 0.
    pub fn core_count(&self) -> usize {
        self.cpu_stat.len().saturating_sub(1).max(1)
    }

    pub fn aggregate_cpu(&self) -> CpuStat {
        self.cpu_stat.first().cloned().unwrap_or_default()
    }

    pub fn primary_net(&self) -> NetInfo {
        self.net_info.first().cloned().unwrap_or_default()
    }

    pub fn max_disk_util(&self) -> f64 {
        self.disk_info
            .iter()
            .map(|d| d.util_percent)
            .fold(0.0_f64, f64::max)
    }
}

/// What's enqueued onto a shard's queue: either a sample to process, or a
/// directive to forget a host's per-shard derived state (§9's recommended
/// fix, issued by the Staleness Sweeper when it evicts a directory entry).
#[derive(Debug, Clone)]
pub enum ShardCommand {
    Sample(MonitorInfo),
    EvictHost(String),
}

/// Live Directory entry (§3 HostScore).
#[derive(Debug, Clone)]
pub struct HostScore {
    pub info: MonitorInfo,
    pub score: f64,
    pub timestamp: SystemTime,
}

/// Snapshot of the aggregate + primary-NIC fields used for I4 rate
/// computation in the Shard Worker (§4.3 step 4).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerfSample {
    pub cpu_percent: f64,
    pub usr_percent: f64,
    pub system_percent: f64,
    pub mem_used_percent: f64,
    pub load_avg_1: f64,
    pub disk_util_percent: f64,
    pub net_rcv_mib_s: f64,
    pub net_send_mib_s: f64,
}

impl PerfSample {
    pub fn from_monitor_info(info: &MonitorInfo) -> Self {
        const MIB: f64 = 1024.0 * 1024.0;
        let cpu = info.aggregate_cpu();
        let net = info.primary_net();
        Self {
            cpu_percent: cpu.cpu_percent,
            usr_percent: cpu.usr_percent,
            system_percent: cpu.system_percent,
            mem_used_percent: info.mem_info.as_ref().map(|m| m.used_percent).unwrap_or(0.0),
            load_avg_1: info.cpu_load.as_ref().map(|l| l.load_avg_1).unwrap_or(0.0),
            disk_util_percent: info.max_disk_util(),
            net_rcv_mib_s: net.rcv_rate / MIB,
            net_send_mib_s: net.send_rate / MIB,
        }
    }
}

/// A fully rated performance row, ready for the historical store (§4.6) and
/// the Query Engine's `PerformanceRow` (§4.7).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceRow {
    pub host: String,
    pub timestamp: chrono::NaiveDateTime,
    pub sample: PerfSample,
    pub rates: PerfSample,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyType {
    CpuHigh,
    MemHigh,
    DiskHigh,
    RateSpike,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyRecord {
    pub host: String,
    pub timestamp: chrono::NaiveDateTime,
    pub kind: AnomalyType,
    pub severity: Severity,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyThresholds {
    pub cpu_percent: f64,
    pub mem_percent: f64,
    pub disk_percent: f64,
    pub change_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetDetailRow {
    pub host: String,
    pub timestamp: chrono::NaiveDateTime,
    pub nic: String,
    pub sample: NetInfo,
    pub rcv_rate_change: f64,
    pub send_rate_change: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiskDetailRow {
    pub host: String,
    pub timestamp: chrono::NaiveDateTime,
    pub disk: String,
    pub sample: DiskInfo,
    pub util_change: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemDetailRow {
    pub host: String,
    pub timestamp: chrono::NaiveDateTime,
    pub sample: MemInfo,
    pub used_percent_change: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoftIrqDetailRow {
    pub host: String,
    pub timestamp: chrono::NaiveDateTime,
    pub sample: SoftIrq,
    pub net_rx_change: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreRow {
    pub host: String,
    pub timestamp: chrono::NaiveDateTime,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatestScoreRow {
    pub host: String,
    pub timestamp: chrono::NaiveDateTime,
    pub score: f64,
    pub online: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterStats {
    pub total: u32,
    pub online: u32,
    pub offline: u32,
    pub avg_score: f64,
    pub max_score: f64,
    pub min_score: f64,
    pub best_server: String,
    pub worst_server: String,
}
