//! Turns raw `/proc` reads into a `fleet_proto::MonitorInfo` wire sample.
//!
//! Percentages and rates need two points in time, so the `Sampler` keeps the
//! previous tick's raw counters and divides by the elapsed wall-clock time,
//! the same two-sample-delta approach as the teacher's
//! `collector::procfs` CPU/net parsers (and the C++ original's
//! `cpu_stat_monitor.cpp`, which computes `cpu_percent` from jiffie deltas
//! over elapsed seconds).

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::time::Instant;

use fleet_proto::{CpuLoad, CpuStat, DiskInfo, HostInfo, MemInfo, MonitorInfo, NetInfo, SoftIrq};

use crate::procfs::{
    self, CpuJiffies, DiskStats, NetDevStats,
};

/// Filesystem indirection so the sampler can be exercised against fixture
/// directories in tests without touching the real `/proc`.
pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

struct NetCounters {
    rx_bytes: u64,
    rx_packets: u64,
    tx_bytes: u64,
    tx_packets: u64,
}

struct DiskCounters {
    reads: u64,
    read_sectors: u64,
    read_time_ms: u64,
    writes: u64,
    write_sectors: u64,
    write_time_ms: u64,
    io_time_ms: u64,
}

/// Samples `/proc` once per tick, carrying enough previous-tick state to
/// turn cumulative kernel counters into the percentages and per-second
/// rates `fleet_proto`'s wire messages carry.
pub struct Sampler<F: FileSystem> {
    fs: F,
    proc_path: String,
    last_cpus: HashMap<Option<u32>, CpuJiffies>,
    last_net: HashMap<String, NetCounters>,
    last_disk: HashMap<String, DiskCounters>,
    last_softirq: HashMap<String, [u64; 10]>,
    last_tick: Option<Instant>,
}

impl<F: FileSystem> Sampler<F> {
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            last_cpus: HashMap::new(),
            last_net: HashMap::new(),
            last_disk: HashMap::new(),
            last_softirq: HashMap::new(),
            last_tick: None,
        }
    }

    fn read(&self, name: &str) -> io::Result<String> {
        self.fs.read_to_string(Path::new(&self.proc_path).join(name).as_path())
    }

    /// Builds one `MonitorInfo` sample. Individual missing/unreadable
    /// `/proc` files degrade gracefully to an absent or empty field rather
    /// than failing the whole tick — a host missing `/proc/diskstats`
    /// (e.g. inside some containers) should still report CPU and memory.
    pub fn sample(&mut self, host: &HostInfo) -> MonitorInfo {
        let now = Instant::now();
        let elapsed_s = self.last_tick.map(|t| now.duration_since(t).as_secs_f64()).unwrap_or(0.0);

        let cpu_stat = self.sample_cpu(elapsed_s);
        let cpu_load = self.sample_loadavg();
        let mem_info = self.sample_meminfo();
        let net_info = self.sample_net(elapsed_s);
        let disk_info = self.sample_disk(elapsed_s);
        let soft_irq = self.sample_softirq();

        self.last_tick = Some(now);

        MonitorInfo {
            name: host.hostname.clone(),
            host_info: Some(host.clone()),
            cpu_stat,
            cpu_load,
            mem_info,
            net_info,
            disk_info,
            soft_irq,
        }
    }

    fn sample_cpu(&mut self, elapsed_s: f64) -> Vec<CpuStat> {
        let Ok(content) = self.read("stat") else {
            return Vec::new();
        };
        let Ok(lines) = procfs::parse_proc_stat(&content) else {
            return Vec::new();
        };

        let mut out = Vec::with_capacity(lines.len());
        for line in &lines {
            let stat = match self.last_cpus.get(&line.id) {
                Some(prev) if elapsed_s > 0.0 => cpu_percentages(prev, line),
                _ => CpuStat::default(),
            };
            out.push(stat);
            self.last_cpus.insert(line.id, line.clone());
        }
        out
    }

    fn sample_loadavg(&self) -> Option<CpuLoad> {
        let content = self.read("loadavg").ok()?;
        let load = procfs::parse_loadavg(&content).ok()?;
        Some(CpuLoad { load_avg_1: load.load1, load_avg_3: load.load5, load_avg_15: load.load15 })
    }

    fn sample_meminfo(&self) -> Option<MemInfo> {
        let content = self.read("meminfo").ok()?;
        let mem = procfs::parse_meminfo(&content).ok()?;

        let used_percent = if mem.mem_total > 0 {
            (mem.mem_total.saturating_sub(mem.mem_available)) as f64 / mem.mem_total as f64 * 100.0
        } else {
            0.0
        };

        Some(MemInfo {
            total: mem.mem_total,
            free: mem.mem_free,
            avail: mem.mem_available,
            used_percent,
            buffers: mem.buffers,
            cached: mem.cached,
            swap_cached: mem.swap_cached,
            active: mem.active,
            inactive: mem.inactive,
            active_anon: mem.active_anon,
            inactive_anon: mem.inactive_anon,
            active_file: mem.active_file,
            inactive_file: mem.inactive_file,
            dirty: mem.dirty,
            writeback: mem.writeback,
            anon_pages: mem.anon_pages,
            mapped: mem.mapped,
            kreclaimable: mem.kreclaimable,
            sreclaimable: mem.s_reclaimable,
            sunreclaim: mem.s_unreclaim,
            swap_total: mem.swap_total,
        })
    }

    fn sample_net(&mut self, elapsed_s: f64) -> Vec<NetInfo> {
        let Ok(content) = self.read("net/dev") else {
            return Vec::new();
        };
        let Ok(devices) = procfs::parse_net_dev(&content) else {
            return Vec::new();
        };

        let mut out = Vec::with_capacity(devices.len());
        for dev in &devices {
            let info = match self.last_net.get(&dev.interface) {
                Some(prev) if elapsed_s > 0.0 => NetInfo {
                    name: dev.interface.clone(),
                    rcv_rate: (dev.rx_bytes.saturating_sub(prev.rx_bytes)) as f64 / elapsed_s,
                    send_rate: (dev.tx_bytes.saturating_sub(prev.tx_bytes)) as f64 / elapsed_s,
                    rcv_packets_rate: (dev.rx_packets.saturating_sub(prev.rx_packets)) as f64 / elapsed_s,
                    send_packets_rate: (dev.tx_packets.saturating_sub(prev.tx_packets)) as f64 / elapsed_s,
                    err_in: dev.rx_errs,
                    err_out: dev.tx_errs,
                    drop_in: dev.rx_drop,
                    drop_out: dev.tx_drop,
                },
                _ => NetInfo {
                    name: dev.interface.clone(),
                    err_in: dev.rx_errs,
                    err_out: dev.tx_errs,
                    drop_in: dev.rx_drop,
                    drop_out: dev.tx_drop,
                    ..Default::default()
                },
            };
            out.push(info);
            self.last_net.insert(
                dev.interface.clone(),
                NetCounters {
                    rx_bytes: dev.rx_bytes,
                    rx_packets: dev.rx_packets,
                    tx_bytes: dev.tx_bytes,
                    tx_packets: dev.tx_packets,
                },
            );
        }
        out
    }

    fn sample_disk(&mut self, elapsed_s: f64) -> Vec<DiskInfo> {
        let Ok(content) = self.read("diskstats") else {
            return Vec::new();
        };
        let Ok(disks) = procfs::parse_diskstats(&content) else {
            return Vec::new();
        };

        let mut out = Vec::with_capacity(disks.len());
        for disk in &disks {
            let info = match self.last_disk.get(&disk.device) {
                Some(prev) if elapsed_s > 0.0 => disk_rates(prev, disk, elapsed_s),
                _ => DiskInfo {
                    name: disk.device.clone(),
                    reads: disk.reads,
                    writes: disk.writes,
                    sectors_read: disk.read_sectors,
                    sectors_written: disk.write_sectors,
                    read_time_ms: disk.read_time_ms,
                    write_time_ms: disk.write_time_ms,
                    io_in_progress: disk.io_in_progress,
                    io_time_ms: disk.io_time_ms,
                    weighted_io_time_ms: disk.weighted_io_time_ms,
                    ..Default::default()
                },
            };
            out.push(info);
            self.last_disk.insert(
                disk.device.clone(),
                DiskCounters {
                    reads: disk.reads,
                    read_sectors: disk.read_sectors,
                    read_time_ms: disk.read_time_ms,
                    writes: disk.writes,
                    write_sectors: disk.write_sectors,
                    write_time_ms: disk.write_time_ms,
                    io_time_ms: disk.io_time_ms,
                },
            );
        }
        out
    }

    fn sample_softirq(&mut self) -> Vec<SoftIrq> {
        let Ok(content) = self.read("softirqs") else {
            return Vec::new();
        };
        let Ok(per_cpu) = procfs::parse_softirqs(&content) else {
            return Vec::new();
        };

        let mut names: Vec<&String> = per_cpu.keys().collect();
        names.sort();

        names
            .into_iter()
            .map(|cpu_name| {
                let c = per_cpu[cpu_name];
                SoftIrq {
                    cpu_name: cpu_name.clone(),
                    hi: c[0],
                    timer: c[1],
                    net_tx: c[2],
                    net_rx: c[3],
                    block: c[4],
                    irq_poll: c[5],
                    tasklet: c[6],
                    sched: c[7],
                    hrtimer: c[8],
                    rcu: c[9],
                }
            })
            .collect()
    }
}

/// `cpu_percent` = busy-jiffies-delta / total-jiffies-delta * 100, matching
/// the original monitor's `cpu_stat_monitor.cpp`.
fn cpu_percentages(prev: &CpuJiffies, now: &CpuJiffies) -> CpuStat {
    let total_now = now.user + now.nice + now.system + now.idle + now.iowait + now.irq + now.softirq + now.steal;
    let total_prev =
        prev.user + prev.nice + prev.system + prev.idle + prev.iowait + prev.irq + prev.softirq + prev.steal;
    let total_delta = total_now.saturating_sub(total_prev) as f64;
    if total_delta <= 0.0 {
        return CpuStat::default();
    }

    let pct = |now_v: u64, prev_v: u64| (now_v.saturating_sub(prev_v)) as f64 / total_delta * 100.0;
    let busy_now = now.user + now.system + now.nice + now.irq + now.softirq + now.steal;
    let busy_prev = prev.user + prev.system + prev.nice + prev.irq + prev.softirq + prev.steal;

    CpuStat {
        cpu_percent: (busy_now.saturating_sub(busy_prev)) as f64 / total_delta * 100.0,
        usr_percent: pct(now.user, prev.user),
        system_percent: pct(now.system, prev.system),
        nice_percent: pct(now.nice, prev.nice),
        idle_percent: pct(now.idle, prev.idle),
        io_wait_percent: pct(now.iowait, prev.iowait),
        irq_percent: pct(now.irq, prev.irq),
        soft_irq_percent: pct(now.softirq, prev.softirq),
    }
}

fn disk_rates(prev: &DiskCounters, now: &DiskStats, elapsed_s: f64) -> DiskInfo {
    const SECTOR_BYTES: f64 = 512.0;
    let read_delta = now.reads.saturating_sub(prev.reads);
    let write_delta = now.writes.saturating_sub(prev.writes);
    let read_time_delta = now.read_time_ms.saturating_sub(prev.read_time_ms);
    let write_time_delta = now.write_time_ms.saturating_sub(prev.write_time_ms);
    let io_time_delta = now.io_time_ms.saturating_sub(prev.io_time_ms);

    DiskInfo {
        name: now.device.clone(),
        read_bytes_per_sec: (now.read_sectors.saturating_sub(prev.read_sectors)) as f64 * SECTOR_BYTES
            / elapsed_s,
        write_bytes_per_sec: (now.write_sectors.saturating_sub(prev.write_sectors)) as f64 * SECTOR_BYTES
            / elapsed_s,
        read_iops: read_delta as f64 / elapsed_s,
        write_iops: write_delta as f64 / elapsed_s,
        avg_read_latency_ms: if read_delta > 0 { read_time_delta as f64 / read_delta as f64 } else { 0.0 },
        avg_write_latency_ms: if write_delta > 0 {
            write_time_delta as f64 / write_delta as f64
        } else {
            0.0
        },
        util_percent: (io_time_delta as f64 / (elapsed_s * 1000.0) * 100.0).min(100.0),
        reads: now.reads,
        writes: now.writes,
        sectors_read: now.read_sectors,
        sectors_written: now.write_sectors,
        read_time_ms: now.read_time_ms,
        write_time_ms: now.write_time_ms,
        io_in_progress: now.io_in_progress,
        io_time_ms: now.io_time_ms,
        weighted_io_time_ms: now.weighted_io_time_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap as StdHashMap;

    struct FixtureFs {
        files: RefCell<StdHashMap<String, Vec<String>>>,
    }

    impl FixtureFs {
        fn new(initial: &[(&str, &str)]) -> Self {
            let mut files = StdHashMap::new();
            for (name, content) in initial {
                files.insert(name.to_string(), vec![content.to_string()]);
            }
            Self { files: RefCell::new(files) }
        }
    }

    impl FileSystem for FixtureFs {
        fn read_to_string(&self, path: &Path) -> io::Result<String> {
            let name = path.file_name().unwrap().to_str().unwrap();
            let key = if path.to_string_lossy().contains("net/dev") { "net/dev".to_string() } else { name.to_string() };
            let mut files = self.files.borrow_mut();
            let versions = files.get_mut(&key).ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
            if versions.len() > 1 {
                Ok(versions.remove(0))
            } else {
                Ok(versions[0].clone())
            }
        }
    }

    #[test]
    fn first_sample_has_zero_cpu_percent_and_populates_state() {
        let fs = FixtureFs::new(&[
            ("stat", "cpu  100 0 50 800 0 0 0 0\n"),
            ("loadavg", "1.0 1.0 1.0 1/100 999\n"),
            ("meminfo", "MemTotal: 1000 kB\nMemAvailable: 500 kB\n"),
        ]);
        let mut sampler = Sampler::new(fs, "/proc");
        let host = HostInfo { hostname: "web-01".into(), ip_address: "10.0.0.1".into() };
        let info = sampler.sample(&host);

        assert_eq!(info.cpu_stat.len(), 1);
        assert_eq!(info.cpu_stat[0].cpu_percent, 0.0);
        assert_eq!(info.mem_info.unwrap().used_percent, 50.0);
    }

    #[test]
    fn second_sample_computes_nonzero_cpu_percent() {
        let fs = FixtureFs::new(&[("stat", "cpu  100 0 50 800 0 0 0 0\n")]);
        {
            let mut files = fs.files.borrow_mut();
            files.get_mut("stat").unwrap().push("cpu  200 0 100 1600 0 0 0 0\n".to_string());
        }
        let mut sampler = Sampler::new(fs, "/proc");
        let host = HostInfo::default();
        let _ = sampler.sample(&host);
        std::thread::sleep(std::time::Duration::from_millis(10));
        let second = sampler.sample(&host);

        assert!(second.cpu_stat[0].cpu_percent > 0.0);
    }

    #[test]
    fn missing_proc_files_degrade_to_empty_fields_without_panicking() {
        let fs = FixtureFs::new(&[]);
        let mut sampler = Sampler::new(fs, "/proc");
        let host = HostInfo::default();
        let info = sampler.sample(&host);

        assert!(info.cpu_stat.is_empty());
        assert!(info.cpu_load.is_none());
        assert!(info.mem_info.is_none());
        assert!(info.net_info.is_empty());
        assert!(info.disk_info.is_empty());
        assert!(info.soft_irq.is_empty());
    }
}
