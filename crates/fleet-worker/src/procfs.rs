//! Parsers for the `/proc` files the Worker samples each tick.
//!
//! These are pure functions over file content, same shape as
//! `rpglot-core`'s `collector::procfs::parser`: no I/O, easily testable with
//! string fixtures, one `ParseError` type with a plain message.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { message: msg.into() }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// One CPU line from `/proc/stat`: the cumulative jiffie counters. `id` is
/// `None` for the aggregate "cpu" line, `Some(n)` for "cpuN".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuJiffies {
    pub id: Option<u32>,
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

/// Parses the `cpu`/`cpuN` lines of `/proc/stat` content.
pub fn parse_proc_stat(content: &str) -> Result<Vec<CpuJiffies>, ParseError> {
    let mut cpus = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() || !parts[0].starts_with("cpu") {
            continue;
        }

        let id = if parts[0] == "cpu" {
            None
        } else {
            parts[0].strip_prefix("cpu").and_then(|s| s.parse().ok())
        };

        let get_val = |idx: usize| -> u64 { parts.get(idx).and_then(|s| s.parse().ok()).unwrap_or(0) };

        cpus.push(CpuJiffies {
            id,
            user: get_val(1),
            nice: get_val(2),
            system: get_val(3),
            idle: get_val(4),
            iowait: get_val(5),
            irq: get_val(6),
            softirq: get_val(7),
            steal: get_val(8),
        });
    }

    if cpus.is_empty() {
        return Err(ParseError::new("no cpu lines found in /proc/stat"));
    }

    Ok(cpus)
}

/// Parsed `/proc/loadavg` content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadAvg {
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
}

pub fn parse_loadavg(content: &str) -> Result<LoadAvg, ParseError> {
    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() < 3 {
        return Err(ParseError::new("invalid loadavg format"));
    }

    let load1 = parts[0].parse().map_err(|_| ParseError::new("invalid load1"))?;
    let load5 = parts[1].parse().map_err(|_| ParseError::new("invalid load5"))?;
    let load15 = parts[2].parse().map_err(|_| ParseError::new("invalid load15"))?;

    Ok(LoadAvg { load1, load5, load15 })
}

/// Parsed `/proc/meminfo` content (all fields `fleet_proto::MemInfo` needs).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemRaw {
    pub mem_total: u64,
    pub mem_free: u64,
    pub mem_available: u64,
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
    pub s_reclaimable: u64,
    pub s_unreclaim: u64,
    pub swap_total: u64,
}

pub fn parse_meminfo(content: &str) -> Result<MemRaw, ParseError> {
    let mut info = MemRaw::default();

    let parse_kb = |line: &str| -> u64 {
        line.split_whitespace().nth(1).and_then(|s| s.parse().ok()).unwrap_or(0)
    };

    for line in content.lines() {
        if line.starts_with("MemTotal:") {
            info.mem_total = parse_kb(line);
        } else if line.starts_with("MemFree:") {
            info.mem_free = parse_kb(line);
        } else if line.starts_with("MemAvailable:") {
            info.mem_available = parse_kb(line);
        } else if line.starts_with("Buffers:") {
            info.buffers = parse_kb(line);
        } else if line.starts_with("Cached:") {
            info.cached = parse_kb(line);
        } else if line.starts_with("SwapCached:") {
            info.swap_cached = parse_kb(line);
        } else if line.starts_with("Active(anon):") {
            info.active_anon = parse_kb(line);
        } else if line.starts_with("Inactive(anon):") {
            info.inactive_anon = parse_kb(line);
        } else if line.starts_with("Active(file):") {
            info.active_file = parse_kb(line);
        } else if line.starts_with("Inactive(file):") {
            info.inactive_file = parse_kb(line);
        } else if line.starts_with("Active:") {
            info.active = parse_kb(line);
        } else if line.starts_with("Inactive:") {
            info.inactive = parse_kb(line);
        } else if line.starts_with("SwapTotal:") {
            info.swap_total = parse_kb(line);
        } else if line.starts_with("Dirty:") {
            info.dirty = parse_kb(line);
        } else if line.starts_with("Writeback:") {
            info.writeback = parse_kb(line);
        } else if line.starts_with("AnonPages:") {
            info.anon_pages = parse_kb(line);
        } else if line.starts_with("Mapped:") {
            info.mapped = parse_kb(line);
        } else if line.starts_with("KReclaimable:") {
            info.kreclaimable = parse_kb(line);
        } else if line.starts_with("SReclaimable:") {
            info.s_reclaimable = parse_kb(line);
        } else if line.starts_with("SUnreclaim:") {
            info.s_unreclaim = parse_kb(line);
        }
    }

    Ok(info)
}

/// One line from `/proc/diskstats`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiskStats {
    pub device: String,
    pub reads: u64,
    pub read_sectors: u64,
    pub read_time_ms: u64,
    pub writes: u64,
    pub write_sectors: u64,
    pub write_time_ms: u64,
    pub io_in_progress: u64,
    pub io_time_ms: u64,
    pub weighted_io_time_ms: u64,
}

pub fn parse_diskstats(content: &str) -> Result<Vec<DiskStats>, ParseError> {
    let mut disks = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 14 {
            continue;
        }

        let get_val = |idx: usize| -> u64 { parts.get(idx).and_then(|s| s.parse().ok()).unwrap_or(0) };

        disks.push(DiskStats {
            device: parts[2].to_string(),
            reads: get_val(3),
            read_sectors: get_val(5),
            read_time_ms: get_val(6),
            writes: get_val(7),
            write_sectors: get_val(9),
            write_time_ms: get_val(10),
            io_in_progress: get_val(11),
            io_time_ms: get_val(12),
            weighted_io_time_ms: get_val(13),
        });
    }

    Ok(disks)
}

/// One interface's line from `/proc/net/dev`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetDevStats {
    pub interface: String,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub rx_errs: u64,
    pub rx_drop: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errs: u64,
    pub tx_drop: u64,
}

pub fn parse_net_dev(content: &str) -> Result<Vec<NetDevStats>, ParseError> {
    let mut devices = Vec::new();

    for line in content.lines() {
        if line.contains('|') || line.trim().is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() != 2 {
            continue;
        }

        let interface = parts[0].trim().to_string();
        if interface == "lo" {
            continue;
        }
        let values: Vec<&str> = parts[1].split_whitespace().collect();
        if values.len() < 16 {
            continue;
        }

        let get_val = |idx: usize| -> u64 { values.get(idx).and_then(|s| s.parse().ok()).unwrap_or(0) };

        devices.push(NetDevStats {
            interface,
            rx_bytes: get_val(0),
            rx_packets: get_val(1),
            rx_errs: get_val(2),
            rx_drop: get_val(3),
            tx_bytes: get_val(8),
            tx_packets: get_val(9),
            tx_errs: get_val(10),
            tx_drop: get_val(11),
        });
    }

    Ok(devices)
}

/// Per-CPU softirq counters, pivoted from `/proc/softirqs` (one column per
/// CPU, one row per IRQ kind). Not present in the teacher, which reads
/// softirq counts from a custom kernel module instead — `/proc/softirqs`
/// carries the same fields so the parser idiom still applies.
pub fn parse_softirqs(content: &str) -> Result<HashMap<String, [u64; 10]>, ParseError> {
    const KINDS: [&str; 10] =
        ["HI", "TIMER", "NET_TX", "NET_RX", "BLOCK", "IRQ_POLL", "TASKLET", "SCHED", "HRTIMER", "RCU"];

    let mut lines = content.lines();
    let header = lines.next().ok_or_else(|| ParseError::new("empty /proc/softirqs"))?;
    let cpu_names: Vec<String> = header.split_whitespace().map(|s| s.to_string()).collect();

    let mut per_cpu: HashMap<String, [u64; 10]> =
        cpu_names.iter().map(|c| (c.to_lowercase(), [0u64; 10])).collect();

    for line in lines {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }
        let kind = parts[0].trim_end_matches(':');
        let Some(slot) = KINDS.iter().position(|k| *k == kind) else {
            continue;
        };

        for (cpu_idx, cpu_name) in cpu_names.iter().enumerate() {
            let value: u64 = parts.get(cpu_idx + 1).and_then(|s| s.parse().ok()).unwrap_or(0);
            if let Some(counters) = per_cpu.get_mut(&cpu_name.to_lowercase()) {
                counters[slot] = value;
            }
        }
    }

    Ok(per_cpu)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aggregate_and_percpu_stat_lines() {
        let content = "cpu  100 10 50 800 5 0 2 0 0 0\ncpu0 50 5 25 400 2 0 1 0 0 0\nintr 12345\n";
        let cpus = parse_proc_stat(content).unwrap();
        assert_eq!(cpus.len(), 2);
        assert_eq!(cpus[0].id, None);
        assert_eq!(cpus[0].user, 100);
        assert_eq!(cpus[1].id, Some(0));
    }

    #[test]
    fn parses_loadavg() {
        let load = parse_loadavg("0.50 0.40 0.30 2/150 12345\n").unwrap();
        assert_eq!(load.load1, 0.50);
        assert_eq!(load.load15, 0.30);
    }

    #[test]
    fn parses_meminfo_fields() {
        let content = "MemTotal:       16384000 kB\nMemFree:         8192000 kB\nMemAvailable:   12000000 kB\nBuffers:          200000 kB\nCached:          1000000 kB\n";
        let mem = parse_meminfo(content).unwrap();
        assert_eq!(mem.mem_total, 16384000);
        assert_eq!(mem.mem_available, 12000000);
        assert_eq!(mem.cached, 1000000);
    }

    #[test]
    fn parses_diskstats_line() {
        let content = "   8       0 sda 100 5 2000 30 50 2 1000 20 0 60 80\n";
        let disks = parse_diskstats(content).unwrap();
        assert_eq!(disks.len(), 1);
        assert_eq!(disks[0].device, "sda");
        assert_eq!(disks[0].reads, 100);
        assert_eq!(disks[0].io_time_ms, 60);
    }

    #[test]
    fn parses_net_dev_and_skips_loopback() {
        let content = "Inter-|   Receive                                                |  Transmit\n face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n    lo: 1000 10 0 0 0 0 0 0 1000 10 0 0 0 0 0 0\n  eth0: 5000 40 1 0 0 0 0 0 3000 30 0 2 0 0 0 0\n";
        let devices = parse_net_dev(content).unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].interface, "eth0");
        assert_eq!(devices[0].rx_bytes, 5000);
        assert_eq!(devices[0].tx_drop, 2);
    }

    #[test]
    fn parses_softirqs_pivoted_by_cpu() {
        let content = "                    CPU0       CPU1\n          HI:          2          0\n       TIMER:     711126     693993\n      NET_TX:         45          3\n      NET_RX:        567         9\n       BLOCK:          0          0\n    IRQ_POLL:          0          0\n     TASKLET:        205          0\n       SCHED:     841380     841400\n     HRTIMER:          0          0\n         RCU:     650988     639176\n";
        let per_cpu = parse_softirqs(content).unwrap();
        assert_eq!(per_cpu.len(), 2);
        let cpu0 = per_cpu.get("cpu0").unwrap();
        assert_eq!(cpu0[1], 711126); // TIMER
        assert_eq!(cpu0[3], 567); // NET_RX
        let cpu1 = per_cpu.get("cpu1").unwrap();
        assert_eq!(cpu1[3], 9);
    }

    #[test]
    fn rejects_empty_proc_stat() {
        assert!(parse_proc_stat("intr 12345\n").is_err());
    }
}
