//! Composite health score (§4.8). Pure function, no I/O, no shared state —
//! called directly by the Shard Worker (§4.3 step 3) before any store write.

use crate::model::MonitorInfo;

const NET_REFERENCE_BYTES_PER_SEC: f64 = 2.0 * 125_000_000.0;

const WEIGHT_CPU: f64 = 0.35;
const WEIGHT_MEM: f64 = 0.30;
const WEIGHT_LOAD: f64 = 0.15;
const WEIGHT_DISK: f64 = 0.15;
const WEIGHT_NET: f64 = 0.05;

fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// `100 * Σ weight_i * subscore_i`, clamped to `[0,100]`.
pub fn score(info: &MonitorInfo) -> f64 {
    let cpu_pct = info.cpu_stat.first().map(|c| c.cpu_percent).unwrap_or(0.0);
    let cores = info.core_count() as f64;
    let load1 = info.cpu_load.as_ref().map(|l| l.load_avg_1).unwrap_or(0.0);
    let mem_pct = info.mem_info.as_ref().map(|m| m.used_percent).unwrap_or(0.0);
    let net_rate = info
        .net_info
        .first()
        .map(|n| n.rcv_rate + n.send_rate)
        .unwrap_or(0.0);
    let disk_util = info.max_disk_util();

    let cpu_score = clamp01(1.0 - cpu_pct / 100.0);
    let mem_score = clamp01(1.0 - mem_pct / 100.0);
    let load_score = clamp01(1.0 - load1 / (cores * 1.5));
    let disk_score = clamp01(1.0 - disk_util / 100.0);
    let net_score = clamp01(1.0 - net_rate / NET_REFERENCE_BYTES_PER_SEC);

    let total = WEIGHT_CPU * cpu_score
        + WEIGHT_MEM * mem_score
        + WEIGHT_LOAD * load_score
        + WEIGHT_DISK * disk_score
        + WEIGHT_NET * net_score;

    (100.0 * total).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CpuLoad, CpuStat, DiskInfo, MemInfo, NetInfo};

    fn idle_host() -> MonitorInfo {
        MonitorInfo {
            cpu_stat: vec![CpuStat {
                cpu_percent: 0.0,
                ..Default::default()
            }],
            cpu_load: Some(CpuLoad::default()),
            mem_info: Some(MemInfo::default()),
            net_info: vec![NetInfo::default()],
            disk_info: vec![DiskInfo::default()],
            ..Default::default()
        }
    }

    #[test]
    fn idle_host_scores_one_hundred() {
        assert_eq!(score(&idle_host()), 100.0);
    }

    #[test]
    fn empty_sample_defaults_to_perfect_score() {
        assert_eq!(score(&MonitorInfo::default()), 100.0);
    }

    #[test]
    fn pegged_cpu_reduces_score_by_cpu_weight() {
        let mut host = idle_host();
        host.cpu_stat[0].cpu_percent = 100.0;
        assert_eq!(score(&host), 100.0 - 35.0);
    }

    #[test]
    fn score_is_monotonically_decreasing_in_cpu_pct() {
        let mut prev = 100.0;
        for pct in [0.0, 25.0, 50.0, 75.0, 100.0] {
            let mut host = idle_host();
            host.cpu_stat[0].cpu_percent = pct;
            let s = score(&host);
            assert!(s <= prev, "score did not decrease: {s} > {prev} at {pct}");
            prev = s;
        }
    }

    #[test]
    fn score_never_leaves_zero_to_hundred_range() {
        let mut host = idle_host();
        host.cpu_stat[0].cpu_percent = 1000.0;
        host.mem_info.as_mut().unwrap().used_percent = 1000.0;
        host.disk_info[0].util_percent = 1000.0;
        host.net_info[0].rcv_rate = 1e12;
        host.cpu_load.as_mut().unwrap().load_avg_1 = 1000.0;
        let s = score(&host);
        assert!((0.0..=100.0).contains(&s));
    }
}
