//! Conversions between the generated `fleet_proto` wire types and
//! `fleet_core`'s domain model. Kept in the binary crate so neither
//! `fleet-core` nor `fleet-proto` needs to depend on the other.

use fleet_core::model as core;
use fleet_core::store::TimeRange as CoreTimeRange;

fn unix_to_naive(secs: i64) -> chrono::NaiveDateTime {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.naive_utc())
        .unwrap_or(chrono::NaiveDateTime::MIN)
}

fn naive_to_unix(ts: chrono::NaiveDateTime) -> i64 {
    ts.and_utc().timestamp()
}

pub fn pb_monitor_info_to_core(pb: fleet_proto::MonitorInfo) -> core::MonitorInfo {
    core::MonitorInfo {
        name: pb.name,
        host_info: pb.host_info.map(|h| core::HostInfo {
            hostname: h.hostname,
            ip_address: h.ip_address,
        }),
        cpu_stat: pb
            .cpu_stat
            .into_iter()
            .map(|c| core::CpuStat {
                cpu_percent: c.cpu_percent,
                usr_percent: c.usr_percent,
                system_percent: c.system_percent,
                nice_percent: c.nice_percent,
                idle_percent: c.idle_percent,
                io_wait_percent: c.io_wait_percent,
                irq_percent: c.irq_percent,
                soft_irq_percent: c.soft_irq_percent,
            })
            .collect(),
        cpu_load: pb.cpu_load.map(|l| core::CpuLoad {
            load_avg_1: l.load_avg_1,
            load_avg_3: l.load_avg_3,
            load_avg_15: l.load_avg_15,
        }),
        mem_info: pb.mem_info.map(|m| core::MemInfo {
            total: m.total,
            free: m.free,
            avail: m.avail,
            used_percent: m.used_percent,
            buffers: m.buffers,
            cached: m.cached,
            swap_cached: m.swap_cached,
            active: m.active,
            inactive: m.inactive,
            active_anon: m.active_anon,
            inactive_anon: m.inactive_anon,
            active_file: m.active_file,
            inactive_file: m.inactive_file,
            dirty: m.dirty,
            writeback: m.writeback,
            anon_pages: m.anon_pages,
            mapped: m.mapped,
            kreclaimable: m.kreclaimable,
            sreclaimable: m.sreclaimable,
            sunreclaim: m.sunreclaim,
            swap_total: m.swap_total,
        }),
        net_info: pb
            .net_info
            .into_iter()
            .map(|n| core::NetInfo {
                name: n.name,
                rcv_rate: n.rcv_rate,
                send_rate: n.send_rate,
                rcv_packets_rate: n.rcv_packets_rate,
                send_packets_rate: n.send_packets_rate,
                err_in: n.err_in,
                err_out: n.err_out,
                drop_in: n.drop_in,
                drop_out: n.drop_out,
            })
            .collect(),
        disk_info: pb
            .disk_info
            .into_iter()
            .map(|d| core::DiskInfo {
                name: d.name,
                read_bytes_per_sec: d.read_bytes_per_sec,
                write_bytes_per_sec: d.write_bytes_per_sec,
                read_iops: d.read_iops,
                write_iops: d.write_iops,
                avg_read_latency_ms: d.avg_read_latency_ms,
                avg_write_latency_ms: d.avg_write_latency_ms,
                util_percent: d.util_percent,
                reads: d.reads,
                writes: d.writes,
                sectors_read: d.sectors_read,
                sectors_written: d.sectors_written,
                read_time_ms: d.read_time_ms,
                write_time_ms: d.write_time_ms,
                io_in_progress: d.io_in_progress,
                io_time_ms: d.io_time_ms,
                weighted_io_time_ms: d.weighted_io_time_ms,
            })
            .collect(),
        soft_irq: pb
            .soft_irq
            .into_iter()
            .map(|s| core::SoftIrq {
                cpu_name: s.cpu_name,
                hi: s.hi,
                timer: s.timer,
                net_tx: s.net_tx,
                net_rx: s.net_rx,
                block: s.block,
                irq_poll: s.irq_poll,
                tasklet: s.tasklet,
                sched: s.sched,
                hrtimer: s.hrtimer,
                rcu: s.rcu,
            })
            .collect(),
    }
}

pub fn core_monitor_info_to_pb(info: &core::MonitorInfo) -> fleet_proto::MonitorInfo {
    fleet_proto::MonitorInfo {
        name: info.name.clone(),
        host_info: info.host_info.as_ref().map(|h| fleet_proto::HostInfo {
            hostname: h.hostname.clone(),
            ip_address: h.ip_address.clone(),
        }),
        cpu_stat: info
            .cpu_stat
            .iter()
            .map(|c| fleet_proto::CpuStat {
                cpu_percent: c.cpu_percent,
                usr_percent: c.usr_percent,
                system_percent: c.system_percent,
                nice_percent: c.nice_percent,
                idle_percent: c.idle_percent,
                io_wait_percent: c.io_wait_percent,
                irq_percent: c.irq_percent,
                soft_irq_percent: c.soft_irq_percent,
            })
            .collect(),
        cpu_load: info.cpu_load.as_ref().map(|l| fleet_proto::CpuLoad {
            load_avg_1: l.load_avg_1,
            load_avg_3: l.load_avg_3,
            load_avg_15: l.load_avg_15,
        }),
        mem_info: info.mem_info.as_ref().map(|m| fleet_proto::MemInfo {
            total: m.total,
            free: m.free,
            avail: m.avail,
            used_percent: m.used_percent,
            buffers: m.buffers,
            cached: m.cached,
            swap_cached: m.swap_cached,
            active: m.active,
            inactive: m.inactive,
            active_anon: m.active_anon,
            inactive_anon: m.inactive_anon,
            active_file: m.active_file,
            inactive_file: m.inactive_file,
            dirty: m.dirty,
            writeback: m.writeback,
            anon_pages: m.anon_pages,
            mapped: m.mapped,
            kreclaimable: m.kreclaimable,
            sreclaimable: m.sreclaimable,
            sunreclaim: m.sunreclaim,
            swap_total: m.swap_total,
        }),
        net_info: info
            .net_info
            .iter()
            .map(|n| fleet_proto::NetInfo {
                name: n.name.clone(),
                rcv_rate: n.rcv_rate,
                send_rate: n.send_rate,
                rcv_packets_rate: n.rcv_packets_rate,
                send_packets_rate: n.send_packets_rate,
                err_in: n.err_in,
                err_out: n.err_out,
                drop_in: n.drop_in,
                drop_out: n.drop_out,
            })
            .collect(),
        disk_info: info
            .disk_info
            .iter()
            .map(|d| fleet_proto::DiskInfo {
                name: d.name.clone(),
                read_bytes_per_sec: d.read_bytes_per_sec,
                write_bytes_per_sec: d.write_bytes_per_sec,
                read_iops: d.read_iops,
                write_iops: d.write_iops,
                avg_read_latency_ms: d.avg_read_latency_ms,
                avg_write_latency_ms: d.avg_write_latency_ms,
                util_percent: d.util_percent,
                reads: d.reads,
                writes: d.writes,
                sectors_read: d.sectors_read,
                sectors_written: d.sectors_written,
                read_time_ms: d.read_time_ms,
                write_time_ms: d.write_time_ms,
                io_in_progress: d.io_in_progress,
                io_time_ms: d.io_time_ms,
                weighted_io_time_ms: d.weighted_io_time_ms,
            })
            .collect(),
        soft_irq: info
            .soft_irq
            .iter()
            .map(|s| fleet_proto::SoftIrq {
                cpu_name: s.cpu_name.clone(),
                hi: s.hi,
                timer: s.timer,
                net_tx: s.net_tx,
                net_rx: s.net_rx,
                block: s.block,
                irq_poll: s.irq_poll,
                tasklet: s.tasklet,
                sched: s.sched,
                hrtimer: s.hrtimer,
                rcu: s.rcu,
            })
            .collect(),
    }
}

pub fn pb_time_range_to_core(range: Option<fleet_proto::TimeRange>) -> CoreTimeRange {
    match range {
        Some(r) => CoreTimeRange {
            start: unix_to_naive(r.start_unix),
            end: unix_to_naive(r.end_unix),
        },
        None => CoreTimeRange {
            start: chrono::NaiveDateTime::MIN,
            end: chrono::NaiveDateTime::MAX,
        },
    }
}

pub fn pb_page_to_core(page: Option<fleet_proto::Page>) -> (u32, u32) {
    match page {
        Some(p) => (p.page, p.page_size),
        None => (1, 100),
    }
}

pub fn pb_thresholds_to_core(t: Option<fleet_proto::AnomalyThresholds>) -> core::AnomalyThresholds {
    match t {
        Some(t) => core::AnomalyThresholds {
            cpu_percent: t.cpu_percent,
            mem_percent: t.mem_percent,
            disk_percent: t.disk_percent,
            change_rate: t.change_rate,
        },
        None => core::AnomalyThresholds {
            cpu_percent: 90.0,
            mem_percent: 90.0,
            disk_percent: 90.0,
            change_rate: 0.5,
        },
    }
}

pub fn pb_sort_order_to_core(order: i32) -> core::SortOrder {
    match fleet_proto::SortOrder::try_from(order) {
        Ok(fleet_proto::SortOrder::Desc) => core::SortOrder::Desc,
        _ => core::SortOrder::Asc,
    }
}

pub fn core_performance_row_to_pb(row: &core::PerformanceRow) -> fleet_proto::PerformanceRow {
    fleet_proto::PerformanceRow {
        host: row.host.clone(),
        timestamp_unix: naive_to_unix(row.timestamp),
        cpu_percent: row.sample.cpu_percent,
        cpu_percent_rate: row.rates.cpu_percent,
        usr_percent: row.sample.usr_percent,
        usr_percent_rate: row.rates.usr_percent,
        system_percent: row.sample.system_percent,
        system_percent_rate: row.rates.system_percent,
        mem_used_percent: row.sample.mem_used_percent,
        mem_used_percent_rate: row.rates.mem_used_percent,
        load_avg_1: row.sample.load_avg_1,
        load_avg_1_rate: row.rates.load_avg_1,
        disk_util_percent: row.sample.disk_util_percent,
        disk_util_percent_rate: row.rates.disk_util_percent,
        net_rcv_mib_s: row.sample.net_rcv_mib_s,
        net_rcv_mib_s_rate: row.rates.net_rcv_mib_s,
        net_send_mib_s: row.sample.net_send_mib_s,
        net_send_mib_s_rate: row.rates.net_send_mib_s,
        score: row.score,
    }
}

pub fn core_anomaly_record_to_pb(r: &core::AnomalyRecord) -> fleet_proto::AnomalyRecord {
    let kind = match r.kind {
        core::AnomalyType::CpuHigh => fleet_proto::AnomalyType::CpuHigh,
        core::AnomalyType::MemHigh => fleet_proto::AnomalyType::MemHigh,
        core::AnomalyType::DiskHigh => fleet_proto::AnomalyType::DiskHigh,
        core::AnomalyType::RateSpike => fleet_proto::AnomalyType::RateSpike,
    };
    let severity = match r.severity {
        core::Severity::Warning => fleet_proto::Severity::Warning,
        core::Severity::Critical => fleet_proto::Severity::Critical,
    };
    fleet_proto::AnomalyRecord {
        host: r.host.clone(),
        timestamp_unix: naive_to_unix(r.timestamp),
        r#type: kind as i32,
        severity: severity as i32,
        value: r.value,
    }
}

pub fn core_score_row_to_pb(r: &core::ScoreRow) -> fleet_proto::ScoreRow {
    fleet_proto::ScoreRow {
        host: r.host.clone(),
        score: r.score,
        timestamp_unix: naive_to_unix(r.timestamp),
    }
}

pub fn core_latest_score_row_to_pb(r: &core::LatestScoreRow) -> fleet_proto::LatestScoreRow {
    fleet_proto::LatestScoreRow {
        host: r.host.clone(),
        score: r.score,
        timestamp_unix: naive_to_unix(r.timestamp),
        online: r.online,
    }
}

pub fn core_cluster_stats_to_pb(s: &core::ClusterStats) -> fleet_proto::ClusterStats {
    fleet_proto::ClusterStats {
        total: s.total,
        online: s.online,
        offline: s.offline,
        avg_score: s.avg_score,
        max_score: s.max_score,
        min_score: s.min_score,
        best_server: s.best_server.clone(),
        worst_server: s.worst_server.clone(),
    }
}

pub fn core_net_detail_row_to_pb(r: &core::NetDetailRow) -> fleet_proto::NetDetailRow {
    fleet_proto::NetDetailRow {
        host: r.host.clone(),
        net_name: r.nic.clone(),
        timestamp_unix: naive_to_unix(r.timestamp),
        rcv_rate: r.sample.rcv_rate,
        rcv_rate_rate: r.rcv_rate_change,
        send_rate: r.sample.send_rate,
        send_rate_rate: r.send_rate_change,
        err_in: r.sample.err_in,
        err_out: r.sample.err_out,
        drop_in: r.sample.drop_in,
        drop_out: r.sample.drop_out,
    }
}

pub fn core_disk_detail_row_to_pb(r: &core::DiskDetailRow) -> fleet_proto::DiskDetailRow {
    fleet_proto::DiskDetailRow {
        host: r.host.clone(),
        disk_name: r.disk.clone(),
        timestamp_unix: naive_to_unix(r.timestamp),
        read_bytes_per_sec: r.sample.read_bytes_per_sec,
        read_bytes_per_sec_rate: 0.0,
        write_bytes_per_sec: r.sample.write_bytes_per_sec,
        write_bytes_per_sec_rate: 0.0,
        util_percent: r.sample.util_percent,
        util_percent_rate: r.util_change,
    }
}

pub fn core_mem_detail_row_to_pb(r: &core::MemDetailRow) -> fleet_proto::MemDetailRow {
    fleet_proto::MemDetailRow {
        host: r.host.clone(),
        timestamp_unix: naive_to_unix(r.timestamp),
        total: r.sample.total,
        free: r.sample.free,
        used_percent: r.sample.used_percent,
        used_percent_rate: r.used_percent_change,
        cached: r.sample.cached,
        dirty: r.sample.dirty,
    }
}

pub fn core_softirq_detail_row_to_pb(r: &core::SoftIrqDetailRow) -> fleet_proto::SoftIrqDetailRow {
    fleet_proto::SoftIrqDetailRow {
        host: r.host.clone(),
        cpu_name: r.sample.cpu_name.clone(),
        timestamp_unix: naive_to_unix(r.timestamp),
        net_rx: r.sample.net_rx,
        net_rx_rate: r.net_rx_change,
        net_tx: r.sample.net_tx,
        net_tx_rate: 0.0,
    }
}
