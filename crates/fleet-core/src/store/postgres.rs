//! Postgres-backed `HistoricalStore` (§4.6). Five append-only tables, one
//! `sqlx::PgPool` shared by every writer and reader — a pooled connection
//! where the original opened and closed a handle per call (§9: "a
//! pooled-connection design is strictly superior and should be used").
//!
//! Every statement below is parameterized through `sqlx::query*!`-style bind
//! arguments; none concatenate caller-controlled strings into SQL text
//! (§4.7's injection defect is not reproduced here).

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::error::StoreError;
use crate::model::{
    AnomalyRecord, AnomalyThresholds, AnomalyType, ClusterStats, DiskDetailRow, DiskInfo,
    LatestScoreRow, MemDetailRow, MemInfo, NetDetailRow, NetInfo, PerfSample, PerformanceRow,
    ScoreRow, Severity, SoftIrqDetailRow, SortOrder,
};

use super::{HistoricalStore, Page, TimeRange};

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the five tables if they do not already exist. Called once at
    /// boot from `fleet-manager`'s `main`.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS server_performance (
                id BIGSERIAL PRIMARY KEY,
                server_name TEXT NOT NULL,
                timestamp TIMESTAMP NOT NULL,
                cpu_percent DOUBLE PRECISION NOT NULL,
                usr_percent DOUBLE PRECISION NOT NULL,
                system_percent DOUBLE PRECISION NOT NULL,
                mem_used_percent DOUBLE PRECISION NOT NULL,
                load_avg_1 DOUBLE PRECISION NOT NULL,
                disk_util_percent DOUBLE PRECISION NOT NULL,
                net_rcv_mib_s DOUBLE PRECISION NOT NULL,
                net_send_mib_s DOUBLE PRECISION NOT NULL,
                cpu_percent_rate DOUBLE PRECISION NOT NULL,
                usr_percent_rate DOUBLE PRECISION NOT NULL,
                system_percent_rate DOUBLE PRECISION NOT NULL,
                mem_used_percent_rate DOUBLE PRECISION NOT NULL,
                load_avg_1_rate DOUBLE PRECISION NOT NULL,
                disk_util_percent_rate DOUBLE PRECISION NOT NULL,
                net_rcv_mib_s_rate DOUBLE PRECISION NOT NULL,
                net_send_mib_s_rate DOUBLE PRECISION NOT NULL,
                score DOUBLE PRECISION NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_server_performance_host_ts
                ON server_performance (server_name, timestamp DESC);

            CREATE TABLE IF NOT EXISTS server_net_detail (
                id BIGSERIAL PRIMARY KEY,
                server_name TEXT NOT NULL,
                timestamp TIMESTAMP NOT NULL,
                nic TEXT NOT NULL,
                rcv_rate DOUBLE PRECISION NOT NULL,
                send_rate DOUBLE PRECISION NOT NULL,
                rcv_packets_rate DOUBLE PRECISION NOT NULL,
                send_packets_rate DOUBLE PRECISION NOT NULL,
                err_in BIGINT NOT NULL,
                err_out BIGINT NOT NULL,
                drop_in BIGINT NOT NULL,
                drop_out BIGINT NOT NULL,
                rcv_rate_change DOUBLE PRECISION NOT NULL,
                send_rate_change DOUBLE PRECISION NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_server_net_detail_host_ts ON server_net_detail (server_name, timestamp DESC);

            CREATE TABLE IF NOT EXISTS server_disk_detail (
                id BIGSERIAL PRIMARY KEY,
                server_name TEXT NOT NULL,
                timestamp TIMESTAMP NOT NULL,
                disk_name TEXT NOT NULL,
                read_bytes_per_sec DOUBLE PRECISION NOT NULL,
                write_bytes_per_sec DOUBLE PRECISION NOT NULL,
                read_iops DOUBLE PRECISION NOT NULL,
                write_iops DOUBLE PRECISION NOT NULL,
                avg_read_latency_ms DOUBLE PRECISION NOT NULL,
                avg_write_latency_ms DOUBLE PRECISION NOT NULL,
                util_percent DOUBLE PRECISION NOT NULL,
                util_change DOUBLE PRECISION NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_server_disk_detail_host_ts ON server_disk_detail (server_name, timestamp DESC);

            CREATE TABLE IF NOT EXISTS server_mem_detail (
                id BIGSERIAL PRIMARY KEY,
                server_name TEXT NOT NULL,
                timestamp TIMESTAMP NOT NULL,
                total BIGINT NOT NULL,
                free BIGINT NOT NULL,
                avail BIGINT NOT NULL,
                used_percent DOUBLE PRECISION NOT NULL,
                buffers BIGINT NOT NULL,
                cached BIGINT NOT NULL,
                active BIGINT NOT NULL,
                inactive BIGINT NOT NULL,
                dirty BIGINT NOT NULL,
                used_percent_change DOUBLE PRECISION NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_server_mem_detail_host_ts ON server_mem_detail (server_name, timestamp DESC);

            CREATE TABLE IF NOT EXISTS server_softirq_detail (
                id BIGSERIAL PRIMARY KEY,
                server_name TEXT NOT NULL,
                timestamp TIMESTAMP NOT NULL,
                cpu_name TEXT NOT NULL,
                hi BIGINT NOT NULL,
                timer BIGINT NOT NULL,
                net_tx BIGINT NOT NULL,
                net_rx BIGINT NOT NULL,
                block BIGINT NOT NULL,
                sched BIGINT NOT NULL,
                net_rx_change DOUBLE PRECISION NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_server_softirq_detail_host_ts ON server_softirq_detail (server_name, timestamp DESC);
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl HistoricalStore for PostgresStore {
    async fn write_performance(&self, row: &PerformanceRow) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO server_performance
             (server_name, timestamp, cpu_percent, usr_percent, system_percent, mem_used_percent,
              load_avg_1, disk_util_percent, net_rcv_mib_s, net_send_mib_s,
              cpu_percent_rate, usr_percent_rate, system_percent_rate, mem_used_percent_rate,
              load_avg_1_rate, disk_util_percent_rate, net_rcv_mib_s_rate, net_send_mib_s_rate, score)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19)",
        )
        .bind(&row.host)
        .bind(row.timestamp)
        .bind(row.sample.cpu_percent)
        .bind(row.sample.usr_percent)
        .bind(row.sample.system_percent)
        .bind(row.sample.mem_used_percent)
        .bind(row.sample.load_avg_1)
        .bind(row.sample.disk_util_percent)
        .bind(row.sample.net_rcv_mib_s)
        .bind(row.sample.net_send_mib_s)
        .bind(row.rates.cpu_percent)
        .bind(row.rates.usr_percent)
        .bind(row.rates.system_percent)
        .bind(row.rates.mem_used_percent)
        .bind(row.rates.load_avg_1)
        .bind(row.rates.disk_util_percent)
        .bind(row.rates.net_rcv_mib_s)
        .bind(row.rates.net_send_mib_s)
        .bind(row.score)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn write_net_detail(&self, row: &NetDetailRow) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO server_net_detail
             (server_name, timestamp, nic, rcv_rate, send_rate, rcv_packets_rate, send_packets_rate,
              err_in, err_out, drop_in, drop_out, rcv_rate_change, send_rate_change)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)",
        )
        .bind(&row.host)
        .bind(row.timestamp)
        .bind(&row.nic)
        .bind(row.sample.rcv_rate)
        .bind(row.sample.send_rate)
        .bind(row.sample.rcv_packets_rate)
        .bind(row.sample.send_packets_rate)
        .bind(row.sample.err_in as i64)
        .bind(row.sample.err_out as i64)
        .bind(row.sample.drop_in as i64)
        .bind(row.sample.drop_out as i64)
        .bind(row.rcv_rate_change)
        .bind(row.send_rate_change)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn write_disk_detail(&self, row: &DiskDetailRow) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO server_disk_detail
             (server_name, timestamp, disk_name, read_bytes_per_sec, write_bytes_per_sec,
              read_iops, write_iops, avg_read_latency_ms, avg_write_latency_ms, util_percent, util_change)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)",
        )
        .bind(&row.host)
        .bind(row.timestamp)
        .bind(&row.disk)
        .bind(row.sample.read_bytes_per_sec)
        .bind(row.sample.write_bytes_per_sec)
        .bind(row.sample.read_iops)
        .bind(row.sample.write_iops)
        .bind(row.sample.avg_read_latency_ms)
        .bind(row.sample.avg_write_latency_ms)
        .bind(row.sample.util_percent)
        .bind(row.util_change)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn write_mem_detail(&self, row: &MemDetailRow) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO server_mem_detail
             (server_name, timestamp, total, free, avail, used_percent, buffers, cached,
              active, inactive, dirty, used_percent_change)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)",
        )
        .bind(&row.host)
        .bind(row.timestamp)
        .bind(row.sample.total as i64)
        .bind(row.sample.free as i64)
        .bind(row.sample.avail as i64)
        .bind(row.sample.used_percent)
        .bind(row.sample.buffers as i64)
        .bind(row.sample.cached as i64)
        .bind(row.sample.active as i64)
        .bind(row.sample.inactive as i64)
        .bind(row.sample.dirty as i64)
        .bind(row.used_percent_change)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn write_softirq_detail(&self, row: &SoftIrqDetailRow) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO server_softirq_detail
             (server_name, timestamp, cpu_name, hi, timer, net_tx, net_rx, block, sched, net_rx_change)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)",
        )
        .bind(&row.host)
        .bind(row.timestamp)
        .bind(&row.sample.cpu_name)
        .bind(row.sample.hi as i64)
        .bind(row.sample.timer as i64)
        .bind(row.sample.net_tx as i64)
        .bind(row.sample.net_rx as i64)
        .bind(row.sample.block as i64)
        .bind(row.sample.sched as i64)
        .bind(row.net_rx_change)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn query_performance(
        &self,
        host: Option<&str>,
        range: TimeRange,
        page: Page,
    ) -> Result<(Vec<PerformanceRow>, u64), StoreError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM server_performance
             WHERE timestamp BETWEEN $1 AND $2 AND ($3::text IS NULL OR server_name = $3)",
        )
        .bind(range.start)
        .bind(range.end)
        .bind(host)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            "SELECT server_name, timestamp, cpu_percent, usr_percent, system_percent, mem_used_percent,
                    load_avg_1, disk_util_percent, net_rcv_mib_s, net_send_mib_s,
                    cpu_percent_rate, usr_percent_rate, system_percent_rate, mem_used_percent_rate,
                    load_avg_1_rate, disk_util_percent_rate, net_rcv_mib_s_rate, net_send_mib_s_rate, score
             FROM server_performance
             WHERE timestamp BETWEEN $1 AND $2 AND ($3::text IS NULL OR server_name = $3)
             ORDER BY timestamp DESC
             LIMIT $4 OFFSET $5",
        )
        .bind(range.start)
        .bind(range.end)
        .bind(host)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((rows.iter().map(row_to_performance).collect(), total.max(0) as u64))
    }

    async fn query_trend(
        &self,
        host: Option<&str>,
        range: TimeRange,
        interval_s: u32,
    ) -> Result<Vec<PerformanceRow>, StoreError> {
        if interval_s == 0 {
            let rows = sqlx::query(
                "SELECT server_name, timestamp, cpu_percent, usr_percent, system_percent, mem_used_percent,
                        load_avg_1, disk_util_percent, net_rcv_mib_s, net_send_mib_s,
                        cpu_percent_rate, usr_percent_rate, system_percent_rate, mem_used_percent_rate,
                        load_avg_1_rate, disk_util_percent_rate, net_rcv_mib_s_rate, net_send_mib_s_rate, score
                 FROM server_performance
                 WHERE timestamp BETWEEN $1 AND $2 AND ($3::text IS NULL OR server_name = $3)
                 ORDER BY timestamp ASC",
            )
            .bind(range.start)
            .bind(range.end)
            .bind(host)
            .fetch_all(&self.pool)
            .await?;
            return Ok(rows.iter().map(row_to_performance).collect());
        }

        let rows = sqlx::query(
            "SELECT
                to_timestamp(floor(extract(epoch from timestamp) / $4) * $4) AS bucket,
                AVG(cpu_percent) AS cpu_percent, AVG(usr_percent) AS usr_percent,
                AVG(system_percent) AS system_percent, AVG(mem_used_percent) AS mem_used_percent,
                AVG(load_avg_1) AS load_avg_1, AVG(disk_util_percent) AS disk_util_percent,
                AVG(net_rcv_mib_s) AS net_rcv_mib_s, AVG(net_send_mib_s) AS net_send_mib_s,
                AVG(score) AS score
             FROM server_performance
             WHERE timestamp BETWEEN $1 AND $2 AND ($3::text IS NULL OR server_name = $3)
             GROUP BY bucket
             ORDER BY bucket ASC",
        )
        .bind(range.start)
        .bind(range.end)
        .bind(host)
        .bind(interval_s as f64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| PerformanceRow {
                host: host.unwrap_or_default().to_string(),
                timestamp: r.get::<chrono::DateTime<chrono::Utc>, _>("bucket").naive_utc(),
                sample: PerfSample {
                    cpu_percent: r.get("cpu_percent"),
                    usr_percent: r.get("usr_percent"),
                    system_percent: r.get("system_percent"),
                    mem_used_percent: r.get("mem_used_percent"),
                    load_avg_1: r.get("load_avg_1"),
                    disk_util_percent: r.get("disk_util_percent"),
                    net_rcv_mib_s: r.get("net_rcv_mib_s"),
                    net_send_mib_s: r.get("net_send_mib_s"),
                },
                rates: PerfSample::default(),
                score: r.get("score"),
            })
            .collect())
    }

    async fn query_anomaly(
        &self,
        host: Option<&str>,
        range: TimeRange,
        thresholds: AnomalyThresholds,
        page: Page,
    ) -> Result<(Vec<AnomalyRecord>, u64), StoreError> {
        let rows = sqlx::query(
            "SELECT server_name, timestamp, cpu_percent, mem_used_percent, disk_util_percent, cpu_percent_rate
             FROM server_performance
             WHERE timestamp BETWEEN $1 AND $2 AND ($3::text IS NULL OR server_name = $3)
               AND (cpu_percent > $4 OR mem_used_percent > $5 OR disk_util_percent > $6 OR abs(cpu_percent_rate) > $7)
             ORDER BY timestamp DESC",
        )
        .bind(range.start)
        .bind(range.end)
        .bind(host)
        .bind(thresholds.cpu_percent)
        .bind(thresholds.mem_percent)
        .bind(thresholds.disk_percent)
        .bind(thresholds.change_rate)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::new();
        for r in &rows {
            let server_name: String = r.get("server_name");
            let timestamp: chrono::NaiveDateTime = r.get("timestamp");
            let cpu_percent: f64 = r.get("cpu_percent");
            let mem_used_percent: f64 = r.get("mem_used_percent");
            let disk_util_percent: f64 = r.get("disk_util_percent");
            let cpu_percent_rate: f64 = r.get("cpu_percent_rate");

            let severity_for = |value: f64, is_rate: bool| {
                if (!is_rate && value > 95.0) || (is_rate && value.abs() > 1.0) {
                    Severity::Critical
                } else {
                    Severity::Warning
                }
            };

            if cpu_percent > thresholds.cpu_percent {
                records.push(AnomalyRecord {
                    host: server_name.clone(),
                    timestamp,
                    kind: AnomalyType::CpuHigh,
                    severity: severity_for(cpu_percent, false),
                    value: cpu_percent,
                });
            }
            if mem_used_percent > thresholds.mem_percent {
                records.push(AnomalyRecord {
                    host: server_name.clone(),
                    timestamp,
                    kind: AnomalyType::MemHigh,
                    severity: severity_for(mem_used_percent, false),
                    value: mem_used_percent,
                });
            }
            if disk_util_percent > thresholds.disk_percent {
                records.push(AnomalyRecord {
                    host: server_name.clone(),
                    timestamp,
                    kind: AnomalyType::DiskHigh,
                    severity: severity_for(disk_util_percent, false),
                    value: disk_util_percent,
                });
            }
            if cpu_percent_rate.abs() > thresholds.change_rate {
                records.push(AnomalyRecord {
                    host: server_name,
                    timestamp,
                    kind: AnomalyType::RateSpike,
                    severity: severity_for(cpu_percent_rate, true),
                    value: cpu_percent_rate,
                });
            }
        }

        let total = records.len() as u64;
        let start = page.offset() as usize;
        let page_rows = if start >= records.len() {
            Vec::new()
        } else {
            let end = (start + page.limit() as usize).min(records.len());
            records[start..end].to_vec()
        };
        Ok((page_rows, total))
    }

    async fn query_score_rank(
        &self,
        order: SortOrder,
        page: Page,
    ) -> Result<(Vec<ScoreRow>, u64), StoreError> {
        let order_sql = match order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        let query = format!(
            "SELECT sp.server_name, sp.timestamp, sp.score
             FROM server_performance sp
             JOIN (SELECT server_name, MAX(timestamp) AS max_ts FROM server_performance GROUP BY server_name) latest
               ON sp.server_name = latest.server_name AND sp.timestamp = latest.max_ts
             ORDER BY sp.score {order_sql}
             LIMIT $1 OFFSET $2"
        );
        // `order_sql` is one of two fixed literals chosen above, never caller input.
        let rows = sqlx::query(&query)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT server_name) FROM server_performance")
            .fetch_one(&self.pool)
            .await?;

        Ok((
            rows.iter()
                .map(|r| ScoreRow {
                    host: r.get("server_name"),
                    timestamp: r.get("timestamp"),
                    score: r.get("score"),
                })
                .collect(),
            total.max(0) as u64,
        ))
    }

    async fn query_latest_score(&self) -> Result<(Vec<LatestScoreRow>, ClusterStats), StoreError> {
        let rows = sqlx::query(
            "SELECT sp.server_name, sp.timestamp, sp.score
             FROM server_performance sp
             JOIN (SELECT server_name, MAX(timestamp) AS max_ts FROM server_performance GROUP BY server_name) latest
               ON sp.server_name = latest.server_name AND sp.timestamp = latest.max_ts
             ORDER BY sp.server_name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let now = chrono::Utc::now().naive_utc();
        let latest: Vec<LatestScoreRow> = rows
            .iter()
            .map(|r| {
                let timestamp: chrono::NaiveDateTime = r.get("timestamp");
                LatestScoreRow {
                    host: r.get("server_name"),
                    timestamp,
                    score: r.get("score"),
                    online: (now - timestamp).num_seconds() <= 60,
                }
            })
            .collect();

        let total = latest.len() as u32;
        let online = latest.iter().filter(|r| r.online).count() as u32;
        let offline = total - online;
        let (avg_score, max_score, min_score, best_server, worst_server) = if latest.is_empty() {
            (0.0, 0.0, 0.0, String::new(), String::new())
        } else {
            let sum: f64 = latest.iter().map(|r| r.score).sum();
            let best = latest.iter().max_by(|a, b| a.score.partial_cmp(&b.score).unwrap()).unwrap();
            let worst = latest.iter().min_by(|a, b| a.score.partial_cmp(&b.score).unwrap()).unwrap();
            (
                sum / latest.len() as f64,
                best.score,
                worst.score,
                best.host.clone(),
                worst.host.clone(),
            )
        };

        Ok((
            latest,
            ClusterStats {
                total,
                online,
                offline,
                avg_score,
                max_score,
                min_score,
                best_server,
                worst_server,
            },
        ))
    }

    async fn query_net_detail(
        &self,
        host: Option<&str>,
        range: TimeRange,
        page: Page,
    ) -> Result<(Vec<NetDetailRow>, u64), StoreError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM server_net_detail WHERE timestamp BETWEEN $1 AND $2 AND ($3::text IS NULL OR server_name = $3)",
        )
        .bind(range.start)
        .bind(range.end)
        .bind(host)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            "SELECT server_name, timestamp, nic, rcv_rate, send_rate, rcv_packets_rate, send_packets_rate,
                    err_in, err_out, drop_in, drop_out, rcv_rate_change, send_rate_change
             FROM server_net_detail
             WHERE timestamp BETWEEN $1 AND $2 AND ($3::text IS NULL OR server_name = $3)
             ORDER BY timestamp DESC LIMIT $4 OFFSET $5",
        )
        .bind(range.start)
        .bind(range.end)
        .bind(host)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((
            rows.iter()
                .map(|r| NetDetailRow {
                    host: r.get("server_name"),
                    timestamp: r.get("timestamp"),
                    nic: r.get("nic"),
                    sample: NetInfo {
                        name: r.get("nic"),
                        rcv_rate: r.get("rcv_rate"),
                        send_rate: r.get("send_rate"),
                        rcv_packets_rate: r.get("rcv_packets_rate"),
                        send_packets_rate: r.get("send_packets_rate"),
                        err_in: r.get::<i64, _>("err_in") as u64,
                        err_out: r.get::<i64, _>("err_out") as u64,
                        drop_in: r.get::<i64, _>("drop_in") as u64,
                        drop_out: r.get::<i64, _>("drop_out") as u64,
                    },
                    rcv_rate_change: r.get("rcv_rate_change"),
                    send_rate_change: r.get("send_rate_change"),
                })
                .collect(),
            total.max(0) as u64,
        ))
    }

    async fn query_disk_detail(
        &self,
        host: Option<&str>,
        range: TimeRange,
        page: Page,
    ) -> Result<(Vec<DiskDetailRow>, u64), StoreError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM server_disk_detail WHERE timestamp BETWEEN $1 AND $2 AND ($3::text IS NULL OR server_name = $3)",
        )
        .bind(range.start)
        .bind(range.end)
        .bind(host)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            "SELECT server_name, timestamp, disk_name, read_bytes_per_sec, write_bytes_per_sec,
                    read_iops, write_iops, avg_read_latency_ms, avg_write_latency_ms, util_percent, util_change
             FROM server_disk_detail
             WHERE timestamp BETWEEN $1 AND $2 AND ($3::text IS NULL OR server_name = $3)
             ORDER BY timestamp DESC LIMIT $4 OFFSET $5",
        )
        .bind(range.start)
        .bind(range.end)
        .bind(host)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((
            rows.iter()
                .map(|r| DiskDetailRow {
                    host: r.get("server_name"),
                    timestamp: r.get("timestamp"),
                    disk: r.get("disk_name"),
                    sample: DiskInfo {
                        name: r.get("disk_name"),
                        read_bytes_per_sec: r.get("read_bytes_per_sec"),
                        write_bytes_per_sec: r.get("write_bytes_per_sec"),
                        read_iops: r.get("read_iops"),
                        write_iops: r.get("write_iops"),
                        avg_read_latency_ms: r.get("avg_read_latency_ms"),
                        avg_write_latency_ms: r.get("avg_write_latency_ms"),
                        util_percent: r.get("util_percent"),
                        ..Default::default()
                    },
                    util_change: r.get("util_change"),
                })
                .collect(),
            total.max(0) as u64,
        ))
    }

    async fn query_mem_detail(
        &self,
        host: Option<&str>,
        range: TimeRange,
        page: Page,
    ) -> Result<(Vec<MemDetailRow>, u64), StoreError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM server_mem_detail WHERE timestamp BETWEEN $1 AND $2 AND ($3::text IS NULL OR server_name = $3)",
        )
        .bind(range.start)
        .bind(range.end)
        .bind(host)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            "SELECT server_name, timestamp, total, free, avail, used_percent, buffers, cached,
                    active, inactive, dirty, used_percent_change
             FROM server_mem_detail
             WHERE timestamp BETWEEN $1 AND $2 AND ($3::text IS NULL OR server_name = $3)
             ORDER BY timestamp DESC LIMIT $4 OFFSET $5",
        )
        .bind(range.start)
        .bind(range.end)
        .bind(host)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((
            rows.iter()
                .map(|r| MemDetailRow {
                    host: r.get("server_name"),
                    timestamp: r.get("timestamp"),
                    sample: MemInfo {
                        total: r.get::<i64, _>("total") as u64,
                        free: r.get::<i64, _>("free") as u64,
                        avail: r.get::<i64, _>("avail") as u64,
                        used_percent: r.get("used_percent"),
                        buffers: r.get::<i64, _>("buffers") as u64,
                        cached: r.get::<i64, _>("cached") as u64,
                        active: r.get::<i64, _>("active") as u64,
                        inactive: r.get::<i64, _>("inactive") as u64,
                        dirty: r.get::<i64, _>("dirty") as u64,
                        ..Default::default()
                    },
                    used_percent_change: r.get("used_percent_change"),
                })
                .collect(),
            total.max(0) as u64,
        ))
    }

    async fn query_softirq_detail(
        &self,
        host: Option<&str>,
        range: TimeRange,
        page: Page,
    ) -> Result<(Vec<SoftIrqDetailRow>, u64), StoreError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM server_softirq_detail WHERE timestamp BETWEEN $1 AND $2 AND ($3::text IS NULL OR server_name = $3)",
        )
        .bind(range.start)
        .bind(range.end)
        .bind(host)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            "SELECT server_name, timestamp, cpu_name, hi, timer, net_tx, net_rx, block, sched, net_rx_change
             FROM server_softirq_detail
             WHERE timestamp BETWEEN $1 AND $2 AND ($3::text IS NULL OR server_name = $3)
             ORDER BY timestamp DESC LIMIT $4 OFFSET $5",
        )
        .bind(range.start)
        .bind(range.end)
        .bind(host)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((
            rows.iter()
                .map(|r| SoftIrqDetailRow {
                    host: r.get("server_name"),
                    timestamp: r.get("timestamp"),
                    sample: crate::model::SoftIrq {
                        cpu_name: r.get("cpu_name"),
                        hi: r.get::<i64, _>("hi") as u64,
                        timer: r.get::<i64, _>("timer") as u64,
                        net_tx: r.get::<i64, _>("net_tx") as u64,
                        net_rx: r.get::<i64, _>("net_rx") as u64,
                        block: r.get::<i64, _>("block") as u64,
                        sched: r.get::<i64, _>("sched") as u64,
                        ..Default::default()
                    },
                    net_rx_change: r.get("net_rx_change"),
                })
                .collect(),
            total.max(0) as u64,
        ))
    }
}

fn row_to_performance(r: &sqlx::postgres::PgRow) -> PerformanceRow {
    PerformanceRow {
        host: r.get("server_name"),
        timestamp: r.get("timestamp"),
        sample: PerfSample {
            cpu_percent: r.get("cpu_percent"),
            usr_percent: r.get("usr_percent"),
            system_percent: r.get("system_percent"),
            mem_used_percent: r.get("mem_used_percent"),
            load_avg_1: r.get("load_avg_1"),
            disk_util_percent: r.get("disk_util_percent"),
            net_rcv_mib_s: r.get("net_rcv_mib_s"),
            net_send_mib_s: r.get("net_send_mib_s"),
        },
        rates: PerfSample {
            cpu_percent: r.get("cpu_percent_rate"),
            usr_percent: r.get("usr_percent_rate"),
            system_percent: r.get("system_percent_rate"),
            mem_used_percent: r.get("mem_used_percent_rate"),
            load_avg_1: r.get("load_avg_1_rate"),
            disk_util_percent: r.get("disk_util_percent_rate"),
            net_rcv_mib_s: r.get("net_rcv_mib_s_rate"),
            net_send_mib_s: r.get("net_send_mib_s_rate"),
        },
        score: r.get("score"),
    }
}
