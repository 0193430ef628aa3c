//! In-memory `HistoricalStore` fake used by `fleet-core`'s own integration
//! tests and by `fleet-manager` test builds — mirrors the teacher's habit of
//! testing `LiveProvider` logic against a `FileSystem` fake rather than the
//! real disk.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{
    AnomalyRecord, AnomalyThresholds, AnomalyType, ClusterStats, DiskDetailRow, LatestScoreRow,
    MemDetailRow, NetDetailRow, PerformanceRow, ScoreRow, Severity, SoftIrqDetailRow, SortOrder,
};

use super::{HistoricalStore, Page, TimeRange};

#[derive(Default)]
struct Tables {
    performance: Vec<PerformanceRow>,
    net_detail: Vec<NetDetailRow>,
    disk_detail: Vec<DiskDetailRow>,
    mem_detail: Vec<MemDetailRow>,
    softirq_detail: Vec<SoftIrqDetailRow>,
}

/// Append-only, process-local stand-in for the five Postgres tables.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn in_range(ts: chrono::NaiveDateTime, range: TimeRange) -> bool {
    ts >= range.start && ts <= range.end
}

fn paginate<T: Clone>(mut rows: Vec<T>, page: Page) -> (Vec<T>, u64) {
    let total = rows.len() as u64;
    let start = page.offset() as usize;
    if start >= rows.len() {
        return (Vec::new(), total);
    }
    let end = (start + page.limit() as usize).min(rows.len());
    (rows.drain(start..end).collect(), total)
}

#[async_trait]
impl HistoricalStore for MemoryStore {
    async fn write_performance(&self, row: &PerformanceRow) -> Result<(), StoreError> {
        self.tables.lock().expect("poisoned").performance.push(row.clone());
        Ok(())
    }

    async fn write_net_detail(&self, row: &NetDetailRow) -> Result<(), StoreError> {
        self.tables.lock().expect("poisoned").net_detail.push(row.clone());
        Ok(())
    }

    async fn write_disk_detail(&self, row: &DiskDetailRow) -> Result<(), StoreError> {
        self.tables.lock().expect("poisoned").disk_detail.push(row.clone());
        Ok(())
    }

    async fn write_mem_detail(&self, row: &MemDetailRow) -> Result<(), StoreError> {
        self.tables.lock().expect("poisoned").mem_detail.push(row.clone());
        Ok(())
    }

    async fn write_softirq_detail(&self, row: &SoftIrqDetailRow) -> Result<(), StoreError> {
        self.tables.lock().expect("poisoned").softirq_detail.push(row.clone());
        Ok(())
    }

    async fn query_performance(
        &self,
        host: Option<&str>,
        range: TimeRange,
        page: Page,
    ) -> Result<(Vec<PerformanceRow>, u64), StoreError> {
        let guard = self.tables.lock().expect("poisoned");
        let mut rows: Vec<_> = guard
            .performance
            .iter()
            .filter(|r| host.map_or(true, |h| r.host == h) && in_range(r.timestamp, range))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(paginate(rows, page))
    }

    async fn query_trend(
        &self,
        host: Option<&str>,
        range: TimeRange,
        interval_s: u32,
    ) -> Result<Vec<PerformanceRow>, StoreError> {
        let guard = self.tables.lock().expect("poisoned");
        let mut rows: Vec<_> = guard
            .performance
            .iter()
            .filter(|r| host.map_or(true, |h| r.host == h) && in_range(r.timestamp, range))
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.timestamp);
        if interval_s == 0 {
            return Ok(rows);
        }
        let mut buckets: Vec<(i64, Vec<PerformanceRow>)> = Vec::new();
        for row in rows {
            let bucket = row.timestamp.and_utc().timestamp() / interval_s as i64;
            match buckets.last_mut() {
                Some((b, members)) if *b == bucket => members.push(row),
                _ => buckets.push((bucket, vec![row])),
            }
        }
        Ok(buckets
            .into_iter()
            .map(|(bucket, members)| average_bucket(bucket, interval_s, &members))
            .collect())
    }

    async fn query_anomaly(
        &self,
        host: Option<&str>,
        range: TimeRange,
        thresholds: AnomalyThresholds,
        page: Page,
    ) -> Result<(Vec<AnomalyRecord>, u64), StoreError> {
        let guard = self.tables.lock().expect("poisoned");
        let mut records = Vec::new();
        for row in guard
            .performance
            .iter()
            .filter(|r| host.map_or(true, |h| r.host == h) && in_range(r.timestamp, range))
        {
            classify_row(row, &thresholds, &mut records);
        }
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(paginate(records, page))
    }

    async fn query_score_rank(
        &self,
        order: SortOrder,
        page: Page,
    ) -> Result<(Vec<ScoreRow>, u64), StoreError> {
        let guard = self.tables.lock().expect("poisoned");
        let mut latest_per_host: std::collections::HashMap<&str, &PerformanceRow> =
            std::collections::HashMap::new();
        for row in &guard.performance {
            latest_per_host
                .entry(row.host.as_str())
                .and_modify(|best| {
                    if row.timestamp > best.timestamp {
                        *best = row;
                    }
                })
                .or_insert(row);
        }
        let mut rows: Vec<ScoreRow> = latest_per_host
            .into_values()
            .map(|r| ScoreRow {
                host: r.host.clone(),
                timestamp: r.timestamp,
                score: r.score,
            })
            .collect();
        match order {
            SortOrder::Asc => rows.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap()),
            SortOrder::Desc => rows.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap()),
        }
        Ok(paginate(rows, page))
    }

    async fn query_latest_score(&self) -> Result<(Vec<LatestScoreRow>, ClusterStats), StoreError> {
        let guard = self.tables.lock().expect("poisoned");
        let mut latest_per_host: std::collections::HashMap<&str, &PerformanceRow> =
            std::collections::HashMap::new();
        for row in &guard.performance {
            latest_per_host
                .entry(row.host.as_str())
                .and_modify(|best| {
                    if row.timestamp > best.timestamp {
                        *best = row;
                    }
                })
                .or_insert(row);
        }
        let now = chrono::Utc::now().naive_utc();
        let mut rows: Vec<LatestScoreRow> = latest_per_host
            .into_values()
            .map(|r| {
                let online = (now - r.timestamp).num_seconds() <= 60;
                LatestScoreRow {
                    host: r.host.clone(),
                    timestamp: r.timestamp,
                    score: r.score,
                    online,
                }
            })
            .collect();
        rows.sort_by(|a, b| a.host.cmp(&b.host));

        let total = rows.len() as u32;
        let online = rows.iter().filter(|r| r.online).count() as u32;
        let offline = total - online;
        let (avg_score, max_score, min_score, best_server, worst_server) = if rows.is_empty() {
            (0.0, 0.0, 0.0, String::new(), String::new())
        } else {
            let sum: f64 = rows.iter().map(|r| r.score).sum();
            let best = rows.iter().max_by(|a, b| a.score.partial_cmp(&b.score).unwrap()).unwrap();
            let worst = rows.iter().min_by(|a, b| a.score.partial_cmp(&b.score).unwrap()).unwrap();
            (
                sum / rows.len() as f64,
                best.score,
                worst.score,
                best.host.clone(),
                worst.host.clone(),
            )
        };

        Ok((
            rows,
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
        let guard = self.tables.lock().expect("poisoned");
        let mut rows: Vec<_> = guard
            .net_detail
            .iter()
            .filter(|r| host.map_or(true, |h| r.host == h) && in_range(r.timestamp, range))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(paginate(rows, page))
    }

    async fn query_disk_detail(
        &self,
        host: Option<&str>,
        range: TimeRange,
        page: Page,
    ) -> Result<(Vec<DiskDetailRow>, u64), StoreError> {
        let guard = self.tables.lock().expect("poisoned");
        let mut rows: Vec<_> = guard
            .disk_detail
            .iter()
            .filter(|r| host.map_or(true, |h| r.host == h) && in_range(r.timestamp, range))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(paginate(rows, page))
    }

    async fn query_mem_detail(
        &self,
        host: Option<&str>,
        range: TimeRange,
        page: Page,
    ) -> Result<(Vec<MemDetailRow>, u64), StoreError> {
        let guard = self.tables.lock().expect("poisoned");
        let mut rows: Vec<_> = guard
            .mem_detail
            .iter()
            .filter(|r| host.map_or(true, |h| r.host == h) && in_range(r.timestamp, range))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(paginate(rows, page))
    }

    async fn query_softirq_detail(
        &self,
        host: Option<&str>,
        range: TimeRange,
        page: Page,
    ) -> Result<(Vec<SoftIrqDetailRow>, u64), StoreError> {
        let guard = self.tables.lock().expect("poisoned");
        let mut rows: Vec<_> = guard
            .softirq_detail
            .iter()
            .filter(|r| host.map_or(true, |h| r.host == h) && in_range(r.timestamp, range))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(paginate(rows, page))
    }
}

fn average_bucket(bucket: i64, interval_s: u32, members: &[PerformanceRow]) -> PerformanceRow {
    let n = members.len() as f64;
    let mut acc = PerformanceRow {
        host: members[0].host.clone(),
        timestamp: chrono::DateTime::from_timestamp(bucket * interval_s as i64, 0)
            .map(|dt| dt.naive_utc())
            .unwrap_or(members[0].timestamp),
        ..Default::default()
    };
    for m in members {
        acc.score += m.score / n;
        acc.sample.cpu_percent += m.sample.cpu_percent / n;
        acc.sample.mem_used_percent += m.sample.mem_used_percent / n;
        acc.sample.load_avg_1 += m.sample.load_avg_1 / n;
        acc.sample.disk_util_percent += m.sample.disk_util_percent / n;
        acc.sample.net_rcv_mib_s += m.sample.net_rcv_mib_s / n;
        acc.sample.net_send_mib_s += m.sample.net_send_mib_s / n;
    }
    acc
}

fn classify_row(row: &PerformanceRow, thresholds: &AnomalyThresholds, out: &mut Vec<AnomalyRecord>) {
    let severity_for = |value: f64, is_rate: bool| {
        if (!is_rate && value > 95.0) || (is_rate && value.abs() > 1.0) {
            Severity::Critical
        } else {
            Severity::Warning
        }
    };

    if row.sample.cpu_percent > thresholds.cpu_percent {
        out.push(AnomalyRecord {
            host: row.host.clone(),
            timestamp: row.timestamp,
            kind: AnomalyType::CpuHigh,
            severity: severity_for(row.sample.cpu_percent, false),
            value: row.sample.cpu_percent,
        });
    }
    if row.sample.mem_used_percent > thresholds.mem_percent {
        out.push(AnomalyRecord {
            host: row.host.clone(),
            timestamp: row.timestamp,
            kind: AnomalyType::MemHigh,
            severity: severity_for(row.sample.mem_used_percent, false),
            value: row.sample.mem_used_percent,
        });
    }
    if row.sample.disk_util_percent > thresholds.disk_percent {
        out.push(AnomalyRecord {
            host: row.host.clone(),
            timestamp: row.timestamp,
            kind: AnomalyType::DiskHigh,
            severity: severity_for(row.sample.disk_util_percent, false),
            value: row.sample.disk_util_percent,
        });
    }
    if row.rates.cpu_percent.abs() > thresholds.change_rate {
        out.push(AnomalyRecord {
            host: row.host.clone(),
            timestamp: row.timestamp,
            kind: AnomalyType::RateSpike,
            severity: severity_for(row.rates.cpu_percent, true),
            value: row.rates.cpu_percent,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PerfSample;

    fn row(host: &str, minute: i64, cpu: f64, score: f64) -> PerformanceRow {
        PerformanceRow {
            host: host.to_string(),
            timestamp: chrono::DateTime::from_timestamp(minute * 60, 0).unwrap().naive_utc(),
            sample: PerfSample {
                cpu_percent: cpu,
                ..Default::default()
            },
            rates: PerfSample::default(),
            score,
        }
    }

    #[tokio::test]
    async fn pagination_round_trips_total_and_rows() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.write_performance(&row("h1", i, 10.0, 80.0)).await.unwrap();
        }
        let range = TimeRange {
            start: chrono::NaiveDateTime::MIN,
            end: chrono::NaiveDateTime::MAX,
        };
        let (rows, total) = store
            .query_performance(Some("h1"), range, Page::coerce(1, 2))
            .await
            .unwrap();
        assert_eq!(total, 5);
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn anomaly_classification_respects_severity_boundary() {
        let store = MemoryStore::new();
        store.write_performance(&row("h1", 0, 96.0, 10.0)).await.unwrap();
        store.write_performance(&row("h1", 1, 80.0, 10.0)).await.unwrap();
        let range = TimeRange {
            start: chrono::NaiveDateTime::MIN,
            end: chrono::NaiveDateTime::MAX,
        };
        let thresholds = AnomalyThresholds {
            cpu_percent: 75.0,
            mem_percent: 75.0,
            disk_percent: 75.0,
            change_rate: 0.5,
        };
        let (records, total) = store
            .query_anomaly(Some("h1"), range, thresholds, Page::coerce(1, 100))
            .await
            .unwrap();
        assert_eq!(total, 2);
        let critical = records.iter().find(|r| r.value == 96.0).unwrap();
        assert_eq!(critical.severity, Severity::Critical);
        let warning = records.iter().find(|r| r.value == 80.0).unwrap();
        assert_eq!(warning.severity, Severity::Warning);
    }

    #[tokio::test]
    async fn latest_score_reports_cluster_stats() {
        let store = MemoryStore::new();
        store.write_performance(&row("h1", 0, 10.0, 90.0)).await.unwrap();
        store.write_performance(&row("h2", 0, 10.0, 30.0)).await.unwrap();
        let (rows, stats) = store.query_latest_score().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.max_score, 90.0);
        assert_eq!(stats.best_server, "h1");
    }
}
