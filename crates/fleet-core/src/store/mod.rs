//! Historical Store Adapter (§4.6) and the read side consumed by the Query
//! Engine (§4.7). The trait lets `fleet-manager` wire a real `sqlx::PgPool`
//! in production and an in-memory fake in tests, mirroring the teacher's
//! `SnapshotProvider` trait split between `LiveProvider` and its test
//! doubles.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{
    AnomalyRecord, AnomalyThresholds, ClusterStats, DiskDetailRow, LatestScoreRow, MemDetailRow,
    NetDetailRow, PerformanceRow, ScoreRow, SoftIrqDetailRow, SortOrder,
};

#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub page: u32,
    pub page_size: u32,
}

impl Page {
    /// Coerces `page >= 1`, `page_size >= 1` per §4.7 preconditions.
    pub fn coerce(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn offset(&self) -> i64 {
        ((self.page as i64) - 1) * self.page_size as i64
    }

    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TimeRange {
    pub start: chrono::NaiveDateTime,
    pub end: chrono::NaiveDateTime,
}

impl TimeRange {
    pub fn validate(&self) -> Result<(), crate::error::QueryError> {
        if self.start > self.end {
            Err(crate::error::QueryError::InvalidTimeRange)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
pub trait HistoricalStore: Send + Sync {
    async fn write_performance(&self, row: &PerformanceRow) -> Result<(), StoreError>;
    async fn write_net_detail(&self, row: &NetDetailRow) -> Result<(), StoreError>;
    async fn write_disk_detail(&self, row: &DiskDetailRow) -> Result<(), StoreError>;
    async fn write_mem_detail(&self, row: &MemDetailRow) -> Result<(), StoreError>;
    async fn write_softirq_detail(&self, row: &SoftIrqDetailRow) -> Result<(), StoreError>;

    async fn query_performance(
        &self,
        host: Option<&str>,
        range: TimeRange,
        page: Page,
    ) -> Result<(Vec<PerformanceRow>, u64), StoreError>;

    /// `interval_s == 0` returns raw rows ascending; otherwise SQL-side
    /// bucket averages ordered by bucket ascending.
    async fn query_trend(
        &self,
        host: Option<&str>,
        range: TimeRange,
        interval_s: u32,
    ) -> Result<Vec<PerformanceRow>, StoreError>;

    async fn query_anomaly(
        &self,
        host: Option<&str>,
        range: TimeRange,
        thresholds: AnomalyThresholds,
        page: Page,
    ) -> Result<(Vec<AnomalyRecord>, u64), StoreError>;

    async fn query_score_rank(
        &self,
        order: SortOrder,
        page: Page,
    ) -> Result<(Vec<ScoreRow>, u64), StoreError>;

    async fn query_latest_score(&self) -> Result<(Vec<LatestScoreRow>, ClusterStats), StoreError>;

    async fn query_net_detail(
        &self,
        host: Option<&str>,
        range: TimeRange,
        page: Page,
    ) -> Result<(Vec<NetDetailRow>, u64), StoreError>;

    async fn query_disk_detail(
        &self,
        host: Option<&str>,
        range: TimeRange,
        page: Page,
    ) -> Result<(Vec<DiskDetailRow>, u64), StoreError>;

    async fn query_mem_detail(
        &self,
        host: Option<&str>,
        range: TimeRange,
        page: Page,
    ) -> Result<(Vec<MemDetailRow>, u64), StoreError>;

    async fn query_softirq_detail(
        &self,
        host: Option<&str>,
        range: TimeRange,
        page: Page,
    ) -> Result<(Vec<SoftIrqDetailRow>, u64), StoreError>;
}
