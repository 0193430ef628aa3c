//! Query Engine (§4.7): validates preconditions, then delegates to whatever
//! `HistoricalStore` was wired at boot. Every operation here is read-only.

use std::sync::Arc;

use crate::error::QueryError;
use crate::model::{
    AnomalyRecord, AnomalyThresholds, ClusterStats, DiskDetailRow, LatestScoreRow, MemDetailRow,
    NetDetailRow, PerformanceRow, ScoreRow, SoftIrqDetailRow, SortOrder,
};
use crate::store::{HistoricalStore, Page, TimeRange};

pub struct QueryEngine {
    store: Arc<dyn HistoricalStore>,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn HistoricalStore>) -> Self {
        Self { store }
    }

    pub async fn query_performance(
        &self,
        host: Option<&str>,
        range: TimeRange,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<PerformanceRow>, u64), QueryError> {
        range.validate()?;
        Ok(self
            .store
            .query_performance(host, range, Page::coerce(page, page_size))
            .await?)
    }

    pub async fn query_trend(
        &self,
        host: Option<&str>,
        range: TimeRange,
        interval_s: u32,
    ) -> Result<Vec<PerformanceRow>, QueryError> {
        range.validate()?;
        Ok(self.store.query_trend(host, range, interval_s).await?)
    }

    pub async fn query_anomaly(
        &self,
        host: Option<&str>,
        range: TimeRange,
        thresholds: AnomalyThresholds,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<AnomalyRecord>, u64), QueryError> {
        range.validate()?;
        Ok(self
            .store
            .query_anomaly(host, range, thresholds, Page::coerce(page, page_size))
            .await?)
    }

    pub async fn query_score_rank(
        &self,
        order: SortOrder,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<ScoreRow>, u64), QueryError> {
        Ok(self.store.query_score_rank(order, Page::coerce(page, page_size)).await?)
    }

    pub async fn query_latest_score(&self) -> Result<(Vec<LatestScoreRow>, ClusterStats), QueryError> {
        Ok(self.store.query_latest_score().await?)
    }

    pub async fn query_net_detail(
        &self,
        host: Option<&str>,
        range: TimeRange,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<NetDetailRow>, u64), QueryError> {
        range.validate()?;
        Ok(self
            .store
            .query_net_detail(host, range, Page::coerce(page, page_size))
            .await?)
    }

    pub async fn query_disk_detail(
        &self,
        host: Option<&str>,
        range: TimeRange,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<DiskDetailRow>, u64), QueryError> {
        range.validate()?;
        Ok(self
            .store
            .query_disk_detail(host, range, Page::coerce(page, page_size))
            .await?)
    }

    pub async fn query_mem_detail(
        &self,
        host: Option<&str>,
        range: TimeRange,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<MemDetailRow>, u64), QueryError> {
        range.validate()?;
        Ok(self
            .store
            .query_mem_detail(host, range, Page::coerce(page, page_size))
            .await?)
    }

    pub async fn query_softirq_detail(
        &self,
        host: Option<&str>,
        range: TimeRange,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<SoftIrqDetailRow>, u64), QueryError> {
        range.validate()?;
        Ok(self
            .store
            .query_softirq_detail(host, range, Page::coerce(page, page_size))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn full_range() -> TimeRange {
        TimeRange {
            start: chrono::NaiveDateTime::MIN,
            end: chrono::NaiveDateTime::MAX,
        }
    }

    #[tokio::test]
    async fn rejects_inverted_time_range() {
        let engine = QueryEngine::new(Arc::new(MemoryStore::new()));
        let range = TimeRange {
            start: chrono::NaiveDateTime::MAX,
            end: chrono::NaiveDateTime::MIN,
        };
        let err = engine.query_performance(None, range, 1, 20).await.unwrap_err();
        assert!(matches!(err, QueryError::InvalidTimeRange));
    }

    #[tokio::test]
    async fn coerces_page_and_page_size_to_minimum_one() {
        let engine = QueryEngine::new(Arc::new(MemoryStore::new()));
        let (rows, total) = engine.query_performance(None, full_range(), 0, 0).await.unwrap();
        assert_eq!(rows.len(), 0);
        assert_eq!(total, 0);
    }
}
