//! Query Engine gRPC façade (§4.7, §6). Each RPC converts its request into
//! `fleet_core` domain types, delegates to `QueryEngine`, and converts the
//! result back to wire rows.

use std::sync::Arc;

use fleet_core::error::QueryError;
use fleet_core::query::QueryEngine;
use tonic::{Request, Response, Status};

use crate::convert::*;
use fleet_proto::manager_query_server::ManagerQuery;
use fleet_proto::*;

pub struct QueryService {
    engine: Arc<QueryEngine>,
}

impl QueryService {
    pub fn new(engine: Arc<QueryEngine>) -> Self {
        Self { engine }
    }
}

fn query_error_to_status(e: QueryError) -> Status {
    match e {
        QueryError::InvalidTimeRange => Status::invalid_argument(e.to_string()),
        QueryError::Store(_) => Status::internal(e.to_string()),
    }
}

fn opt_host(host: &str) -> Option<&str> {
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

#[tonic::async_trait]
impl ManagerQuery for QueryService {
    async fn query_performance(
        &self,
        request: Request<QueryPerformanceRequest>,
    ) -> Result<Response<QueryPerformanceResponse>, Status> {
        let req = request.into_inner();
        let range = pb_time_range_to_core(req.range);
        let (page, page_size) = pb_page_to_core(req.page);
        let (rows, total) = self
            .engine
            .query_performance(opt_host(&req.host), range, page, page_size)
            .await
            .map_err(query_error_to_status)?;
        Ok(Response::new(QueryPerformanceResponse {
            rows: rows.iter().map(core_performance_row_to_pb).collect(),
            total,
        }))
    }

    async fn query_trend(
        &self,
        request: Request<QueryTrendRequest>,
    ) -> Result<Response<QueryTrendResponse>, Status> {
        let req = request.into_inner();
        let range = pb_time_range_to_core(req.range);
        let rows = self
            .engine
            .query_trend(opt_host(&req.host), range, req.interval_secs)
            .await
            .map_err(query_error_to_status)?;
        Ok(Response::new(QueryTrendResponse {
            rows: rows.iter().map(core_performance_row_to_pb).collect(),
        }))
    }

    async fn query_anomaly(
        &self,
        request: Request<QueryAnomalyRequest>,
    ) -> Result<Response<QueryAnomalyResponse>, Status> {
        let req = request.into_inner();
        let range = pb_time_range_to_core(req.range);
        let thresholds = pb_thresholds_to_core(req.thresholds);
        let (page, page_size) = pb_page_to_core(req.page);
        let (records, total) = self
            .engine
            .query_anomaly(opt_host(&req.host), range, thresholds, page, page_size)
            .await
            .map_err(query_error_to_status)?;
        Ok(Response::new(QueryAnomalyResponse {
            records: records.iter().map(core_anomaly_record_to_pb).collect(),
            total,
        }))
    }

    async fn query_score_rank(
        &self,
        request: Request<QueryScoreRankRequest>,
    ) -> Result<Response<QueryScoreRankResponse>, Status> {
        let req = request.into_inner();
        let order = pb_sort_order_to_core(req.order);
        let (page, page_size) = pb_page_to_core(req.page);
        let (rows, _total) = self
            .engine
            .query_score_rank(order, page, page_size)
            .await
            .map_err(query_error_to_status)?;
        Ok(Response::new(QueryScoreRankResponse {
            rows: rows.iter().map(core_score_row_to_pb).collect(),
        }))
    }

    async fn query_latest_score(
        &self,
        _request: Request<QueryLatestScoreRequest>,
    ) -> Result<Response<QueryLatestScoreResponse>, Status> {
        let (rows, stats) = self
            .engine
            .query_latest_score()
            .await
            .map_err(query_error_to_status)?;
        Ok(Response::new(QueryLatestScoreResponse {
            rows: rows.iter().map(core_latest_score_row_to_pb).collect(),
            stats: Some(core_cluster_stats_to_pb(&stats)),
        }))
    }

    async fn query_net_detail(
        &self,
        request: Request<QueryNetDetailRequest>,
    ) -> Result<Response<QueryNetDetailResponse>, Status> {
        let req = request.into_inner();
        let range = pb_time_range_to_core(req.range);
        let (page, page_size) = pb_page_to_core(req.page);
        let (rows, total) = self
            .engine
            .query_net_detail(opt_host(&req.host), range, page, page_size)
            .await
            .map_err(query_error_to_status)?;
        Ok(Response::new(QueryNetDetailResponse {
            rows: rows.iter().map(core_net_detail_row_to_pb).collect(),
            total,
        }))
    }

    async fn query_disk_detail(
        &self,
        request: Request<QueryDiskDetailRequest>,
    ) -> Result<Response<QueryDiskDetailResponse>, Status> {
        let req = request.into_inner();
        let range = pb_time_range_to_core(req.range);
        let (page, page_size) = pb_page_to_core(req.page);
        let (rows, total) = self
            .engine
            .query_disk_detail(opt_host(&req.host), range, page, page_size)
            .await
            .map_err(query_error_to_status)?;
        Ok(Response::new(QueryDiskDetailResponse {
            rows: rows.iter().map(core_disk_detail_row_to_pb).collect(),
            total,
        }))
    }

    async fn query_mem_detail(
        &self,
        request: Request<QueryMemDetailRequest>,
    ) -> Result<Response<QueryMemDetailResponse>, Status> {
        let req = request.into_inner();
        let range = pb_time_range_to_core(req.range);
        let (page, page_size) = pb_page_to_core(req.page);
        let (rows, total) = self
            .engine
            .query_mem_detail(opt_host(&req.host), range, page, page_size)
            .await
            .map_err(query_error_to_status)?;
        Ok(Response::new(QueryMemDetailResponse {
            rows: rows.iter().map(core_mem_detail_row_to_pb).collect(),
            total,
        }))
    }

    async fn query_soft_irq_detail(
        &self,
        request: Request<QuerySoftIrqDetailRequest>,
    ) -> Result<Response<QuerySoftIrqDetailResponse>, Status> {
        let req = request.into_inner();
        let range = pb_time_range_to_core(req.range);
        let (page, page_size) = pb_page_to_core(req.page);
        let (rows, total) = self
            .engine
            .query_softirq_detail(opt_host(&req.host), range, page, page_size)
            .await
            .map_err(query_error_to_status)?;
        Ok(Response::new(QuerySoftIrqDetailResponse {
            rows: rows.iter().map(core_softirq_detail_row_to_pb).collect(),
            total,
        }))
    }
}
