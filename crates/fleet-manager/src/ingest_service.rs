//! Ingest Endpoint (§4.1): validates host identity, enqueues onto the Shard
//! Router, and returns immediately. Never touches the Historical Store or
//! the Live Directory directly — that happens downstream in the owning
//! Shard Worker.

use std::sync::Arc;

use fleet_core::directory::LiveDirectory;
use fleet_core::identity::derive_host_id;
use fleet_core::router::ShardRouter;
use tonic::{Request, Response, Status};

use crate::convert::{core_monitor_info_to_pb, pb_monitor_info_to_core};
use fleet_proto::manager_ingest_server::ManagerIngest;
use fleet_proto::{Ack, Empty, MonitorInfo};

pub struct IngestService {
    router: Arc<ShardRouter>,
    directory: Arc<LiveDirectory>,
}

impl IngestService {
    pub fn new(router: Arc<ShardRouter>, directory: Arc<LiveDirectory>) -> Self {
        Self { router, directory }
    }
}

#[tonic::async_trait]
impl ManagerIngest for IngestService {
    async fn push_monitor_info(&self, request: Request<MonitorInfo>) -> Result<Response<Ack>, Status> {
        let info = pb_monitor_info_to_core(request.into_inner());

        if derive_host_id(&info).is_err() {
            return Err(Status::invalid_argument(
                "sample has no host identity (hostname, ip, and name all empty)",
            ));
        }

        self.router.route(info);
        Ok(Response::new(Ack { ok: true }))
    }

    /// Liveness ping: returns any one currently-known sample. §4.1 permits
    /// any deterministic choice; this takes the lexicographically-first
    /// host id from the Live Directory snapshot.
    async fn get_monitor_info(&self, _request: Request<Empty>) -> Result<Response<MonitorInfo>, Status> {
        let snapshot = self.directory.get_all();
        let chosen = snapshot
            .iter()
            .min_by(|a, b| a.0.cmp(b.0))
            .map(|(_, entry)| core_monitor_info_to_pb(&entry.info));
        Ok(Response::new(chosen.unwrap_or_default()))
    }
}
