//! fleet-manager - host fleet telemetry ingest and query service.
//!
//! Dequeues pushed samples through a fixed pool of shard workers, keeps a
//! live host-score directory, writes history to Postgres, and serves the
//! ingest/query gRPC surface (§4, §6).

mod convert;
mod ingest_service;
mod query_service;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tonic::transport::Server;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use fleet_core::directory::LiveDirectory;
use fleet_core::queue::{close, closable_queue};
use fleet_core::query::QueryEngine;
use fleet_core::router::ShardRouter;
use fleet_core::shard::ShardWorker;
use fleet_core::store::postgres::PostgresStore;
use fleet_core::store::HistoricalStore;
use fleet_core::{config, sweeper};

use fleet_proto::manager_ingest_server::ManagerIngestServer;
use fleet_proto::manager_query_server::ManagerQueryServer;

use ingest_service::IngestService;
use query_service::QueryService;

/// Host fleet telemetry manager: ingest endpoint, query engine.
#[derive(Parser)]
#[command(name = "fleet-manager", about = "Host fleet telemetry manager", version)]
struct Args {
    /// Address to listen on for gRPC traffic.
    #[arg(default_value = config::DEFAULT_LISTEN_ADDRESS)]
    listen_address: String,

    /// Number of shard workers.
    #[arg(long, default_value_t = config::DEFAULT_SHARD_COUNT)]
    shards: usize,

    /// Postgres connection string. Falls back to $DATABASE_URL, then a
    /// built-in default.
    #[arg(long, env = "DATABASE_URL", default_value = config::DEFAULT_DB_URL)]
    db_url: String,

    /// Live Directory staleness threshold in seconds.
    #[arg(long, default_value_t = 60)]
    liveness_secs: u64,

    /// Increase logging verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("fleet_manager={}", level).parse().unwrap())
        .add_directive(format!("fleet_core={}", level).parse().unwrap());

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    info!("fleet-manager {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "config: listen={}, shards={}, liveness_secs={}",
        args.listen_address, args.shards, args.liveness_secs
    );

    let pool = PgPoolOptions::new().max_connections(10).connect(&args.db_url).await?;
    let pg_store = PostgresStore::new(pool);
    pg_store.migrate().await?;
    info!("connected to historical store, schema ready");
    let store: Arc<dyn HistoricalStore> = Arc::new(pg_store);

    let directory = Arc::new(LiveDirectory::new());
    let running = Arc::new(AtomicBool::new(true));

    let mut producers = Vec::with_capacity(args.shards);
    let mut closed_flags = Vec::with_capacity(args.shards);
    let mut worker_handles = Vec::with_capacity(args.shards);

    for shard_idx in 0..args.shards {
        let (producer, consumer, closed) = closable_queue();
        producers.push(producer);
        closed_flags.push(closed);

        let worker = ShardWorker::new(
            shard_idx,
            args.shards,
            consumer,
            directory.clone(),
            store.clone(),
            tokio::runtime::Handle::current(),
        );
        worker_handles.push(worker.spawn());
    }

    let router = Arc::new(ShardRouter::new(producers));
    let sweeper_handle = sweeper::spawn(directory.clone(), router.clone(), running.clone());

    let ingest = IngestService::new(router.clone(), directory.clone());
    let query = QueryService::new(Arc::new(QueryEngine::new(store.clone())));

    let addr: SocketAddr = args.listen_address.parse()?;

    let shutdown_running = running.clone();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let shutdown_tx = std::sync::Mutex::new(Some(shutdown_tx));
    if let Err(e) = ctrlc::set_handler(move || {
        info!("received shutdown signal");
        shutdown_running.store(false, Ordering::SeqCst);
        if let Some(tx) = shutdown_tx.lock().expect("poisoned").take() {
            let _ = tx.send(());
        }
    }) {
        warn!("failed to set Ctrl-C handler: {}", e);
    }

    info!("listening on {}", addr);
    Server::builder()
        .add_service(ManagerIngestServer::new(ingest))
        .add_service(ManagerQueryServer::new(query))
        .serve_with_shutdown(addr, async {
            let _ = shutdown_rx.await;
        })
        .await?;

    info!("shutting down...");
    for closed in &closed_flags {
        close(closed);
    }
    for handle in worker_handles {
        let _ = handle.join();
    }
    running.store(false, Ordering::SeqCst);
    let _ = sweeper_handle.join();

    info!("shutdown complete");
    Ok(())
}
