//! fleet-worker - host agent: samples `/proc` and pushes `MonitorInfo` to a
//! fleet-manager on a fixed interval (§4.1, §6).

mod procfs;
mod sampler;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use fleet_proto::manager_ingest_client::ManagerIngestClient;
use fleet_proto::HostInfo;

use sampler::{RealFs, Sampler};

/// Host agent that samples local system metrics and pushes them to a
/// fleet-manager.
#[derive(Parser)]
#[command(name = "fleet-worker", about = "Host fleet telemetry agent", version)]
struct Args {
    /// Address of the fleet-manager to push samples to (e.g. http://10.0.0.1:50051).
    manager_address: String,

    /// Sampling/push interval in seconds.
    #[arg(default_value_t = 10)]
    interval_seconds: u64,

    /// Path to the /proc filesystem (for testing against fixture directories).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// Override the reported hostname; defaults to the OS hostname.
    #[arg(long)]
    hostname: Option<String>,

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

    let filter = EnvFilter::from_default_env().add_directive(format!("fleet_worker={}", level).parse().unwrap());

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn local_host_info(override_hostname: Option<String>) -> HostInfo {
    let hostname = override_hostname.unwrap_or_else(|| {
        hostname::get().ok().and_then(|h| h.into_string().ok()).unwrap_or_else(|| "unknown".to_string())
    });
    let ip_address = local_ip_address().unwrap_or_default();
    HostInfo { hostname, ip_address }
}

/// Best-effort local IPv4 lookup via a UDP "connect" (no packets sent,
/// just resolves the outbound route). Falls back to empty on failure,
/// consistent with the identity fallback chain (§3) tolerating a missing IP.
fn local_ip_address() -> Option<String> {
    let socket = std::net::UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    socket.local_addr().ok().map(|addr| addr.ip().to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    info!("fleet-worker {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "config: manager={}, interval={}s, proc_path={}",
        args.manager_address, args.interval_seconds, args.proc_path
    );

    let host = local_host_info(args.hostname);
    info!("reporting as hostname={}, ip={}", host.hostname, host.ip_address);

    let mut client = ManagerIngestClient::connect(args.manager_address.clone()).await?;
    let mut sampler = Sampler::new(RealFs, args.proc_path.clone());

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("failed to set Ctrl-C handler: {}", e);
    }

    let interval = Duration::from_secs(args.interval_seconds.max(1));
    let mut pushed: u64 = 0;

    info!("starting sampling loop");
    while running.load(Ordering::SeqCst) {
        let sample = sampler.sample(&host);

        // Fixed-interval push regardless of success/failure, matching the
        // original `monitor_pusher.cpp`: log and continue, no backoff.
        match client.push_monitor_info(sample).await {
            Ok(_) => {
                pushed += 1;
                if pushed.is_multiple_of(6) {
                    info!("pushed {} samples", pushed);
                }
            }
            Err(e) => {
                error!("push_monitor_info failed: {}", e);
            }
        }

        let sleep_interval = Duration::from_millis(100);
        let mut remaining = interval;
        while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
            let slice = remaining.min(sleep_interval);
            tokio::time::sleep(slice).await;
            remaining = remaining.saturating_sub(slice);
        }
    }

    info!("shutdown complete");
    Ok(())
}
