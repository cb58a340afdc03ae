use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use crossbeam_channel::RecvTimeoutError;
use tracing::{info, warn};

use spejare_capture::{list_devices, PcapProvider};
use spejare_config::SpejareConfig;
use spejare_core::{Protocol, QueryFilter};
use spejare_engine::CaptureEngine;
use spejare_telemetry::MetricsRecorder;

#[derive(Parser)]
#[command(name = "spejare", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Capture live traffic and stream events as JSON lines until Ctrl-C
    Run(RunArgs),
    /// List capture-capable interfaces on this host
    Devices,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Interface to capture from (overrides configuration)
    #[arg(short, long)]
    pub interface: Option<String>,

    /// Configuration file (default: config/spejare.yaml plus SPEJARE_* env)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Protocol filter for the shutdown summary (TCP, UDP, ICMP, IP, OTHER)
    #[arg(long)]
    pub protocol: Option<String>,

    /// Source IP filter for the shutdown summary
    #[arg(long)]
    pub source_ip: Option<String>,

    /// Destination IP filter for the shutdown summary
    #[arg(long)]
    pub destination_ip: Option<String>,

    /// Maximum records in the shutdown summary (default from configuration)
    #[arg(long)]
    pub limit: Option<usize>,
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => SpejareConfig::load_from_path(path)?,
        None => SpejareConfig::load()?,
    };
    if let Some(interface) = &args.interface {
        config.capture.interface = interface.clone();
    }

    let filter = build_filter(&args)?;
    let limit = args.limit.unwrap_or(config.store.default_query_limit);

    let provider = Arc::new(PcapProvider::new(
        &config.capture.interface,
        config.capture.promiscuous,
        config.capture.snaplen,
        config.capture.poll_timeout_ms,
    ));
    let metrics = Arc::new(MetricsRecorder::new());
    let engine = CaptureEngine::new(&config, provider, metrics);

    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.try_send(());
    })?;

    engine.start()?;
    info!(interface = %config.capture.interface, "capturing, Ctrl-C to stop");
    let subscription = engine.subscribe();

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }
        match subscription
            .events()
            .recv_timeout(Duration::from_millis(200))
        {
            Ok(event) => println!("{}", serde_json::to_string(&event)?),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let status = engine.stop();
    if subscription.dropped_events() > 0 {
        warn!(
            dropped = subscription.dropped_events(),
            "stream events were dropped for this consumer"
        );
    }
    engine.unsubscribe(subscription.id());

    let result = engine.query(&filter, limit);
    println!(
        "{}",
        serde_json::to_string(&serde_json::json!({
            "status": status,
            "total_count": result.total_count,
            "filtered_count": result.filtered_count,
            "packets": result.records,
        }))?
    );
    Ok(())
}

pub fn devices() -> Result<(), Box<dyn Error>> {
    for name in list_devices()? {
        println!("{name}");
    }
    Ok(())
}

fn build_filter(args: &RunArgs) -> Result<QueryFilter, Box<dyn Error>> {
    let protocol = match &args.protocol {
        Some(name) => Some(Protocol::from_name(name).ok_or_else(|| {
            format!("unknown protocol '{name}' (expected TCP, UDP, ICMP, IP or OTHER)")
        })?),
        None => None,
    };
    Ok(QueryFilter {
        protocol,
        source_ip: args.source_ip.clone(),
        destination_ip: args.destination_ip.clone(),
    })
}
