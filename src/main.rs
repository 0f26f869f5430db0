use anyhow::Result;
use clap::Parser;
use log::info;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use udptimer::clock::SystemWallClock;
use udptimer::config::{ProbeConfig, ReportFormat};
use udptimer::net::UdpListener;
use udptimer::receiver::Receiver;
use udptimer::report::Reporter;
use udptimer::store::SampleStore;

/// Collects one-way latency from timestamped UDP datagrams and prints
/// statistics every reporting interval.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// UDP port to listen on (default 5000)
    port: Option<u16>,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds without traffic before a report is printed
    #[arg(short, long)]
    interval: Option<u64>,

    /// Samples per storage chunk
    #[arg(long)]
    chunk_capacity: Option<usize>,

    /// Maximum number of storage chunks; later samples are dropped
    #[arg(long)]
    max_chunks: Option<usize>,

    /// Print reports as JSON lines
    #[arg(long)]
    json: bool,
}

impl Args {
    fn into_config(self) -> Result<ProbeConfig> {
        let mut config = match &self.config {
            Some(path) => ProbeConfig::load(path)?,
            None => ProbeConfig::default(),
        };

        if let Some(port) = self.port {
            config.listen.port = port;
        }
        if let Some(secs) = self.interval {
            config.report.interval_secs = secs;
        }
        if let Some(n) = self.chunk_capacity {
            config.store.chunk_capacity = n;
        }
        if let Some(n) = self.max_chunks {
            config.store.max_chunks = n;
        }
        if self.json {
            config.report.format = ReportFormat::Json;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let config = Args::parse().into_config()?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        info!("Ctrl+C received. Shutting down...");
        r.store(false, Ordering::SeqCst);
    })?;

    let listener = UdpListener::bind(config.listen.port)?;
    info!(
        "Listening on {} (report every {}s, store {} x {})",
        listener.local_addr()?,
        config.report.interval_secs,
        config.store.max_chunks,
        config.store.chunk_capacity
    );

    let store = SampleStore::new(config.store.chunk_capacity, config.store.max_chunks);
    let reporter = Reporter::new(io::stdout(), config.report.format);
    let mut receiver = Receiver::new(
        listener,
        SystemWallClock,
        store,
        reporter,
        config.report_interval(),
    );

    receiver.run(&running)
}
