//! rdp-updates - RDP Display Update Decoder
//!
//! Decodes a capture of concatenated fast-path output PDUs and prints how
//! many records of each kind it contained.

use anyhow::{bail, Context, Result};
use clap::Parser;
use rdp_updates::config::{load_config, Config};
use rdp_updates::fastpath::FastPath;
use rdp_updates::handler::UpdateCounter;
use std::path::PathBuf;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// rdp-updates - decode captured RDP fast-path output PDUs
#[derive(Parser, Debug)]
#[command(name = "rdp-updates")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Capture file of concatenated fast-path output PDUs
    capture: PathBuf,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON logging format
    #[arg(long)]
    json_log: bool,

    /// Stop at the first PDU that fails to decode
    #[arg(long)]
    stop_on_error: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    setup_logging(&args.log_level, args.json_log)?;

    // Load configuration
    let config = match &args.config {
        Some(path) => {
            let config = load_config(path)?;
            info!("Configuration loaded from: {:?}", path);
            config
        }
        None => Config::default(),
    };

    info!("rdp-updates v{}", rdp_updates::VERSION);

    let capture = std::fs::read(&args.capture)
        .with_context(|| format!("Failed to read capture file: {:?}", args.capture))?;
    info!("Decoding {} bytes from {:?}", capture.len(), args.capture);

    let mut fastpath = FastPath::new(&config.decoder);
    let mut counter = UpdateCounter::new();
    let mut offset = 0;
    let mut pdus = 0u64;
    let mut failures = 0u64;

    while offset < capture.len() {
        match fastpath.process_pdu(&capture[offset..], &mut counter) {
            Ok(used) => {
                offset += used;
                pdus += 1;
            }
            Err(e) => {
                failures += 1;
                error!("PDU at offset {} failed: {}", offset, e);
                if args.stop_on_error {
                    bail!("Decoding stopped at offset {}: {}", offset, e);
                }
                // resume at the next PDU boundary if the header was readable
                let Some(header) = fastpath.last_header().copied() else {
                    bail!("Cannot resynchronize after offset {}", offset);
                };
                if header.length == 0 || offset + header.length > capture.len() {
                    bail!("Cannot resynchronize after offset {}", offset);
                }
                warn!("Skipping {} bytes and resetting decoder state", header.length);
                offset += header.length;
                fastpath.reset();
            }
        }
    }

    println!("PDUs: {} decoded, {} failed", pdus, failures);
    for (kind, count) in counter.iter() {
        println!("{:<28}{}", kind, count);
    }
    println!("{:<28}{}", "total", counter.total());

    Ok(())
}

/// Setup logging based on configuration
///
/// `RUST_LOG`, when set, overrides `--log-level`.
fn setup_logging(level: &str, json: bool) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    if json {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}
