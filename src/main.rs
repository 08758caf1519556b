mod capture;
mod completeness;
mod config;
mod database;
mod error;
mod models;
mod poller;
mod utils;

use clap::Parser;
use log::{error, info, LevelFilter};
use std::path::PathBuf;

use capture::TfrecReader;
use config::SensorConfig;
use database::{LogSink, PostgresSink, Sink};
use poller::Poller;

/// Collects room climate readings from tfrec and stores them in a time-series database
#[derive(Debug, Parser)]
#[command(name = "tfrec-climate-etl", version)]
struct Options {
    /// Load environment variables from this file instead of .env
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); overrides DEBUG_FLAG
    #[arg(long, value_parser = parse_level)]
    log_level: Option<LevelFilter>,

    /// Run a single collection cycle and exit
    #[arg(long)]
    once: bool,

    /// Log records instead of writing them to the database
    #[arg(long)]
    dry_run: bool,
}

fn parse_level(value: &str) -> Result<LevelFilter, String> {
    value
        .parse()
        .map_err(|_| format!("unknown log level '{}'", value))
}

async fn main_loop<S: Sink>(config: SensorConfig, sink: S, once: bool) {
    let reader = TfrecReader::new(&config.capture);
    let mut poller = Poller::new(
        reader,
        sink,
        config.sensors,
        config.capture.layouts,
        config.capture.max_counter,
        config.storage.update_interval,
        config.storage.measurement,
    );

    if once {
        let report = poller.run_cycle().await;
        info!(
            "Cycle finished after {} attempts: complete={}, stored={}, rooms={:?}",
            report.attempts, report.complete, report.flushed, report.rooms
        );
    } else {
        poller.run().await;
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = Options::parse();

    // Load configuration first, its debug flag decides the default log level
    let config = SensorConfig::new(options.env_file.as_deref());
    let level = options.log_level.unwrap_or(match &config {
        Ok(config) if config.capture.debug => LevelFilter::Debug,
        _ => LevelFilter::Info,
    });

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp_secs()
        .init();

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    info!("Starting tfrec climate collection");
    let mut sensors: Vec<_> = config.sensors.iter().collect();
    sensors.sort_by_key(|(_, room)| *room);
    for (id, room) in sensors {
        info!("Sensor: {} -> {}", id, room);
    }

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = tx.send(());
            }
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {}", e);
                // Keep the sender alive so the collection loop is not cancelled
                std::future::pending::<()>().await;
                drop(tx);
            }
        }
    });

    let once = options.once;
    let collection = async move {
        if options.dry_run {
            main_loop(config, LogSink, once).await
        } else {
            let sink = PostgresSink::new(config.storage.database_url.clone());
            main_loop(config, sink, once).await
        }
    };

    // Run main loop or wait for shutdown signal
    tokio::select! {
        _ = collection => {
            info!("Collection finished");
        }
        _ = &mut rx => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}
