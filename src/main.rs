use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gaswatch::config::{ChannelKind, RuntimeConfig, DEFAULT_CONFIG_PATH};
use gaswatch::util::log;
use gaswatch::{log_info, Runtime};

/// Gas leak detector: sensor ingestion and danger monitoring.
#[derive(Parser, Debug)]
#[command(name = "gaswatch", version, about)]
struct Args {
    /// Path to the YAML config
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log debug messages, same as DEBUG=true
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Sensor and monitor in one process
    Run,
    /// Read the sensor and append readings to the journal
    Ingest,
    /// Follow the journal and raise alarms
    Monitor,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let (config, source) = RuntimeConfig::load(&args.config)?;
    log::init(&config.logging.dir, config.logging.debug || args.debug);
    RuntimeConfig::log_source(&args.config, source);

    let runtime = Runtime::new(config);
    match args.command.unwrap_or(Command::Run) {
        Command::Run => runtime.run().await,
        Command::Ingest => {
            let channel = runtime.build_channel(ChannelKind::Journal)?;
            tokio::select! {
                stats = runtime.ingest(channel) => {
                    let stats = stats?;
                    log_info!("Ingested {} lines, {} readings", stats.lines, stats.readings);
                }
                _ = tokio::signal::ctrl_c() => log_info!("Interrupted"),
            }
            Ok(())
        }
        Command::Monitor => {
            let channel = runtime.build_channel(ChannelKind::Journal)?;
            runtime.monitor(channel, true).await
        }
    }
}
