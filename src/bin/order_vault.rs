use clap::Parser;
use order_vault::logging;
use order_vault::processor::{JsonLinesSink, JsonLinesSource, OrderVaultProcessor};
use order_vault::{SledVaultStore, VaultConfig};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Newline-delimited JSON file of inbound order events
    #[arg(short, long, required = true)]
    input: PathBuf,

    /// File the order report events are appended to
    #[arg(short, long, required = true)]
    output: PathBuf,

    /// Run a single batch pass and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => VaultConfig::from_file(path)?,
        None => VaultConfig::from_env()?,
    };
    // A logger installed by the host process is kept.
    let _ = logging::init(config.level_filter());

    log::info!(
        "Opening vault at {} ({:?} satellites)",
        config.storage_path.display(),
        config.satellite_mode
    );
    let store = SledVaultStore::open(&config.storage_path, config.enforce_references)?;
    let source = JsonLinesSource::open(&cli.input)?;
    let sink = JsonLinesSink::open(&cli.output)?;
    let mut processor = OrderVaultProcessor::from_config(&config, store, source, sink);

    if cli.once {
        processor.run_batch()?;
        return Ok(());
    }

    let mut interval = tokio::time::interval(Duration::from_secs(config.poll_interval_secs));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                match tokio::task::block_in_place(|| processor.run_batch()) {
                    Ok(_) => {}
                    Err(e) if e.is_retryable() => {
                        log::warn!("Batch pass failed, retrying next interval: {}", e);
                    }
                    Err(e) => {
                        log::error!("Batch pass halted: {}", e);
                        return Err(e.into());
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Received Ctrl-C, shutting down");
                break;
            }
        }
    }

    processor.store().db().flush()?;
    Ok(())
}
