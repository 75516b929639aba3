//! `tagpair` console.
//!
//! Runs the pairing flow against console-driven readers: type `barcode`
//! and `tag` commands to simulate the camera and the NFC reader.

mod console;
mod settings;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tagpair_core::PairingTable;
use tagpair_flow::{FlowRunner, Peripherals, RedirectCallback, SessionFlowController};
use tagpair_hardware::EVENT_CHANNEL_CAPACITY;
use tagpair_hardware::mock::{MockBarcodeReader, MockNfcReader};
use tagpair_storage::{Database, DatabaseConfig, FlowStore, KeyValueStore, MemoryStore, SqliteStore};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use console::{Console, ConsoleRedirect};
use settings::Settings;

#[derive(Parser, Debug)]
#[command(name = "tagpair", version, about = "Barcode and NFC tag pairing verifier")]
struct Args {
    /// Settings file (defaults to ./tagpair.toml when present).
    #[arg(long, short = 'c', env = "TAGPAIR_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite file for the session store.
    #[arg(long)]
    store: Option<PathBuf>,

    /// Seconds to show a result before restarting.
    #[arg(long)]
    reset_delay_secs: Option<u64>,

    /// Simulate a platform without in-process NFC.
    #[arg(long)]
    no_web_nfc: bool,

    /// Callback URL from the external NFC app to resume a flow.
    #[arg(long)]
    callback: Option<String>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(level) = &args.log_level {
        settings.log_level = level.clone();
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(path) = &args.store {
        settings.store_path = Some(path.clone());
    }
    if let Some(secs) = args.reset_delay_secs {
        settings.reset_delay_secs = secs;
    }
    if args.no_web_nfc {
        settings.web_nfc = false;
    }

    let callback = match args.callback.as_deref() {
        Some(input) => Some(
            RedirectCallback::from_url(input)
                .context("invalid --callback")?
                .context("--callback needs both session_id and tag_data")?,
        ),
        None => None,
    };

    match settings.store_path.clone() {
        Some(path) => {
            let db = Database::new(DatabaseConfig::new(&path))
                .await
                .with_context(|| format!("failed to open store '{}'", path.display()))?;
            info!("Using session store {}", path.display());
            let result = run(&settings, SqliteStore::from_database(&db), callback).await;
            db.close().await;
            result
        }
        None => {
            info!("Using in-memory session store");
            run(&settings, MemoryStore::new(), callback).await
        }
    }
}

async fn run<S>(
    settings: &Settings,
    store: S,
    callback: Option<RedirectCallback>,
) -> anyhow::Result<()>
where
    S: KeyValueStore + Clone + 'static,
{
    let pairs = resolve_pairs(settings, &store).await?;
    info!("Loaded {} barcode/tag pairs", pairs.len());

    let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (barcode_reader, barcode) = MockBarcodeReader::new(events_tx.clone());
    let (nfc_reader, nfc) = if settings.web_nfc {
        MockNfcReader::new(events_tx)
    } else {
        MockNfcReader::unsupported(events_tx)
    };

    let controller = SessionFlowController::new(
        settings.flow_config(),
        pairs,
        store,
        Peripherals::new(barcode_reader, nfc_reader, ConsoleRedirect),
    )
    .await?;

    let flow = FlowRunner::spawn(controller, events_rx);

    // A callback resumes the persisted session, so it must reach the
    // controller before `start` replaces that session.
    match callback {
        Some(callback) => flow.redirect_callback(callback).await?,
        None => flow.start().await?,
    }

    Console::new(flow, barcode, nfc).run().await
}

/// Pairs from the settings file, else those persisted by an earlier run,
/// else the demo table.
async fn resolve_pairs<S: KeyValueStore + Clone>(
    settings: &Settings,
    store: &S,
) -> anyhow::Result<PairingTable> {
    if let Some(table) = settings.pairing_table()? {
        return Ok(table);
    }

    let flow_store = FlowStore::new(store.clone());
    match flow_store.load_pairs().await {
        Ok(Some(table)) if !table.is_empty() => Ok(table),
        Ok(_) => Ok(PairingTable::demo()),
        Err(e) => {
            warn!("Ignoring unreadable stored pairs: {}", e);
            Ok(PairingTable::demo())
        }
    }
}
