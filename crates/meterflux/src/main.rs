use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use meterflux::router;
use meterflux::state::{ImportState, LocalBackend};
use meterflux_core::{
    AdapterAddress, Dispatcher, ImportConfig, ImportSession, LocalFile, PayloadBuilder,
    UtilityType,
};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Meter reading CSV import", long_about = None)]
struct Cli {
    /// Adapter instance to send imports to, e.g. meterflux.0
    #[arg(long, global = true)]
    adapter: Option<AdapterAddress>,
    /// Seconds to wait for the adapter's reply
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import one CSV file of meter readings
    Import(ImportArgs),
    /// Serve the upload API backed by a local import adapter
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// CSV file to import; when given more than once the last one is used
    #[arg(long = "file", required = true)]
    files: Vec<PathBuf>,
    /// gas, water, electricity or pv
    #[arg(long = "type")]
    utility_type: UtilityType,
    /// Meter name (letters, digits and underscores)
    #[arg(long)]
    name: String,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on (defaults to METERFLUX_BIND or 127.0.0.1:8080)
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Command::Import(args) => handle_import(&config, args).await,
        Command::Serve(args) => handle_serve(&config, args).await,
    }
}

fn load_config(cli: &Cli) -> Result<ImportConfig> {
    let mut config = ImportConfig::from_env().context("invalid meterflux configuration")?;
    if let Some(adapter) = &cli.adapter {
        config.adapter = adapter.clone();
    }
    if let Some(secs) = cli.timeout_secs {
        if secs == 0 {
            return Err(anyhow!("--timeout-secs must be at least 1"));
        }
        config.timeout = Duration::from_secs(secs);
    }
    Ok(config)
}

async fn handle_import(config: &ImportConfig, args: ImportArgs) -> Result<()> {
    if args.files.len() > 1 {
        warn!(
            selected = args.files.len(),
            "several files given; only the last one is imported"
        );
    }

    let backend = LocalBackend::start(config);
    let session = ImportSession::new(
        PayloadBuilder::new(config.max_file_bytes),
        Dispatcher::new(backend.transport(), config.adapter.clone()),
    );
    session.select_files(args.files.into_iter().map(LocalFile::new));
    session.set_utility_type(args.utility_type);
    session.set_import_name(args.name);

    let result = session.submit().await.context("import failed")?;
    if let Some(outcome) = session.last_outcome() {
        info!(adapter = %config.adapter, "{}", outcome.message());
    }
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn handle_serve(config: &ImportConfig, args: ServeArgs) -> Result<()> {
    let bind = args.bind.unwrap_or(config.bind);

    let backend = LocalBackend::start(config);
    let state = Arc::new(ImportState::new(config, backend.transport()));

    let listener = TcpListener::bind(bind).await?;
    info!(
        address = %listener.local_addr()?,
        adapter = %config.adapter,
        "listening for imports"
    );
    axum::serve(listener, router(state).into_make_service()).await?;

    backend.adapter_task.abort();
    Ok(())
}
