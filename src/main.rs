use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use project_tracker::{Config, MemoryStore, Store, db, start_server};

/// Project tracker API server
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Address to bind (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Keep all data in memory instead of PostgreSQL
    #[arg(long)]
    in_memory: bool,

    /// Apply database migrations before serving
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    let store: Arc<dyn Store> = if cli.in_memory {
        info!("Using in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        let db = db::init(&config, cli.migrate).await?;
        info!("Database connection established");
        Arc::new(db)
    };

    start_server(&config, store).await
}
