//! urlstore server
//!
//! Serves one in-memory key registry over TCP. Entries live only as long as
//! the process.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use urlstore_core::{init_logging, KeyGenKind, ServiceConfig, UrlStore};
use urlstore_server::{server_exit, UrlStoreServer};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GeneratorArg {
    Random,
    Sequential,
}

impl From<GeneratorArg> for KeyGenKind {
    fn from(arg: GeneratorArg) -> Self {
        match arg {
            GeneratorArg::Random => KeyGenKind::Random,
            GeneratorArg::Sequential => KeyGenKind::Sequential,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "urlstore-server")]
#[command(about = "In-memory short key registry")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short = 'C', long, env = "URLSTORE_CONFIG")]
    config: Option<PathBuf>,

    /// TCP server bind address
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// TCP server port
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Key generation scheme
    #[arg(short = 'g', long, value_enum)]
    generator: Option<GeneratorArg>,

    /// Length of random keys
    #[arg(short = 'l', long)]
    key_length: Option<usize>,

    /// Enable debug logging
    #[arg(short = 'd', long)]
    debug: bool,
}

impl Args {
    /// Command line flags override the file
    fn into_config(self) -> Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::from_file(path)?,
            None => ServiceConfig::default(),
        };

        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(generator) = self.generator {
            config.keygen.kind = generator.into();
        }
        if let Some(length) = self.key_length {
            config.keygen.length = length;
        }
        if self.debug {
            config.logging.level = "debug".to_string();
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Args::parse().into_config()?;

    init_logging(&config.logging)?;

    info!("urlstore server v{} starting", env!("CARGO_PKG_VERSION"));
    info!("  • Listen Address: {}:{}", config.server.host, config.server.port);
    info!("  • Shards: {}", config.store.num_shards);
    info!("  • Key Generator: {:?} (length {})", config.keygen.kind, config.keygen.length);
    info!("  • Max Attempts: {}", config.store.max_attempts);
    info!("  • Log Filter: {}", config.logging.filter_directive());

    let store = Arc::new(UrlStore::with_config(&config.store, config.keygen.build())?);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    let server = UrlStoreServer::new(Arc::clone(&store), config.server.max_frame_bytes);
    let server_handle = tokio::spawn(server.serve(listener));

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal, stopping server...");
        }
        result = server_handle => {
            server_exit(result)?;
        }
    }

    info!("Shutdown complete, {} entries discarded", store.len());

    Ok(())
}
