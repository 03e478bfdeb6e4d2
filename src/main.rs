//! hq-server binary.
//!
//! Serves HTTP/0.9 `GET` requests over QUIC for interoperability testing.
//! Startup failures exit with status 1; SIGINT/SIGTERM shut down gracefully.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use hq_server::config::{load_config, validate_config, ConfigError, ServerConfig};
use hq_server::lifecycle::{exit_on_failure, signals, Shutdown};
use hq_server::net::{Listener, Session, TlsMaterial};
use hq_server::observability::{logging, metrics};
use hq_server::protocol::{ContentSource, FsContent, NoContent};

#[derive(Parser, Debug)]
#[command(name = "hq-server", version, about = "HTTP/0.9 over QUIC interop server")]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// UDP port to listen on.
    #[arg(short, long)]
    port: Option<u16>,

    /// Require address validation (Retry) before accepting connections.
    #[arg(long)]
    retry: bool,

    /// Directory to serve files from.
    #[arg(short, long)]
    root: Option<String>,

    /// Certificate chain (PEM). Requires --key.
    #[arg(long, requires = "key")]
    cert: Option<String>,

    /// Private key (PEM). Requires --cert.
    #[arg(long, requires = "cert")]
    key: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Command-line flags win over the configuration file.
    fn apply(&self, config: &mut ServerConfig) {
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if self.retry {
            config.listener.require_retry = true;
        }
        if let Some(root) = &self.root {
            config.content.root_dir = Some(root.clone());
        }
        if let (Some(cert), Some(key)) = (&self.cert, &self.key) {
            config.tls.cert_path = Some(cert.clone());
            config.tls.key_path = Some(key.clone());
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => exit_on_failure(load_config(path), "load_config"),
        None => ServerConfig::default(),
    };
    cli.apply(&mut config);
    exit_on_failure(
        validate_config(&config).map_err(ConfigError::Validation),
        "validate_config",
    );

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "hq-server starting");

    if config.observability.metrics_enabled {
        let addr = exit_on_failure(
            config.observability.metrics_address.parse::<SocketAddr>(),
            "parse metrics_address",
        );
        exit_on_failure(metrics::init_metrics(addr), "init_metrics");
    }

    let tls = exit_on_failure(TlsMaterial::from_config(&config.tls), "load certificate");
    let session = exit_on_failure(Session::open(&config, tls), "Session::open");

    let content: Arc<dyn ContentSource> = match &config.content.root_dir {
        Some(dir) => {
            tracing::info!(root = %dir, "Serving files");
            Arc::new(FsContent::new(dir))
        }
        None => Arc::new(NoContent),
    };

    let listener = exit_on_failure(
        Listener::bind(&session, &config.listener, content),
        "Listener::bind",
    );

    let shutdown = Shutdown::new();
    let server = tokio::spawn(listener.run(shutdown.subscribe()));

    match signals::wait_for_signal().await {
        Ok(signal) => tracing::info!(signal, "Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Cannot watch for signals, shutting down"),
    }
    shutdown.trigger();

    if let Err(e) = server.await {
        tracing::error!(error = %e, "Listener task failed");
    }
    tracing::info!("Shutdown complete");
}
