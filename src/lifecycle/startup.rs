//! Startup orchestration.
//!
//! # Responsibilities
//! - Name every way one-time setup can fail
//! - Turn a setup failure into an immediate process exit
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The diagnostic names the failing operation and its source location

use std::fmt::Display;
use std::io;
use std::net::{AddrParseError, SocketAddr};
use std::panic::Location;

use crate::config::ConfigError;
use crate::net::tls::TlsError;

/// Errors raised while configuring the session or listener.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("tls: {0}")]
    Tls(#[from] TlsError),

    #[error("crypto: {0}")]
    Crypto(#[from] rustls::Error),

    #[error("quic crypto: {0}")]
    QuicCrypto(#[from] quinn::crypto::rustls::NoInitialCipherSuite),

    #[error("invalid address: {0}")]
    Address(#[from] AddrParseError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

/// Unwrap a startup result or exit the process.
///
/// The diagnostic carries the caller's file and line plus `operation`.
#[track_caller]
pub fn exit_on_failure<T, E: Display>(result: Result<T, E>, operation: &str) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            let location = Location::caller();
            tracing::error!(%location, operation, error = %e, "Startup failed");
            eprintln!("{location} {operation} failed: {e}");
            std::process::exit(1);
        }
    }
}
