//! QUIC session configuration.
//!
//! # Responsibilities
//! - Build the TLS 1.3 server configuration with the configured ALPN list
//! - Enable 0-RTT and resumption tickets
//! - Advertise the per-connection stream limits
//!
//! # Design Decisions
//! - The crypto provider is chosen explicitly (ring) so feature unification
//!   elsewhere in the build cannot change it
//! - Built once at startup and shared by every accepted connection

use std::sync::Arc;

use quinn::crypto::rustls::QuicServerConfig;
use quinn::{TransportConfig, VarInt};

use crate::config::ServerConfig;
use crate::lifecycle::StartupError;
use crate::net::tls::TlsMaterial;

/// Resumption tickets issued after each handshake.
const TICKETS_PER_HANDSHAKE: usize = 1;

/// Server-side session settings shared by all connections.
#[derive(Clone)]
pub struct Session {
    server_config: quinn::ServerConfig,
    alpn: Vec<String>,
}

impl Session {
    /// Configure the session from `config` and the loaded certificate.
    pub fn open(config: &ServerConfig, tls: TlsMaterial) -> Result<Self, StartupError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let mut crypto = rustls::ServerConfig::builder_with_provider(provider)
            .with_protocol_versions(&[&rustls::version::TLS13])?
            .with_no_client_auth()
            .with_single_cert(tls.certs, tls.key)?;
        crypto.alpn_protocols = config.listener.alpn_protocols();
        crypto.max_early_data_size = u32::MAX;
        crypto.send_tls13_tickets = TICKETS_PER_HANDSHAKE;

        let crypto = QuicServerConfig::try_from(crypto)?;
        let mut server_config = quinn::ServerConfig::with_crypto(Arc::new(crypto));

        let mut transport = TransportConfig::default();
        transport
            .max_concurrent_bidi_streams(VarInt::from_u32(config.limits.max_bidi_streams))
            .max_concurrent_uni_streams(VarInt::from_u32(config.limits.max_uni_streams));
        server_config.transport_config(Arc::new(transport));

        tracing::info!(
            alpn = ?config.listener.alpn,
            max_bidi_streams = config.limits.max_bidi_streams,
            max_uni_streams = config.limits.max_uni_streams,
            "Session configured"
        );

        Ok(Self {
            server_config,
            alpn: config.listener.alpn.clone(),
        })
    }

    /// quinn server configuration for a new endpoint.
    pub fn server_config(&self) -> quinn::ServerConfig {
        self.server_config.clone()
    }

    /// ALPN identifiers offered to peers.
    pub fn alpn(&self) -> &[String] {
        &self.alpn
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("alpn", &self.alpn).finish()
    }
}
