//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::net::{AddrParseError, IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

/// Default UDP port.
pub const DEFAULT_PORT: u16 = 4433;

/// Maximum concurrent requests (peer bidirectional streams) per connection.
pub const MAX_REQUESTS_PER_CONNECTION: u32 = 100;

/// Peer unidirectional streams allowed per connection, for interop tests.
pub const PEER_UNI_STREAM_COUNT: u32 = 1;

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, port, ALPN, retry).
    pub listener: ListenerConfig,

    /// Per-connection stream limits.
    pub limits: LimitsConfig,

    /// Where response bodies come from.
    pub content: ContentConfig,

    /// Certificate configuration.
    pub tls: TlsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Local IP address to bind (e.g., "0.0.0.0" or "::").
    pub bind_address: String,

    /// UDP port.
    pub port: u16,

    /// Answer unvalidated peers with a Retry packet before accepting.
    pub require_retry: bool,

    /// ALPN identifiers offered during the handshake, in preference order.
    pub alpn: Vec<String>,
}

impl ListenerConfig {
    /// Socket address the endpoint binds to.
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        let ip: IpAddr = self.bind_address.parse()?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// ALPN identifiers as raw bytes.
    pub fn alpn_protocols(&self) -> Vec<Vec<u8>> {
        self.alpn.iter().map(|p| p.as_bytes().to_vec()).collect()
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            require_retry: false,
            alpn: vec!["hq-interop".to_string(), "hq-29".to_string()],
        }
    }
}

/// Stream limits advertised to every peer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Peer-initiated bidirectional streams (concurrent requests).
    pub max_bidi_streams: u32,

    /// Peer-initiated unidirectional streams.
    pub max_uni_streams: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_bidi_streams: MAX_REQUESTS_PER_CONNECTION,
            max_uni_streams: PEER_UNI_STREAM_COUNT,
        }
    }
}

/// Response content configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Directory served for non-root paths. Without it only `/` is served.
    pub root_dir: Option<String>,
}

/// Certificate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Path to certificate chain (PEM).
    pub cert_path: Option<String>,

    /// Path to private key (PEM).
    pub key_path: Option<String>,

    /// Subject names for the self-signed certificate used when no
    /// certificate is configured.
    pub self_signed_names: Vec<String>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert_path: None,
            key_path: None,
            self_signed_names: vec!["localhost".to_string()],
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
