//! QUIC listener.
//!
//! # Responsibilities
//! - Bind the UDP endpoint to the configured address
//! - Accept incoming connections, optionally validating addresses with Retry
//! - Spawn one connection task per accepted connection
//! - Close the endpoint and drain live connections on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use quinn::{Endpoint, VarInt};
use tokio::sync::broadcast;

use crate::config::ListenerConfig;
use crate::lifecycle::StartupError;
use crate::net::driver;
use crate::net::session::Session;
use crate::protocol::{ConnectionTracker, ContentSource};

/// How long live connections may take to finish after shutdown starts.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// A bound QUIC endpoint serving requests.
pub struct Listener {
    endpoint: Endpoint,
    require_retry: bool,
    content: Arc<dyn ContentSource>,
    tracker: ConnectionTracker,
}

impl Listener {
    /// Bind to the configured address with the given session settings.
    pub fn bind(
        session: &Session,
        config: &ListenerConfig,
        content: Arc<dyn ContentSource>,
    ) -> Result<Self, StartupError> {
        let addr = config.socket_addr()?;
        let endpoint = Endpoint::server(session.server_config(), addr)
            .map_err(|source| StartupError::Bind { addr, source })?;

        tracing::info!(
            address = %endpoint.local_addr().unwrap_or(addr),
            require_retry = config.require_retry,
            "Listener bound"
        );

        Ok(Self {
            endpoint,
            require_retry: config.require_retry,
            content,
            tracker: ConnectionTracker::new(),
        })
    }

    /// Get the local address the endpoint is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.endpoint.local_addr()
    }

    /// Live connection tracking.
    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Accept connections until `shutdown` fires, then drain.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                incoming = self.endpoint.accept() => match incoming {
                    Some(incoming) => self.on_incoming(incoming),
                    None => {
                        tracing::info!("Endpoint closed");
                        break;
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!("Listener stopping");
                    break;
                }
            }
        }

        self.endpoint
            .close(VarInt::from_u32(0), b"server shutting down");

        if !self.tracker.wait_for_shutdown(DRAIN_TIMEOUT).await {
            tracing::warn!(
                remaining = self.tracker.active_count(),
                "Connections still live after drain timeout"
            );
        }
        self.endpoint.wait_idle().await;
        tracing::info!("Listener stopped");
    }

    fn on_incoming(&self, incoming: quinn::Incoming) {
        let peer = incoming.remote_address();

        if self.require_retry && !incoming.remote_address_validated() {
            tracing::debug!(%peer, "Validating address with retry");
            if let Err(e) = incoming.retry() {
                tracing::warn!(%peer, error = ?e, "Retry failed");
            }
            return;
        }

        tracing::debug!(%peer, "Accepting connection");
        tokio::spawn(driver::serve_connection(
            incoming,
            Arc::clone(&self.content),
            self.tracker.clone(),
        ));
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("local_addr", &self.endpoint.local_addr().ok())
            .field("require_retry", &self.require_retry)
            .field("active_connections", &self.tracker.active_count())
            .finish()
    }
}
