//! Connection handle and lifecycle tracking.
//!
//! # Responsibilities
//! - Own the transport connection for as long as any handle exists
//! - Turn peer-started streams into requests
//! - Generate unique connection IDs for tracing
//! - Count live connections for graceful shutdown
//!
//! # Reference Counting
//! ```text
//! accept()                 → 1 reference, held on behalf of the transport
//! PeerStreamStarted        → +1, moved into the new Request
//! Request dropped          → -1
//! ShutdownComplete         → -1, the transport's reference
//! last reference dropped   → transport connection closed
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::observability::metrics;
use crate::protocol::content::ContentSource;
use crate::protocol::event::ConnectionEvent;
use crate::protocol::request::Request;
use crate::protocol::transport::ConnectionTransport;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

struct Inner {
    id: ConnectionId,
    transport: Box<dyn ConnectionTransport>,
    content: Arc<dyn ContentSource>,
    _guard: Option<ConnectionGuard>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.transport.close();
        metrics::connection_closed();
        tracing::debug!(connection_id = %self.id, "Connection destroyed");
    }
}

/// Counted handle to one transport connection.
///
/// Handles are not `Clone`; a new reference is taken explicitly with
/// [`add_ref`](Connection::add_ref) and given back with
/// [`release`](Connection::release) or by dropping it.
pub struct Connection {
    inner: Arc<Inner>,
}

/// Result of handling a connection event.
pub enum Dispatch {
    /// The transport still holds its reference.
    Open(Connection),
    /// The peer started a stream; the caller drives the returned request.
    Stream(Connection, Request),
    /// The transport's reference was released.
    Released,
}

impl Connection {
    /// Wrap a newly accepted transport connection.
    ///
    /// The returned handle is the transport's reference; it is released by
    /// [`ConnectionEvent::ShutdownComplete`].
    pub fn accept(
        transport: Box<dyn ConnectionTransport>,
        content: Arc<dyn ContentSource>,
        guard: Option<ConnectionGuard>,
    ) -> Self {
        let id = ConnectionId::new();
        metrics::connection_opened();
        tracing::debug!(connection_id = %id, "Connection created");
        Self {
            inner: Arc::new(Inner {
                id,
                transport,
                content,
                _guard: guard,
            }),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.inner.id
    }

    /// Take another reference.
    pub fn add_ref(&self) -> Connection {
        Connection {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Give this reference back. The last release closes the transport.
    pub fn release(self) {
        drop(self);
    }

    /// Number of live references.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    pub(crate) fn content(&self) -> &dyn ContentSource {
        self.inner.content.as_ref()
    }

    /// Handle a connection-level transport event.
    pub fn handle_event(self, event: ConnectionEvent) -> Dispatch {
        match event {
            ConnectionEvent::Connected => {
                tracing::debug!(connection_id = %self.id(), "Connected");
                if let Err(e) = self.inner.transport.send_resumption_ticket() {
                    tracing::warn!(
                        connection_id = %self.id(),
                        error = %e,
                        "Failed to send resumption ticket"
                    );
                }
                Dispatch::Open(self)
            }
            ConnectionEvent::PeerStreamStarted { stream, direction } => {
                let request = Request::new(self.add_ref(), stream, direction);
                Dispatch::Stream(self, request)
            }
            ConnectionEvent::ShutdownComplete => {
                tracing::debug!(
                    connection_id = %self.id(),
                    remaining_refs = self.ref_count() - 1,
                    "Connection shutdown complete"
                );
                self.release();
                Dispatch::Released
            }
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.inner.id)
            .field("refs", &self.ref_count())
            .finish()
    }
}

/// Tracks live connections for graceful shutdown.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    /// Current count of live connections.
    active_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    /// Create a new connection tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new live connection. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
        }
    }

    /// Get current live connection count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Wait until all connections are gone or `timeout` elapses.
    ///
    /// Returns `true` if every connection was released in time.
    pub async fn wait_for_shutdown(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.active_count() > 0 {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        true
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements the live count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
    }
}
