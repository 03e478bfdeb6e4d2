//! Transport events consumed by the protocol state machines.
//!
//! The transport delivers one event at a time per stream, in the order it
//! observed them. Handlers run to completion and never block.

use bytes::Bytes;

use crate::protocol::transport::StreamTransport;

/// Direction of a peer-initiated stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Bidirectional,
    Unidirectional,
}

/// Per-stream event.
#[derive(Debug)]
pub enum StreamEvent {
    /// Ordered inbound data.
    Receive { buffers: Vec<Bytes> },
    /// The previously submitted send has left local ownership.
    SendComplete { canceled: bool },
    /// The peer finished its send direction.
    PeerSendShutdown,
    /// The peer aborted its send direction.
    PeerSendAborted { error_code: u64 },
    /// The stream is fully closed. No further events follow.
    ShutdownComplete,
}

/// What the owner of a request does after an event was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Drop the request.
    Closed,
}

/// Per-connection event.
pub enum ConnectionEvent {
    /// The handshake completed.
    Connected,
    /// The peer opened a stream.
    PeerStreamStarted {
        stream: Box<dyn StreamTransport>,
        direction: Direction,
    },
    /// The connection is fully shut down. No further events follow.
    ShutdownComplete,
}

impl std::fmt::Debug for ConnectionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionEvent::Connected => f.write_str("Connected"),
            ConnectionEvent::PeerStreamStarted { stream, direction } => f
                .debug_struct("PeerStreamStarted")
                .field("stream_id", &stream.id())
                .field("direction", direction)
                .finish(),
            ConnectionEvent::ShutdownComplete => f.write_str("ShutdownComplete"),
        }
    }
}
