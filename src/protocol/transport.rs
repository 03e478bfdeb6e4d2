//! Capabilities consumed from the QUIC transport.
//!
//! The protocol core only talks to these traits; `net::driver` implements
//! them on top of quinn and tests implement them with recorders.

use crate::protocol::buffer::SendFlags;
use crate::protocol::error::{RequestErrorCode, TransportError};

/// How a stream is shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Finish the stream once queued data is delivered.
    Graceful,
    /// Terminate both directions immediately, reporting `code` to the peer.
    Abort(RequestErrorCode),
}

/// One transport stream, exclusively owned by its request.
pub trait StreamTransport: Send {
    /// Transport stream identifier.
    fn id(&self) -> u64;

    /// Submit one send operation.
    ///
    /// The transport copies `data` if it needs it past this call. Exactly one
    /// `SendComplete` event follows a successful submission.
    fn send(&mut self, data: &[u8], flags: SendFlags) -> Result<(), TransportError>;

    /// Request stream shutdown. `ShutdownComplete` is delivered later.
    fn shutdown(&mut self, mode: ShutdownMode) -> Result<(), TransportError>;
}

/// One transport connection, owned by the `Connection` handle.
pub trait ConnectionTransport: Send + Sync {
    /// Ask the transport to issue a resumption credential to the peer.
    fn send_resumption_ticket(&self) -> Result<(), TransportError>;

    /// Close the connection. Called once, when the last handle is dropped.
    fn close(&self);
}
