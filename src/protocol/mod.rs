//! Application protocol over QUIC streams.
//!
//! # Data Flow
//! ```text
//! ConnectionEvent::PeerStreamStarted
//!     → connection.rs (counted handle, spawns one Request per stream)
//!     → request.rs (state machine, driven by StreamEvent)
//!     → parse.rs (request line) → content.rs (body)
//!     → buffer.rs (one IO_SIZE chunk in flight)
//!     → transport.rs (send / shutdown on the stream)
//! ```
//!
//! # Design Decisions
//! - Purely reactive: no threads, no blocking, no timers
//! - Events for one stream are serialized by the caller
//! - Runtime faults terminate a single stream, never its connection

pub mod buffer;
pub mod connection;
pub mod content;
pub mod error;
pub mod event;
pub mod parse;
pub mod request;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use buffer::{SendBuffer, SendFlags, IO_SIZE};
pub use connection::{Connection, ConnectionGuard, ConnectionId, ConnectionTracker, Dispatch};
pub use content::{ContentSource, FsContent, NoContent, DEFAULT_PAYLOAD};
pub use error::{RequestErrorCode, TransportError};
pub use event::{ConnectionEvent, Direction, Flow, StreamEvent};
pub use request::{Request, RequestState};
pub use transport::{ConnectionTransport, ShutdownMode, StreamTransport};
