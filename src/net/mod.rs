//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming QUIC connection
//!     → listener.rs (accept loop, optional address validation via Retry)
//!     → session.rs (TLS 1.3 + ALPN, stream limits)
//!     → driver.rs (one task per connection, one task per stream)
//!     → Hand off to protocol layer as ConnectionEvent / StreamEvent
//! ```
//!
//! # Design Decisions
//! - The protocol core never touches quinn types
//! - Each stream task is the only event source for its request
//! - Connections are tracked for graceful shutdown

pub mod driver;
pub mod listener;
pub mod session;
pub mod tls;

pub use listener::Listener;
pub use session::Session;
pub use tls::{TlsError, TlsMaterial};
