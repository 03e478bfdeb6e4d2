//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → TLS material → Session → Listener
//!     (any failure exits the process with the failing operation's location)
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Close endpoint → Drain connections
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then security, then listener
//! - Startup is never retried
//! - Shutdown has timeout: remaining connections are abandoned after deadline

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{exit_on_failure, StartupError};
