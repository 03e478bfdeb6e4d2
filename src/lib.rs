//! Minimal HTTP/0.9 server over QUIC streams.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                  HQ SERVER                   │
//!                      │                                              │
//!     QUIC peer        │  ┌──────────┐   ┌──────────┐   ┌──────────┐  │
//!     ─────────────────┼─▶│   net    │──▶│ protocol │──▶│ content  │  │
//!                      │  │ listener │   │ request  │   │ (files)  │  │
//!                      │  │ + driver │◀──│  state   │◀──│          │  │
//!     ◀────────────────┼──│          │   │ machine  │   │          │  │
//!                      │  └──────────┘   └──────────┘   └──────────┘  │
//!                      │                                              │
//!                      │  ┌────────────────────────────────────────┐  │
//!                      │  │          Cross-Cutting Concerns        │  │
//!                      │  │  config   observability   lifecycle    │  │
//!                      │  └────────────────────────────────────────┘  │
//!                      └──────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod protocol;

pub use config::ServerConfig;
pub use lifecycle::Shutdown;
pub use net::{Listener, Session, TlsMaterial};
