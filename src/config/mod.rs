//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → CLI overrides (main.rs)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → Session / Listener setup
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; stream limits are never renegotiated
//! - All fields have defaults so an empty file is a valid config
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ContentConfig, LimitsConfig, ListenerConfig, ObservabilityConfig, ServerConfig, TlsConfig,
};
pub use validation::{validate_config, ValidationError};
