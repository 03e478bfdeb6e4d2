//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (stream limits, ALPN lengths, addresses)
//! - Check that paired settings are set together
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ServerConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not an IP address")]
    BindAddress(String),

    #[error("listener.alpn must list at least one protocol")]
    EmptyAlpn,

    #[error("listener.alpn entry `{0}` must be 1..=255 bytes")]
    AlpnLength(String),

    #[error("limits.max_bidi_streams must be greater than zero")]
    NoRequestStreams,

    #[error("tls.cert_path and tls.key_path must be set together")]
    IncompleteTls,

    #[error("tls.self_signed_names must not be empty when no certificate is configured")]
    NoSelfSignedNames,

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.socket_addr().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.listener.alpn.is_empty() {
        errors.push(ValidationError::EmptyAlpn);
    }
    for alpn in &config.listener.alpn {
        if alpn.is_empty() || alpn.len() > 255 {
            errors.push(ValidationError::AlpnLength(alpn.clone()));
        }
    }

    if config.limits.max_bidi_streams == 0 {
        errors.push(ValidationError::NoRequestStreams);
    }

    match (&config.tls.cert_path, &config.tls.key_path) {
        (Some(_), None) | (None, Some(_)) => errors.push(ValidationError::IncompleteTls),
        (None, None) if config.tls.self_signed_names.is_empty() => {
            errors.push(ValidationError::NoSelfSignedNames)
        }
        _ => {}
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&ServerConfig::default()), Ok(()));
    }

    #[test]
    fn reports_every_error() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "localhost".into();
        config.listener.alpn = vec![String::new()];
        config.limits.max_bidi_streams = 0;
        config.tls.cert_path = Some("cert.pem".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::BindAddress("localhost".into()),
                ValidationError::AlpnLength(String::new()),
                ValidationError::NoRequestStreams,
                ValidationError::IncompleteTls,
            ]
        );
    }

    #[test]
    fn empty_alpn_rejected() {
        let mut config = ServerConfig::default();
        config.listener.alpn.clear();
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::EmptyAlpn])
        );
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = ServerConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::MetricsAddress("nowhere".into())])
        );
    }

    #[test]
    fn self_signed_needs_a_name() {
        let mut config = ServerConfig::default();
        config.tls.self_signed_names.clear();
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::NoSelfSignedNames])
        );
    }
}
