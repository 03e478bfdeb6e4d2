//! Certificate and key loading.
//!
//! # Responsibilities
//! - Read a PEM certificate chain and private key from disk
//! - Generate a self-signed certificate when none is configured

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};

use crate::config::TlsConfig;

/// Error type for certificate loading.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no certificates found in {0:?}")]
    NoCertificates(PathBuf),

    #[error("no private key found in {0:?}")]
    NoPrivateKey(PathBuf),

    #[error("failed to generate certificate: {0}")]
    Generate(#[from] rcgen::Error),
}

/// A certificate chain and its private key.
#[derive(Debug)]
pub struct TlsMaterial {
    pub certs: Vec<CertificateDer<'static>>,
    pub key: PrivateKeyDer<'static>,
}

impl TlsMaterial {
    /// Load configured PEM files, or generate a self-signed certificate.
    pub fn from_config(config: &TlsConfig) -> Result<Self, TlsError> {
        match (&config.cert_path, &config.key_path) {
            (Some(cert), Some(key)) => Self::from_pem_files(Path::new(cert), Path::new(key)),
            _ => Self::self_signed(&config.self_signed_names),
        }
    }

    /// Load a certificate chain and private key from PEM files.
    pub fn from_pem_files(cert_path: &Path, key_path: &Path) -> Result<Self, TlsError> {
        let certs = rustls_pemfile::certs(&mut open(cert_path)?)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| TlsError::Io {
                path: cert_path.to_path_buf(),
                source,
            })?;
        if certs.is_empty() {
            return Err(TlsError::NoCertificates(cert_path.to_path_buf()));
        }

        let key = rustls_pemfile::private_key(&mut open(key_path)?)
            .map_err(|source| TlsError::Io {
                path: key_path.to_path_buf(),
                source,
            })?
            .ok_or_else(|| TlsError::NoPrivateKey(key_path.to_path_buf()))?;

        tracing::info!(cert = ?cert_path, chain_len = certs.len(), "Loaded certificate");
        Ok(Self { certs, key })
    }

    /// Generate a self-signed certificate for `names`.
    pub fn self_signed(names: &[String]) -> Result<Self, TlsError> {
        let generated = rcgen::generate_simple_self_signed(names.to_vec())?;
        let key = PrivatePkcs8KeyDer::from(generated.key_pair.serialize_der());
        tracing::info!(names = ?names, "Generated self-signed certificate");
        Ok(Self {
            certs: vec![CertificateDer::from(generated.cert)],
            key: key.into(),
        })
    }
}

impl Clone for TlsMaterial {
    fn clone(&self) -> Self {
        Self {
            certs: self.certs.clone(),
            key: self.key.clone_key(),
        }
    }
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| TlsError::Io {
            path: path.to_path_buf(),
            source,
        })
}
