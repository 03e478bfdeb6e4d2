//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use quinn::crypto::rustls::QuicClientConfig;
use tokio::task::JoinHandle;

use hq_server::config::ServerConfig;
use hq_server::lifecycle::Shutdown;
use hq_server::net::{Listener, Session, TlsMaterial};
use hq_server::protocol::{ContentSource, FsContent, NoContent};

/// A running server on an ephemeral loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub tls: TlsMaterial,
    shutdown: Shutdown,
    task: JoinHandle<()>,
}

impl TestServer {
    /// Trigger shutdown and wait for the listener to drain.
    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(10), self.task)
            .await
            .expect("listener did not stop")
            .expect("listener task panicked");
    }
}

/// Start a server serving `root` (or only `/` when `None`).
pub async fn start_server(root: Option<&Path>, require_retry: bool) -> TestServer {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1".into();
    config.listener.port = 0;
    config.listener.require_retry = require_retry;
    config.limits.max_uni_streams = 4;

    let tls = TlsMaterial::self_signed(&["localhost".to_string()]).unwrap();
    let session = Session::open(&config, tls.clone()).unwrap();
    let content: Arc<dyn ContentSource> = match root {
        Some(dir) => Arc::new(FsContent::new(dir)),
        None => Arc::new(NoContent),
    };
    let listener = Listener::bind(&session, &config.listener, content).unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let task = tokio::spawn(listener.run(shutdown.subscribe()));

    TestServer {
        addr,
        tls,
        shutdown,
        task,
    }
}

/// Open a client connection that trusts the server's certificate.
pub async fn connect(server: &TestServer) -> quinn::Connection {
    let mut roots = rustls::RootCertStore::empty();
    for cert in &server.tls.certs {
        roots.add(cert.clone()).unwrap();
    }
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut crypto = rustls::ClientConfig::builder_with_provider(provider)
        .with_protocol_versions(&[&rustls::version::TLS13])
        .unwrap()
        .with_root_certificates(roots)
        .with_no_client_auth();
    crypto.alpn_protocols = vec![b"hq-interop".to_vec()];

    let client_config =
        quinn::ClientConfig::new(Arc::new(QuicClientConfig::try_from(crypto).unwrap()));
    let mut endpoint = quinn::Endpoint::client("127.0.0.1:0".parse().unwrap()).unwrap();
    endpoint.set_default_client_config(client_config);

    endpoint
        .connect(server.addr, "localhost")
        .unwrap()
        .await
        .unwrap()
}

/// Send `request` on a new bidirectional stream and read the response.
pub async fn request(
    conn: &quinn::Connection,
    request: &[u8],
) -> Result<Vec<u8>, quinn::ReadToEndError> {
    let (mut send, mut recv) = conn.open_bi().await.unwrap();
    // The server may reset the stream before the whole request is written.
    let _ = send.write_all(request).await;
    let _ = send.finish();
    tokio::time::timeout(Duration::from_secs(10), recv.read_to_end(8 * 1024 * 1024))
        .await
        .expect("response timed out")
}

/// Error code the server reset the stream with, if it did.
pub fn reset_code(result: &Result<Vec<u8>, quinn::ReadToEndError>) -> Option<u64> {
    match result {
        Err(quinn::ReadToEndError::Read(quinn::ReadError::Reset(code))) => Some(code.into_inner()),
        _ => None,
    }
}

/// A fresh directory under the system temp dir.
pub fn temp_root(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hq-it-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
