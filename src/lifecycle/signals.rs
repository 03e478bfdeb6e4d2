//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM
//! - Report which signal arrived so the caller can log it
//! - Report an error when no signal can be observed at all

use std::future::Future;
use std::io;

/// Wait for the first termination signal and return its name.
///
/// Returns an error when Ctrl-C cannot be watched and no other signal is
/// available, so the caller shuts down instead of waiting forever.
pub async fn wait_for_signal() -> io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let terminate = match signal(SignalKind::terminate()) {
            Ok(mut stream) => Some(async move {
                stream.recv().await;
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                None
            }
        };
        first_signal(tokio::signal::ctrl_c(), terminate).await
    }

    #[cfg(not(unix))]
    {
        first_signal(tokio::signal::ctrl_c(), None::<std::future::Ready<()>>).await
    }
}

async fn first_signal<C, T>(ctrl_c: C, terminate: Option<T>) -> io::Result<&'static str>
where
    C: Future<Output = io::Result<()>>,
    T: Future<Output = ()>,
{
    let Some(terminate) = terminate else {
        ctrl_c.await?;
        return Ok("SIGINT");
    };
    tokio::pin!(terminate);

    tokio::select! {
        result = ctrl_c => match result {
            Ok(()) => Ok("SIGINT"),
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C, waiting for SIGTERM");
                terminate.as_mut().await;
                Ok("SIGTERM")
            }
        },
        () = terminate.as_mut() => Ok("SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use std::future::{pending, ready, Ready};

    use super::*;

    fn failed() -> Ready<io::Result<()>> {
        ready(Err(io::Error::other("no signal handler")))
    }

    #[tokio::test]
    async fn ctrl_c_failure_without_sigterm_returns_error() {
        let result = first_signal(failed(), None::<Ready<()>>).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn ctrl_c_failure_falls_back_to_sigterm() {
        assert_eq!(first_signal(failed(), Some(ready(()))).await.unwrap(), "SIGTERM");
    }

    #[tokio::test]
    async fn ctrl_c_reports_sigint() {
        let result = first_signal(ready(Ok(())), Some(pending::<()>())).await;
        assert_eq!(result.unwrap(), "SIGINT");
    }
}
