//! quinn adapter for the protocol core.
//!
//! # Responsibilities
//! - Implement the transport traits on quinn connections and streams
//! - Turn quinn results into `ConnectionEvent` / `StreamEvent`
//! - Keep at most one send in flight per stream
//!
//! # Data Flow
//! ```text
//! serve_connection (one task per connection):
//!     Incoming → handshake → Connected
//!     accept_bi / accept_uni → PeerStreamStarted → spawn drive_stream
//!     accept fails → ShutdownComplete
//!
//! drive_stream (one task per stream):
//!     Request ──StreamCommand──► task ──write / finish / reset──► quinn
//!     quinn ──read_chunk / write result──► task ──StreamEvent──► Request
//! ```
//!
//! # Design Decisions
//! - Requests never block: `send` and `shutdown` only queue a command
//! - Commands are applied before the next quinn operation is awaited, so
//!   events reach the request in the order they happen
//! - Response bodies are read synchronously; on the multi-threaded runtime
//!   those handlers run under `block_in_place`

use std::sync::Arc;

use bytes::{Buf, Bytes};
use quinn::{ReadError, RecvStream, SendStream, VarInt, WriteError};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc;

use crate::protocol::{
    Connection, ConnectionEvent, ConnectionTracker, ContentSource, ConnectionTransport,
    Direction, Dispatch, Flow, Request, SendFlags, ShutdownMode, StreamEvent, StreamTransport,
    TransportError, IO_SIZE,
};

/// Operation requested by a [`Request`] on its stream.
#[derive(Debug)]
enum StreamCommand {
    Send { data: Bytes, fin: bool },
    Shutdown(ShutdownMode),
}

/// [`ConnectionTransport`] over a quinn connection.
struct QuinnConnection {
    inner: quinn::Connection,
}

impl ConnectionTransport for QuinnConnection {
    fn send_resumption_ticket(&self) -> Result<(), TransportError> {
        if self.inner.close_reason().is_some() {
            return Err(TransportError::ConnectionClosed);
        }
        // rustls emits the ticket itself once the handshake completes.
        tracing::trace!(peer = %self.inner.remote_address(), "Resumption ticket scheduled");
        Ok(())
    }

    fn close(&self) {
        self.inner.close(VarInt::from_u32(0), b"");
    }
}

/// [`StreamTransport`] that forwards to the stream's driving task.
struct QuinnStream {
    id: u64,
    commands: mpsc::UnboundedSender<StreamCommand>,
}

impl StreamTransport for QuinnStream {
    fn id(&self) -> u64 {
        self.id
    }

    fn send(&mut self, data: &[u8], flags: SendFlags) -> Result<(), TransportError> {
        self.commands
            .send(StreamCommand::Send {
                data: Bytes::copy_from_slice(data),
                fin: flags.contains(SendFlags::FIN),
            })
            .map_err(|_| TransportError::StreamClosed)
    }

    fn shutdown(&mut self, mode: ShutdownMode) -> Result<(), TransportError> {
        self.commands
            .send(StreamCommand::Shutdown(mode))
            .map_err(|_| TransportError::StreamClosed)
    }
}

/// Accept one incoming connection and serve its streams until it closes.
pub(crate) async fn serve_connection(
    incoming: quinn::Incoming,
    content: Arc<dyn ContentSource>,
    tracker: ConnectionTracker,
) {
    let peer = incoming.remote_address();
    let connecting = match incoming.accept() {
        Ok(connecting) => connecting,
        Err(e) => {
            tracing::debug!(%peer, error = %e, "Incoming connection refused");
            return;
        }
    };
    let quic = match connecting.await {
        Ok(quic) => quic,
        Err(e) => {
            tracing::debug!(%peer, error = %e, "Handshake failed");
            return;
        }
    };

    let connection = Connection::accept(
        Box::new(QuinnConnection {
            inner: quic.clone(),
        }),
        content,
        Some(tracker.track()),
    );
    tracing::info!(connection_id = %connection.id(), %peer, "Connection established");

    let Some(mut connection) = dispatch(connection.handle_event(ConnectionEvent::Connected))
    else {
        return;
    };

    loop {
        let (send, recv, direction) = tokio::select! {
            bi = quic.accept_bi() => match bi {
                Ok((send, recv)) => (Some(send), recv, Direction::Bidirectional),
                Err(e) => {
                    tracing::debug!(connection_id = %connection.id(), reason = %e, "Connection closed");
                    break;
                }
            },
            uni = quic.accept_uni() => match uni {
                Ok(recv) => (None, recv, Direction::Unidirectional),
                Err(e) => {
                    tracing::debug!(connection_id = %connection.id(), reason = %e, "Connection closed");
                    break;
                }
            },
        };

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let stream = QuinnStream {
            id: VarInt::from(recv.id()).into_inner(),
            commands: commands_tx,
        };
        let event = ConnectionEvent::PeerStreamStarted {
            stream: Box::new(stream),
            direction,
        };
        match connection.handle_event(event) {
            Dispatch::Stream(next, request) => {
                tokio::spawn(drive_stream(request, send, recv, commands_rx));
                connection = next;
            }
            Dispatch::Open(next) => connection = next,
            Dispatch::Released => return,
        }
    }

    quic.closed().await;
    connection.handle_event(ConnectionEvent::ShutdownComplete);
}

/// Keep the transport's reference unless the event released it.
fn dispatch(dispatch: Dispatch) -> Option<Connection> {
    match dispatch {
        Dispatch::Open(connection) => Some(connection),
        Dispatch::Stream(connection, request) => {
            tracing::warn!(stream_id = request.stream_id(), "Unexpected stream dispatch");
            Some(connection)
        }
        Dispatch::Released => None,
    }
}

/// A send accepted from the request but not fully written yet.
struct Outgoing {
    data: Bytes,
    fin: bool,
}

/// Drive one stream until its request sees `ShutdownComplete`.
async fn drive_stream(
    mut request: Request,
    mut send: Option<SendStream>,
    mut recv: RecvStream,
    mut commands: mpsc::UnboundedReceiver<StreamCommand>,
) {
    let mut outgoing: Option<Outgoing> = None;
    let mut recv_open = true;

    loop {
        let mut closing = None;
        while let Ok(command) = commands.try_recv() {
            match command {
                StreamCommand::Send { data, fin } => outgoing = Some(Outgoing { data, fin }),
                StreamCommand::Shutdown(mode) => {
                    apply_shutdown(mode, send.as_mut(), &mut recv);
                    closing = Some(mode);
                }
            }
        }

        if let Some(mode) = closing {
            if mode == ShutdownMode::Graceful {
                if let Some(send) = send.as_mut() {
                    // Resolves once the peer has acknowledged everything.
                    let _ = send.stopped().await;
                }
            }
            finish(&mut request);
            return;
        }

        let pending = outgoing.as_ref().map(|o| o.data.clone());
        let can_write = pending.is_some() && send.is_some();

        tokio::select! {
            written = write_some(send.as_mut(), pending), if can_write => match written {
                Ok(n) => {
                    let complete = outgoing.as_mut().and_then(|o| {
                        o.data.advance(n);
                        o.data.is_empty().then_some(o.fin)
                    });
                    if let Some(fin) = complete {
                        outgoing = None;
                        if fin {
                            if let Some(send) = send.as_mut() {
                                let _ = send.finish();
                            }
                        }
                        deliver_blocking(&mut request, StreamEvent::SendComplete { canceled: false });
                    }
                }
                Err(e) => {
                    tracing::debug!(stream_id = request.stream_id(), error = %e, "Stream write failed");
                    request.handle_event(StreamEvent::SendComplete { canceled: true });
                    finish(&mut request);
                    return;
                }
            },
            chunk = recv.read_chunk(IO_SIZE, true), if recv_open => match chunk {
                Ok(Some(chunk)) => {
                    deliver_blocking(
                        &mut request,
                        StreamEvent::Receive {
                            buffers: vec![chunk.bytes],
                        },
                    );
                }
                Ok(None) => {
                    recv_open = false;
                    deliver_blocking(&mut request, StreamEvent::PeerSendShutdown);
                }
                Err(ReadError::Reset(code)) => {
                    recv_open = false;
                    request.handle_event(StreamEvent::PeerSendAborted {
                        error_code: code.into_inner(),
                    });
                }
                Err(ReadError::ConnectionLost(e)) => {
                    tracing::debug!(stream_id = request.stream_id(), reason = %e, "Connection lost");
                    finish(&mut request);
                    return;
                }
                Err(e) => {
                    recv_open = false;
                    tracing::debug!(stream_id = request.stream_id(), error = %e, "Stream read failed");
                    request.handle_event(StreamEvent::PeerSendAborted { error_code: 0 });
                }
            },
            else => {
                finish(&mut request);
                return;
            }
        }
    }
}

async fn write_some(send: Option<&mut SendStream>, data: Option<Bytes>) -> Result<usize, WriteError> {
    match (send, data) {
        (Some(send), Some(data)) => send.write(&data).await,
        _ => std::future::pending().await,
    }
}

fn apply_shutdown(mode: ShutdownMode, send: Option<&mut SendStream>, recv: &mut RecvStream) {
    match mode {
        ShutdownMode::Graceful => {
            if let Some(send) = send {
                let _ = send.finish();
            }
        }
        ShutdownMode::Abort(code) => {
            let code = VarInt::from_u32(code.to_code() as u32);
            if let Some(send) = send {
                let _ = send.reset(code);
            }
            let _ = recv.stop(code);
        }
    }
}

fn finish(request: &mut Request) {
    let flow = request.handle_event(StreamEvent::ShutdownComplete);
    debug_assert_eq!(flow, Flow::Closed);
}

/// Deliver an event whose handler may open or read the response body.
fn deliver_blocking(request: &mut Request, event: StreamEvent) -> Flow {
    offload(|| request.handle_event(event))
}

/// Run blocking work without stalling the other tasks on this worker.
///
/// `block_in_place` is only available on the multi-threaded runtime; elsewhere
/// the work runs inline.
fn offload<T>(work: impl FnOnce() -> T) -> T {
    match Handle::try_current().map(|handle| handle.runtime_flavor()) {
        Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(work),
        _ => work(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn offloaded_work_does_not_stall_the_worker() {
        let ran = Arc::new(AtomicBool::new(false));

        let blocked = tokio::spawn({
            let ran = Arc::clone(&ran);
            async move {
                offload(|| {
                    let deadline = Instant::now() + Duration::from_secs(5);
                    while !ran.load(Ordering::SeqCst) && Instant::now() < deadline {
                        std::thread::sleep(Duration::from_millis(10));
                    }
                    ran.load(Ordering::SeqCst)
                })
            }
        });
        let other = tokio::spawn({
            let ran = Arc::clone(&ran);
            async move { ran.store(true, Ordering::SeqCst) }
        });

        assert!(blocked.await.unwrap());
        other.await.unwrap();
    }

    #[tokio::test]
    async fn offload_runs_inline_on_current_thread_runtime() {
        assert_eq!(offload(|| 7), 7);
    }

    #[test]
    fn offload_runs_inline_outside_a_runtime() {
        assert_eq!(offload(|| "inline"), "inline");
    }
}
