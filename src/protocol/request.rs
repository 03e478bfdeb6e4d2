//! Per-stream request state machine.
//!
//! # States
//! ```text
//! bidirectional:   Receiving ──▶ Sending ──▶ ShuttingDown
//!                      └──────────────────────▲   (abort)
//! unidirectional:  ReceivingUnidirectional ──▶ ShuttingDown
//! ```
//!
//! `ShuttingDown` is entered exactly once, either by a graceful finish or by
//! [`Request::abort`]. Every event after that is ignored until the transport
//! reports `ShutdownComplete`, at which point the owner drops the request.
//!
//! # Sending
//! One chunk of at most [`IO_SIZE`](crate::protocol::IO_SIZE) bytes is in
//! flight at a time. The next chunk is read into the same buffer only after
//! the previous chunk's `SendComplete`.

use std::io::Cursor;

use bytes::Bytes;

use crate::observability::metrics;
use crate::protocol::buffer::{Fill, SendBuffer, SendFlags};
use crate::protocol::connection::Connection;
use crate::protocol::content::{Body, DEFAULT_PAYLOAD, HTTP11_PREAMBLE};
use crate::protocol::error::RequestErrorCode;
use crate::protocol::event::{Direction, Flow, StreamEvent};
use crate::protocol::parse::{parse_request, Parse, RequestHead};
use crate::protocol::transport::{ShutdownMode, StreamTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Accumulating the request head.
    Receiving,
    /// Draining an unidirectional stream.
    ReceivingUnidirectional,
    /// Streaming the response.
    Sending,
    /// Terminal.
    ShuttingDown,
}

/// One request, bound to one transport stream.
pub struct Request {
    connection: Connection,
    stream: Box<dyn StreamTransport>,
    direction: Direction,
    state: RequestState,
    buffer: SendBuffer,
    body: Option<Body>,
    /// A status preamble is owed to a versioned request and not yet written.
    preamble_pending: bool,
    bytes_received: usize,
    bytes_sent: u64,
}

impl Request {
    pub(crate) fn new(
        connection: Connection,
        stream: Box<dyn StreamTransport>,
        direction: Direction,
    ) -> Self {
        let state = match direction {
            Direction::Bidirectional => RequestState::Receiving,
            Direction::Unidirectional => RequestState::ReceivingUnidirectional,
        };
        tracing::trace!(
            connection_id = %connection.id(),
            stream_id = stream.id(),
            ?direction,
            "Stream started"
        );
        Self {
            connection,
            stream,
            direction,
            state,
            buffer: SendBuffer::new(),
            body: None,
            preamble_pending: false,
            bytes_received: 0,
            bytes_sent: 0,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn stream_id(&self) -> u64 {
        self.stream.id()
    }

    /// Handle one transport event for this stream.
    pub fn handle_event(&mut self, event: StreamEvent) -> Flow {
        match event {
            StreamEvent::ShutdownComplete => {
                tracing::debug!(
                    connection_id = %self.connection.id(),
                    stream_id = self.stream.id(),
                    bytes_sent = self.bytes_sent,
                    "Stream shutdown complete"
                );
                self.body = None;
                return Flow::Closed;
            }
            event if self.state == RequestState::ShuttingDown => {
                tracing::trace!(stream_id = self.stream.id(), ?event, "Ignoring event after shutdown");
            }
            StreamEvent::Receive { buffers } => match self.state {
                RequestState::Receiving => self.receive_request(&buffers),
                RequestState::ReceivingUnidirectional => self.receive_unidirectional(&buffers),
                RequestState::Sending | RequestState::ShuttingDown => {
                    if buffers.iter().any(|b| !b.is_empty()) {
                        self.abort(RequestErrorCode::ExtraRecv);
                    }
                }
            },
            StreamEvent::SendComplete { canceled } => self.on_send_complete(canceled),
            StreamEvent::PeerSendShutdown => self.on_peer_send_shutdown(),
            StreamEvent::PeerSendAborted { error_code } => {
                tracing::debug!(
                    stream_id = self.stream.id(),
                    peer_error_code = error_code,
                    "Peer aborted send"
                );
                self.abort(RequestErrorCode::PeerAbort);
            }
        }
        Flow::Continue
    }

    /// Mark the request terminal and ask the transport to abort the stream.
    ///
    /// Calling this again after the first call has no effect.
    pub fn abort(&mut self, code: RequestErrorCode) {
        if self.state == RequestState::ShuttingDown {
            return;
        }
        self.state = RequestState::ShuttingDown;
        self.body = None;
        metrics::stream_aborted(code);
        tracing::debug!(
            connection_id = %self.connection.id(),
            stream_id = self.stream.id(),
            error_code = %code,
            "Aborting stream"
        );
        self.shutdown_stream(ShutdownMode::Abort(code));
    }

    fn receive_request(&mut self, buffers: &[Bytes]) {
        let mut chunks = buffers.iter().filter(|b| !b.is_empty());

        while let Some(chunk) = chunks.next() {
            if !self.buffer.has_room(chunk.len()) {
                // A bad method or path in the part that fits still wins.
                self.buffer.write_truncated(chunk);
                let code = match parse_request(self.buffer.as_bytes(), false) {
                    Err(e) => e.code(),
                    Ok(_) => RequestErrorCode::GetTooBig,
                };
                self.abort(code);
                return;
            }
            self.buffer.write(chunk);

            match parse_request(self.buffer.as_bytes(), false) {
                Err(e) => {
                    self.abort(e.code());
                    return;
                }
                Ok(Parse::Incomplete) => {}
                Ok(Parse::Complete { head, consumed }) => {
                    // Exactly one request per stream.
                    if consumed < self.buffer.len() || chunks.next().is_some() {
                        self.abort(RequestErrorCode::ExtraRecv);
                    } else {
                        self.start_response(head);
                    }
                    return;
                }
            }
        }
    }

    fn receive_unidirectional(&mut self, buffers: &[Bytes]) {
        for chunk in buffers {
            if !self.buffer.has_room(chunk.len()) {
                self.abort(RequestErrorCode::RecvNoRoom);
                return;
            }
            self.buffer.write(chunk);
            self.bytes_received += chunk.len();
        }
    }

    fn on_peer_send_shutdown(&mut self) {
        match self.state {
            RequestState::Receiving => match parse_request(self.buffer.as_bytes(), true) {
                Ok(Parse::Complete { head, .. }) => self.start_response(head),
                Ok(Parse::Incomplete) => self.abort(RequestErrorCode::NotGet),
                Err(e) => self.abort(e.code()),
            },
            RequestState::ReceivingUnidirectional => {
                tracing::debug!(
                    stream_id = self.stream.id(),
                    bytes_received = self.bytes_received,
                    "Unidirectional stream finished"
                );
                self.state = RequestState::ShuttingDown;
                self.shutdown_stream(ShutdownMode::Graceful);
            }
            RequestState::Sending | RequestState::ShuttingDown => {}
        }
    }

    fn start_response(&mut self, head: RequestHead) {
        metrics::request_received();

        let body: Body = if head.is_root() {
            Box::new(Cursor::new(DEFAULT_PAYLOAD))
        } else {
            match self.connection.content().open(head.path.trim_start_matches('/')) {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(
                        connection_id = %self.connection.id(),
                        stream_id = self.stream.id(),
                        path = %head.path,
                        error = %e,
                        "Resource not found"
                    );
                    self.abort(RequestErrorCode::NoError);
                    return;
                }
            }
        };

        tracing::info!(
            connection_id = %self.connection.id(),
            stream_id = self.stream.id(),
            path = %head.path,
            "GET"
        );

        self.body = Some(body);
        self.preamble_pending = head.versioned;
        self.buffer.reset();
        self.state = RequestState::Sending;
        self.send_data();
    }

    /// Fill the buffer with the next chunk and submit it.
    fn send_data(&mut self) {
        if self.preamble_pending {
            self.buffer.write(HTTP11_PREAMBLE);
            self.preamble_pending = false;
        }

        let Some(body) = self.body.as_mut() else {
            return;
        };
        match self.buffer.fill_from(body.as_mut()) {
            Ok(Fill::Full) => {}
            Ok(Fill::Eof) => {
                self.buffer.set_flags(SendFlags::FIN);
                self.body = None;
            }
            Err(e) => {
                tracing::warn!(
                    stream_id = self.stream.id(),
                    error = %e,
                    "Failed to read response body"
                );
                self.abort(RequestErrorCode::SendFailed);
                return;
            }
        }

        if let Err(e) = self.stream.send(self.buffer.as_bytes(), self.buffer.flags()) {
            tracing::warn!(stream_id = self.stream.id(), error = %e, "Send failed");
            self.abort(RequestErrorCode::SendFailed);
            return;
        }
        self.bytes_sent += self.buffer.len() as u64;
        metrics::response_bytes(self.buffer.len());
    }

    fn on_send_complete(&mut self, canceled: bool) {
        if self.state != RequestState::Sending {
            return;
        }
        if canceled {
            tracing::debug!(stream_id = self.stream.id(), "Send canceled");
            return;
        }

        let finished = self.buffer.flags().contains(SendFlags::FIN);
        self.buffer.reset();
        if finished {
            tracing::debug!(
                stream_id = self.stream.id(),
                bytes_sent = self.bytes_sent,
                "Response complete"
            );
            self.state = RequestState::ShuttingDown;
            self.shutdown_stream(ShutdownMode::Graceful);
        } else {
            self.send_data();
        }
    }

    fn shutdown_stream(&mut self, mode: ShutdownMode) {
        if let Err(e) = self.stream.shutdown(mode) {
            tracing::debug!(stream_id = self.stream.id(), ?mode, error = %e, "Stream shutdown rejected");
        }
    }
}

impl Drop for Request {
    fn drop(&mut self) {
        tracing::trace!(
            connection_id = %self.connection.id(),
            stream_id = self.stream.id(),
            "Request destroyed"
        );
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("connection_id", &self.connection.id())
            .field("stream_id", &self.stream.id())
            .field("direction", &self.direction)
            .field("state", &self.state)
            .field("buffer", &self.buffer)
            .finish()
    }
}
