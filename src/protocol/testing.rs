//! Recording transport doubles for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::protocol::buffer::SendFlags;
use crate::protocol::error::TransportError;
use crate::protocol::transport::{ConnectionTransport, ShutdownMode, StreamTransport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamCall {
    Send { data: Vec<u8>, flags: SendFlags },
    Shutdown(ShutdownMode),
}

/// Shared view of everything a [`MockStream`] was asked to do.
#[derive(Debug, Clone, Default)]
pub struct StreamLog {
    calls: Arc<Mutex<Vec<StreamCall>>>,
}

impl StreamLog {
    pub fn calls(&self) -> Vec<StreamCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sends(&self) -> Vec<(Vec<u8>, SendFlags)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StreamCall::Send { data, flags } => Some((data, flags)),
                StreamCall::Shutdown(_) => None,
            })
            .collect()
    }

    pub fn shutdowns(&self) -> Vec<ShutdownMode> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StreamCall::Shutdown(mode) => Some(mode),
                StreamCall::Send { .. } => None,
            })
            .collect()
    }

    /// All sent bytes, concatenated.
    pub fn body(&self) -> Vec<u8> {
        self.sends().into_iter().flat_map(|(data, _)| data).collect()
    }
}

pub struct MockStream {
    id: u64,
    log: StreamLog,
    fail_sends: bool,
}

impl MockStream {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            log: StreamLog::default(),
            fail_sends: false,
        }
    }

    /// A stream whose send submissions are rejected.
    pub fn failing_sends(id: u64) -> Self {
        Self {
            fail_sends: true,
            ..Self::new(id)
        }
    }

    pub fn log(&self) -> StreamLog {
        self.log.clone()
    }
}

impl StreamTransport for MockStream {
    fn id(&self) -> u64 {
        self.id
    }

    fn send(&mut self, data: &[u8], flags: SendFlags) -> Result<(), TransportError> {
        if self.fail_sends {
            return Err(TransportError::SendRejected("mock".into()));
        }
        self.log.calls.lock().unwrap().push(StreamCall::Send {
            data: data.to_vec(),
            flags,
        });
        Ok(())
    }

    fn shutdown(&mut self, mode: ShutdownMode) -> Result<(), TransportError> {
        self.log.calls.lock().unwrap().push(StreamCall::Shutdown(mode));
        Ok(())
    }
}

#[derive(Default)]
struct ConnectionState {
    tickets: AtomicUsize,
    closes: AtomicUsize,
    fail_tickets: AtomicBool,
}

#[derive(Clone, Default)]
pub struct MockConnection {
    state: Arc<ConnectionState>,
}

impl MockConnection {
    pub fn failing_tickets() -> Self {
        let mock = Self::default();
        mock.state.fail_tickets.store(true, Ordering::SeqCst);
        mock
    }

    pub fn tickets(&self) -> usize {
        self.state.tickets.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closes() > 0
    }
}

impl ConnectionTransport for MockConnection {
    fn send_resumption_ticket(&self) -> Result<(), TransportError> {
        if self.state.fail_tickets.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed);
        }
        self.state.tickets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
    }
}
