//! Error types for the stream protocol.
//!
//! # Tiers
//! - `RequestErrorCode`: wire-visible reason attached to a stream abort
//! - `TransportError`: a transport primitive refused an operation
//!
//! Neither tier ever escapes the stream it was raised on.

use std::fmt;

/// Abort reason delivered to the peer when a request stream is torn down.
///
/// The discriminants are the application error codes carried on the wire.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestErrorCode {
    NoError = 0,
    NotGet = 1,
    FoundDots = 2,
    GetTooBig = 3,
    SendFailed = 4,
    RecvNoRoom = 5,
    PeerAbort = 6,
    ExtraRecv = 7,
}

impl RequestErrorCode {
    /// Wire value of the code.
    pub const fn to_code(self) -> u64 {
        self as u64
    }

    /// Stable label used in logs and metrics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoError => "no_error",
            Self::NotGet => "not_get",
            Self::FoundDots => "found_dots",
            Self::GetTooBig => "get_too_big",
            Self::SendFailed => "send_failed",
            Self::RecvNoRoom => "recv_no_room",
            Self::PeerAbort => "peer_abort",
            Self::ExtraRecv => "extra_recv",
        }
    }
}

impl fmt::Display for RequestErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by transport primitives.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("stream closed")]
    StreamClosed,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("send rejected: {0}")]
    SendRejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_are_stable() {
        assert_eq!(RequestErrorCode::NoError.to_code(), 0);
        assert_eq!(RequestErrorCode::FoundDots.to_code(), 2);
        assert_eq!(RequestErrorCode::ExtraRecv.to_code(), 7);
        assert_eq!(RequestErrorCode::RecvNoRoom.to_code(), 5);
    }

    #[test]
    fn labels_match_display() {
        assert_eq!(RequestErrorCode::GetTooBig.to_string(), "get_too_big");
    }
}
