//! Incremental request-line parser.
//!
//! Accepted syntax is a single `GET <path>` line. A version token after the
//! path (`GET /index.html HTTP/1.1`) switches to a request head that ends at
//! the first empty line; header lines are skipped, never interpreted.
//!
//! The parser is stateless: it is re-run over the accumulated bytes each
//! time more arrive, so callers only keep the byte buffer.

use crate::protocol::error::RequestErrorCode;

const METHOD: &[u8] = b"GET ";

/// A parsed request head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    /// Requested path, exactly as sent.
    pub path: String,
    /// A version token followed the path; the response gets a status preamble.
    pub versioned: bool,
}

impl RequestHead {
    /// Empty path or `/`.
    pub fn is_root(&self) -> bool {
        self.path.is_empty() || self.path == "/"
    }
}

/// Outcome of a parse attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum Parse {
    /// More bytes are needed.
    Incomplete,
    /// The head is complete and occupies the first `consumed` bytes.
    Complete { head: RequestHead, consumed: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("method is not GET")]
    NotGet,

    #[error("path contains `..`")]
    FoundDots,
}

impl ParseError {
    /// Abort reason reported to the peer.
    pub fn code(self) -> RequestErrorCode {
        match self {
            ParseError::NotGet => RequestErrorCode::NotGet,
            ParseError::FoundDots => RequestErrorCode::FoundDots,
        }
    }
}

/// Parse the accumulated request bytes.
///
/// `at_end` is set once the peer has finished its send direction; the
/// remaining bytes are then taken as the complete request.
pub fn parse_request(input: &[u8], at_end: bool) -> Result<Parse, ParseError> {
    // Reject a wrong method as soon as enough bytes are in.
    let prefix = input.len().min(METHOD.len());
    if !input[..prefix].eq_ignore_ascii_case(&METHOD[..prefix]) {
        return Err(ParseError::NotGet);
    }
    if input.len() < METHOD.len() {
        return if at_end {
            Err(ParseError::NotGet)
        } else {
            Ok(Parse::Incomplete)
        };
    }

    let (line, mut consumed) = match next_line(input, 0) {
        Some((end, next)) => (&input[..end], next),
        None if at_end => (input, input.len()),
        None => return Ok(Parse::Incomplete),
    };

    let target = &line[METHOD.len()..];
    let (path, rest) = match target.iter().position(|&b| b == b' ') {
        Some(space) => (&target[..space], &target[space + 1..]),
        None => (target, &[][..]),
    };
    let path = std::str::from_utf8(path).map_err(|_| ParseError::NotGet)?;
    if path.contains("..") {
        return Err(ParseError::FoundDots);
    }
    let versioned = rest.iter().any(|b| !b.is_ascii_whitespace());

    if versioned {
        loop {
            match next_line(input, consumed) {
                Some((end, next)) => {
                    let blank = end == consumed;
                    consumed = next;
                    if blank {
                        break;
                    }
                }
                None if at_end => {
                    consumed = input.len();
                    break;
                }
                None => return Ok(Parse::Incomplete),
            }
        }
    }

    Ok(Parse::Complete {
        head: RequestHead {
            path: path.to_string(),
            versioned,
        },
        consumed,
    })
}

/// Locate the line starting at `start`.
///
/// Returns the end of the line content (before `\r\n` or `\n`) and the
/// offset of the following line.
fn next_line(input: &[u8], start: usize) -> Option<(usize, usize)> {
    let newline = start + input[start..].iter().position(|&b| b == b'\n')?;
    let end = if newline > start && input[newline - 1] == b'\r' {
        newline - 1
    } else {
        newline
    };
    Some((end, newline + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(input: &[u8], at_end: bool) -> (RequestHead, usize) {
        match parse_request(input, at_end) {
            Ok(Parse::Complete { head, consumed }) => (head, consumed),
            other => panic!("expected complete parse, got {other:?}"),
        }
    }

    #[test]
    fn simple_get() {
        let (head, consumed) = complete(b"GET /index.html\r\n", false);
        assert_eq!(head.path, "/index.html");
        assert!(!head.versioned);
        assert_eq!(consumed, 17);
    }

    #[test]
    fn bare_newline_terminates() {
        let (head, consumed) = complete(b"GET /a\n", false);
        assert_eq!(head.path, "/a");
        assert_eq!(consumed, 7);
    }

    #[test]
    fn root_paths() {
        assert!(complete(b"GET /\r\n", false).0.is_root());
        assert!(complete(b"GET \r\n", false).0.is_root());
        assert!(!complete(b"GET /x\r\n", false).0.is_root());
    }

    #[test]
    fn method_is_case_insensitive() {
        assert_eq!(complete(b"get /\r\n", false).0.path, "/");
    }

    #[test]
    fn wrong_method_rejected_early() {
        assert_eq!(parse_request(b"PO", false), Err(ParseError::NotGet));
        assert_eq!(parse_request(b"POST /\r\n", false), Err(ParseError::NotGet));
        assert_eq!(parse_request(b"GETX /", false), Err(ParseError::NotGet));
    }

    #[test]
    fn short_input_waits_until_end() {
        assert_eq!(parse_request(b"GE", false), Ok(Parse::Incomplete));
        assert_eq!(parse_request(b"GE", true), Err(ParseError::NotGet));
        assert_eq!(parse_request(b"", true), Err(ParseError::NotGet));
    }

    #[test]
    fn missing_terminator_waits() {
        assert_eq!(parse_request(b"GET /index", false), Ok(Parse::Incomplete));
    }

    #[test]
    fn end_of_stream_completes_line() {
        let (head, consumed) = complete(b"GET /index", true);
        assert_eq!(head.path, "/index");
        assert_eq!(consumed, 10);
    }

    #[test]
    fn dots_rejected() {
        assert_eq!(
            parse_request(b"GET /../etc/passwd\r\n", false),
            Err(ParseError::FoundDots)
        );
        assert_eq!(
            parse_request(b"GET /a/..\r\n", false),
            Err(ParseError::FoundDots)
        );
        assert_eq!(ParseError::FoundDots.code(), RequestErrorCode::FoundDots);
    }

    #[test]
    fn trailing_bytes_are_not_consumed() {
        let (_, consumed) = complete(b"GET /\r\nextra", false);
        assert_eq!(consumed, 7);
    }

    #[test]
    fn versioned_request_skips_headers() {
        let input = b"GET /a HTTP/1.1\r\nHost: x\r\n\r\n";
        let (head, consumed) = complete(input, false);
        assert!(head.versioned);
        assert_eq!(head.path, "/a");
        assert_eq!(consumed, input.len());
    }

    #[test]
    fn versioned_request_waits_for_blank_line() {
        assert_eq!(
            parse_request(b"GET /a HTTP/1.1\r\nHost: x\r\n", false),
            Ok(Parse::Incomplete)
        );
        let (head, _) = complete(b"GET /a HTTP/1.1\r\nHost: x\r\n", true);
        assert!(head.versioned);
    }

    #[test]
    fn invalid_utf8_path_is_not_get() {
        assert_eq!(
            parse_request(b"GET /\xff\r\n", false),
            Err(ParseError::NotGet)
        );
    }
}
