//! Response bodies.
//!
//! Requests for `/` are answered with [`DEFAULT_PAYLOAD`]. Every other path
//! is resolved by a [`ContentSource`], normally a directory on disk.

use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

/// Body served for the root path.
pub const DEFAULT_PAYLOAD: &[u8] = b"<!DOCTYPE html>\n<html>\n<head><title>hq-server</title></head>\n<body><p>hq-server is running.</p></body>\n</html>\n";

/// Status preamble written before the body of a versioned request.
pub const HTTP11_PREAMBLE: &[u8] = b"HTTP/1.1 200 OK\r\n\r\n";

/// A readable response body.
pub type Body = Box<dyn Read + Send>;

/// Opens response bodies by request path.
pub trait ContentSource: Send + Sync {
    /// Open `path` for reading. `path` has no leading `/` and no `..`.
    fn open(&self, path: &str) -> io::Result<Body>;
}

/// Serves files below a root directory.
#[derive(Debug, Clone)]
pub struct FsContent {
    root: PathBuf,
}

impl FsContent {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ContentSource for FsContent {
    fn open(&self, path: &str) -> io::Result<Body> {
        let file = File::open(self.root.join(path))?;
        if file.metadata()?.is_dir() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "is a directory"));
        }
        Ok(Box::new(file))
    }
}

/// Source used when no content root is configured; every path is missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContent;

impl ContentSource for NoContent {
    fn open(&self, _path: &str) -> io::Result<Body> {
        Err(io::Error::new(io::ErrorKind::NotFound, "no content root configured"))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::io::{self, Cursor, Read};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::{Body, ContentSource};

    /// In-memory content keyed by path.
    #[derive(Default)]
    pub struct MemoryContent {
        files: HashMap<String, Vec<u8>>,
        failing: HashMap<String, usize>,
        opens: AtomicUsize,
    }

    impl MemoryContent {
        pub fn with_file(mut self, path: &str, data: impl Into<Vec<u8>>) -> Self {
            self.files.insert(path.to_string(), data.into());
            self
        }

        /// A file whose reads fail after `ok_bytes` bytes.
        pub fn with_failing_file(mut self, path: &str, ok_bytes: usize) -> Self {
            self.failing.insert(path.to_string(), ok_bytes);
            self
        }

        /// Number of `open` calls so far.
        pub fn opens(&self) -> usize {
            self.opens.load(Ordering::SeqCst)
        }
    }

    impl ContentSource for MemoryContent {
        fn open(&self, path: &str) -> io::Result<Body> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            if let Some(&ok_bytes) = self.failing.get(path) {
                return Ok(Box::new(FailingReader { remaining: ok_bytes }));
            }
            self.files
                .get(path)
                .map(|data| Box::new(Cursor::new(data.clone())) as Body)
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
        }
    }

    struct FailingReader {
        remaining: usize,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.remaining == 0 {
                return Err(io::Error::other("disk error"));
            }
            let n = buf.len().min(self.remaining);
            buf[..n].fill(b'x');
            self.remaining -= n;
            Ok(n)
        }
    }
}
