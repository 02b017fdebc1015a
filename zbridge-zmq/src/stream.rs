//! Byte-stream endpoint over a raw descriptor.
//!
//! Anything that owns a file descriptor (a serial device, a regular file, an
//! accepted TCP connection, a socketpair end) is wrapped as a [`File`] and
//! driven with plain blocking `read`/`write`. Readiness is reported to the
//! poller through the raw descriptor.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::path::Path;

use bytes::{Bytes, BytesMut};
use tracing::trace;
use zbridge_core::error::{BridgeError, Result};

pub struct ByteStream {
    file: File,
    buffer: BytesMut,
}

impl ByteStream {
    /// Take ownership of any descriptor-backed stream.
    pub fn from_fd(fd: impl Into<OwnedFd>) -> Self {
        Self {
            file: File::from(fd.into()),
            buffer: BytesMut::new(),
        }
    }

    /// Open a file or device for reading and writing.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self::from_fd(file))
    }

    /// Duplicate the descriptor; both handles refer to the same stream.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self::from_fd(self.file.try_clone()?))
    }

    /// Read whatever is available, up to `max_len` bytes.
    ///
    /// A zero-length read is reported as [`BridgeError::EndOfStream`].
    pub fn read_chunk(&mut self, max_len: usize) -> Result<Bytes> {
        self.buffer.resize(max_len.max(1), 0);
        let n = loop {
            match self.file.read(&mut self.buffer) {
                Ok(0) => return Err(BridgeError::EndOfStream),
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        trace!(fd = self.as_raw_fd(), len = n, "[STREAM] read");
        Ok(self.buffer.split_to(n).freeze())
    }

    /// Write all of `data`, retrying short writes.
    pub fn write_chunk(&mut self, data: &[u8]) -> Result<usize> {
        self.file.write_all(data)?;
        trace!(fd = self.as_raw_fd(), len = data.len(), "[STREAM] write");
        Ok(data.len())
    }
}

impl AsFd for ByteStream {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl AsRawFd for ByteStream {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl std::fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteStream")
            .field("fd", &self.as_raw_fd())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixStream;

    #[test]
    fn test_read_returns_available_bytes() {
        let (local, mut remote) = UnixStream::pair().unwrap();
        let mut stream = ByteStream::from_fd(local);

        remote.write_all(b"hello").unwrap();
        assert_eq!(stream.read_chunk(1024).unwrap(), Bytes::from_static(b"hello"));
    }

    #[test]
    fn test_read_respects_max_len() {
        let (local, mut remote) = UnixStream::pair().unwrap();
        let mut stream = ByteStream::from_fd(local);

        remote.write_all(b"abcdef").unwrap();
        assert_eq!(stream.read_chunk(4).unwrap(), Bytes::from_static(b"abcd"));
        assert_eq!(stream.read_chunk(4).unwrap(), Bytes::from_static(b"ef"));
    }

    #[test]
    fn test_end_of_stream() {
        let (local, remote) = UnixStream::pair().unwrap();
        let mut stream = ByteStream::from_fd(local);
        drop(remote);

        assert!(stream.read_chunk(16).unwrap_err().is_end_of_stream());
    }

    #[test]
    fn test_clone_shares_stream() {
        let (local, mut remote) = UnixStream::pair().unwrap();
        let stream = ByteStream::from_fd(local);
        let mut writer = stream.try_clone().unwrap();
        assert_ne!(writer.as_raw_fd(), stream.as_raw_fd());

        writer.write_chunk(b"from clone").unwrap();
        let mut buf = [0u8; 10];
        remote.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"from clone");
    }

    #[test]
    fn test_open_missing_path() {
        assert!(ByteStream::open("/nonexistent/zbridge/device").is_err());
    }
}
