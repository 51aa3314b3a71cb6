//! An accepted connection and its burst I/O.

use std::io::{self, ErrorKind, Read, Write};
use std::sync::Mutex;

use mio::net::UnixStream;
use mio::{Interest, Registry, Token};

/// One accepted stream. A connection belongs to exactly one worker's
/// readiness set from attachment until it is dropped, and the stream is
/// non-blocking for its whole life: reads and writes run in bursts that
/// drain or fill until the socket pushes back.
#[derive(Debug)]
pub(crate) struct Connection {
    stream: Mutex<UnixStream>,
}

impl Connection {
    pub(crate) fn new(stream: UnixStream) -> Self {
        Connection {
            stream: Mutex::new(stream),
        }
    }

    pub(crate) fn register(&self, registry: &Registry, token: Token) -> io::Result<()> {
        let mut stream = self.stream.lock().map_err(|_| poisoned())?;
        registry.register(&mut *stream, token, Interest::READABLE)
    }

    pub(crate) fn deregister(&self, registry: &Registry) -> io::Result<()> {
        let mut stream = self.stream.lock().map_err(|_| poisoned())?;
        registry.deregister(&mut *stream)
    }

    /// Read one burst into `buf`: keep reading until the socket would block,
    /// the peer stops, or all but the last byte of `buf` is filled. A
    /// document that fills the buffer is truncated.
    ///
    /// `Ok(0)` means the wakeup produced no bytes and the connection is still
    /// live. A peer that closed before sending anything surfaces as
    /// [`ErrorKind::UnexpectedEof`] so the caller can retire the slot.
    pub(crate) fn read_burst(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut stream = self.stream.lock().map_err(|_| poisoned())?;
        let mut total = 0;
        let limit = buf.len() - 1;
        while total < limit {
            match stream.read(&mut buf[total..limit]) {
                Ok(0) => {
                    if total == 0 {
                        return Err(ErrorKind::UnexpectedEof.into());
                    }
                    break;
                }
                Ok(n) => total += n,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(total)
    }

    /// Write the whole of `bytes` as one burst, riding out `WouldBlock` and
    /// `Interrupted` until the peer has taken everything.
    pub(crate) fn write_burst(&self, bytes: &[u8]) -> io::Result<()> {
        let mut stream = self.stream.lock().map_err(|_| poisoned())?;
        let mut written = 0;
        while written < bytes.len() {
            match stream.write(&bytes[written..]) {
                Ok(0) => return Err(ErrorKind::WriteZero.into()),
                Ok(n) => written += n,
                Err(e) if e.kind() == ErrorKind::WouldBlock => continue,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

fn poisoned() -> io::Error {
    io::Error::new(ErrorKind::Other, "connection mutex poisoned")
}
