//! Client side: one shared connection, calls serialized across it.

use std::io::{self, ErrorKind, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::wire::{Request, BUFFER_SIZE};
use crate::{Error, Result};

/// A client handle for one connection to a server.
///
/// Cloning is cheap and shares the underlying stream. Calls from any number
/// of threads serialize on an internal mutex held across exactly one write
/// burst and one read burst, which is what keeps responses paired with their
/// requests on a connection that has no framing.
#[derive(Clone, Debug)]
pub struct Client {
    stream: Arc<Mutex<UnixStream>>,
}

impl Client {
    /// Connect to the server listening at `path`.
    pub fn connect(path: impl AsRef<Path>) -> Result<Client> {
        let stream = UnixStream::connect(path)?;
        Ok(Client {
            stream: Arc::new(Mutex::new(stream)),
        })
    }

    /// Bound every subsequent call's wait for a response. The default is
    /// `None`: a server that never answers (unknown method, oversized or
    /// malformed request) then hangs the caller indefinitely, so callers
    /// that care should set a bound. A timed-out call surfaces as
    /// [`Error::Io`].
    pub fn set_call_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        let stream = self.lock()?;
        stream.set_read_timeout(timeout)?;
        Ok(())
    }

    /// Call `method` with `params` and wait for the response document.
    ///
    /// The request is serialized before the connection lock is taken; the
    /// lock then covers one write burst and one read burst.
    pub fn call(&self, method: &str, params: Value) -> Result<Value> {
        let bytes = Request::new(method, params).to_bytes()?;

        let mut buf = [0u8; BUFFER_SIZE];
        let n = {
            let mut stream = self.lock()?;
            stream.write_all(&bytes)?;
            stream.read(&mut buf)?
        };
        if n == 0 {
            return Err(Error::ConnectionClosed);
        }
        Ok(serde_json::from_slice(&buf[..n])?)
    }

    /// Issue `method` on a detached thread and hand the outcome to
    /// `callback` once the exchange completes. Concurrent async calls
    /// serialize on the shared connection exactly as sync calls do.
    pub fn call_async<F>(&self, method: &str, params: Value, callback: F)
    where
        F: FnOnce(Result<Value>) + Send + 'static,
    {
        let client = self.clone();
        let method = method.to_owned();
        let spawned = thread::Builder::new()
            .name("hermod-call".into())
            .spawn(move || callback(client.call(&method, params)));
        if let Err(e) = spawned {
            debug!(error = %e, "failed to spawn async call thread");
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, UnixStream>> {
        self.stream
            .lock()
            .map_err(|_| Error::Io(io::Error::new(ErrorKind::Other, "client mutex poisoned")))
    }
}
