//! Worker shards and the readiness loop that services them.
//!
//! Each worker owns a readiness set fed by the acceptor. Connections attach
//! to exactly one shard for their lifetime; the shard's thread multiplexes
//! whatever became readable, runs one exchange per wakeup, and retires
//! connections whose peer has gone away. Handlers are invoked outside every
//! lock in the engine, so a slow method can only ever delay its own shard's
//! queue.

use std::io::{self, ErrorKind};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mio::net::UnixStream;
use mio::{Events, Poll, Registry, Token};
use slab::Slab;
use tracing::{debug, error, trace};

use crate::connection::Connection;
use crate::server::Shared;
use crate::wire::{Request, BUFFER_SIZE};

/// Readiness events drained per wait.
pub(crate) const MAX_EVENTS: usize = 10;

/// How long a readiness wait may sleep before the running flag is re-checked.
pub(crate) const WORKER_WAIT: Duration = Duration::from_millis(100);

/// The share of a worker visible outside its thread: where the acceptor
/// registers new streams and the slots they occupy. The `Poll` these
/// registrations feed is owned by the worker thread itself.
#[derive(Debug)]
pub(crate) struct Shard {
    pub(crate) id: usize,
    registry: Registry,
    connections: Mutex<Slab<Arc<Connection>>>,
}

impl Shard {
    pub(crate) fn new(id: usize, registry: Registry) -> Self {
        Shard {
            id,
            registry,
            connections: Mutex::new(Slab::new()),
        }
    }

    /// Attach an accepted stream to this shard's readiness set. The stream
    /// is dropped (closing the socket) if registration fails.
    pub(crate) fn attach(&self, stream: UnixStream) -> io::Result<()> {
        let mut connections = self
            .connections
            .lock()
            .map_err(|_| io::Error::new(ErrorKind::Other, "shard mutex poisoned"))?;
        let entry = connections.vacant_entry();
        let token = Token(entry.key());
        let connection = Connection::new(stream);
        connection.register(&self.registry, token)?;
        entry.insert(Arc::new(connection));
        Ok(())
    }

    /// Number of currently attached connections.
    pub(crate) fn connection_count(&self) -> usize {
        self.connections.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn connection(&self, token: Token) -> Option<Arc<Connection>> {
        self.connections.lock().ok()?.get(token.0).cloned()
    }

    fn detach(&self, token: Token) {
        let removed = self
            .connections
            .lock()
            .ok()
            .and_then(|mut connections| connections.try_remove(token.0));
        if let Some(connection) = removed {
            let _ = connection.deregister(&self.registry);
        }
    }
}

/// Worker loop: wait on the shard's readiness set, service whatever became
/// ready, re-check the running flag, repeat. The bounded wait exists only so
/// shutdown is observed without poking each worker.
pub(crate) fn run(mut poll: Poll, shard: Arc<Shard>, shared: Arc<Shared>) {
    let mut events = Events::with_capacity(MAX_EVENTS);
    debug!(worker = shard.id, "worker started");

    while shared.running.load(Ordering::Relaxed) {
        if let Err(e) = poll.poll(&mut events, Some(WORKER_WAIT)) {
            if e.kind() == ErrorKind::Interrupted {
                continue;
            }
            error!(worker = shard.id, error = %e, "readiness wait failed");
            break;
        }

        for event in events.iter() {
            let token = event.token();
            let Some(connection) = shard.connection(token) else {
                continue;
            };
            if let Err(e) = serve(&connection, &shared) {
                trace!(worker = shard.id, error = %e, "retiring connection");
                shard.detach(token);
            }
        }
    }

    debug!(
        worker = shard.id,
        connections = shard.connection_count(),
        "worker stopped"
    );
}

/// One exchange on a ready connection: read burst, decode, snapshot the
/// handler, invoke it, write the response burst back. Requests that fail to
/// decode and methods nobody registered are dropped without a response; the
/// connection stays open either way.
fn serve(connection: &Connection, shared: &Shared) -> io::Result<()> {
    let mut buf = [0u8; BUFFER_SIZE];
    let n = connection.read_burst(&mut buf)?;
    if n == 0 {
        // spurious wakeup
        return Ok(());
    }

    let Ok(request) = Request::from_bytes(&buf[..n]) else {
        debug!("dropping request that failed to decode");
        return Ok(());
    };

    let Some(handler) = shared.methods.lookup(&request.method) else {
        debug!(method = %request.method, "no handler registered");
        return Ok(());
    };

    if let Some(response) = handler.invoke(&request.params) {
        let bytes = serde_json::to_vec(&response)?;
        connection.write_burst(&bytes)?;
    }
    Ok(())
}
