//! Server engine: lifecycle, the acceptor loop, and connection placement.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use mio::net::UnixListener;
use mio::{Events, Interest, Poll, Token};
use tracing::{debug, error, info, warn};

use crate::methods::{Handler, Methods};
use crate::worker::{self, Shard, MAX_EVENTS, WORKER_WAIT};
use crate::Result;

/// Worker shards servicing connections.
pub(crate) const NUM_WORKERS: usize = 4;

const LISTENER_TOKEN: Token = Token(usize::MAX);

/// State shared by the public handle, the acceptor, and the workers.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) methods: Methods,
    pub(crate) running: AtomicBool,
    next_worker: AtomicUsize,
}

/// An RPC server bound to a Unix socket path.
///
/// A server is created idle, accumulates method registrations, and opens its
/// socket on [`start`]: a fixed pool of worker threads multiplexes accepted
/// connections while a detached acceptor distributes new ones round-robin
/// across the pool. Registration remains legal at any point, including while
/// requests are in flight.
///
/// Dropping the server shuts it down: the listening socket stops accepting,
/// workers finish their current exchanges and are joined, and the socket
/// file is removed.
///
/// [`start`]: Server::start
#[derive(Debug)]
pub struct Server {
    path: PathBuf,
    shared: Arc<Shared>,
    shards: Vec<Arc<Shard>>,
    workers: Vec<JoinHandle<()>>,
    started: bool,
}

impl Server {
    /// Create an idle server for `path`. No sockets are opened until
    /// [`Server::start`].
    pub fn new(path: impl AsRef<Path>) -> Self {
        Server {
            path: path.as_ref().to_path_buf(),
            shared: Arc::new(Shared {
                methods: Methods::new(),
                running: AtomicBool::new(false),
                next_worker: AtomicUsize::new(0),
            }),
            shards: Vec::new(),
            workers: Vec::new(),
            started: false,
        }
    }

    /// Register `handler` under `name`, replacing any previous handler with
    /// that name. May be called before or after [`Server::start`], from any
    /// thread, concurrently with in-flight requests.
    pub fn register<H: Handler>(&self, name: &str, handler: H) {
        self.shared.methods.register(name, Arc::new(handler));
    }

    /// Bind the socket and spawn the worker pool and the acceptor. Any stale
    /// file at the socket path is removed before binding. Calling `start`
    /// again is a no-op.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }

        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed stale socket file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        let mut listener = UnixListener::bind(&self.path)?;

        self.shared.running.store(true, Ordering::Relaxed);
        self.started = true;

        for id in 0..NUM_WORKERS {
            let poll = Poll::new()?;
            let shard = Arc::new(Shard::new(id, poll.registry().try_clone()?));
            self.shards.push(Arc::clone(&shard));
            let shared = Arc::clone(&self.shared);
            let handle = thread::Builder::new()
                .name(format!("hermod-worker-{id}"))
                .spawn(move || worker::run(poll, shard, shared))?;
            self.workers.push(handle);
        }

        let accept_poll = Poll::new()?;
        accept_poll
            .registry()
            .register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;
        let shards = self.shards.clone();
        let shared = Arc::clone(&self.shared);
        // Fire and forget: the acceptor observes `running` turning false on
        // its next wait and exits on its own, so the handle is dropped.
        let _ = thread::Builder::new()
            .name("hermod-acceptor".into())
            .spawn(move || accept_loop(accept_poll, listener, shards, shared))?;

        info!(path = %self.path.display(), workers = NUM_WORKERS, "server started");
        Ok(())
    }

    /// Stop accepting, join the workers, and remove the socket file. After
    /// the workers are joined no handler is running. Idempotent; also runs
    /// on drop.
    pub fn shutdown(&mut self) {
        if !self.shared.running.swap(false, Ordering::Relaxed) {
            return;
        }
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to remove socket file");
            }
        }
        info!(path = %self.path.display(), "server stopped");
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn accept_loop(
    mut poll: Poll,
    listener: UnixListener,
    shards: Vec<Arc<Shard>>,
    shared: Arc<Shared>,
) {
    let mut events = Events::with_capacity(MAX_EVENTS);
    debug!("acceptor started");

    while shared.running.load(Ordering::Relaxed) {
        if let Err(e) = poll.poll(&mut events, Some(WORKER_WAIT)) {
            if e.kind() == ErrorKind::Interrupted {
                continue;
            }
            error!(error = %e, "acceptor wait failed");
            break;
        }
        for event in events.iter() {
            if event.token() == LISTENER_TOKEN {
                accept_ready(&listener, &shards, &shared);
            }
        }
    }

    debug!("acceptor stopped");
}

/// Accept until the listener runs dry, handing each stream to the next shard
/// in round-robin order. Accepted streams are non-blocking from the start.
fn accept_ready(listener: &UnixListener, shards: &[Arc<Shard>], shared: &Shared) {
    loop {
        match listener.accept() {
            Ok((stream, _)) => {
                let next = shared.next_worker.fetch_add(1, Ordering::Relaxed) % shards.len();
                let shard = &shards[next];
                match shard.attach(stream) {
                    Ok(()) => debug!(
                        worker = shard.id,
                        connections = shard.connection_count(),
                        "connection attached"
                    ),
                    Err(e) => warn!(worker = shard.id, error = %e, "failed to attach connection"),
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => return,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                error!(error = %e, "accept failed");
                return;
            }
        }
    }
}
