#![deny(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unused_imports
)]
// Disallow warnings in examples.
#![doc(test(attr(deny(warnings))))]

//! hermod is a lightweight request/response RPC runtime over Unix domain
//! stream sockets, exchanging JSON-encoded method calls.
//!
//! A [`Server`] owns a socket path and a table of named method [`Handler`]s.
//! Once started, a fixed pool of worker threads multiplexes ready
//! connections through per-worker readiness sets while a detached acceptor
//! distributes new connections round-robin across the pool. Methods may be
//! registered at any time, including while requests are in flight.
//!
//! A [`Client`] multiplexes synchronous and fire-and-forget asynchronous
//! calls onto a single shared connection; a mutex held across one
//! write/read pair keeps responses paired with their requests.
//!
//! ## Example
//!
//! ```no_run
//! use hermod::{Client, Server};
//! use serde_json::{json, Value};
//!
//! fn main() -> hermod::Result<()> {
//!     let mut server = Server::new("/tmp/app.sock");
//!     server.register("add", |params: &Value| {
//!         let a = params.get(0)?.as_i64()?;
//!         let b = params.get(1)?.as_i64()?;
//!         Some(json!(a + b))
//!     });
//!     server.start()?;
//!
//!     let client = Client::connect("/tmp/app.sock")?;
//!     assert_eq!(client.call("add", json!([5, 3]))?, json!(8));
//!     Ok(())
//! }
//! ```
//!
//! Further runnable programs live in the `demos` directory of the source
//! tree (`cargo run --example calculator`).

mod client;
mod connection;
mod error;
mod methods;
mod server;
mod wire;
mod worker;

pub use client::Client;
pub use error::{Error, Result};
pub use methods::Handler;
pub use server::Server;
