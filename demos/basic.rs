//! Minimal echo service: register one method, call it, print the reply.

use hermod::{Client, Server};
use serde_json::{json, Value};

fn main() -> hermod::Result<()> {
    tracing_subscriber::fmt::init();

    let socket = std::env::temp_dir().join("hermod-basic.sock");

    let mut server = Server::new(&socket);
    server.register("echo", |params: &Value| Some(params.clone()));
    server.start()?;

    let client = Client::connect(&socket)?;
    let reply = client.call("echo", json!({ "message": "hello" }))?;
    println!("echo replied: {reply}");

    Ok(())
}
