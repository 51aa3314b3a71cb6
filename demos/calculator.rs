//! Arithmetic over `[a, b]` number pairs, mixing sync and async calls.
//!
//! `divide` reports division by zero through an `"error"` member of its
//! result document; the transport carries it like any other response.

use std::sync::mpsc;

use hermod::{Client, Server};
use serde_json::{json, Value};

fn pair(params: &Value) -> Option<(f64, f64)> {
    let a = params.get(0)?.as_f64()?;
    let b = params.get(1)?.as_f64()?;
    Some((a, b))
}

fn main() -> hermod::Result<()> {
    tracing_subscriber::fmt::init();

    let socket = std::env::temp_dir().join("hermod-calculator.sock");

    let mut server = Server::new(&socket);
    server.register("add", |p: &Value| pair(p).map(|(a, b)| json!(a + b)));
    server.register("subtract", |p: &Value| pair(p).map(|(a, b)| json!(a - b)));
    server.register("multiply", |p: &Value| pair(p).map(|(a, b)| json!(a * b)));
    server.register("divide", |p: &Value| {
        let (a, b) = pair(p)?;
        if b == 0.0 {
            Some(json!({ "error": "division by zero" }))
        } else {
            Some(json!(a / b))
        }
    });
    server.start()?;

    let client = Client::connect(&socket)?;
    for (method, a, b) in [
        ("add", 6.0, 7.0),
        ("subtract", 9.0, 4.0),
        ("multiply", 6.0, 7.0),
        ("divide", 9.0, 3.0),
    ] {
        let result = client.call(method, json!([a, b]))?;
        println!("{method}([{a}, {b}]) = {result}");
    }

    let failure = client.call("divide", json!([1, 0]))?;
    println!("divide([1, 0]) = {failure}");

    let (tx, rx) = mpsc::channel();
    client.call_async("add", json!([2, 3]), move |result| {
        let _ = tx.send(result);
    });
    if let Ok(result) = rx.recv() {
        println!("async add([2, 3]) = {}", result?);
    }

    Ok(())
}
