//! String transforms over `{"text": ...}` documents.

use std::sync::mpsc;

use hermod::{Client, Server};
use serde_json::{json, Value};

fn main() -> hermod::Result<()> {
    tracing_subscriber::fmt::init();

    let socket = std::env::temp_dir().join("hermod-string-ops.sock");

    let mut server = Server::new(&socket);
    server.register("reverse", |p: &Value| {
        Some(json!(p.get("text")?.as_str()?.chars().rev().collect::<String>()))
    });
    server.register("upper", |p: &Value| {
        Some(json!(p.get("text")?.as_str()?.to_uppercase()))
    });
    server.register("count", |p: &Value| {
        let text = p.get("text")?.as_str()?;
        Some(json!({
            "chars": text.chars().count(),
            "words": text.split_whitespace().count(),
        }))
    });
    server.start()?;

    let client = Client::connect(&socket)?;
    let text = "the quick brown fox";

    println!(
        "reverse = {}",
        client.call("reverse", json!({ "text": text }))?
    );
    println!("count = {}", client.call("count", json!({ "text": text }))?);

    let (tx, rx) = mpsc::channel();
    client.call_async("upper", json!({ "text": text }), move |result| {
        let _ = tx.send(result);
    });
    if let Ok(result) = rx.recv() {
        println!("async upper = {}", result?);
    }

    Ok(())
}
