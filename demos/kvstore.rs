//! In-memory key-value store served over RPC.
//!
//! Handlers are closures over a shared map, showing how stateful services
//! hang their state off the registered capabilities rather than the server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use hermod::{Client, Server};
use serde_json::{json, Value};

type Store = Arc<Mutex<HashMap<String, Value>>>;

fn main() -> hermod::Result<()> {
    tracing_subscriber::fmt::init();

    let socket = std::env::temp_dir().join("hermod-kvstore.sock");
    let store: Store = Arc::new(Mutex::new(HashMap::new()));

    let mut server = Server::new(&socket);

    let db = Arc::clone(&store);
    server.register("set", move |params: &Value| {
        let key = params.get("key")?.as_str()?.to_owned();
        let value = params.get("value")?.clone();
        db.lock().ok()?.insert(key, value);
        Some(json!({ "ok": true }))
    });

    let db = Arc::clone(&store);
    server.register("get", move |params: &Value| {
        let key = params.get("key")?.as_str()?;
        Some(db.lock().ok()?.get(key).cloned().unwrap_or(Value::Null))
    });

    let db = Arc::clone(&store);
    server.register("delete", move |params: &Value| {
        let key = params.get("key")?.as_str()?;
        let removed = db.lock().ok()?.remove(key).is_some();
        Some(json!({ "removed": removed }))
    });

    let db = Arc::clone(&store);
    server.register("list", move |_: &Value| {
        let mut keys: Vec<String> = db.lock().ok()?.keys().cloned().collect();
        keys.sort();
        Some(json!(keys))
    });

    server.start()?;

    let client = Client::connect(&socket)?;
    client.call("set", json!({ "key": "name", "value": "hermod" }))?;
    client.call("set", json!({ "key": "kind", "value": "rpc" }))?;
    println!("get name = {}", client.call("get", json!({ "key": "name" }))?);
    println!("list = {}", client.call("list", Value::Null)?);
    println!("delete kind = {}", client.call("delete", json!({ "key": "kind" }))?);
    println!("get kind = {}", client.call("get", json!({ "key": "kind" }))?);

    Ok(())
}
