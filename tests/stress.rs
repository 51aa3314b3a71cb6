//! Mixed sync/async load across several clients, then a prompt shutdown.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use hermod::{Client, Server};
use serde_json::{json, Value};

const CLIENTS: usize = 5;
const OPERATIONS_PER_CLIENT: usize = 20;
const ARRAY_SIZE: usize = 20;
const STRING_SIZE: usize = 128;

fn socket_path() -> PathBuf {
    std::env::temp_dir().join(format!("hermod-stress-{}.sock", std::process::id()))
}

fn sort_handler(params: &Value) -> Option<Value> {
    let mut numbers: Vec<i64> = params.as_array()?.iter().filter_map(Value::as_i64).collect();
    numbers.sort_unstable();
    Some(json!(numbers))
}

fn process_handler(params: &Value) -> Option<Value> {
    let text = params.get("text")?.as_str()?;
    let reversed: String = text.chars().rev().collect();
    Some(json!(reversed.to_uppercase()))
}

fn multiply_handler(params: &Value) -> Option<Value> {
    let a = matrix(params.get("matrix1")?)?;
    let b = matrix(params.get("matrix2")?)?;
    if a.len() != b.len() {
        return Some(json!([]));
    }
    let size = a.len();
    let mut product = vec![vec![0i64; size]; size];
    for (i, row) in product.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..size).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    Some(json!(product))
}

fn matrix(value: &Value) -> Option<Vec<Vec<i64>>> {
    let rows = value.as_array()?;
    let size = rows.len();
    rows.iter()
        .map(|row| {
            let row = row.as_array()?;
            if row.len() != size {
                return None;
            }
            row.iter().map(Value::as_i64).collect()
        })
        .collect()
}

/// Deterministic spread over the three method shapes.
fn operation(client_id: usize, op: usize) -> (&'static str, Value) {
    match (client_id + op) % 3 {
        0 => {
            let numbers: Vec<i64> = (0..ARRAY_SIZE)
                .map(|i| ((i * 7 + op * 13 + client_id * 31) % 100) as i64)
                .collect();
            ("sort", json!(numbers))
        }
        1 => {
            let text: String = (0..STRING_SIZE)
                .map(|i| (b'a' + ((i + op + client_id) % 26) as u8) as char)
                .collect();
            ("process", json!({ "text": text }))
        }
        _ => (
            "multiply",
            json!({
                "matrix1": [[1, 2, 3], [4, 5, 6], [7, 8, 9]],
                "matrix2": [[9, 8, 7], [6, 5, 4], [3, 2, 1]],
            }),
        ),
    }
}

#[test]
fn stress_mixed_sync_and_async_load() {
    let path = socket_path();
    let mut server = Server::new(&path);
    server.register("sort", sort_handler);
    server.register("process", process_handler);
    server.register("multiply", multiply_handler);
    server.start().unwrap();

    let successes = Arc::new(AtomicU32::new(0));
    let failures = Arc::new(AtomicU32::new(0));

    let mut clients = Vec::new();
    for client_id in 0..CLIENTS {
        let path = path.clone();
        let successes = Arc::clone(&successes);
        let failures = Arc::clone(&failures);
        clients.push(thread::spawn(move || {
            let client = Client::connect(&path).unwrap();
            client
                .set_call_timeout(Some(Duration::from_secs(10)))
                .unwrap();

            for op in 0..OPERATIONS_PER_CLIENT {
                let (method, params) = operation(client_id, op);
                if op % 2 == 0 {
                    match client.call(method, params) {
                        Ok(_) => successes.fetch_add(1, Ordering::Relaxed),
                        Err(_) => failures.fetch_add(1, Ordering::Relaxed),
                    };
                } else {
                    let successes = Arc::clone(&successes);
                    let failures = Arc::clone(&failures);
                    client.call_async(method, params, move |result| {
                        match result {
                            Ok(_) => successes.fetch_add(1, Ordering::Relaxed),
                            Err(_) => failures.fetch_add(1, Ordering::Relaxed),
                        };
                    });
                }
            }
        }));
    }
    for client in clients {
        client.join().unwrap();
    }

    // Async calls are fire-and-forget; give them a bounded drain.
    let issued = (CLIENTS * OPERATIONS_PER_CLIENT) as u32;
    let deadline = Instant::now() + Duration::from_secs(5);
    while successes.load(Ordering::Relaxed) + failures.load(Ordering::Relaxed) < issued
        && Instant::now() < deadline
    {
        thread::sleep(Duration::from_millis(50));
    }

    let succeeded = successes.load(Ordering::Relaxed);
    let failed = failures.load(Ordering::Relaxed);
    assert_eq!(succeeded + failed, issued, "operations went unaccounted");
    assert!(succeeded > 0, "no operation succeeded");

    let started = Instant::now();
    server.shutdown();
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "shutdown took too long"
    );
}
