//! Named method handlers and the bounded table that dispatches to them.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::warn;

/// Most methods a table will hold.
pub(crate) const MAX_METHODS: usize = 100;

/// A callable registered under a method name.
///
/// Handlers run on worker threads, possibly several at once, so they must be
/// safe to invoke concurrently with themselves and with other handlers. The
/// parameter document is borrowed for the duration of one exchange; a handler
/// that wants to keep any of it must clone it. Returning `None` produces no
/// response document.
///
/// Any `Fn(&Value) -> Option<Value>` closure or function is a handler:
///
/// ```
/// use serde_json::{json, Value};
///
/// fn add(params: &Value) -> Option<Value> {
///     let a = params.get(0)?.as_i64()?;
///     let b = params.get(1)?.as_i64()?;
///     Some(json!(a + b))
/// }
///
/// assert_eq!(add(&json!([5, 3])), Some(json!(8)));
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Invoke the method with the request's parameter document.
    fn invoke(&self, params: &Value) -> Option<Value>;
}

impl<F> Handler for F
where
    F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
{
    fn invoke(&self, params: &Value) -> Option<Value> {
        self(params)
    }
}

struct Method {
    name: String,
    handler: Arc<dyn Handler>,
}

/// Name-to-handler table. Bounded, guarded by a single mutex, scanned
/// linearly: servers register a handful of methods, so a scan costs nothing
/// measurable and keeps replacement a single atomic slot overwrite.
pub(crate) struct Methods {
    entries: Mutex<Vec<Method>>,
}

impl Methods {
    pub(crate) fn new() -> Self {
        Methods {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Insert `handler` under `name`, replacing any existing entry with the
    /// same name. A full table refuses new names; replacement stays allowed
    /// since it does not grow the table.
    pub(crate) fn register(&self, name: &str, handler: Arc<dyn Handler>) {
        if name.is_empty() {
            warn!("refusing to register an empty method name");
            return;
        }
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        if let Some(method) = entries.iter_mut().find(|m| m.name == name) {
            method.handler = handler;
            return;
        }
        if entries.len() >= MAX_METHODS {
            warn!(name, "method table full, registration dropped");
            return;
        }
        entries.push(Method {
            name: name.to_owned(),
            handler,
        });
    }

    /// Look up the handler registered under `name`. The returned handle is a
    /// snapshot of the slot; callers invoke it after this returns, so a slow
    /// method never holds up registration.
    pub(crate) fn lookup(&self, name: &str) -> Option<Arc<dyn Handler>> {
        let entries = self.entries.lock().ok()?;
        entries
            .iter()
            .find(|m| m.name == name)
            .map(|m| Arc::clone(&m.handler))
    }
}

impl fmt::Debug for Methods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = match self.entries.lock() {
            Ok(entries) => entries.iter().map(|m| m.name.clone()).collect(),
            Err(_) => Vec::new(),
        };
        f.debug_struct("Methods").field("registered", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn constant(value: Value) -> Arc<dyn Handler> {
        Arc::new(move |_: &Value| Some(value.clone()))
    }

    #[test]
    fn lookup_finds_registered_handler() {
        let methods = Methods::new();
        methods.register("ping", constant(json!("pong")));

        let handler = methods.lookup("ping").unwrap();
        assert_eq!(handler.invoke(&Value::Null), Some(json!("pong")));
        assert!(methods.lookup("pong").is_none());
    }

    #[test]
    fn lookup_is_case_sensitive_and_exact() {
        let methods = Methods::new();
        methods.register("Echo", constant(json!(1)));

        assert!(methods.lookup("echo").is_none());
        assert!(methods.lookup("").is_none());
    }

    #[test]
    fn replacement_routes_subsequent_lookups() {
        let methods = Methods::new();
        methods.register("version", constant(json!(1)));
        methods.register("version", constant(json!(2)));

        let handler = methods.lookup("version").unwrap();
        assert_eq!(handler.invoke(&Value::Null), Some(json!(2)));
    }

    #[test]
    fn full_table_refuses_new_names_but_not_replacement() {
        let methods = Methods::new();
        for i in 0..MAX_METHODS {
            methods.register(&format!("m{i}"), constant(json!(i)));
        }

        methods.register("overflow", constant(json!("lost")));
        assert!(methods.lookup("overflow").is_none());

        methods.register("m0", constant(json!("replaced")));
        let handler = methods.lookup("m0").unwrap();
        assert_eq!(handler.invoke(&Value::Null), Some(json!("replaced")));
    }

    #[test]
    fn empty_name_is_never_registered() {
        let methods = Methods::new();
        methods.register("", constant(json!(1)));
        assert!(methods.lookup("").is_none());
    }
}
