//! Wire-level request documents.
//!
//! An exchange is one JSON request document answered by at most one JSON
//! response document on the same connection. Documents are self-delimiting
//! JSON text with no length prefix or terminator: the sender writes the whole
//! document in one burst and the receiver reads until the stream stops
//! producing bytes. A single burst is therefore assumed to carry a complete
//! document; anything larger than the receive buffer is truncated and fails
//! to decode.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// Receive buffer capacity on both sides of a connection. The largest
/// document a server will decode is one byte less.
pub(crate) const BUFFER_SIZE: usize = 4096;

/// A method call as it appears on the wire.
///
/// `params` decodes to `Value::Null` when the member is absent, so a handler
/// never sees a missing parameter document. A request whose `method` member
/// is missing or not a string fails to decode.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Request {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Request {
    pub(crate) fn new(method: &str, params: Value) -> Self {
        Request {
            method: method.to_owned(),
            params,
        }
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_params_decode_to_null() {
        let request = Request::from_bytes(br#"{"method":"ping"}"#).unwrap();
        assert_eq!(request.method, "ping");
        assert!(request.params.is_null());
    }

    #[test]
    fn params_carry_arbitrary_documents() {
        let request =
            Request::from_bytes(br#"{"method":"add","params":[5,3]}"#).unwrap();
        assert_eq!(request.params, json!([5, 3]));
    }

    #[test]
    fn missing_method_is_rejected() {
        assert!(Request::from_bytes(br#"{"params":[1]}"#).is_err());
    }

    #[test]
    fn non_string_method_is_rejected() {
        assert!(Request::from_bytes(br#"{"method":5,"params":[]}"#).is_err());
    }

    #[test]
    fn truncated_document_is_rejected() {
        let full = Request::new("echo", json!({"message": "hello"}))
            .to_bytes()
            .unwrap();
        assert!(Request::from_bytes(&full[..full.len() - 4]).is_err());
    }
}
