use super::request::HeaderVec;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// The response handed back to the container adapter: status, headers and a
/// JSON entity body. Serialization of the body onto the wire belongs to the
/// adapter/entity-provider layer, not to the dispatch core.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    /// HTTP status code (200, 404, 500, ...).
    pub status: u16,
    /// Response headers.
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    /// Response body as JSON.
    pub body: Value,
}

impl Response {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Response {
            status,
            headers,
            body,
        }
    }

    /// A JSON response with the content type already set.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Response {
            status,
            headers,
            body,
        }
    }

    /// A 200 OK JSON response.
    #[must_use]
    pub fn ok_json(body: Value) -> Self {
        Self::json(200, body)
    }

    /// A 204 response with no entity.
    #[must_use]
    pub fn no_content() -> Self {
        Response {
            status: 204,
            headers: HeaderVec::new(),
            body: Value::Null,
        }
    }

    /// A JSON error envelope: `{"error": message}`.
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    /// Get a header by name (case-insensitive).
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header (case-insensitive on the name).
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }
}
