use crate::media::{self, MediaType};
use crate::template::CaptureVec;
use http::Method;
use serde_json::Value;
use smallvec::SmallVec;
use std::sync::Arc;

/// Maximum inline headers before heap allocation.
/// Most requests carry ≤16 headers.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage for the hot path.
///
/// Header names use `Arc<str>` because common names (content-type, accept,
/// authorization) repeat across requests and clone in O(1); values are
/// per-request data and stay `String`.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// A parsed inbound request as supplied by the container adapter.
///
/// Carries the HTTP method, the decoded path (query string split off at
/// construction), the ordered header multi-map and an optional JSON entity
/// body. Form-urlencoded bodies are expected to be pre-parsed into a JSON
/// object by the adapter, the same way it parses JSON bodies.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Request path without the query string.
    pub path: String,
    /// Ordered headers; lookup is ASCII-case-insensitive.
    pub headers: HeaderVec,
    /// Query string parameters, URL-decoded, in wire order.
    pub query_params: CaptureVec,
    /// Entity body parsed as JSON (if present).
    pub body: Option<Value>,
}

impl Request {
    /// Build a request from a method and a request URI (path plus optional
    /// query string). Query parameters are split off and URL-decoded here.
    #[must_use]
    pub fn new(method: Method, uri: &str) -> Self {
        let (path, query_params) = match uri.find('?') {
            Some(pos) => {
                let params = url::form_urlencoded::parse(uri[pos + 1..].as_bytes())
                    .map(|(k, v)| (Arc::from(k.as_ref()), v.to_string()))
                    .collect();
                (uri[..pos].to_string(), params)
            }
            None => (uri.to_string(), CaptureVec::new()),
        };
        Request {
            method,
            path,
            headers: HeaderVec::new(),
            query_params,
            body: None,
        }
    }

    /// Builder-style header addition for adapters and tests.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((Arc::from(name), value.to_string()));
        self
    }

    /// Builder-style JSON body attachment.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Get a header by name (case-insensitive per RFC 7230).
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name, last occurrence wins
    /// (e.g. `?limit=10&limit=20` yields `20`).
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a cookie by name, parsed from the `Cookie` header.
    #[must_use]
    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        let header = self.get_header("cookie")?;
        for pair in header.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            if parts.next()?.trim() == name {
                return Some(parts.next().unwrap_or("").trim());
            }
        }
        None
    }

    /// The parsed `Content-Type` header, if present and well-formed.
    #[must_use]
    pub fn content_type(&self) -> Option<MediaType> {
        self.get_header("content-type")
            .and_then(|v| MediaType::parse(v).ok())
    }

    /// The parsed `Accept` header; missing or empty means "anything".
    #[must_use]
    pub fn accepted_types(&self) -> Vec<MediaType> {
        media::parse_accept(self.get_header("accept"))
    }
}
