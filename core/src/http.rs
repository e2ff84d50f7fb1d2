//! HTTP transport types shared by the request builders and the dispatcher.
//!
//! # Design
//! Requests and responses are plain data. `ContentApi` builds `HttpRequest`
//! values, a `Transport` turns them into `HttpResponse` values, and
//! `decode_response` maps a response to the decoded `Payload` the caller sees.
//! Keeping the wire shapes as data means every request shape can be asserted
//! without a network.

use serde_json::Value;

use crate::error::ApiError;

/// Highest status code treated as success.
pub const MAX_SUCCESS_STATUS: u16 = 299;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute. The dispatcher adds the authorization header before the
/// request reaches the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: String) -> Self {
        Self {
            method: HttpMethod::Get,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Build a request carrying a JSON body.
    pub fn with_json<T: serde::Serialize>(
        method: HttpMethod,
        url: String,
        body: &T,
    ) -> Result<Self, ApiError> {
        let body =
            serde_json::to_string(body).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(Self {
            method,
            url,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Set a header, replacing any existing value with the same name.
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value));
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_success(&self) -> bool {
        self.status <= MAX_SUCCESS_STATUS
    }
}

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    /// Decode `body` as JSON when `content_type` says so, raw text otherwise.
    ///
    /// A JSON content type with an empty body decodes to `Json(Null)`; a body
    /// that claims JSON but does not parse is kept as text.
    pub fn decode(content_type: Option<&str>, body: String) -> Self {
        let is_json = content_type
            .map(|ct| ct.to_ascii_lowercase().contains("json"))
            .unwrap_or(false);
        if !is_json {
            return Payload::Text(body);
        }
        if body.trim().is_empty() {
            return Payload::Json(Value::Null);
        }
        match serde_json::from_str(&body) {
            Ok(value) => Payload::Json(value),
            Err(_) => Payload::Text(body),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Text(_) => None,
        }
    }

    pub fn into_json(self) -> Result<Value, ApiError> {
        match self {
            Payload::Json(value) => Ok(value),
            Payload::Text(text) => Err(ApiError::DeserializationError(format!(
                "expected a JSON body, got text: {text}"
            ))),
        }
    }
}

impl std::fmt::Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::Json(value) => write!(f, "{value}"),
            Payload::Text(text) => f.write_str(text),
        }
    }
}

/// Decode a response and settle it by status: success range → `Ok(payload)`,
/// anything else → `ApiError::Upstream` carrying the decoded body verbatim.
pub fn decode_response(response: HttpResponse) -> Result<Payload, ApiError> {
    let status = response.status;
    let success = response.is_success();
    let content_type = response.header("content-type").map(str::to_string);
    let payload = Payload::decode(content_type.as_deref(), response.body);
    if success {
        Ok(payload)
    } else {
        Err(ApiError::Upstream {
            status,
            body: payload,
        })
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
