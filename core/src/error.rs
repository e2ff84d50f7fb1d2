//! Error types for the content API client.
//!
//! # Design
//! `Upstream` carries the server's decoded error body untouched so callers can
//! branch on upstream semantics such as validation errors. `Precondition` is
//! raised before any call is submitted. Nothing in the client retries; every
//! variant reaches the operation that caused it.

use std::fmt;

use crate::http::Payload;

/// Errors returned by client operations.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// The exchange never completed (connection, TLS, I/O failure).
    Transport(String),

    /// The server answered with a status outside the success range.
    Upstream { status: u16, body: Payload },

    /// Caller-supplied input is structurally invalid; no call was issued.
    Precondition(String),

    /// A response body could not be deserialized into the expected type.
    DeserializationError(String),

    /// A request payload could not be serialized to JSON.
    SerializationError(String),

    /// The client configuration is unusable.
    InvalidConfig(String),

    /// The dispatcher task stopped before the call settled.
    DispatcherClosed,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Transport(msg) => write!(f, "transport failure: {msg}"),
            ApiError::Upstream { status, body } => write!(f, "HTTP {status}: {body}"),
            ApiError::Precondition(msg) => write!(f, "precondition violated: {msg}"),
            ApiError::DeserializationError(msg) => write!(f, "deserialization failed: {msg}"),
            ApiError::SerializationError(msg) => write!(f, "serialization failed: {msg}"),
            ApiError::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            ApiError::DispatcherClosed => write!(f, "dispatcher is no longer running"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Status code of an upstream rejection, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}
