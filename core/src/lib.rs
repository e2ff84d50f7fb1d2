//! Rate-limited client for a collection-based content API.
//!
//! # Overview
//! Every outbound call goes through one FIFO queue drained by a single
//! dispatcher task. The dispatcher runs one call at a time, reads the
//! server's remaining-quota header after each response and slows down as the
//! quota drops below a low-water mark. `ContentClient` builds the public
//! operations on top: paginated listing, single fetches, create/update/publish,
//! multi-locale creation and multi-locale deletion.
//!
//! # Design
//! - `ContentApi` builds `HttpRequest` values and parses decoded payloads
//!   without touching the network.
//! - `Transport` is the only I/O seam; `UreqTransport` is the HTTP
//!   implementation.
//! - Calls settle through oneshot channels, so each settles exactly once and
//!   upstream error bodies reach the caller verbatim.
//! - Logging goes through `tracing`; no subscriber is installed here.

pub mod api;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod queue;
pub mod rate_limit;
pub mod transport;
pub mod types;

pub use api::ContentApi;
pub use client::ContentClient;
pub use config::ClientConfig;
pub use dispatcher::{spawn_dispatcher, Dispatcher};
pub use error::ApiError;
pub use http::{decode_response, HttpMethod, HttpRequest, HttpResponse, Payload};
pub use queue::{call_queue, CallHandle, CallQueue, PendingCalls};
pub use rate_limit::{PacingPolicy, RateLimit, REMAINING_HEADER};
pub use transport::{Transport, UreqTransport};
pub use types::{
    BulkCreateItems, BulkCreateResponse, FieldData, Item, ItemPage, ItemUpdate, LocaleFields,
    MultiLocaleItem, NewItem, Pagination, PublishResponse,
};
