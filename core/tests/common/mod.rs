//! Scripted `Transport` for dispatcher and saga tests.
//!
//! Records every request with the (tokio) instant it started and answers from
//! a handler closure. Tracks how many requests are executing at once so tests
//! can assert single-flight.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cms_client::{ApiError, ClientConfig, ContentClient, HttpMethod, HttpRequest, HttpResponse, Transport};
use serde_json::Value;
use tokio::time::Instant;

pub const BASE_URL: &str = "http://cms.test/v2";
pub const TOKEN: &str = "test-token";

type Handler = dyn Fn(usize, &HttpRequest) -> Result<HttpResponse, ApiError> + Send + Sync;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub started: Instant,
}

impl RecordedCall {
    /// URL with the base stripped, e.g. `/collections/c/items?limit=100&offset=0`.
    pub fn path(&self) -> &str {
        self.url.strip_prefix(BASE_URL).unwrap_or(&self.url)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub struct ScriptedTransport {
    handler: Box<Handler>,
    latency: Duration,
    calls: Mutex<Vec<RecordedCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(usize, &HttpRequest) -> Result<HttpResponse, ApiError> + Send + Sync + 'static,
    {
        Self::with_latency(Duration::ZERO, handler)
    }

    pub fn with_latency<F>(latency: Duration, handler: F) -> Arc<Self>
    where
        F: Fn(usize, &HttpRequest) -> Result<HttpResponse, ApiError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            latency,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls().iter().map(|c| c.path().to_string()).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(RecordedCall {
                method: request.method,
                url: request.url.clone(),
                headers: request.headers.clone(),
                body: request
                    .body
                    .as_deref()
                    .map(|b| serde_json::from_str(b).unwrap()),
                started: Instant::now(),
            });
            calls.len() - 1
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let result = (self.handler)(index, &request);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

pub fn json_response(status: u16, body: Value, remaining: u64) -> HttpResponse {
    HttpResponse {
        status,
        headers: vec![
            ("content-type".to_string(), "application/json; charset=utf-8".to_string()),
            ("x-ratelimit-remaining".to_string(), remaining.to_string()),
        ],
        body: body.to_string(),
    }
}

pub fn ok_json(body: Value) -> Result<HttpResponse, ApiError> {
    Ok(json_response(200, body, 100))
}

pub fn config() -> ClientConfig {
    ClientConfig::new(BASE_URL, TOKEN)
}

pub fn client(transport: &Arc<ScriptedTransport>) -> ContentClient {
    ContentClient::new(config(), Arc::clone(transport)).unwrap()
}

/// Request body as JSON, `Null` when absent.
pub fn body_of(request: &HttpRequest) -> Value {
    request
        .body
        .as_deref()
        .map(|b| serde_json::from_str(b).unwrap())
        .unwrap_or(Value::Null)
}

/// Value of a query parameter in `url`.
pub fn query_param<'a>(url: &'a str, name: &str) -> Option<&'a str> {
    let query = url.split_once('?')?.1;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}
