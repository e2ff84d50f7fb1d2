//! Single-flight dispatch loop.
//!
//! # Design
//! One tokio task owns the receive side of the call queue, the transport and
//! the rate-limit state. It runs one call at a time, in submission order:
//! execute, read the quota header, settle the call, then pace before the next
//! call if more are waiting. When the queue is empty the task parks on the
//! channel and the next submit wakes it. Nothing here retries and nothing
//! here panics on a failed call; every failure goes back through the call's
//! completion.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::http::decode_response;
use crate::queue::{call_queue, Call, CallQueue, PendingCalls};
use crate::rate_limit::{PacingPolicy, RateLimit};
use crate::transport::Transport;

/// Start a dispatcher on the current tokio runtime and return its queue.
///
/// The dispatcher stops once every clone of the returned queue is dropped and
/// the remaining calls have run.
pub fn spawn_dispatcher<T: Transport>(transport: T, config: &ClientConfig) -> CallQueue {
    let (queue, pending) = call_queue();
    let dispatcher = Dispatcher::new(transport, pending, config);
    tokio::spawn(dispatcher.run());
    queue
}

pub struct Dispatcher<T> {
    transport: T,
    pending: PendingCalls,
    rate_limit: RateLimit,
    pacing: PacingPolicy,
    authorization: String,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T, pending: PendingCalls, config: &ClientConfig) -> Self {
        Self {
            transport,
            pending,
            rate_limit: RateLimit::new(config.initial_remaining),
            pacing: config.pacing,
            authorization: format!("Bearer {}", config.api_token),
        }
    }

    pub async fn run(mut self) {
        debug!(remaining = self.rate_limit.remaining(), "dispatcher started");
        while let Some(call) = self.pending.dequeue_next().await {
            self.dispatch(call).await;

            if self.pending.has_pending() {
                let remaining = self.rate_limit.remaining();
                let delay = self.pacing.delay_for(remaining);
                if !delay.is_zero() {
                    info!(
                        remaining,
                        delay_ms = saturating_millis(delay),
                        "quota below low-water mark, pacing next call"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
        debug!("call queue closed, dispatcher stopped");
    }

    async fn dispatch(&mut self, call: Call) {
        let Call {
            mut request,
            completion,
        } = call;
        request.set_header("authorization", self.authorization.clone());
        if request.body.is_some() && request.header("content-type").is_none() {
            request.set_header("content-type", "application/json".to_string());
        }

        let method = request.method.as_str();
        let url = request.url.clone();
        debug!(method, url = %url, "dispatching call");

        let outcome = match self.transport.execute(request).await {
            Ok(response) => {
                let remaining = self.rate_limit.observe(&response);
                debug!(method, url = %url, status = response.status, remaining, "call completed");
                decode_response(response)
            }
            Err(err) => {
                warn!(method, url = %url, error = %err, "transport failure");
                Err(err)
            }
        };
        completion.settle(outcome);
    }
}

fn saturating_millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}
