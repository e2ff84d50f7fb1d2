//! FIFO queue of calls waiting for the dispatcher.
//!
//! Each `Call` pairs a request with a oneshot completion, so it settles
//! exactly once. `CallQueue` is the cheap, cloneable submit side held by the
//! facade; `PendingCalls` is the receive side owned by the dispatcher. The
//! queue is unbounded and `submit` never blocks.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot};

use crate::error::ApiError;
use crate::http::{HttpRequest, Payload};

pub type CallOutcome = Result<Payload, ApiError>;

/// One outbound exchange and its completion.
#[derive(Debug)]
pub struct Call {
    pub(crate) request: HttpRequest,
    pub(crate) completion: Completion,
}

impl Call {
    pub(crate) fn settle(self, outcome: CallOutcome) {
        self.completion.settle(outcome);
    }
}

/// Single-settlement result slot of a call.
#[derive(Debug)]
pub(crate) struct Completion(oneshot::Sender<CallOutcome>);

impl Completion {
    /// Consumes the completion, so a call cannot settle twice.
    pub(crate) fn settle(self, outcome: CallOutcome) {
        // The submitter may have stopped waiting; the outcome is then dropped.
        let _ = self.0.send(outcome);
    }
}

/// Create a connected submit/receive pair.
pub fn call_queue() -> (CallQueue, PendingCalls) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CallQueue { tx }, PendingCalls { rx })
}

#[derive(Debug, Clone)]
pub struct CallQueue {
    tx: mpsc::UnboundedSender<Call>,
}

impl CallQueue {
    /// Append a request to the queue and return a handle to its outcome.
    ///
    /// Calls execute in submission order. When the dispatcher is gone the
    /// handle resolves to `ApiError::DispatcherClosed`.
    pub fn submit(&self, request: HttpRequest) -> CallHandle {
        let (tx, rx) = oneshot::channel();
        let call = Call {
            request,
            completion: Completion(tx),
        };
        if let Err(mpsc::error::SendError(call)) = self.tx.send(call) {
            call.settle(Err(ApiError::DispatcherClosed));
        }
        CallHandle { rx }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Future resolving to the outcome of a submitted call.
#[derive(Debug)]
#[must_use = "a call handle does nothing unless awaited"]
pub struct CallHandle {
    rx: oneshot::Receiver<CallOutcome>,
}

impl Future for CallHandle {
    type Output = CallOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|settled| settled.unwrap_or(Err(ApiError::DispatcherClosed)))
    }
}

/// Receive side of the queue, drained by the dispatcher.
#[derive(Debug)]
pub struct PendingCalls {
    rx: mpsc::UnboundedReceiver<Call>,
}

impl PendingCalls {
    /// Wait for the oldest call. `None` once every `CallQueue` is dropped and
    /// the queue is drained.
    pub async fn dequeue_next(&mut self) -> Option<Call> {
        self.rx.recv().await
    }

    pub fn has_pending(&self) -> bool {
        !self.rx.is_empty()
    }
}
