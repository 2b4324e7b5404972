//! Shared test doubles.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;

use horizon_lattice_ajax::http::{
    Exchange, OutgoingRequest, ProgressObservers, TransferProgress, Transport,
};

#[derive(Default)]
struct MockInner {
    requests: Mutex<Vec<OutgoingRequest>>,
    response: Mutex<Option<Exchange>>,
    delay: Mutex<Option<Duration>>,
}

/// A transport that records every request and replays one canned exchange.
///
/// Clones share the same recording, so a test can keep one clone and give
/// another to `Ajax`.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<MockInner>,
}

impl MockTransport {
    /// Respond `200 OK` with an empty body.
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond with `exchange`. An empty URL is filled in from the request.
    pub fn respond_with(self, exchange: Exchange) -> Self {
        *self.inner.response.lock() = Some(exchange);
        self
    }

    /// Wait before responding.
    pub fn delay(self, delay: Duration) -> Self {
        *self.inner.delay.lock() = Some(delay);
        self
    }

    /// Every request sent so far.
    pub fn requests(&self) -> Vec<OutgoingRequest> {
        self.inner.requests.lock().clone()
    }

    /// Number of requests sent so far.
    pub fn request_count(&self) -> usize {
        self.inner.requests.lock().len()
    }

    /// The most recent request.
    pub fn last_request(&self) -> Option<OutgoingRequest> {
        self.inner.requests.lock().last().cloned()
    }
}

impl Transport for MockTransport {
    fn send(
        &self,
        request: OutgoingRequest,
        observers: ProgressObservers,
    ) -> BoxFuture<'static, Exchange> {
        let mut exchange = self
            .inner
            .response
            .lock()
            .clone()
            .unwrap_or_else(|| Exchange::new(200, "").with_status_text("OK"));
        if exchange.url.is_empty() {
            exchange.url = request.url.clone();
        }
        let delay = *self.inner.delay.lock();
        self.inner.requests.lock().push(request);

        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let received = match &exchange.body {
                horizon_lattice_ajax::http::ResponseBody::Empty => 0,
                horizon_lattice_ajax::http::ResponseBody::Text(text) => text.len() as u64,
                horizon_lattice_ajax::http::ResponseBody::Binary(bytes) => bytes.len() as u64,
            };
            observers.notify_download(TransferProgress {
                bytes_transferred: received,
                total_bytes: Some(received),
            });
            exchange
        })
    }
}

/// Records the order callbacks ran in.
#[derive(Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }
}
