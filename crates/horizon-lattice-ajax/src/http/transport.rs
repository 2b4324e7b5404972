//! The network primitive seam.
//!
//! The pipeline never talks to the network itself. It hands an
//! [`OutgoingRequest`] to a [`Transport`] and waits for the single
//! [`Exchange`] that comes back. [`HttpClient`](super::HttpClient) is the
//! reqwest-backed implementation; hosts with their own primitive (a browser
//! bridge, a test double) implement the trait directly.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use super::request::OutgoingRequest;
use super::response::{Exchange, TransferProgress};
use crate::error::Result;

/// Callback receiving progress notifications.
pub type ProgressCallback = Arc<dyn Fn(TransferProgress) + Send + Sync>;

/// Progress observers attached to a request before it is sent.
#[derive(Clone, Default)]
pub struct ProgressObservers {
    /// Notified as response bytes arrive.
    pub download: Option<ProgressCallback>,
    /// Notified as request bytes are written.
    pub upload: Option<ProgressCallback>,
}

impl ProgressObservers {
    /// Report download progress, if anyone is listening.
    pub fn notify_download(&self, progress: TransferProgress) {
        if let Some(observer) = &self.download {
            observer(progress);
        }
    }

    /// Report upload progress, if anyone is listening.
    pub fn notify_upload(&self, progress: TransferProgress) {
        if let Some(observer) = &self.upload {
            observer(progress);
        }
    }

    /// Returns true if no observer is attached.
    pub fn is_empty(&self) -> bool {
        self.download.is_none() && self.upload.is_none()
    }
}

impl std::fmt::Debug for ProgressObservers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressObservers")
            .field("download", &self.download.is_some())
            .field("upload", &self.upload.is_some())
            .finish()
    }
}

/// An asynchronous network-request primitive.
///
/// `send` must yield exactly one [`Exchange`] per call and must not fail:
/// anything that prevents a response (DNS, refused connection, timeout) is
/// reported as an exchange with status `0`.
pub trait Transport: Send + Sync {
    /// Resolve and validate a request URL before anything is sent.
    ///
    /// Called synchronously during dispatch, so an unusable URL is reported
    /// to the caller as a configuration error.
    fn resolve_url(&self, url: &str) -> Result<String> {
        Ok(url.to_string())
    }

    /// Transmit the request and wait for its completion.
    fn send(
        &self,
        request: OutgoingRequest,
        observers: ProgressObservers,
    ) -> BoxFuture<'static, Exchange>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn resolve_url(&self, url: &str) -> Result<String> {
        (**self).resolve_url(url)
    }

    fn send(
        &self,
        request: OutgoingRequest,
        observers: ProgressObservers,
    ) -> BoxFuture<'static, Exchange> {
        (**self).send(request, observers)
    }
}
