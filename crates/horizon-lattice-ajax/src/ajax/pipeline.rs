//! Request dispatch.
//!
//! [`Ajax`] turns [`RequestOptions`] into an [`OutgoingRequest`], hands it
//! to the transport and wraps the completed exchange in an [`AjaxResult`].
//! Everything that can be wrong with the options is reported by `dispatch`
//! itself; the returned [`PendingRequest`] always resolves to a result.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;

use super::headers::install_headers;
use super::options::{AjaxCall, AjaxSettings, RequestOptions, ResolvedRequest};
use super::payload::Payload;
use super::query::{append_query, encode_query};
use super::result::AjaxResult;
use crate::error::Result;
use crate::form::{FormLookup, FormSource};
use crate::http::{HttpClient, OutgoingRequest, ProgressObservers, RequestBody, Transport};

/// Unique identifier for a dispatched request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw identifier.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct AjaxInner {
    transport: Arc<dyn Transport>,
    settings: AjaxSettings,
    forms: Option<Arc<dyn FormLookup>>,
}

/// Entry point for issuing requests.
///
/// Cheap to clone; clones share the transport and settings.
///
/// # Example
///
/// ```ignore
/// use horizon_lattice_ajax::{Ajax, RequestOptions};
///
/// let ajax = Ajax::with_http_client()?;
/// let result = ajax
///     .dispatch_url("https://example.com/api/ping", RequestOptions::new())?
///     .await;
///
/// if !result.has_error() {
///     println!("{}", result.text());
/// }
/// ```
#[derive(Clone)]
pub struct Ajax {
    inner: Arc<AjaxInner>,
}

impl Ajax {
    /// Create an instance with default settings.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::builder(transport).build()
    }

    /// Create an instance backed by a default [`HttpClient`].
    pub fn with_http_client() -> Result<Self> {
        Ok(Self::new(HttpClient::new()?))
    }

    /// Start configuring an instance.
    pub fn builder(transport: impl Transport + 'static) -> AjaxBuilder {
        AjaxBuilder {
            transport: Arc::new(transport),
            settings: AjaxSettings::default(),
            forms: None,
        }
    }

    /// The defaults merged into every request.
    pub fn settings(&self) -> &AjaxSettings {
        &self.inner.settings
    }

    /// The transport requests are sent through.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    /// Dispatch a request described entirely by `options`.
    pub fn dispatch(&self, options: RequestOptions) -> Result<PendingRequest> {
        self.start(RequestOptions::from_options(options))
    }

    /// Dispatch a request to `url`.
    pub fn dispatch_url(
        &self,
        url: impl Into<String>,
        options: RequestOptions,
    ) -> Result<PendingRequest> {
        self.start(RequestOptions::from_url(url, options))
    }

    /// Submit `form` as a request.
    pub fn dispatch_form(
        &self,
        form: Arc<dyn FormSource>,
        options: RequestOptions,
    ) -> Result<PendingRequest> {
        self.start(RequestOptions::from_form(form, options))
    }

    /// Dispatch any call shape.
    pub fn call(&self, call: impl Into<AjaxCall>) -> Result<PendingRequest> {
        self.start(call.into().into_options())
    }

    /// Dispatch and drive the request on the Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn(
        &self,
        call: impl Into<AjaxCall>,
    ) -> Result<tokio::task::JoinHandle<AjaxResult>> {
        let pending = self.call(call)?;
        Ok(tokio::spawn(pending))
    }

    fn start(&self, options: RequestOptions) -> Result<PendingRequest> {
        let id = RequestId::new();
        let resolved = options
            .resolve(&self.inner.settings)
            .and_then(|resolved| Ok((self.assemble(&resolved)?, resolved)));

        let (request, resolved) = match resolved {
            Ok(parts) => parts,
            Err(e) => {
                tracing::error!(
                    target: "horizon_lattice_ajax::pipeline",
                    request_id = %id,
                    error = %e,
                    "Request rejected"
                );
                return Err(e);
            }
        };

        tracing::debug!(
            target: "horizon_lattice_ajax::pipeline",
            request_id = %id,
            method = %request.method,
            url = %request.url,
            "Dispatching request"
        );

        let observers = ProgressObservers {
            download: resolved.hooks.on_progress_hook().cloned(),
            upload: resolved.hooks.on_upload_progress_hook().cloned(),
        };
        let exchange = self.inner.transport.send(request, observers);

        Ok(PendingRequest {
            id,
            future: Box::pin(complete(id, exchange, resolved)),
        })
    }

    /// Build the outgoing request and run the pre-send interceptor.
    fn assemble(&self, resolved: &ResolvedRequest) -> Result<OutgoingRequest> {
        let payload = Payload::from_content(&resolved.content, self.inner.forms.as_deref());
        let url = self.inner.transport.resolve_url(&resolved.url)?;

        let mut request = if resolved.method.is_read_only() {
            OutgoingRequest::new(resolved.method, append_query(&url, &encode_query(&payload)))
        } else {
            let mut request = OutgoingRequest::new(resolved.method, url);
            request.body = RequestBody::Payload(payload);
            request
        };

        install_headers(&mut request, resolved.headers.as_deref())?;

        if let Some(before_send) = resolved.hooks.before_send_hook() {
            before_send(&mut request);
        }

        Ok(request)
    }
}

impl std::fmt::Debug for Ajax {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ajax")
            .field("settings", &self.inner.settings)
            .field("form_lookup", &self.inner.forms.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Ajax`].
pub struct AjaxBuilder {
    transport: Arc<dyn Transport>,
    settings: AjaxSettings,
    forms: Option<Arc<dyn FormLookup>>,
}

impl AjaxBuilder {
    /// Replace the default settings.
    pub fn settings(mut self, settings: AjaxSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Resolve selector strings in request content through `lookup`.
    pub fn form_lookup(mut self, lookup: impl FormLookup + 'static) -> Self {
        self.forms = Some(Arc::new(lookup));
        self
    }

    /// Build the instance.
    pub fn build(self) -> Ajax {
        Ajax {
            inner: Arc::new(AjaxInner {
                transport: self.transport,
                settings: self.settings,
                forms: self.forms,
            }),
        }
    }
}

/// Wait for the exchange, then run the post-processing stages in order.
async fn complete(
    id: RequestId,
    exchange: BoxFuture<'static, crate::http::Exchange>,
    resolved: ResolvedRequest,
) -> AjaxResult {
    let result = AjaxResult::new(exchange.await);

    tracing::debug!(
        target: "horizon_lattice_ajax::pipeline",
        request_id = %id,
        status = result.status(),
        has_error = result.has_error(),
        "Request completed"
    );

    if let Some(before_return) = resolved.hooks.before_return_hook() {
        before_return(&result);
    }
    if let Some(callback) = resolved.status_code.get(&result.status()) {
        callback(&result);
    }
    if !result.has_error()
        && let Some(success) = &resolved.success
    {
        success(&result);
    }
    if result.has_error()
        && let Some(error) = &resolved.error
    {
        error(&result);
    }

    result
}

/// A dispatched request.
///
/// Resolves to the [`AjaxResult`] once the transport reports completion and
/// the configured callbacks have run. The request is handed to the
/// transport at dispatch, but only makes progress while this is polled.
#[must_use = "requests do nothing unless awaited or spawned"]
pub struct PendingRequest {
    id: RequestId,
    future: BoxFuture<'static, AjaxResult>,
}

impl PendingRequest {
    /// The identifier logged for this request.
    pub fn id(&self) -> RequestId {
        self.id
    }
}

impl Future for PendingRequest {
    type Output = AjaxResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.get_mut().future.as_mut().poll(cx)
    }
}

impl std::fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequest")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
