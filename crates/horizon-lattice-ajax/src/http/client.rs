//! reqwest-backed transport.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use reqwest::redirect::Policy;

use super::request::{OutgoingRequest, RequestBody};
use super::response::{Exchange, ResponseBody, TransferProgress};
use super::transport::{ProgressObservers, Transport};
use crate::ajax::{Payload, PayloadValue};
use crate::error::{AjaxError, Result};

const TARGET: &str = "horizon_lattice_ajax::transport";

/// Configuration for the HTTP client.
#[derive(Clone, Debug)]
pub struct HttpClientConfig {
    /// Request timeout.
    pub timeout: Option<Duration>,
    /// Connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Whether to follow redirects.
    pub follow_redirects: bool,
    /// Maximum number of redirects to follow.
    pub max_redirects: usize,
    /// Whether to enable cookie storage.
    pub cookies_enabled: bool,
    /// Default user agent.
    pub user_agent: Option<String>,
    /// Proxy URL.
    pub proxy: Option<String>,
    /// Base URL that relative request URLs are resolved against.
    pub base_url: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            connect_timeout: Some(Duration::from_secs(10)),
            follow_redirects: true,
            max_redirects: 10,
            cookies_enabled: true,
            user_agent: Some(format!(
                "HorizonLatticeAjax/{} (Rust)",
                env!("CARGO_PKG_VERSION")
            )),
            proxy: None,
            base_url: None,
        }
    }
}

/// Builder for creating an HTTP client with custom configuration.
pub struct HttpClientBuilder {
    config: HttpClientConfig,
    default_headers: http::HeaderMap,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClientBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: HttpClientConfig::default(),
            default_headers: http::HeaderMap::new(),
        }
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Disable request timeout.
    pub fn no_timeout(mut self) -> Self {
        self.config.timeout = None;
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Disable redirect following.
    pub fn no_redirects(mut self) -> Self {
        self.config.follow_redirects = false;
        self
    }

    /// Set the maximum number of redirects to follow.
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config.max_redirects = max;
        self
    }

    /// Disable cookie storage.
    pub fn no_cookies(mut self) -> Self {
        self.config.cookies_enabled = false;
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    /// Set a proxy URL.
    pub fn proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.config.proxy = Some(proxy_url.into());
        self
    }

    /// Resolve relative request URLs against `base_url`, the way a page
    /// resolves them against its document URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = Some(base_url.into());
        self
    }

    /// Add a default header that will be sent with every request.
    pub fn default_header(
        mut self,
        name: impl TryInto<http::HeaderName>,
        value: impl TryInto<http::HeaderValue>,
    ) -> Result<Self> {
        let name = name
            .try_into()
            .map_err(|_| AjaxError::InvalidHeader("Invalid header name".to_string()))?;
        let value = value
            .try_into()
            .map_err(|_| AjaxError::InvalidHeader("Invalid header value".to_string()))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Build the HTTP client.
    pub fn build(self) -> Result<HttpClient> {
        let mut builder = reqwest::Client::builder();

        if let Some(timeout) = self.config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = self.config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        if self.config.follow_redirects {
            builder = builder.redirect(Policy::limited(self.config.max_redirects));
        } else {
            builder = builder.redirect(Policy::none());
        }

        if self.config.cookies_enabled {
            builder = builder.cookie_store(true);
        }

        if let Some(ref ua) = self.config.user_agent {
            builder = builder.user_agent(ua);
        }

        if let Some(ref proxy_url) = self.config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| AjaxError::TransportUnavailable(format!("proxy: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let base_url = match self.config.base_url {
            Some(ref base) => Some(url::Url::parse(base)?),
            None => None,
        };

        builder = builder.default_headers(self.default_headers);

        let client = builder
            .build()
            .map_err(|e| AjaxError::TransportUnavailable(e.to_string()))?;

        Ok(HttpClient {
            inner: Arc::new(HttpClientInner {
                client,
                config: self.config,
                base_url,
            }),
        })
    }
}

/// Internal state for the HTTP client.
struct HttpClientInner {
    client: reqwest::Client,
    config: HttpClientConfig,
    base_url: Option<url::Url>,
}

/// A [`Transport`] that sends requests with reqwest.
///
/// The client is cheaply cloneable. Clones share the same connection pool
/// and configuration.
///
/// Payload bodies are sent as `multipart/form-data`. Any failure to obtain a
/// response is reported as a status-`0` exchange rather than an error.
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<HttpClientInner>,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration.
    pub fn new() -> Result<Self> {
        HttpClientBuilder::new().build()
    }

    /// Create a builder for configuring a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    /// Get the client's configuration.
    pub fn config(&self) -> &HttpClientConfig {
        &self.inner.config
    }
}

impl Transport for HttpClient {
    fn resolve_url(&self, url: &str) -> Result<String> {
        let resolved = match &self.inner.base_url {
            Some(base) => base.join(url)?,
            None => url::Url::parse(url)?,
        };
        Ok(resolved.into())
    }

    fn send(
        &self,
        request: OutgoingRequest,
        observers: ProgressObservers,
    ) -> BoxFuture<'static, Exchange> {
        let client = self.inner.client.clone();
        async move { execute(client, request, observers).await }.boxed()
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.inner.config)
            .finish()
    }
}

async fn execute(
    client: reqwest::Client,
    request: OutgoingRequest,
    observers: ProgressObservers,
) -> Exchange {
    let method = request.method;
    let url = request.url.clone();
    match round_trip(&client, request, &observers).await {
        Ok(exchange) => exchange,
        Err(err) => {
            tracing::warn!(target: TARGET, %method, %url, "Request failed without a response: {}", err);
            Exchange::network_failure(url)
        }
    }
}

async fn round_trip(
    client: &reqwest::Client,
    request: OutgoingRequest,
    observers: &ProgressObservers,
) -> Result<Exchange> {
    let has_body = !matches!(request.body, RequestBody::None);

    let mut req_builder = client
        .request(request.method.to_reqwest(), request.url.as_str())
        .headers(request.headers);

    match request.body {
        RequestBody::None => {}
        RequestBody::Payload(payload) => {
            req_builder = req_builder.multipart(to_multipart(&payload)?);
        }
        RequestBody::Text(text) => {
            req_builder = req_builder.body(text);
        }
        RequestBody::Bytes(bytes) => {
            req_builder = req_builder.body(bytes);
        }
    }

    let outgoing = req_builder.build()?;
    let upload_total = if has_body { upload_length(&outgoing) } else { None };
    let mut response = client.execute(outgoing).await?;

    if let Some(total) = upload_total {
        observers.notify_upload(TransferProgress {
            bytes_transferred: total,
            total_bytes: Some(total),
        });
    }

    let status = response.status();
    let final_url = response.url().to_string();
    let raw_headers = header_block(response.headers());
    let total_bytes = response.content_length();

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        body.extend_from_slice(&chunk);
        observers.notify_download(TransferProgress {
            bytes_transferred: body.len() as u64,
            total_bytes,
        });
    }

    tracing::trace!(target: TARGET, status = status.as_u16(), url = %final_url, bytes = body.len(), "Response received");

    Ok(Exchange {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
        url: final_url,
        body: ResponseBody::from_bytes(Bytes::from(body)),
        document: None,
        response_type: None,
        raw_headers: Some(raw_headers),
    })
}

/// Size of the body reqwest will put on the wire.
///
/// Multipart bodies are streamed, so their size comes from the
/// `Content-Length` reqwest computes for in-memory parts.
fn upload_length(request: &reqwest::Request) -> Option<u64> {
    let body = request.body()?;
    body.as_bytes().map(|bytes| bytes.len() as u64).or_else(|| {
        request
            .headers()
            .get(http::header::CONTENT_LENGTH)?
            .to_str()
            .ok()?
            .parse()
            .ok()
    })
}

/// Render response headers as a CRLF-delimited `name: value` block.
fn header_block(headers: &http::HeaderMap) -> String {
    let mut block = String::new();
    for (name, value) in headers {
        block.push_str(name.as_str());
        block.push_str(": ");
        block.push_str(&String::from_utf8_lossy(value.as_bytes()));
        block.push_str("\r\n");
    }
    block
}

/// Convert the payload into a multipart form, one part per entry.
fn to_multipart(payload: &Payload) -> Result<reqwest::multipart::Form> {
    let mut form = reqwest::multipart::Form::new();
    for (key, value) in payload.entries() {
        form = match value {
            PayloadValue::Text(text) => form.text(key.clone(), text.clone()),
            PayloadValue::Blob(blob) => {
                let mut part = reqwest::multipart::Part::bytes(blob.bytes.to_vec())
                    .file_name(blob.file_name.clone().unwrap_or_else(|| "blob".to_string()));
                if let Some(mime) = &blob.mime_type {
                    part = part
                        .mime_str(mime)
                        .map_err(|e| AjaxError::Request(format!("invalid MIME type '{mime}': {e}")))?;
                }
                form.part(key.clone(), part)
            }
        };
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_defaults() {
        let client = HttpClient::new().expect("default client");
        assert!(client.config().timeout.is_some());
        assert!(client.config().cookies_enabled);
        assert!(client.config().base_url.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(60))
            .no_cookies()
            .max_redirects(5)
            .build()
            .expect("client");

        assert_eq!(client.config().timeout, Some(Duration::from_secs(60)));
        assert!(!client.config().cookies_enabled);
        assert_eq!(client.config().max_redirects, 5);
    }

    #[test]
    fn test_resolve_relative_against_base() {
        let client = HttpClient::builder()
            .base_url("https://example.com/app/")
            .build()
            .expect("client");
        assert_eq!(
            client.resolve_url("api/items?a=1").unwrap(),
            "https://example.com/app/api/items?a=1"
        );
        assert_eq!(
            client.resolve_url("/root").unwrap(),
            "https://example.com/root"
        );
    }

    #[test]
    fn test_resolve_relative_without_base_fails() {
        let client = HttpClient::new().expect("client");
        let err = client.resolve_url("api/items").unwrap_err();
        assert!(matches!(err, AjaxError::InvalidUrl(_)));
    }

    #[test]
    fn test_invalid_base_url_rejected_at_build() {
        let result = HttpClient::builder().base_url("not a url").build();
        assert!(matches!(result, Err(AjaxError::InvalidUrl(_))));
    }

    fn build(body: RequestBody) -> reqwest::Request {
        let client = reqwest::Client::new();
        let builder = client.post("https://example.com/upload");
        match body {
            RequestBody::None => builder,
            RequestBody::Payload(payload) => builder.multipart(to_multipart(&payload).unwrap()),
            RequestBody::Text(text) => builder.body(text),
            RequestBody::Bytes(bytes) => builder.body(bytes),
        }
        .build()
        .unwrap()
    }

    #[test]
    fn test_upload_length_of_multipart_payload() {
        let payload = Payload::new().with("a", "1").with("b", "hello world");
        let request = build(RequestBody::Payload(payload));
        let length = upload_length(&request).expect("multipart length");
        let declared: u64 = request.headers()[http::header::CONTENT_LENGTH]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(length, declared);
        assert!(length > "1hello world".len() as u64);
    }

    #[test]
    fn test_upload_length_of_plain_bodies() {
        assert_eq!(upload_length(&build(RequestBody::Text("abc".into()))), Some(3));
        assert_eq!(
            upload_length(&build(RequestBody::Bytes(Bytes::from_static(b"12345")))),
            Some(5)
        );
        assert_eq!(upload_length(&build(RequestBody::None)), None);
    }

    #[test]
    fn test_header_block() {
        let mut headers = http::HeaderMap::new();
        headers.insert("content-type", http::HeaderValue::from_static("text/html"));
        headers.insert("x-trace", http::HeaderValue::from_static("a: b"));
        let block = header_block(&headers);
        assert!(block.contains("content-type: text/html\r\n"));
        assert!(block.contains("x-trace: a: b\r\n"));
    }
}
