//! Request options, defaults and call shapes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::payload::Content;
use super::result::AjaxResult;
use crate::error::{AjaxError, Result};
use crate::form::{Confirmation, FormSource};
use crate::http::{HttpMethod, OutgoingRequest, ProgressCallback, TransferProgress};

/// Callback receiving a finished result.
pub type ResultCallback = Arc<dyn Fn(&AjaxResult) + Send + Sync>;

/// Interceptor run on the assembled request before it is sent.
pub type BeforeSendHook = Arc<dyn Fn(&mut OutgoingRequest) + Send + Sync>;

/// Interceptor run on the result before any other callback sees it.
pub type BeforeReturnHook = Arc<dyn Fn(&AjaxResult) + Send + Sync>;

/// Default settings merged into every request.
///
/// Loadable from any serde format; missing fields take their defaults.
///
/// ```ignore
/// let settings: AjaxSettings = serde_json::from_str(r#"{"url": "/api", "interval_ms": 250}"#)?;
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AjaxSettings {
    /// URL used when a request names none.
    pub url: String,
    /// Verb used when a request names none.
    pub method: HttpMethod,
    /// Headers used when a request sets none.
    pub headers: Option<Vec<(String, String)>>,
    /// Cooldown before a guarded form accepts another submission.
    pub interval_ms: u64,
    /// Confirmation used by guarded forms that set none.
    #[serde(skip)]
    pub confirmation: Confirmation,
}

impl AjaxSettings {
    /// The guard cooldown as a duration.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for AjaxSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: HttpMethod::Get,
            headers: None,
            interval_ms: 1000,
            confirmation: Confirmation::Always,
        }
    }
}

/// Instrumentation hooks bundled together.
///
/// A hook set here takes precedence over the same hook set directly on
/// [`RequestOptions`].
#[derive(Clone, Default)]
pub struct RequestModifier {
    on_progress: Option<ProgressCallback>,
    on_upload_progress: Option<ProgressCallback>,
    before_send: Option<BeforeSendHook>,
    before_return: Option<BeforeReturnHook>,
}

impl RequestModifier {
    /// Create a modifier with no hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe download progress.
    pub fn on_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(TransferProgress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(f));
        self
    }

    /// Observe upload progress.
    pub fn on_upload_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(TransferProgress) + Send + Sync + 'static,
    {
        self.on_upload_progress = Some(Arc::new(f));
        self
    }

    /// Intercept the request before it is sent.
    pub fn before_send<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut OutgoingRequest) + Send + Sync + 'static,
    {
        self.before_send = Some(Arc::new(f));
        self
    }

    /// Intercept the result before callbacks run.
    pub fn before_return<F>(mut self, f: F) -> Self
    where
        F: Fn(&AjaxResult) + Send + Sync + 'static,
    {
        self.before_return = Some(Arc::new(f));
        self
    }

    /// Fill every hook missing here from `fallback`.
    fn or(self, fallback: RequestModifier) -> Self {
        Self {
            on_progress: self.on_progress.or(fallback.on_progress),
            on_upload_progress: self.on_upload_progress.or(fallback.on_upload_progress),
            before_send: self.before_send.or(fallback.before_send),
            before_return: self.before_return.or(fallback.before_return),
        }
    }

    pub(crate) fn on_progress_hook(&self) -> Option<&ProgressCallback> {
        self.on_progress.as_ref()
    }

    pub(crate) fn on_upload_progress_hook(&self) -> Option<&ProgressCallback> {
        self.on_upload_progress.as_ref()
    }

    pub(crate) fn before_send_hook(&self) -> Option<&BeforeSendHook> {
        self.before_send.as_ref()
    }

    pub(crate) fn before_return_hook(&self) -> Option<&BeforeReturnHook> {
        self.before_return.as_ref()
    }
}

impl std::fmt::Debug for RequestModifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestModifier")
            .field("on_progress", &self.on_progress.is_some())
            .field("on_upload_progress", &self.on_upload_progress.is_some())
            .field("before_send", &self.before_send.is_some())
            .field("before_return", &self.before_return.is_some())
            .finish()
    }
}

/// Options for a single request.
///
/// Every field is optional; unset fields fall back to [`AjaxSettings`] when
/// the request is dispatched.
///
/// # Example
///
/// ```ignore
/// let options = RequestOptions::new()
///     .url("/api/items")
///     .method("post")
///     .content(json!({"name": "lamp"}))
///     .status_code(409, |r| eprintln!("conflict: {}", r.text()))
///     .success(|r| println!("created: {:?}", r.value()));
/// ```
#[derive(Clone, Default)]
pub struct RequestOptions {
    url: Option<String>,
    method: Option<String>,
    content: Option<Content>,
    headers: Option<Vec<(String, String)>>,
    status_code: HashMap<u16, ResultCallback>,
    success: Option<ResultCallback>,
    error: Option<ResultCallback>,
    hooks: RequestModifier,
    modifier: Option<RequestModifier>,
}

impl RequestOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options given directly.
    pub fn from_options(options: RequestOptions) -> Self {
        options
    }

    /// Options for `url`. A URL set in `options` wins.
    pub fn from_url(url: impl Into<String>, options: RequestOptions) -> Self {
        Self {
            url: options.url.clone().or_else(|| Some(url.into())),
            ..options
        }
    }

    /// Options for submitting `form`.
    ///
    /// The form supplies the URL (its action), the verb (its method) and the
    /// content (its controls); any of these set in `options` wins.
    pub fn from_form(form: Arc<dyn FormSource>, options: RequestOptions) -> Self {
        Self {
            url: options.url.clone().or_else(|| Some(form.action())),
            method: options.method.clone().or_else(|| Some(form.method())),
            content: options.content.clone().or(Some(Content::Form(form))),
            ..options
        }
    }

    /// Set the request URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the verb. Parsed case-insensitively at dispatch.
    pub fn method(mut self, method: impl std::fmt::Display) -> Self {
        self.method = Some(method.to_string());
        self
    }

    /// Set the request content.
    pub fn content(mut self, content: impl Into<Content>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Alias for [`content`](Self::content).
    pub fn data(self, content: impl Into<Content>) -> Self {
        self.content(content)
    }

    /// Replace the request headers.
    pub fn headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers = Some(
            headers
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Add one request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(Vec::new)
            .push((name.into(), value.into()));
        self
    }

    /// Run `f` when the response has the given status.
    pub fn status_code<F>(mut self, status: u16, f: F) -> Self
    where
        F: Fn(&AjaxResult) + Send + Sync + 'static,
    {
        self.status_code.insert(status, Arc::new(f));
        self
    }

    /// Run `f` when the response is not an error.
    pub fn success<F>(mut self, f: F) -> Self
    where
        F: Fn(&AjaxResult) + Send + Sync + 'static,
    {
        self.success = Some(Arc::new(f));
        self
    }

    /// Run `f` when the response is an error, including network failure.
    pub fn error<F>(mut self, f: F) -> Self
    where
        F: Fn(&AjaxResult) + Send + Sync + 'static,
    {
        self.error = Some(Arc::new(f));
        self
    }

    /// Observe download progress.
    pub fn on_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(TransferProgress) + Send + Sync + 'static,
    {
        self.hooks = self.hooks.on_progress(f);
        self
    }

    /// Observe upload progress.
    pub fn on_upload_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(TransferProgress) + Send + Sync + 'static,
    {
        self.hooks = self.hooks.on_upload_progress(f);
        self
    }

    /// Intercept the request before it is sent.
    pub fn before_send<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut OutgoingRequest) + Send + Sync + 'static,
    {
        self.hooks = self.hooks.before_send(f);
        self
    }

    /// Intercept the result before callbacks run.
    pub fn before_return<F>(mut self, f: F) -> Self
    where
        F: Fn(&AjaxResult) + Send + Sync + 'static,
    {
        self.hooks = self.hooks.before_return(f);
        self
    }

    /// Attach a bundle of hooks.
    pub fn modifier(mut self, modifier: RequestModifier) -> Self {
        self.modifier = Some(modifier);
        self
    }

    /// Merge with `settings` into a request ready for dispatch.
    pub(crate) fn resolve(self, settings: &AjaxSettings) -> Result<ResolvedRequest> {
        let url = self.url.unwrap_or_else(|| settings.url.clone());
        if url.trim().is_empty() {
            return Err(AjaxError::invalid_request("URL wasn't specified"));
        }

        let method = match self.method.as_deref().map(str::trim) {
            Some(method) if !method.is_empty() => method.parse()?,
            _ => settings.method,
        };

        let hooks = match self.modifier {
            Some(modifier) => modifier.or(self.hooks),
            None => self.hooks,
        };

        Ok(ResolvedRequest {
            url,
            method,
            content: self.content.unwrap_or_default(),
            headers: self.headers.or_else(|| settings.headers.clone()),
            status_code: self.status_code,
            success: self.success,
            error: self.error,
            hooks,
        })
    }
}

impl std::fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut status_codes: Vec<_> = self.status_code.keys().copied().collect();
        status_codes.sort_unstable();
        f.debug_struct("RequestOptions")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("content", &self.content)
            .field("headers", &self.headers)
            .field("status_code", &status_codes)
            .field("success", &self.success.is_some())
            .field("error", &self.error.is_some())
            .field("hooks", &self.hooks)
            .field("modifier", &self.modifier)
            .finish()
    }
}

/// Options merged with the defaults, ready for dispatch.
pub(crate) struct ResolvedRequest {
    pub url: String,
    pub method: HttpMethod,
    pub content: Content,
    pub headers: Option<Vec<(String, String)>>,
    pub status_code: HashMap<u16, ResultCallback>,
    pub success: Option<ResultCallback>,
    pub error: Option<ResultCallback>,
    pub hooks: RequestModifier,
}

/// The three ways to start a request.
#[derive(Clone)]
pub enum AjaxCall {
    /// Everything comes from the options.
    Options(RequestOptions),
    /// A URL plus options.
    Url(String, RequestOptions),
    /// A form to submit plus options.
    Form(Arc<dyn FormSource>, RequestOptions),
}

impl AjaxCall {
    /// Collapse the call shape into a single set of options.
    pub fn into_options(self) -> RequestOptions {
        match self {
            Self::Options(options) => RequestOptions::from_options(options),
            Self::Url(url, options) => RequestOptions::from_url(url, options),
            Self::Form(form, options) => RequestOptions::from_form(form, options),
        }
    }
}

impl std::fmt::Debug for AjaxCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Options(options) => f.debug_tuple("Options").field(options).finish(),
            Self::Url(url, options) => f.debug_tuple("Url").field(url).field(options).finish(),
            Self::Form(form, options) => f
                .debug_tuple("Form")
                .field(&form.action())
                .field(options)
                .finish(),
        }
    }
}

impl From<RequestOptions> for AjaxCall {
    fn from(options: RequestOptions) -> Self {
        Self::Options(options)
    }
}

impl From<&str> for AjaxCall {
    fn from(url: &str) -> Self {
        Self::Url(url.to_string(), RequestOptions::default())
    }
}

impl From<String> for AjaxCall {
    fn from(url: String) -> Self {
        Self::Url(url, RequestOptions::default())
    }
}

impl From<Arc<dyn FormSource>> for AjaxCall {
    fn from(form: Arc<dyn FormSource>) -> Self {
        Self::Form(form, RequestOptions::default())
    }
}
