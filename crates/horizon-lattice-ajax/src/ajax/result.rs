//! The result of a completed request.
//!
//! [`AjaxResult`] wraps the [`Exchange`] reported by the transport. Its core
//! fields are fixed at construction; the derived views (text, headers,
//! document, response type, JSON value) are computed on first access and
//! cached for the lifetime of the result. A derived view that cannot be
//! computed reads as `None`, and stays `None`.

use std::sync::OnceLock;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::document::Document;
use super::headers::ResponseHeaders;
use crate::error::Result;
use crate::http::{Exchange, ResponseBody};

/// A write-once cache slot for one derived field.
///
/// The first call to [`get_or_compute`](Self::get_or_compute) runs the
/// computation and stores its outcome, including a failed (`None`) one.
/// Later calls return the stored value without recomputing it.
pub struct Memo<T> {
    slot: OnceLock<Option<T>>,
}

impl<T> Memo<T> {
    /// Create an empty slot.
    pub const fn new() -> Self {
        Self {
            slot: OnceLock::new(),
        }
    }

    /// Return the cached value, computing it first if needed.
    pub fn get_or_compute(&self, compute: impl FnOnce() -> Option<T>) -> Option<&T> {
        self.slot.get_or_init(compute).as_ref()
    }

    /// Returns true once the computation has run.
    pub fn is_computed(&self) -> bool {
        self.slot.get().is_some()
    }
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.slot.get() {
            Some(value) => f.debug_tuple("Memo").field(value).finish(),
            None => f.write_str("Memo(<pending>)"),
        }
    }
}

/// The outcome of one request.
///
/// Created exactly once per completed exchange and shared read-only
/// afterwards.
#[derive(Debug)]
pub struct AjaxResult {
    exchange: Exchange,
    has_error: bool,
    headers: Memo<ResponseHeaders>,
    text: Memo<String>,
    document: Memo<Document>,
    response_type: Memo<String>,
    value: Memo<Value>,
}

impl AjaxResult {
    /// Wrap a completed exchange.
    pub fn new(exchange: Exchange) -> Self {
        let has_error = !(100..400).contains(&exchange.status);
        Self {
            exchange,
            has_error,
            headers: Memo::new(),
            text: Memo::new(),
            document: Memo::new(),
            response_type: Memo::new(),
            value: Memo::new(),
        }
    }

    /// HTTP status code, or `0` if no response was received.
    pub fn status(&self) -> u16 {
        self.exchange.status
    }

    /// Reason phrase.
    pub fn status_text(&self) -> &str {
        &self.exchange.status_text
    }

    /// The final response URL.
    pub fn url(&self) -> &str {
        &self.exchange.url
    }

    /// Returns true unless the status is in `100..400`.
    pub fn has_error(&self) -> bool {
        self.has_error
    }

    /// The underlying exchange.
    pub fn exchange(&self) -> &Exchange {
        &self.exchange
    }

    /// The raw response body.
    pub fn body(&self) -> &ResponseBody {
        &self.exchange.body
    }

    /// Parsed response headers.
    pub fn headers(&self) -> &ResponseHeaders {
        // Parsing cannot fail, so the slot is always filled.
        static EMPTY: ResponseHeaders = ResponseHeaders::EMPTY;
        self.headers
            .get_or_compute(|| {
                Some(ResponseHeaders::parse(
                    self.exchange.raw_headers.as_deref(),
                ))
            })
            .unwrap_or(&EMPTY)
    }

    /// The body as text.
    ///
    /// Binary bodies are decoded as lossy UTF-8. An empty body is `""`.
    pub fn text(&self) -> &str {
        self.text
            .get_or_compute(|| {
                Some(match &self.exchange.body {
                    ResponseBody::Empty => String::new(),
                    ResponseBody::Text(text) => text.clone(),
                    ResponseBody::Binary(bytes) => String::from_utf8_lossy(bytes).into_owned(),
                })
            })
            .map(String::as_str)
            .unwrap_or("")
    }

    /// The body as a markup document.
    ///
    /// A document supplied by the host wins. Otherwise the text is parsed
    /// when the `content-type` header mentions XML or HTML.
    pub fn document(&self) -> Option<&Document> {
        if let Some(document) = &self.exchange.document {
            return Some(document);
        }
        self.document.get_or_compute(|| {
            let content_type = self.headers().get("content-type")?;
            if !content_type.contains("xml") && !content_type.contains("html") {
                return None;
            }
            let mime = content_type.split(';').next().unwrap_or(content_type).trim();
            match Document::parse(self.text(), mime) {
                Ok(document) => Some(document),
                Err(e) => {
                    tracing::debug!(
                        target: "horizon_lattice_ajax::result",
                        url = %self.exchange.url,
                        error = %e,
                        "Response document could not be parsed"
                    );
                    None
                }
            }
        })
    }

    /// The response type.
    ///
    /// The type declared by the host, if non-empty. Otherwise the subtype of
    /// the `content-type` header: `application/json; charset=utf-8` gives
    /// `json`.
    pub fn response_type(&self) -> Option<&str> {
        self.response_type
            .get_or_compute(|| {
                let declared = self
                    .exchange
                    .response_type
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty());
                if let Some(declared) = declared {
                    return Some(declared.to_string());
                }

                let content_type = self.headers().get("content-type")?;
                let subtype = content_type.rsplit('/').next().unwrap_or(content_type);
                let subtype = subtype.split(';').next().unwrap_or(subtype).trim();
                Some(subtype.to_string())
            })
            .map(String::as_str)
    }

    /// The body parsed as JSON.
    pub fn value(&self) -> Option<&Value> {
        self.value
            .get_or_compute(|| match serde_json::from_str(self.text()) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::debug!(
                        target: "horizon_lattice_ajax::result",
                        url = %self.exchange.url,
                        error = %e,
                        "Response body is not JSON"
                    );
                    None
                }
            })
    }

    /// Deserialize the body into a typed value.
    ///
    /// Unlike [`value`](Self::value) this is not cached, and the parse
    /// error is returned.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(self.text())?)
    }
}

impl From<Exchange> for AjaxResult {
    fn from(exchange: Exchange) -> Self {
        Self::new(exchange)
    }
}
