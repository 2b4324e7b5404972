//! AJAX requests and guarded form submission for Horizon Lattice.
//!
//! This crate sits on top of an asynchronous network primitive and provides:
//!
//! - **Request pipeline**: content of any shape (forms, plain maps, scalars,
//!   selector strings) is serialized into one payload, sent, and returned as
//!   an [`AjaxResult`] with lazily computed views
//! - **Form guard**: a form's submit events are turned into requests, with
//!   overlapping submissions suppressed and an optional confirmation step
//! - **HTTP transport**: a reqwest-backed [`HttpClient`] implementing the
//!   [`Transport`] seam
//!
//! # Requests
//!
//! ```ignore
//! use horizon_lattice_ajax::{Ajax, RequestOptions};
//! use serde_json::json;
//!
//! let ajax = Ajax::with_http_client()?;
//!
//! // GET: content becomes the query string, `?a=1&b[0]=x&b[1]=y`
//! let result = ajax
//!     .dispatch(
//!         RequestOptions::new()
//!             .url("https://example.com/items")
//!             .content(json!({"a": "1", "b": ["x", "y"]})),
//!     )?
//!     .await;
//!
//! println!("{} {:?}", result.status(), result.response_type());
//! ```
//!
//! Callbacks run in a fixed order once the response arrives: the
//! `status_code` callback for the received status, then `success` or
//! `error`:
//!
//! ```ignore
//! ajax.dispatch_url(
//!     "/items/7",
//!     RequestOptions::new()
//!         .method("DELETE")
//!         .status_code(404, |_| println!("already gone"))
//!         .error(|r| eprintln!("failed: {}", r.status())),
//! )?
//! .await;
//! ```
//!
//! Problems with the options themselves (no URL, an unknown verb, a bad
//! header) are returned by `dispatch`. A request that was sent always
//! resolves to a result; network failures show up as status `0`.
//!
//! # Defaults
//!
//! [`AjaxSettings`] holds the defaults merged into every request and can be
//! loaded from any serde format:
//!
//! ```ignore
//! let settings: AjaxSettings = serde_json::from_str(r#"{
//!     "method": "POST",
//!     "headers": [["X-Requested-With", "XMLHttpRequest"]],
//!     "interval_ms": 500
//! }"#)?;
//!
//! let ajax = Ajax::builder(HttpClient::new()?).settings(settings).build();
//! ```
//!
//! # Forms
//!
//! ```ignore
//! use horizon_lattice_ajax::form::{FormGuard, FormGuardOptions, SubmitEvent};
//!
//! let guard = FormGuard::bind(ajax, form, |event| {
//!     if let Some(result) = event.response() {
//!         println!("submitted: {}", result.status());
//!     }
//! }, FormGuardOptions::new().interval_ms(500.0));
//!
//! // From the host's submit event handler:
//! guard.submit(&mut SubmitEvent::new());
//! ```
//!
//! # Logging
//!
//! Events are emitted through `tracing` under the
//! `horizon_lattice_ajax::{pipeline, transport, form, result}` targets.
//! Installing a subscriber is up to the application.

pub mod ajax;
mod error;
pub mod form;
pub mod http;

pub use error::{AjaxError, Result};

// Re-export commonly used types at the crate root
pub use ajax::{
    Ajax, AjaxBuilder, AjaxCall, AjaxResult, AjaxSettings, Blob, Content, Document, Payload,
    PayloadValue, PendingRequest, RequestId, RequestModifier, RequestOptions, ResponseHeaders,
};
pub use form::{
    Confirmation, FormGuard, FormGuardOptions, FormLookup, FormSnapshot, FormSource, SubmitEvent,
    SubmitOutcome,
};
pub use http::{
    Exchange, HttpClient, HttpClientBuilder, HttpMethod, OutgoingRequest, ProgressObservers,
    TransferProgress, Transport,
};
