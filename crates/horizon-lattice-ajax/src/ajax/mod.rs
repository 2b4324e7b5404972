//! The request/response pipeline.
//!
//! Content of any shape is serialized into a [`Payload`], sent through a
//! [`Transport`](crate::http::Transport) and returned as an [`AjaxResult`]
//! whose derived views are computed lazily.
//!
//! # Example
//!
//! ```ignore
//! use horizon_lattice_ajax::ajax::{Ajax, RequestOptions};
//! use serde_json::json;
//!
//! let ajax = Ajax::with_http_client()?;
//! let result = ajax
//!     .dispatch(
//!         RequestOptions::new()
//!             .url("https://example.com/search")
//!             .content(json!({"q": "lamp", "tag": ["new", "sale"]}))
//!             .status_code(404, |_| println!("nothing found"))
//!             .success(|r| println!("{:?}", r.value())),
//!     )?
//!     .await;
//! ```

mod document;
mod headers;
mod options;
mod payload;
mod pipeline;
mod query;
mod result;

pub use document::{Document, DocumentError, Element, Node};
pub use headers::{ResponseHeaders, install_headers};
pub use options::{
    AjaxCall, AjaxSettings, BeforeReturnHook, BeforeSendHook, RequestModifier, RequestOptions,
    ResultCallback,
};
pub use payload::{Blob, Content, Payload, PayloadValue};
pub use pipeline::{Ajax, AjaxBuilder, PendingRequest, RequestId};
pub use query::{append_query, encode_component, encode_query, parse_query};
pub use result::{AjaxResult, Memo};
