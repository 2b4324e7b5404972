//! Transport layer: outgoing requests, completed exchanges and the network
//! primitive that connects them.
//!
//! # Example
//!
//! ```ignore
//! use horizon_lattice_ajax::http::{HttpClient, HttpMethod, OutgoingRequest, Transport};
//!
//! let client = HttpClient::builder()
//!     .base_url("https://example.com/")
//!     .build()?;
//!
//! let url = client.resolve_url("api/ping")?;
//! let exchange = client
//!     .send(OutgoingRequest::new(HttpMethod::Get, url), Default::default())
//!     .await;
//! println!("{} {}", exchange.status, exchange.status_text);
//! ```

mod client;
mod request;
mod response;
mod transport;

pub use client::{HttpClient, HttpClientBuilder, HttpClientConfig};
pub use request::{HttpMethod, OutgoingRequest, RequestBody};
pub use response::{Exchange, ResponseBody, TransferProgress};
pub use transport::{ProgressCallback, ProgressObservers, Transport};
