//! Completed exchange records and transfer progress.

use bytes::Bytes;

use crate::ajax::Document;

/// The raw body of a completed response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ResponseBody {
    /// No body was received.
    #[default]
    Empty,
    /// A text-typed body.
    Text(String),
    /// A non-text body.
    Binary(Bytes),
}

impl ResponseBody {
    /// Build a body from received bytes, preferring text when the bytes are UTF-8.
    pub fn from_bytes(bytes: Bytes) -> Self {
        if bytes.is_empty() {
            return Self::Empty;
        }
        match std::str::from_utf8(&bytes) {
            Ok(text) => Self::Text(text.to_string()),
            Err(_) => Self::Binary(bytes),
        }
    }

    /// Returns true if nothing was received.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.is_empty(),
            Self::Binary(bytes) => bytes.is_empty(),
        }
    }
}

/// Everything the transport reports about one finished request.
///
/// This is the terminal outcome of [`Transport::send`](super::Transport::send).
/// Transport-level failures are reported here too, as status `0`.
#[derive(Clone, Debug, Default)]
pub struct Exchange {
    /// HTTP status code, or `0` if no response was received.
    pub status: u16,
    /// Reason phrase.
    pub status_text: String,
    /// The final URL after redirects.
    pub url: String,
    /// The received body.
    pub body: ResponseBody,
    /// A document the host already parsed, if any.
    pub document: Option<Document>,
    /// The response type declared by the host, if any.
    pub response_type: Option<String>,
    /// All response headers as a CRLF-delimited `Name: Value` block.
    pub raw_headers: Option<String>,
}

impl Exchange {
    /// Create an exchange with the given status and no body.
    pub fn new(status: u16, url: impl Into<String>) -> Self {
        Self {
            status,
            url: url.into(),
            ..Self::default()
        }
    }

    /// The outcome reported when no response could be obtained.
    pub fn network_failure(url: impl Into<String>) -> Self {
        Self::new(0, url)
    }

    /// Set the reason phrase.
    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = status_text.into();
        self
    }

    /// Set a text body.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.body = ResponseBody::Text(text.into());
        self
    }

    /// Set a binary body.
    pub fn with_bytes(mut self, bytes: impl Into<Bytes>) -> Self {
        self.body = ResponseBody::Binary(bytes.into());
        self
    }

    /// Set the raw header block.
    pub fn with_raw_headers(mut self, raw_headers: impl Into<String>) -> Self {
        self.raw_headers = Some(raw_headers.into());
        self
    }

    /// Append a single header line to the raw header block.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        let block = self.raw_headers.get_or_insert_with(String::new);
        block.push_str(name);
        block.push_str(": ");
        block.push_str(value);
        block.push_str("\r\n");
        self
    }

    /// Set the declared response type.
    pub fn with_response_type(mut self, response_type: impl Into<String>) -> Self {
        self.response_type = Some(response_type.into());
        self
    }

    /// Attach a document parsed by the host.
    pub fn with_document(mut self, document: Document) -> Self {
        self.document = Some(document);
        self
    }
}

/// Progress information for downloads/uploads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferProgress {
    /// Number of bytes transferred so far.
    pub bytes_transferred: u64,
    /// Total number of bytes, if known.
    pub total_bytes: Option<u64>,
}

impl TransferProgress {
    /// Get the progress as a fraction (0.0 to 1.0), if total is known.
    pub fn fraction(&self) -> Option<f64> {
        self.total_bytes.map(|total| {
            if total == 0 {
                1.0
            } else {
                self.bytes_transferred as f64 / total as f64
            }
        })
    }

    /// Get the progress as a percentage (0 to 100), if total is known.
    pub fn percent(&self) -> Option<u8> {
        self.fraction().map(|f| (f * 100.0).min(100.0) as u8)
    }
}
