//! Error types for the ajax layer.
//!
//! Only configuration problems surface as errors. A request that reached the
//! transport always resolves to an [`AjaxResult`](crate::ajax::AjaxResult),
//! whatever its status; HTTP and network failures are carried by
//! `has_error()` instead.

/// Errors raised before a request is handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AjaxError {
    /// The request could not be assembled, e.g. no URL was given.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The URL could not be parsed or resolved.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The verb is not one the transport can send.
    #[error("Unsupported HTTP method: {0}")]
    InvalidMethod(String),

    /// Invalid header name or value.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// The network primitive could not be created.
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// The transport failed while talking to the server.
    #[error("HTTP request error: {0}")]
    Request(String),

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// Connection refused or failed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),
}

impl AjaxError {
    /// Create an invalid-request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Whether this error is raised before anything is sent.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_)
                | Self::InvalidUrl(_)
                | Self::InvalidMethod(_)
                | Self::InvalidHeader(_)
                | Self::TransportUnavailable(_)
        )
    }
}

impl From<reqwest::Error> for AjaxError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if err.is_builder() {
            Self::TransportUnavailable(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

impl From<url::ParseError> for AjaxError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for AjaxError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<http::header::InvalidHeaderName> for AjaxError {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for AjaxError {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

/// A specialized Result type for ajax operations.
pub type Result<T> = std::result::Result<T, AjaxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_classification() {
        assert!(AjaxError::invalid_request("URL wasn't specified").is_configuration());
        assert!(AjaxError::InvalidMethod("FETCH".into()).is_configuration());
        assert!(!AjaxError::Timeout.is_configuration());
        assert!(!AjaxError::Json("eof".into()).is_configuration());
    }

    #[test]
    fn test_display() {
        let err = AjaxError::invalid_request("URL wasn't specified");
        assert_eq!(err.to_string(), "Invalid request: URL wasn't specified");
    }

    #[test]
    fn test_header_error_conversion() {
        let err: AjaxError = http::HeaderName::from_bytes(b"bad header")
            .unwrap_err()
            .into();
        assert!(matches!(err, AjaxError::InvalidHeader(_)));
    }
}
