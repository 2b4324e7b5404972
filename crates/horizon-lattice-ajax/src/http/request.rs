//! Outgoing request types.

use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::ajax::Payload;
use crate::error::AjaxError;

/// HTTP request methods.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// HTTP GET method.
    #[default]
    Get,
    /// HTTP POST method.
    Post,
    /// HTTP PUT method.
    Put,
    /// HTTP DELETE method.
    Delete,
    /// HTTP PATCH method.
    Patch,
    /// HTTP HEAD method.
    Head,
    /// HTTP OPTIONS method.
    Options,
}

impl HttpMethod {
    /// Convert to reqwest method.
    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
            Self::Patch => reqwest::Method::PATCH,
            Self::Head => reqwest::Method::HEAD,
            Self::Options => reqwest::Method::OPTIONS,
        }
    }

    /// Whether the payload travels in the query string instead of the body.
    pub fn is_read_only(self) -> bool {
        matches!(self, Self::Get | Self::Head)
    }

    /// The canonical uppercase verb.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = AjaxError;

    /// Parse a verb case-insensitively (`"post"`, `"Post"` and `"POST"` are equal).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "PATCH" => Ok(Self::Patch),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(AjaxError::InvalidMethod(s.to_string())),
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The body of an outgoing request.
#[derive(Clone, Debug, Default)]
pub enum RequestBody {
    /// No body (always the case for GET and HEAD).
    #[default]
    None,
    /// The serialized payload, sent as form data.
    Payload(Payload),
    /// Plain text body, usually installed by a `before_send` hook.
    Text(String),
    /// Raw binary body.
    Bytes(Bytes),
}

impl RequestBody {
    /// Returns the payload if the body carries one.
    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Self::Payload(payload) => Some(payload),
            _ => None,
        }
    }

    /// Length of the body in bytes, when it can be known before encoding.
    ///
    /// `None` for a missing body and for payloads, whose size depends on
    /// the transport's encoding.
    pub fn known_length(&self) -> Option<u64> {
        match self {
            Self::None => None,
            Self::Payload(_) => None,
            Self::Text(text) => Some(text.len() as u64),
            Self::Bytes(bytes) => Some(bytes.len() as u64),
        }
    }
}

/// A fully assembled request, ready for the transport.
///
/// `before_send` hooks receive this mutably, after headers are installed and
/// before it is handed over.
#[derive(Clone, Debug)]
pub struct OutgoingRequest {
    /// The HTTP method.
    pub method: HttpMethod,
    /// The request URL, including the query string for GET and HEAD.
    pub url: String,
    /// Request headers.
    pub headers: http::HeaderMap,
    /// Request body.
    pub body: RequestBody,
}

impl OutgoingRequest {
    /// Create a request with no headers and no body.
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: http::HeaderMap::new(),
            body: RequestBody::None,
        }
    }

    /// Get a header value as a string.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse_is_case_insensitive() {
        assert_eq!("post".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
        assert_eq!("Head".parse::<HttpMethod>().unwrap(), HttpMethod::Head);
        assert_eq!(" get ".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
    }

    #[test]
    fn test_method_parse_rejects_unknown() {
        let err = "FETCH".parse::<HttpMethod>().unwrap_err();
        assert_eq!(err, AjaxError::InvalidMethod("FETCH".into()));
    }

    #[test]
    fn test_read_only_methods() {
        assert!(HttpMethod::Get.is_read_only());
        assert!(HttpMethod::Head.is_read_only());
        assert!(!HttpMethod::Post.is_read_only());
        assert!(!HttpMethod::Delete.is_read_only());
    }

    #[test]
    fn test_method_serde_uses_uppercase() {
        let json = serde_json::to_string(&HttpMethod::Patch).unwrap();
        assert_eq!(json, "\"PATCH\"");
        let method: HttpMethod = serde_json::from_str("\"DELETE\"").unwrap();
        assert_eq!(method, HttpMethod::Delete);
    }

    #[test]
    fn test_known_length() {
        assert_eq!(RequestBody::None.known_length(), None);
        assert_eq!(RequestBody::Text("abc".into()).known_length(), Some(3));
        assert_eq!(RequestBody::Payload(Payload::new()).known_length(), None);
    }
}
