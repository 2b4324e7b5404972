//! Response header parsing and outgoing header installation.
//!
//! # Case sensitivity
//!
//! [`ResponseHeaders::raw`] looks names up exactly as they were received,
//! while [`ResponseHeaders::contains`] and [`ResponseHeaders::get`] lowercase
//! the requested name first. Servers that send mixed-case names are therefore
//! only reachable through `raw`, and HTTP/2 servers (which always send
//! lowercase) are reachable through all three.

use http::{HeaderName, HeaderValue};

use crate::error::Result;
use crate::http::OutgoingRequest;

/// Headers of a completed response, parsed from the raw header block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    entries: Vec<(String, String)>,
}

impl ResponseHeaders {
    pub(crate) const EMPTY: Self = Self {
        entries: Vec::new(),
    };

    /// Parse a CRLF-delimited header block.
    ///
    /// Each line is split on its first `": "`; lines without one are skipped.
    /// When a name repeats, the later value replaces the earlier one but the
    /// name keeps its original position.
    pub fn parse(raw: Option<&str>) -> Self {
        let mut headers = Self::default();
        let Some(raw) = raw else {
            return headers;
        };

        for line in raw.split("\r\n") {
            let Some((name, value)) = line.split_once(": ") else {
                continue;
            };
            match headers.entries.iter_mut().find(|(n, _)| n == name) {
                Some((_, existing)) => *existing = value.to_string(),
                None => headers.entries.push((name.to_string(), value.to_string())),
            }
        }

        headers
    }

    /// Exact, case-sensitive lookup.
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if a header with the lowercased `name` was received.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Look up the lowercased `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.raw(&name.to_lowercase())
    }

    /// Headers in the order they were first received.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no headers were parsed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Install `headers` on an outgoing request, in order.
///
/// Repeated names are appended rather than replaced.
pub fn install_headers(
    request: &mut OutgoingRequest,
    headers: Option<&[(String, String)]>,
) -> Result<()> {
    let Some(headers) = headers else {
        return Ok(());
    };

    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        let value = HeaderValue::from_str(value)?;
        request.headers.append(name, value);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AjaxError;
    use crate::http::HttpMethod;

    const BLOB: &str = "Content-Type: text/html\r\nx-trace: abc\r\nX-Note: a: b\r\n";

    #[test]
    fn test_parse_none_is_empty() {
        assert!(ResponseHeaders::parse(None).is_empty());
        assert!(ResponseHeaders::parse(Some("")).is_empty());
    }

    #[test]
    fn test_split_on_first_separator() {
        let headers = ResponseHeaders::parse(Some(BLOB));
        assert_eq!(headers.len(), 3);
        assert_eq!(headers.raw("X-Note"), Some("a: b"));
    }

    #[test]
    fn test_lines_without_separator_are_dropped() {
        let headers = ResponseHeaders::parse(Some("HTTP/1.1 200 OK\r\nbroken:value\r\nok: 1"));
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.raw("ok"), Some("1"));
    }

    #[test]
    fn test_later_duplicate_overwrites() {
        let headers = ResponseHeaders::parse(Some("a: 1\r\nb: 2\r\na: 3\r\n"));
        assert_eq!(headers.raw("a"), Some("3"));
        let order: Vec<_> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn test_case_asymmetry() {
        let headers = ResponseHeaders::parse(Some(BLOB));

        // Exact lookup sees the received casing only.
        assert_eq!(headers.raw("Content-Type"), Some("text/html"));
        assert_eq!(headers.raw("content-type"), None);

        // Helper lookups lowercase the requested name.
        assert!(!headers.contains("Content-Type"));
        assert_eq!(headers.get("Content-Type"), None);
        assert_eq!(headers.get("X-TRACE"), Some("abc"));
        assert!(headers.contains("x-trace"));
    }

    #[test]
    fn test_install_headers_appends_in_order() {
        let mut request = OutgoingRequest::new(HttpMethod::Get, "/");
        let headers = vec![
            ("Accept".to_string(), "text/plain".to_string()),
            ("X-Tag".to_string(), "one".to_string()),
            ("X-Tag".to_string(), "two".to_string()),
        ];
        install_headers(&mut request, Some(&headers)).unwrap();

        assert_eq!(request.header("accept"), Some("text/plain"));
        let tags: Vec<_> = request
            .headers
            .get_all("x-tag")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(tags, vec!["one", "two"]);
    }

    #[test]
    fn test_install_none_is_noop() {
        let mut request = OutgoingRequest::new(HttpMethod::Get, "/");
        install_headers(&mut request, None).unwrap();
        assert!(request.headers.is_empty());
    }

    #[test]
    fn test_install_rejects_invalid_name() {
        let mut request = OutgoingRequest::new(HttpMethod::Get, "/");
        let headers = vec![("bad name".to_string(), "x".to_string())];
        let err = install_headers(&mut request, Some(&headers)).unwrap_err();
        assert!(matches!(err, AjaxError::InvalidHeader(_)));
    }
}
