//! Query-string encoding for read-only requests.
//!
//! A key with one value encodes as `key=value`. A key with several values
//! uses zero-based indexed brackets: `key[0]=a&key[1]=b`.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use super::payload::Payload;

/// Characters escaped in a URI component: everything except alphanumerics
/// and `- _ . ! ~ * ' ( )`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a single key or value.
pub fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, URI_COMPONENT).to_string()
}

/// Encode a payload as a query string, without a leading `?`.
///
/// An empty payload yields an empty string.
pub fn encode_query(payload: &Payload) -> String {
    let mut pairs = Vec::with_capacity(payload.len());
    for key in payload.keys() {
        let encoded_key = encode_component(key);
        let values = payload.get_all(key);
        if values.len() == 1 {
            pairs.push(format!(
                "{}={}",
                encoded_key,
                encode_component(values[0].as_query_text())
            ));
        } else {
            for (index, value) in values.iter().enumerate() {
                pairs.push(format!(
                    "{}[{}]={}",
                    encoded_key,
                    index,
                    encode_component(value.as_query_text())
                ));
            }
        }
    }
    pairs.join("&")
}

/// Append an encoded query to `url`. Nothing is appended for an empty query.
pub fn append_query(url: &str, query: &str) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{query}")
}

/// Parse a query string produced by [`encode_query`] back into keys and
/// their value lists.
///
/// Indexed keys (`k[0]`, `k[1]`) are folded back under `k`. Keys keep
/// first-seen order and values keep their order within a key.
pub fn parse_query(query: &str) -> Vec<(String, Vec<String>)> {
    let mut result: Vec<(String, Vec<String>)> = Vec::new();
    let query = query.strip_prefix('?').unwrap_or(query);

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(strip_index(raw_key));
        let value = decode_component(raw_value);

        match result.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => result.push((key, vec![value])),
        }
    }

    result
}

fn decode_component(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Strip a trailing `[digits]` suffix. Brackets that are part of the key
/// itself are percent-encoded, so a literal suffix is always an index.
fn strip_index(raw_key: &str) -> &str {
    if let Some(body) = raw_key.strip_suffix(']')
        && let Some(open) = body.rfind('[')
    {
        let index = &body[open + 1..];
        if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) {
            return &body[..open];
        }
    }
    raw_key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ajax::payload::{Blob, Content};
    use serde_json::json;

    #[test]
    fn test_empty_payload() {
        assert_eq!(encode_query(&Payload::new()), "");
        assert_eq!(append_query("/items", ""), "/items");
    }

    #[test]
    fn test_indexed_repeated_keys() {
        let content = Content::map([("a", json!("1")), ("b", json!(["x", "y"]))]);
        let payload = Payload::from_content(&content, None);
        assert_eq!(encode_query(&payload), "a=1&b[0]=x&b[1]=y");
    }

    #[test]
    fn test_interleaved_keys_group_by_first_occurrence() {
        let payload = Payload::new()
            .with("t", "1")
            .with("u", "x")
            .with("t", "2");
        assert_eq!(encode_query(&payload), "t[0]=1&t[1]=2&u=x");
    }

    #[test]
    fn test_percent_encoding_matches_uri_component() {
        let payload = Payload::new()
            .with("q", "a b&c=d")
            .with("safe", "-_.!~*'()")
            .with("ключ", "é/?#[]");
        assert_eq!(
            encode_query(&payload),
            "q=a%20b%26c%3Dd&safe=-_.!~*'()&%D0%BA%D0%BB%D1%8E%D1%87=%C3%A9%2F%3F%23%5B%5D"
        );
    }

    #[test]
    fn test_blob_uses_file_name() {
        let payload = Payload::new().with("upload", Blob::file(vec![0u8; 4], "photo 1.png", None));
        assert_eq!(encode_query(&payload), "upload=photo%201.png");
    }

    #[test]
    fn test_append_query() {
        assert_eq!(append_query("/items", "a=1"), "/items?a=1");
        assert_eq!(append_query("/items?page=2", "a=1"), "/items?page=2&a=1");
    }

    #[test]
    fn test_round_trip() {
        let payload = Payload::new()
            .with("name", "Ann Lee")
            .with("tags[]", "x")
            .with("id", "3")
            .with("id", "1")
            .with("id", "2")
            .with("empty", "");
        let parsed = parse_query(&encode_query(&payload));
        assert_eq!(
            parsed,
            vec![
                ("name".to_string(), vec!["Ann Lee".to_string()]),
                ("tags[]".to_string(), vec!["x".to_string()]),
                (
                    "id".to_string(),
                    vec!["3".to_string(), "1".to_string(), "2".to_string()]
                ),
                ("empty".to_string(), vec![String::new()]),
            ]
        );
    }

    #[test]
    fn test_parse_ignores_leading_question_mark() {
        assert_eq!(
            parse_query("?a=1"),
            vec![("a".to_string(), vec!["1".to_string()])]
        );
    }
}
