//! Payload serialization.
//!
//! Whatever the caller passes as request content is reduced to a
//! [`Payload`]: an ordered multi-map of string keys to text or blob values.
//! The payload is built once per request and only read afterwards.

use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;

use crate::form::{FormLookup, FormSource};

/// Binary content attached to a payload, such as an uploaded file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    /// Raw content.
    pub bytes: Bytes,
    /// File name reported to the server.
    pub file_name: Option<String>,
    /// MIME type, if known.
    pub mime_type: Option<String>,
}

impl Blob {
    /// Create an anonymous blob.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            file_name: None,
            mime_type: None,
        }
    }

    /// Create a named file.
    pub fn file(
        bytes: impl Into<Bytes>,
        file_name: impl Into<String>,
        mime_type: Option<&str>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            file_name: Some(file_name.into()),
            mime_type: mime_type.map(String::from),
        }
    }
}

/// A single payload value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PayloadValue {
    /// A scalar, already coerced to text.
    Text(String),
    /// Binary content.
    Blob(Blob),
}

impl PayloadValue {
    /// The text form of this value, as it appears in a query string.
    ///
    /// Blobs contribute their file name, or nothing.
    pub fn as_query_text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Blob(blob) => blob.file_name.as_deref().unwrap_or(""),
        }
    }

    /// Returns the text if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Blob(_) => None,
        }
    }
}

impl From<String> for PayloadValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for PayloadValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Blob> for PayloadValue {
    fn from(blob: Blob) -> Self {
        Self::Blob(blob)
    }
}

/// The canonical payload: an ordered multi-map.
///
/// Entries keep insertion order. A key may appear several times; its values
/// keep the order they were appended in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Payload {
    entries: Vec<(String, PayloadValue)>,
}

impl Payload {
    /// Create an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize request content into a payload.
    ///
    /// `lookup` resolves selector strings to forms. Without one, every
    /// string is treated as a scalar.
    pub fn from_content(content: &Content, lookup: Option<&dyn FormLookup>) -> Self {
        let mut payload = Self::new();
        match content {
            Content::Empty => {}
            Content::Form(form) => payload.extend_from_form(form.as_ref()),
            Content::Text(text) => {
                if text.is_empty() {
                    return payload;
                }
                match lookup.and_then(|l| l.find_form(text)) {
                    Some(form) => payload.extend_from_form(form.as_ref()),
                    None => payload.append("value", text.as_str()),
                }
            }
            Content::Map(entries) => {
                for (key, value) in entries {
                    match value {
                        Value::Array(items) => {
                            for item in items {
                                payload.append(key.clone(), coerce(item));
                            }
                        }
                        other => payload.append(key.clone(), coerce(other)),
                    }
                }
            }
            Content::Scalar(value) => {
                if !is_falsy(value) {
                    payload.append("value", coerce(value));
                }
            }
        }
        payload
    }

    /// Append a value under `key`, keeping any existing values.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<PayloadValue>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Builder-style [`append`](Self::append).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PayloadValue>) -> Self {
        self.append(key, value);
        self
    }

    /// All values stored under `key`, in append order.
    pub fn get_all(&self, key: &str) -> Vec<&PayloadValue> {
        self.entries
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v)
            .collect()
    }

    /// The first value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&PayloadValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Distinct keys in first-insertion order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for (key, _) in &self.entries {
            if !keys.contains(&key.as_str()) {
                keys.push(key);
            }
        }
        keys
    }

    /// Every entry in insertion order, repeated keys included.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &PayloadValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn extend_from_form(&mut self, form: &dyn FormSource) {
        self.entries.extend(form.fields());
    }
}

/// Request content, before serialization.
#[derive(Clone, Default)]
pub enum Content {
    /// Nothing to send.
    #[default]
    Empty,
    /// A form; every successful control is sent.
    Form(Arc<dyn FormSource>),
    /// A selector naming a form, or otherwise a plain string sent as `value`.
    Text(String),
    /// A plain mapping. Arrays are expanded into repeated keys; nested
    /// objects are sent as JSON text.
    Map(Vec<(String, Value)>),
    /// Any other scalar, sent as `value`.
    Scalar(Value),
}

impl Content {
    /// Build content from a form.
    pub fn form(form: impl FormSource + 'static) -> Self {
        Self::Form(Arc::new(form))
    }

    /// Build map content from key/value pairs.
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Arc<dyn FormSource>> for Content {
    fn from(form: Arc<dyn FormSource>) -> Self {
        Self::Form(form)
    }
}

impl From<Value> for Content {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Empty,
            Value::String(text) => Self::Text(text),
            Value::Object(map) => Self::Map(map.into_iter().collect()),
            other => Self::Scalar(other),
        }
    }
}

impl std::fmt::Debug for Content {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Form(form) => f.debug_tuple("Form").field(&form.action()).finish(),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
            Self::Scalar(value) => f.debug_tuple("Scalar").field(value).finish(),
        }
    }
}

/// Coerce a JSON value to the text that gets transmitted.
fn coerce(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FormSnapshot;
    use serde_json::json;

    struct OneForm;

    impl FormLookup for OneForm {
        fn find_form(&self, selector: &str) -> Option<Arc<dyn FormSource>> {
            (selector == "#login").then(|| {
                Arc::new(FormSnapshot::new("/login", "post").text("user", "ann"))
                    as Arc<dyn FormSource>
            })
        }
    }

    fn texts(payload: &Payload, key: &str) -> Vec<String> {
        payload
            .get_all(key)
            .into_iter()
            .map(|v| v.as_query_text().to_string())
            .collect()
    }

    #[test]
    fn test_empty_and_falsy_content() {
        assert!(Payload::from_content(&Content::Empty, None).is_empty());
        for falsy in [json!(null), json!(false), json!(0), json!("")] {
            assert!(Payload::from_content(&Content::from(falsy.clone()), None).is_empty());
            assert!(Payload::from_content(&Content::Scalar(falsy), None).is_empty());
        }
    }

    #[test]
    fn test_scalar_goes_under_value() {
        let payload = Payload::from_content(&Content::from(json!(42)), None);
        assert_eq!(texts(&payload, "value"), vec!["42"]);

        let payload = Payload::from_content(&Content::from(json!(true)), None);
        assert_eq!(texts(&payload, "value"), vec!["true"]);
    }

    #[test]
    fn test_map_coercion() {
        let content = Content::from(json!({
            "a": "1",
            "n": 2.5,
            "flag": false,
            "nothing": null,
            "nested": {"x": 1}
        }));
        let payload = Payload::from_content(&content, None);
        assert_eq!(texts(&payload, "a"), vec!["1"]);
        assert_eq!(texts(&payload, "n"), vec!["2.5"]);
        assert_eq!(texts(&payload, "flag"), vec!["false"]);
        assert_eq!(texts(&payload, "nothing"), vec!["null"]);
        assert_eq!(texts(&payload, "nested"), vec![r#"{"x":1}"#]);
    }

    #[test]
    fn test_map_arrays_become_repeated_keys() {
        let content = Content::map([("a", json!("1")), ("b", json!(["x", "y"]))]);
        let payload = Payload::from_content(&content, None);
        assert_eq!(payload.keys(), vec!["a", "b"]);
        assert_eq!(texts(&payload, "b"), vec!["x", "y"]);
    }

    #[test]
    fn test_selector_resolves_to_form() {
        let payload = Payload::from_content(&Content::from("#login"), Some(&OneForm));
        assert_eq!(texts(&payload, "user"), vec!["ann"]);
        assert!(payload.get("value").is_none());
    }

    #[test]
    fn test_unresolved_selector_is_a_scalar() {
        let payload = Payload::from_content(&Content::from("#missing"), Some(&OneForm));
        assert_eq!(texts(&payload, "value"), vec!["#missing"]);

        let payload = Payload::from_content(&Content::from("#login"), None);
        assert_eq!(texts(&payload, "value"), vec!["#login"]);
    }

    #[test]
    fn test_form_multi_values_preserved() {
        let form = FormSnapshot::new("/save", "post")
            .checkbox("tag", "red", true)
            .text("title", "hello")
            .checkbox("tag", "blue", true)
            .checkbox("tag", "green", false);
        let payload = Payload::from_content(&Content::form(form), None);
        assert_eq!(payload.keys(), vec!["tag", "title"]);
        assert_eq!(texts(&payload, "tag"), vec!["red", "blue"]);
    }

    #[test]
    fn test_deterministic() {
        let content = Content::map([("k", json!(["1", "2"])), ("z", json!(0))]);
        assert_eq!(
            Payload::from_content(&content, None),
            Payload::from_content(&content, None)
        );
    }

    #[test]
    fn test_blob_query_text() {
        let file = PayloadValue::from(Blob::file(vec![1, 2], "a.bin", None));
        assert_eq!(file.as_query_text(), "a.bin");
        assert_eq!(PayloadValue::from(Blob::new(vec![1])).as_query_text(), "");
    }
}
