//! Form sources.
//!
//! A [`FormSource`] is anything that can report its successful controls,
//! its action URL and its method. [`FormSnapshot`] is a plain in-memory
//! form for hosts that do not have a document tree of their own.

use std::sync::Arc;

use bytes::Bytes;

use crate::ajax::{Blob, PayloadValue};

/// A form that can be submitted.
pub trait FormSource: Send + Sync {
    /// The successful controls, in document order.
    ///
    /// A control with several values appears once per value.
    fn fields(&self) -> Vec<(String, PayloadValue)>;

    /// The URL the form submits to.
    fn action(&self) -> String;

    /// The submission method, as written on the form.
    fn method(&self) -> String;
}

/// Resolves selector strings to forms.
pub trait FormLookup: Send + Sync {
    /// The form matched by `selector`, if there is one.
    fn find_form(&self, selector: &str) -> Option<Arc<dyn FormSource>>;
}

impl<F> FormLookup for F
where
    F: Fn(&str) -> Option<Arc<dyn FormSource>> + Send + Sync,
{
    fn find_form(&self, selector: &str) -> Option<Arc<dyn FormSource>> {
        self(selector)
    }
}

/// One `<option>` of a select control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectOption {
    /// Submitted value.
    pub value: String,
    /// Whether the option is selected.
    pub selected: bool,
}

/// The kind and state of a form control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlKind {
    /// A text-like input or textarea.
    Text(String),
    /// A checkbox.
    Checkbox { value: String, checked: bool },
    /// A radio button.
    Radio { value: String, checked: bool },
    /// A select control, single or multiple.
    Select(Vec<SelectOption>),
    /// A file input with its chosen files.
    File(Vec<Blob>),
    /// A button. Never submitted.
    Button(String),
}

/// A named control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormControl {
    name: String,
    kind: ControlKind,
    disabled: bool,
}

impl FormControl {
    /// Create an enabled control. An empty name makes it unnamed.
    pub fn new(name: impl Into<String>, kind: ControlKind) -> Self {
        Self {
            name: name.into(),
            kind,
            disabled: false,
        }
    }

    /// Mark the control disabled.
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// The control name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The control kind and state.
    pub fn kind(&self) -> &ControlKind {
        &self.kind
    }

    /// Append this control's submitted values to `out`.
    fn submit_into(&self, out: &mut Vec<(String, PayloadValue)>) {
        if self.name.is_empty() || self.disabled {
            return;
        }
        let name = &self.name;
        match &self.kind {
            ControlKind::Text(value) => out.push((name.clone(), value.as_str().into())),
            ControlKind::Checkbox { value, checked } | ControlKind::Radio { value, checked } => {
                if *checked {
                    out.push((name.clone(), value.as_str().into()));
                }
            }
            ControlKind::Select(options) => {
                for option in options.iter().filter(|o| o.selected) {
                    out.push((name.clone(), option.value.as_str().into()));
                }
            }
            ControlKind::File(files) if files.is_empty() => {
                // An empty file input still submits one empty, unnamed file.
                let empty = Blob::file(Bytes::new(), "", Some("application/octet-stream"));
                out.push((name.clone(), empty.into()));
            }
            ControlKind::File(files) => {
                for file in files {
                    out.push((name.clone(), file.clone().into()));
                }
            }
            ControlKind::Button(_) => {}
        }
    }
}

/// An in-memory form.
///
/// # Example
///
/// ```ignore
/// let form = FormSnapshot::new("/signup", "post")
///     .text("email", "ann@example.com")
///     .checkbox("newsletter", "yes", true)
///     .select("plan", [("free", false), ("pro", true)]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormSnapshot {
    action: String,
    method: String,
    controls: Vec<FormControl>,
}

impl FormSnapshot {
    /// Create a form with no controls.
    pub fn new(action: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            method: method.into(),
            controls: Vec::new(),
        }
    }

    /// Add any control.
    pub fn control(mut self, control: FormControl) -> Self {
        self.controls.push(control);
        self
    }

    /// Add a text input.
    pub fn text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.control(FormControl::new(name, ControlKind::Text(value.into())))
    }

    /// Add a checkbox.
    pub fn checkbox(self, name: impl Into<String>, value: impl Into<String>, checked: bool) -> Self {
        self.control(FormControl::new(
            name,
            ControlKind::Checkbox {
                value: value.into(),
                checked,
            },
        ))
    }

    /// Add a radio button.
    pub fn radio(self, name: impl Into<String>, value: impl Into<String>, checked: bool) -> Self {
        self.control(FormControl::new(
            name,
            ControlKind::Radio {
                value: value.into(),
                checked,
            },
        ))
    }

    /// Add a select control from `(value, selected)` pairs.
    pub fn select<V: Into<String>>(
        self,
        name: impl Into<String>,
        options: impl IntoIterator<Item = (V, bool)>,
    ) -> Self {
        let options = options
            .into_iter()
            .map(|(value, selected)| SelectOption {
                value: value.into(),
                selected,
            })
            .collect();
        self.control(FormControl::new(name, ControlKind::Select(options)))
    }

    /// Add a file input.
    pub fn file(self, name: impl Into<String>, files: impl IntoIterator<Item = Blob>) -> Self {
        self.control(FormControl::new(
            name,
            ControlKind::File(files.into_iter().collect()),
        ))
    }

    /// Add a button.
    pub fn button(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.control(FormControl::new(name, ControlKind::Button(value.into())))
    }

    /// All controls, successful or not.
    pub fn controls(&self) -> &[FormControl] {
        &self.controls
    }
}

impl FormSource for FormSnapshot {
    fn fields(&self) -> Vec<(String, PayloadValue)> {
        let mut fields = Vec::new();
        for control in &self.controls {
            control.submit_into(&mut fields);
        }
        fields
    }

    fn action(&self) -> String {
        self.action.clone()
    }

    fn method(&self) -> String {
        self.method.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(form: &FormSnapshot) -> Vec<String> {
        form.fields().into_iter().map(|(k, _)| k).collect()
    }

    #[test]
    fn test_successful_controls() {
        let form = FormSnapshot::new("/f", "post")
            .text("a", "1")
            .text("", "unnamed")
            .control(FormControl::new("b", ControlKind::Text("2".into())).disabled())
            .checkbox("c", "on", false)
            .radio("d", "x", true)
            .radio("d", "y", false)
            .button("go", "Send");

        assert_eq!(names(&form), vec!["a", "d"]);
        assert_eq!(form.fields()[1].1.as_text(), Some("x"));
    }

    #[test]
    fn test_select_contributes_each_selected_option() {
        let form = FormSnapshot::new("/f", "get").select("s", [("1", true), ("2", false), ("3", true)]);
        let values: Vec<_> = form
            .fields()
            .into_iter()
            .map(|(_, v)| v.as_query_text().to_string())
            .collect();
        assert_eq!(values, vec!["1", "3"]);
    }

    #[test]
    fn test_files_become_blobs() {
        let form = FormSnapshot::new("/f", "post").file(
            "docs",
            [
                Blob::file(vec![1u8], "a.txt", Some("text/plain")),
                Blob::file(vec![2u8], "b.txt", None),
            ],
        );
        let fields = form.fields();
        assert_eq!(fields.len(), 2);
        assert!(matches!(&fields[0].1, PayloadValue::Blob(b) if b.file_name.as_deref() == Some("a.txt")));
    }

    #[test]
    fn test_empty_file_input_submits_empty_file() {
        let form = FormSnapshot::new("/f", "post").file("upload", Vec::new());
        let fields = form.fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].1.as_query_text(), "");
    }

    #[test]
    fn test_closure_lookup() {
        let lookup = |selector: &str| -> Option<Arc<dyn FormSource>> {
            (selector == "form").then(|| Arc::new(FormSnapshot::new("/x", "get")) as Arc<dyn FormSource>)
        };
        assert!(lookup.find_form("form").is_some());
        assert!(lookup.find_form("#other").is_none());
    }
}
