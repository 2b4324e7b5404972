//! Parsed markup documents.
//!
//! Responses typed as XML or HTML are parsed into a small element tree with
//! quick-xml. HTML is parsed leniently: end tags need not match and void
//! elements such as `<br>` need no closing tag. Anything quick-xml cannot
//! tokenize is an error, which the result view turns into `None`.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Errors raised while parsing a document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    /// The markup could not be tokenized.
    #[error("Malformed markup: {0}")]
    Syntax(String),

    /// Parsing finished without producing an element.
    #[error("Document has no root element")]
    NoRootElement,

    /// An XML element was still open at end of input.
    #[error("Unclosed element: {0}")]
    Unclosed(String),
}

const HTML_VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// A node in the element tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    /// A child element.
    Element(Element),
    /// Character data, unescaped.
    Text(String),
}

/// An element with its attributes and children.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    /// Create an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Tag name, including any namespace prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute value by exact name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Attributes in source order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Direct children.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Direct child elements.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// The first element named `name`, searching this element and then its
    /// descendants depth-first.
    pub fn find(&self, name: &str) -> Option<&Element> {
        if self.name == name {
            return Some(self);
        }
        self.child_elements().find_map(|child| child.find(name))
    }

    /// Every element named `name`, in document order.
    pub fn find_all<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect(name, &mut found);
        found
    }

    /// Concatenated text of this element and all its descendants.
    pub fn text(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    fn collect<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        if self.name == name {
            found.push(self);
        }
        for child in self.child_elements() {
            child.collect(name, found);
        }
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(text),
                Node::Element(element) => element.collect_text(out),
            }
        }
    }

    fn from_start(start: &BytesStart<'_>, html: bool) -> Self {
        let mut element = Self::new(String::from_utf8_lossy(start.name().as_ref()));
        let attributes = if html {
            start.html_attributes()
        } else {
            start.attributes()
        };
        for attr in attributes.flatten() {
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = String::from_utf8_lossy(&attr.value).to_string();
            element.attributes.push((key, value));
        }
        element
    }
}

/// A parsed XML or HTML document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    content_type: String,
    root: Element,
}

impl Document {
    /// Wrap an already-built element tree.
    pub fn new(content_type: impl Into<String>, root: Element) -> Self {
        Self {
            content_type: content_type.into(),
            root,
        }
    }

    /// Parse `text` as the given MIME type.
    ///
    /// Types mentioning `html` are parsed leniently; everything else is
    /// parsed as well-formed XML.
    pub fn parse(text: &str, content_type: &str) -> Result<Self, DocumentError> {
        let html = content_type.contains("html");

        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);
        if html {
            reader.config_mut().check_end_names = false;
        }

        let mut buf = Vec::new();
        let mut root: Option<Element> = None;
        let mut stack: Vec<Element> = Vec::new();

        loop {
            buf.clear();
            match reader.read_event_into(&mut buf) {
                Ok(Event::Eof) => break,
                Ok(Event::Start(start)) => {
                    let element = Element::from_start(&start, html);
                    if html && is_void(element.name()) {
                        attach(&mut stack, &mut root, element);
                    } else {
                        stack.push(element);
                    }
                }
                Ok(Event::Empty(empty)) => {
                    attach(&mut stack, &mut root, Element::from_start(&empty, html));
                }
                Ok(Event::End(end)) => {
                    if html && is_void(&String::from_utf8_lossy(end.name().as_ref())) {
                        continue;
                    }
                    if let Some(element) = stack.pop() {
                        attach(&mut stack, &mut root, element);
                    }
                }
                Ok(Event::Text(text)) => {
                    let content = match text.unescape() {
                        Ok(content) => content.into_owned(),
                        // Named HTML entities are not known to the XML unescaper.
                        Err(_) if html => String::from_utf8_lossy(&text).into_owned(),
                        Err(e) => return Err(DocumentError::Syntax(e.to_string())),
                    };
                    if !content.is_empty()
                        && let Some(parent) = stack.last_mut()
                    {
                        parent.children.push(Node::Text(content));
                    }
                }
                Ok(Event::CData(cdata)) => {
                    if let Some(parent) = stack.last_mut() {
                        let content = String::from_utf8_lossy(&cdata).into_owned();
                        parent.children.push(Node::Text(content));
                    }
                }
                Ok(_) => {}
                Err(e) => return Err(DocumentError::Syntax(e.to_string())),
            }
        }

        if let Some(open) = stack.last() {
            if !html {
                return Err(DocumentError::Unclosed(open.name.clone()));
            }
            while let Some(element) = stack.pop() {
                attach(&mut stack, &mut root, element);
            }
        }

        root.map(|root| Self::new(content_type, root))
            .ok_or(DocumentError::NoRootElement)
    }

    /// The MIME type this document was parsed as.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The document element.
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// The first element named `name` anywhere in the document.
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.root.find(name)
    }

    /// Concatenated text of the whole document.
    pub fn text(&self) -> String {
        self.root.text()
    }
}

fn is_void(name: &str) -> bool {
    HTML_VOID_ELEMENTS
        .iter()
        .any(|void| void.eq_ignore_ascii_case(name))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None => {
            // Only the first top-level element becomes the root.
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_xml() {
        let doc = Document::parse(
            r#"<?xml version="1.0"?><feed lang="en"><item id="1">One &amp; two</item><item id="2"/></feed>"#,
            "application/xml",
        )
        .unwrap();

        assert_eq!(doc.content_type(), "application/xml");
        assert_eq!(doc.root().name(), "feed");
        assert_eq!(doc.root().attribute("lang"), Some("en"));

        let items = doc.root().find_all("item");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].text(), "One & two");
        assert_eq!(items[1].attribute("id"), Some("2"));
    }

    #[test]
    fn test_cdata_is_text() {
        let doc = Document::parse("<a><![CDATA[<raw>]]></a>", "text/xml").unwrap();
        assert_eq!(doc.text(), "<raw>");
    }

    #[test]
    fn test_xml_rejects_mismatched_tags() {
        assert!(Document::parse("<a><b></a>", "application/xml").is_err());
    }

    #[test]
    fn test_xml_rejects_unclosed_root() {
        assert!(Document::parse("<a><b/>", "application/xml").is_err());
    }

    #[test]
    fn test_no_root_element() {
        assert_eq!(
            Document::parse("just text", "text/xml"),
            Err(DocumentError::NoRootElement)
        );
    }

    #[test]
    fn test_html_is_lenient() {
        let doc = Document::parse(
            "<html><body><p>Hello<br>world&nbsp;</p><img src=x.png></body></html>",
            "text/html",
        )
        .unwrap();

        assert_eq!(doc.root().name(), "html");
        let p = doc.find("p").unwrap();
        assert_eq!(p.child_elements().count(), 1);
        assert_eq!(doc.find("img").unwrap().attribute("src"), Some("x.png"));
    }

    #[test]
    fn test_html_unclosed_elements_are_closed_at_eof() {
        let doc = Document::parse("<div><span>hi", "text/html").unwrap();
        assert_eq!(doc.root().name(), "div");
        assert_eq!(doc.find("span").unwrap().text(), "hi");
    }
}
