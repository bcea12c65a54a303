//! XML namespaces used in OOXML and prefix resolution

use super::RawXmlElement;

/// WordprocessingML main namespace
pub const W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
/// Relationships namespace
pub const R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
/// DrawingML main namespace
pub const A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
/// Legacy VML office namespace (carries `o:relid`)
pub const O: &str = "urn:schemas-microsoft-com:office:office";
/// Content Types namespace
pub const CT: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
/// Package Relationships namespace
pub const PR: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
/// The implicitly bound `xml:` namespace
pub const XML: &str = "http://www.w3.org/XML/1998/namespace";

/// Split a qualified name into (prefix, local name)
pub fn split_qname(name: &str) -> (&str, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (prefix, local),
        None => ("", name),
    }
}

/// In-scope prefix bindings while walking a tree
#[derive(Clone, Debug, Default)]
pub struct NamespaceScope {
    bindings: Vec<(String, String)>,
    marks: Vec<usize>,
}

impl NamespaceScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter an element, adding its `xmlns` declarations
    pub fn push(&mut self, element: &RawXmlElement) {
        self.marks.push(self.bindings.len());
        for (key, value) in &element.attributes {
            if key == "xmlns" {
                self.bindings.push((String::new(), value.clone()));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                self.bindings.push((prefix.to_string(), value.clone()));
            }
        }
    }

    /// Leave the most recently entered element
    pub fn pop(&mut self) {
        if let Some(mark) = self.marks.pop() {
            self.bindings.truncate(mark);
        }
    }

    /// Namespace URI bound to `prefix` ("" is the default namespace)
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML);
        }
        self.bindings
            .iter()
            .rev()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    /// Whether `element` is `{ns}local`
    pub fn is(&self, element: &RawXmlElement, ns: &str, local: &str) -> bool {
        let (prefix, name) = split_qname(&element.name);
        name == local && self.resolve(prefix) == Some(ns)
    }

    /// Namespace of an attribute key; unprefixed attributes have none
    pub fn attr_namespace(&self, key: &str) -> Option<&str> {
        let (prefix, _) = split_qname(key);
        if prefix.is_empty() || prefix == "xmlns" {
            None
        } else {
            self.resolve(prefix)
        }
    }

    /// Value of the `{ns}local` attribute of `element`
    pub fn attr<'e>(&self, element: &'e RawXmlElement, ns: &str, local: &str) -> Option<&'e str> {
        element
            .attributes
            .iter()
            .find(|(key, _)| {
                let (prefix, name) = split_qname(key);
                !prefix.is_empty() && name == local && self.resolve(prefix) == Some(ns)
            })
            .map(|(_, value)| value.as_str())
    }

    /// Exact key of the `{ns}local` attribute, if present
    pub fn attr_key<'e>(&self, element: &'e RawXmlElement, ns: &str, local: &str) -> Option<&'e str> {
        element
            .attributes
            .iter()
            .find(|(key, _)| {
                let (prefix, name) = split_qname(key);
                !prefix.is_empty() && name == local && self.resolve(prefix) == Some(ns)
            })
            .map(|(key, _)| key.as_str())
    }

    /// `w:val` of a WordprocessingML element
    pub fn w_val<'e>(&self, element: &'e RawXmlElement) -> Option<&'e str> {
        self.attr(element, W, "val")
    }
}
