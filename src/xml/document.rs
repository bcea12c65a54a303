//! Whole-part XML documents and tree walking

use quick_xml::events::{BytesDecl, Event};
use quick_xml::{Reader, Writer};
use std::fmt;

use super::{NamespaceScope, RawXmlElement, RawXmlNode};
use crate::error::{Error, Result};

/// Location of an element inside a part, as child-node indices from the root.
///
/// The empty path is the root element. Ordering is document order, with an
/// ancestor sorting before its descendants.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Whether `self` equals `other` or lies inside it
    pub fn starts_with(&self, other: &NodePath) -> bool {
        self.0.starts_with(&other.0)
    }
}

impl From<&[usize]> for NodePath {
    fn from(indices: &[usize]) -> Self {
        Self(indices.to_vec())
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for index in &self.0 {
            write!(f, "/{}", index)?;
        }
        Ok(())
    }
}

/// Decision returned by a [`XmlDocument::walk`] visitor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visit {
    Descend,
    Skip,
}

/// XML declaration fields
#[derive(Clone, Debug, PartialEq)]
struct Declaration {
    version: String,
    encoding: Option<String>,
    standalone: Option<String>,
}

/// A parsed part: declaration, top-level misc nodes and the root element
#[derive(Clone, Debug, PartialEq)]
pub struct XmlDocument {
    declaration: Option<Declaration>,
    prolog: Vec<RawXmlNode>,
    /// Root element
    pub root: RawXmlElement,
    epilog: Vec<RawXmlNode>,
}

impl XmlDocument {
    /// Wrap a root element with a standalone UTF-8 declaration
    pub fn new(root: RawXmlElement) -> Self {
        Self {
            declaration: Some(Declaration {
                version: "1.0".into(),
                encoding: Some("UTF-8".into()),
                standalone: Some("yes".into()),
            }),
            prolog: Vec::new(),
            root,
            epilog: Vec::new(),
        }
    }

    /// Parse a whole part
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let xml = std::str::from_utf8(bytes)?;
        let mut reader = Reader::from_str(xml);

        let mut declaration = None;
        let mut prolog = Vec::new();
        let mut root = None;
        let mut epilog = Vec::new();
        let mut buf = Vec::new();

        loop {
            let event = reader.read_event_into(&mut buf)?;
            let misc = match event {
                Event::Decl(d) => {
                    declaration = Some(Declaration {
                        version: String::from_utf8_lossy(&d.version()?).to_string(),
                        encoding: d
                            .encoding()
                            .transpose()?
                            .map(|e| String::from_utf8_lossy(&e).to_string()),
                        standalone: d
                            .standalone()
                            .transpose()?
                            .map(|s| String::from_utf8_lossy(&s).to_string()),
                    });
                    None
                }
                Event::Start(e) => {
                    if root.is_some() {
                        return Err(Error::InvalidDocument("multiple root elements".into()));
                    }
                    root = Some(RawXmlElement::from_reader(&mut reader, &e)?);
                    None
                }
                Event::Empty(e) => {
                    if root.is_some() {
                        return Err(Error::InvalidDocument("multiple root elements".into()));
                    }
                    root = Some(RawXmlElement::from_empty(&e)?);
                    None
                }
                Event::Text(t) => {
                    let text = t.unescape()?.to_string();
                    if !text.trim().is_empty() {
                        return Err(Error::InvalidDocument("text outside the root element".into()));
                    }
                    (!text.is_empty()).then_some(RawXmlNode::Text(text))
                }
                Event::Comment(c) => Some(RawXmlNode::Comment(String::from_utf8_lossy(&c).to_string())),
                Event::End(e) => {
                    return Err(Error::InvalidDocument(format!(
                        "unmatched closing tag </{}>",
                        String::from_utf8_lossy(e.name().as_ref())
                    )))
                }
                Event::Eof => break,
                _ => None,
            };
            if let Some(node) = misc {
                if root.is_some() {
                    epilog.push(node);
                } else {
                    prolog.push(node);
                }
            }
            buf.clear();
        }

        let root = root.ok_or_else(|| Error::InvalidDocument("no root element".into()))?;
        Ok(Self {
            declaration,
            prolog,
            root,
            epilog,
        })
    }

    /// Serialize back to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        if let Some(decl) = &self.declaration {
            writer.write_event(Event::Decl(BytesDecl::new(
                &decl.version,
                decl.encoding.as_deref(),
                decl.standalone.as_deref(),
            )))?;
        }
        for node in &self.prolog {
            node.write_to(&mut writer)?;
        }
        self.root.write_to(&mut writer)?;
        for node in &self.epilog {
            node.write_to(&mut writer)?;
        }
        Ok(writer.into_inner())
    }

    /// Visit every element in document order with its path and namespace scope
    pub fn walk<F>(&self, mut visitor: F)
    where
        F: FnMut(&[usize], &RawXmlElement, &NamespaceScope) -> Visit,
    {
        let mut path = Vec::new();
        let mut scope = NamespaceScope::new();
        walk_element(&self.root, &mut path, &mut scope, &mut visitor);
    }

    /// Element at `path`
    pub fn element_at(&self, path: &NodePath) -> Option<&RawXmlElement> {
        self.root.element_at(path.indices())
    }
}

fn walk_element<F>(
    element: &RawXmlElement,
    path: &mut Vec<usize>,
    scope: &mut NamespaceScope,
    visitor: &mut F,
) where
    F: FnMut(&[usize], &RawXmlElement, &NamespaceScope) -> Visit,
{
    scope.push(element);
    if visitor(path, element, scope) == Visit::Descend {
        for (index, child) in element.children.iter().enumerate() {
            if let RawXmlNode::Element(child) = child {
                path.push(index);
                walk_element(child, path, scope, visitor);
                path.pop();
            }
        }
    }
    scope.pop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::W;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t xml:space="preserve"> a &amp; b </w:t></w:r></w:p></w:body></w:document>"#;

    #[test]
    fn test_parse_and_serialize_preserves_content() {
        let doc = XmlDocument::parse(DOC.as_bytes()).unwrap();
        let bytes = doc.to_bytes().unwrap();
        let again = XmlDocument::parse(&bytes).unwrap();
        assert_eq!(doc, again);

        let t = doc.element_at(&NodePath::from(vec![0, 0, 0, 0])).unwrap();
        assert_eq!(t.text(), " a & b ");
    }

    #[test]
    fn test_malformed_is_rejected() {
        assert!(XmlDocument::parse(b"<w:document><w:body></w:document>").is_err());
        assert!(XmlDocument::parse(b"<a>").is_err());
        assert!(XmlDocument::parse(b"").is_err());
    }

    #[test]
    fn test_walk_visits_in_document_order() {
        let doc = XmlDocument::parse(DOC.as_bytes()).unwrap();
        let mut seen = Vec::new();
        doc.walk(|path, el, scope| {
            if scope.is(el, W, "r") {
                seen.push(NodePath::from(path));
                return Visit::Skip;
            }
            Visit::Descend
        });
        assert_eq!(seen, vec![NodePath::from(vec![0, 0, 0])]);
    }

    #[test]
    fn test_node_path_ordering() {
        let parent = NodePath::from(vec![0, 2]);
        let child = NodePath::from(vec![0, 2, 1]);
        let later = NodePath::from(vec![0, 3]);
        assert!(parent < child && child < later);
        assert!(child.starts_with(&parent));
        assert!(!later.starts_with(&parent));
    }
}
