//! Raw XML node types holding a part's tree verbatim

use quick_xml::escape::escape;
use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::BufRead;

use crate::error::{Error, Result};

/// Raw XML node
#[derive(Clone, Debug, PartialEq)]
pub enum RawXmlNode {
    /// Element node
    Element(RawXmlElement),
    /// Text node (unescaped)
    Text(String),
    /// CDATA section
    CData(String),
    /// Comment node
    Comment(String),
}

/// Raw XML element with attributes and children
#[derive(Clone, Debug, PartialEq)]
pub struct RawXmlElement {
    /// Full element name (with prefix, e.g., "w:rPr")
    pub name: String,
    /// Attributes as (name, unescaped value) pairs, in document order
    pub attributes: Vec<(String, String)>,
    /// Child nodes
    pub children: Vec<RawXmlNode>,
    /// Whether this was a self-closing element
    pub self_closing: bool,
}

impl RawXmlElement {
    /// Create a new empty element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: true,
        }
    }

    /// Read a complete element from XML reader (starting after the start tag was read)
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
        let attributes = read_attributes(start)?;

        let mut children = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    let child = Self::from_reader(reader, &e)?;
                    children.push(RawXmlNode::Element(child));
                }
                Event::Empty(e) => {
                    children.push(RawXmlNode::Element(Self::from_empty(&e)?));
                }
                Event::Text(t) => {
                    let text = t.unescape()?.to_string();
                    if !text.is_empty() {
                        children.push(RawXmlNode::Text(text));
                    }
                }
                Event::CData(c) => {
                    children.push(RawXmlNode::CData(
                        String::from_utf8_lossy(&c.into_inner()).to_string(),
                    ));
                }
                Event::Comment(c) => {
                    children.push(RawXmlNode::Comment(String::from_utf8_lossy(&c).to_string()));
                }
                Event::End(e) => {
                    let end_name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    if end_name == name {
                        break;
                    }
                }
                Event::Eof => {
                    return Err(Error::InvalidDocument(format!(
                        "unexpected end of input inside <{}>",
                        name
                    )))
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(Self {
            name,
            attributes,
            children,
            self_closing: false,
        })
    }

    /// Create from empty element tag
    pub fn from_empty(e: &BytesStart) -> Result<Self> {
        Ok(Self {
            name: String::from_utf8_lossy(e.name().as_ref()).to_string(),
            attributes: read_attributes(e)?,
            children: Vec::new(),
            self_closing: true,
        })
    }

    /// Write element to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new(&self.name);
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() && self.self_closing {
            writer.write_event(Event::Empty(start))?;
        } else {
            writer.write_event(Event::Start(start))?;
            for child in &self.children {
                child.write_to(writer)?;
            }
            writer.write_event(Event::End(BytesEnd::new(&self.name)))?;
        }

        Ok(())
    }

    /// Size of this element once serialized
    pub fn serialized_len(&self) -> usize {
        let mut writer = Writer::new(Vec::new());
        match self.write_to(&mut writer) {
            Ok(()) => writer.into_inner().len(),
            Err(_) => 0,
        }
    }

    /// Local part of the element name ("rPr" for "w:rPr")
    pub fn local_name(&self) -> &str {
        super::split_qname(&self.name).1
    }

    /// Get an attribute by its exact (prefixed) name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Remove an attribute by its exact name, returning the old value
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(k, _)| k == name)?;
        Some(self.attributes.remove(pos).1)
    }

    /// Iterate over child elements, skipping text and comments
    pub fn child_elements(&self) -> impl Iterator<Item = &RawXmlElement> {
        self.children.iter().filter_map(|c| match c {
            RawXmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Concatenated direct text content
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                RawXmlNode::Text(t) | RawXmlNode::CData(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Descend by child-node indices
    pub fn element_at(&self, path: &[usize]) -> Option<&RawXmlElement> {
        let mut current = self;
        for &index in path {
            current = match current.children.get(index)? {
                RawXmlNode::Element(e) => e,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Descend by child-node indices, mutably
    pub fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut RawXmlElement> {
        let mut current = self;
        for &index in path {
            current = match current.children.get_mut(index)? {
                RawXmlNode::Element(e) => e,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Detach the element at `path` (which must not be empty)
    pub fn remove_at(&mut self, path: &[usize]) -> Option<RawXmlElement> {
        let (&index, parent_path) = path.split_last()?;
        let parent = self.element_at_mut(parent_path)?;
        if !matches!(parent.children.get(index), Some(RawXmlNode::Element(_))) {
            return None;
        }
        match parent.children.remove(index) {
            RawXmlNode::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Replace the element at `path` with its own children
    pub fn unwrap_at(&mut self, path: &[usize]) -> Option<()> {
        let (&index, parent_path) = path.split_last()?;
        let parent = self.element_at_mut(parent_path)?;
        let children = match parent.children.get_mut(index)? {
            RawXmlNode::Element(e) => std::mem::take(&mut e.children),
            _ => return None,
        };
        parent.children.splice(index..=index, children);
        Some(())
    }

    /// Add an attribute
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Add a child element
    pub fn with_child(mut self, child: RawXmlElement) -> Self {
        self.children.push(RawXmlNode::Element(child));
        self.self_closing = false;
        self
    }
}

impl RawXmlNode {
    /// Write node to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        match self {
            RawXmlNode::Element(e) => e.write_to(writer),
            RawXmlNode::Text(t) => {
                writer.write_event(Event::Text(BytesText::new(t)))?;
                Ok(())
            }
            RawXmlNode::CData(t) => {
                writer.write_event(Event::CData(BytesCData::new(t.as_str())))?;
                Ok(())
            }
            RawXmlNode::Comment(c) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(c.as_str())))?;
                Ok(())
            }
        }
    }
}

/// Serialized size of a single ` name="value"` attribute
pub fn attribute_len(name: &str, value: &str) -> usize {
    // space, name, '=', two quotes
    name.len() + escape(value).len() + 4
}

fn read_attributes(start: &BytesStart) -> Result<Vec<(String, String)>> {
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        attributes.push((
            String::from_utf8_lossy(attr.key.as_ref()).to_string(),
            attr.unescape_value()?.to_string(),
        ));
    }
    Ok(attributes)
}
