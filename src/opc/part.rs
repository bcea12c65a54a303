//! Part representation for OPC packages

use crate::opc::{PartUri, Relationships};

/// A part within an OPC package
#[derive(Clone, Debug)]
pub struct Part {
    /// Part URI
    uri: PartUri,
    /// Content type
    content_type: String,
    /// Part data
    data: Vec<u8>,
    /// Part relationships (if any)
    relationships: Option<Relationships>,
    /// Raw `.rels` bytes that could not be parsed, written back untouched
    opaque_relationships: Option<Vec<u8>>,
    /// Whether this part has been modified
    modified: bool,
}

impl Part {
    /// Create a new part
    pub fn new(uri: PartUri, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            uri,
            content_type: content_type.into(),
            data,
            relationships: None,
            opaque_relationships: None,
            modified: false,
        }
    }

    /// Get the part URI
    pub fn uri(&self) -> &PartUri {
        &self.uri
    }

    /// Get the content type
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Get the raw data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether the part holds XML that can be parsed into a tree
    pub fn is_xml(&self) -> bool {
        let ct = self.content_type.as_str();
        if ct.ends_with("+xml") || ct.ends_with("/xml") {
            return true;
        }
        matches!(
            self.uri.extension().map(|e| e.to_ascii_lowercase()).as_deref(),
            Some("xml" | "rels" | "vml")
        )
    }

    /// Set the data
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
        self.modified = true;
    }

    /// Get relationships
    pub fn relationships(&self) -> Option<&Relationships> {
        self.relationships.as_ref()
    }

    /// Get mutable relationships
    pub fn relationships_mut(&mut self) -> Option<&mut Relationships> {
        self.relationships.as_mut()
    }

    /// Set relationships
    pub fn set_relationships(&mut self, rels: Relationships) {
        self.relationships = Some(rels);
        self.opaque_relationships = None;
    }

    /// Ensure relationships exist, creating if needed
    pub fn ensure_relationships(&mut self) -> &mut Relationships {
        self.relationships.get_or_insert_with(Relationships::new)
    }

    /// Keep a malformed `.rels` payload as-is
    pub(crate) fn set_opaque_relationships(&mut self, bytes: Vec<u8>) {
        self.relationships = None;
        self.opaque_relationships = Some(bytes);
    }

    /// Raw bytes of a `.rels` file that failed to parse
    pub fn opaque_relationships(&self) -> Option<&[u8]> {
        self.opaque_relationships.as_deref()
    }

    /// Check if the part has been modified
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Get the relationships URI for this part
    pub fn relationships_uri(&self) -> PartUri {
        self.uri.relationships_uri()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_xml() {
        let doc = Part::new(
            PartUri::new("/word/document.xml").unwrap(),
            crate::opc::MAIN_DOCUMENT,
            Vec::new(),
        );
        let image = Part::new(PartUri::new("/word/media/a.png").unwrap(), "image/png", Vec::new());
        let vml = Part::new(
            PartUri::new("/word/vmlDrawing1.vml").unwrap(),
            "application/vnd.openxmlformats-officedocument.vmlDrawing",
            Vec::new(),
        );

        assert!(doc.is_xml());
        assert!(!image.is_xml());
        assert!(vml.is_xml());
    }

    #[test]
    fn test_set_data_marks_modified() {
        let mut part = Part::new(PartUri::new("/a.xml").unwrap(), "application/xml", Vec::new());
        assert!(!part.is_modified());
        part.set_data(b"<a/>".to_vec());
        assert!(part.is_modified());
        assert!(part.ensure_relationships().is_empty());
    }
}
