//! XML trees for package parts, with namespace-aware lookup

mod document;
mod namespace;
mod raw;

pub use document::{NodePath, Visit, XmlDocument};
pub use namespace::*;
pub use raw::{attribute_len, RawXmlElement, RawXmlNode};

/// Whether an OOXML on/off value is set (missing value means on)
pub fn parse_on_off(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(v) => matches!(v, "1" | "true" | "on"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_element_roundtrip() {
        let xml = r#"<w:custom foo="a &amp; b"><w:child>text</w:child></w:custom>"#;
        let doc = XmlDocument::parse(xml.as_bytes()).unwrap();

        assert_eq!(doc.root.name, "w:custom");
        assert_eq!(doc.root.attr("foo"), Some("a & b"));
        assert_eq!(doc.root.children.len(), 1);

        let out = String::from_utf8(doc.to_bytes().unwrap()).unwrap();
        assert!(out.contains(r#"foo="a &amp; b""#));
    }

    #[test]
    fn test_remove_and_unwrap() {
        let mut root = RawXmlElement::new("w:p")
            .with_child(RawXmlElement::new("w:proofErr"))
            .with_child(
                RawXmlElement::new("w:hyperlink")
                    .with_child(RawXmlElement::new("w:r"))
                    .with_child(RawXmlElement::new("w:r")),
            );

        assert!(root.unwrap_at(&[1]).is_some());
        assert_eq!(root.children.len(), 3);

        let removed = root.remove_at(&[0]).unwrap();
        assert_eq!(removed.local_name(), "proofErr");
        assert!(root.child_elements().all(|c| c.local_name() == "r"));
        assert!(root.remove_at(&[]).is_none());
    }

    #[test]
    fn test_sizes() {
        let font = RawXmlElement::new("a:font")
            .with_attr("script", "Jpan")
            .with_attr("typeface", "Locale Fallback Font 0001");
        assert_eq!(font.serialized_len(), 60);
        assert_eq!(attribute_len("w:rsidR", "00A77B3E"), 19);
    }

    #[test]
    fn test_on_off() {
        assert!(parse_on_off(None));
        assert!(parse_on_off(Some("1")));
        assert!(!parse_on_off(Some("0")));
    }
}
