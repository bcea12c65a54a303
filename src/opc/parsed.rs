//! Read-only parsed view of a package, shared by every analysis stage

use log::warn;
use rayon::prelude::*;
use std::collections::BTreeMap;

use crate::error::Error;
use crate::opc::{Package, PartRole, PartUri};
use crate::xml::XmlDocument;

/// An XML part with its parsed tree
#[derive(Debug)]
pub struct ParsedPart {
    pub uri: PartUri,
    pub role: PartRole,
    pub document: XmlDocument,
}

/// Every XML part of a package parsed once.
///
/// Parts that fail to parse are recorded as [`Error::PartParse`] and left
/// out; the rest of the package is still available.
#[derive(Debug)]
pub struct ParsedPackage<'p> {
    package: &'p Package,
    main: Option<PartUri>,
    roles: BTreeMap<PartUri, PartRole>,
    parts: BTreeMap<PartUri, ParsedPart>,
    failures: Vec<(PartUri, String)>,
}

impl<'p> ParsedPackage<'p> {
    /// Parse all XML parts in parallel
    pub fn new(package: &'p Package) -> Self {
        let main = package.main_document_uri();

        let roles: BTreeMap<PartUri, PartRole> = package
            .parts()
            .map(|(uri, part)| (uri.clone(), PartRole::of(part, main.as_ref())))
            .collect();

        let xml_parts: Vec<_> = package.parts().filter(|(_, part)| part.is_xml()).collect();
        let results: Vec<_> = xml_parts
            .par_iter()
            .map(|(uri, part)| ((*uri).clone(), XmlDocument::parse(part.data())))
            .collect();

        let mut parts = BTreeMap::new();
        let mut failures = Vec::new();
        for (uri, result) in results {
            match result {
                Ok(document) => {
                    let role = roles.get(&uri).copied().unwrap_or(PartRole::Other);
                    parts.insert(uri.clone(), ParsedPart { uri, role, document });
                }
                Err(e) => {
                    warn!("{} is not well-formed, skipping it: {}", uri, e);
                    failures.push((uri, e.to_string()));
                }
            }
        }

        Self {
            package,
            main,
            roles,
            parts,
            failures,
        }
    }

    pub fn package(&self) -> &'p Package {
        self.package
    }

    /// URI of the main document, if the package names one
    pub fn main_document_uri(&self) -> Option<&PartUri> {
        self.main.as_ref()
    }

    /// Parsed parts in path order
    pub fn documents(&self) -> impl Iterator<Item = &ParsedPart> {
        self.parts.values()
    }

    pub fn get(&self, uri: &PartUri) -> Option<&ParsedPart> {
        self.parts.get(uri)
    }

    /// Parsed parts with the given role
    pub fn by_role(&self, role: PartRole) -> impl Iterator<Item = &ParsedPart> {
        self.parts.values().filter(move |p| p.role == role)
    }

    /// Role of any part, parsed or not
    pub fn role_of(&self, uri: &PartUri) -> PartRole {
        self.roles.get(uri).copied().unwrap_or(PartRole::Other)
    }

    /// Whether `uri` is an XML part that failed to parse
    pub fn failed(&self, uri: &PartUri) -> bool {
        self.roles.contains_key(uri)
            && !self.parts.contains_key(uri)
            && self.package.part(uri).is_some_and(|p| p.is_xml())
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Parse failures, one per part
    pub fn failures(&self) -> impl Iterator<Item = Error> + '_ {
        self.failures.iter().map(|(uri, message)| Error::PartParse {
            part: uri.to_string(),
            message: message.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::{rel_types, Part, MAIN_DOCUMENT, STYLES};

    #[test]
    fn test_broken_part_is_isolated() {
        let mut pkg = Package::new();
        pkg.add_part(Part::new(
            PartUri::new("/word/document.xml").unwrap(),
            MAIN_DOCUMENT,
            b"<w:document/>".to_vec(),
        ));
        pkg.add_part(Part::new(
            PartUri::new("/word/styles.xml").unwrap(),
            STYLES,
            b"<w:styles><w:style></w:styles>".to_vec(),
        ));
        pkg.add_part(Part::new(
            PartUri::new("/word/media/image1.png").unwrap(),
            "image/png",
            vec![0x89, 0x50],
        ));
        pkg.add_relationship(rel_types::OFFICE_DOCUMENT, "word/document.xml");

        let parsed = ParsedPackage::new(&pkg);
        let styles = PartUri::new("/word/styles.xml").unwrap();
        let image = PartUri::new("/word/media/image1.png").unwrap();

        assert_eq!(parsed.documents().count(), 1);
        assert_eq!(parsed.failures().count(), 1);
        assert!(parsed.failed(&styles));
        assert!(!parsed.failed(&image));
        assert_eq!(parsed.role_of(&styles), PartRole::Styles);
        assert_eq!(parsed.by_role(PartRole::MainDocument).count(), 1);
    }
}
