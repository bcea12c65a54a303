//! Cruft scanners
//!
//! Each scanner looks at one structural dimension of the package and reports
//! what could be removed. Scanners only read; the executor is the only stage
//! that edits parts. Adding a category means adding an entry to [`SCANNERS`].

mod bookmark;
mod compat;
mod empty;
mod external_link;
mod locale_font;
mod proof;
mod rsid;

use log::{debug, info};
use rayon::prelude::*;

use crate::config::{Category, SweepConfig};
use crate::graph::ResourceId;
use crate::opc::{ParsedPackage, PartUri};
use crate::xml::{NodePath, RawXmlElement};

/// A single edit against a part
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    /// Drop the element at the path
    RemoveElement(NodePath),
    /// Drop one attribute of the element at the path
    StripAttribute(NodePath, String),
    /// Replace the element at the path with its children
    UnwrapElement(NodePath),
    /// Drop a relationship owned by `owner` (`None` for `/_rels/.rels`)
    RemoveRelationship { owner: Option<PartUri>, id: String },
    /// Drop the whole part
    RemovePart,
}

impl Action {
    /// Element the action edits, if any
    pub fn path(&self) -> Option<&NodePath> {
        match self {
            Action::RemoveElement(p) | Action::StripAttribute(p, _) | Action::UnwrapElement(p) => Some(p),
            Action::RemoveRelationship { .. } | Action::RemovePart => None,
        }
    }
}

/// Something that can be removed, with the edits that remove it
#[derive(Clone, Debug, PartialEq)]
pub struct Finding {
    pub category: Category,
    pub part: PartUri,
    pub actions: Vec<Action>,
    /// What is removed ("attribute", "element", "style", ...)
    pub kind: String,
    /// Name of the removed thing
    pub id: String,
    pub detail: String,
    pub reason: String,
    /// Serialized size of everything removed
    pub bytes: usize,
    /// Graph resource the finding removes, when it is one
    pub resource: Option<ResourceId>,
}

impl Finding {
    /// Removal of a whole element
    pub fn element(
        category: Category,
        part: &PartUri,
        path: &[usize],
        el: &RawXmlElement,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            category,
            part: part.clone(),
            actions: vec![Action::RemoveElement(NodePath::from(path))],
            kind: "element".to_string(),
            id: el.name.clone(),
            detail: String::new(),
            reason: reason.into(),
            bytes: el.serialized_len(),
            resource: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    /// Sort key: part path, then document order of the first edit
    pub fn sort_key(&self) -> (&PartUri, Option<&Action>) {
        (&self.part, self.actions.first())
    }
}

/// A scanner: reads the parsed package, returns findings in document order
pub type ScanFn = fn(&ParsedPackage<'_>, &SweepConfig) -> Vec<Finding>;

/// Registry of scanners by category
pub const SCANNERS: &[(Category, ScanFn)] = &[
    (Category::Rsid, rsid::scan),
    (Category::EmptyElement, empty::scan),
    (Category::LocaleFont, locale_font::scan),
    (Category::CompatSetting, compat::scan),
    (Category::Bookmark, bookmark::scan),
    (Category::ProofState, proof::scan),
    (Category::ExternalLinkDomain, external_link::scan),
];

/// Run every enabled scanner in parallel; results keep registry order
pub fn scan_all(parsed: &ParsedPackage<'_>, config: &SweepConfig) -> Vec<Finding> {
    let per_scanner: Vec<Vec<Finding>> = SCANNERS
        .par_iter()
        .filter(|(category, _)| config.is_enabled(*category))
        .map(|(category, scan)| {
            let findings = scan(parsed, config);
            debug!("{} scanner: {} findings", category, findings.len());
            findings
        })
        .collect();

    let findings: Vec<Finding> = per_scanner.into_iter().flatten().collect();
    info!("cruft scan: {} findings", findings.len());
    findings
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::opc::{rel_types, Package, Part, PartUri, MAIN_DOCUMENT, SETTINGS, THEME};

    pub const NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main""#;

    /// Package with a main document body and optional settings and theme
    pub fn package(body: &str, settings: Option<&str>, theme: Option<&str>) -> Package {
        let mut pkg = Package::new();
        let mut doc = Part::new(
            PartUri::new("/word/document.xml").unwrap(),
            MAIN_DOCUMENT,
            format!("<w:document {}><w:body>{}</w:body></w:document>", NS, body).into_bytes(),
        );
        if let Some(settings) = settings {
            doc.ensure_relationships().add(rel_types::SETTINGS, "settings.xml");
            pkg.add_part(Part::new(
                PartUri::new("/word/settings.xml").unwrap(),
                SETTINGS,
                format!("<w:settings {}>{}</w:settings>", NS, settings).into_bytes(),
            ));
        }
        if let Some(theme) = theme {
            doc.ensure_relationships().add(rel_types::THEME, "theme/theme1.xml");
            pkg.add_part(Part::new(
                PartUri::new("/word/theme/theme1.xml").unwrap(),
                THEME,
                format!("<a:theme {}>{}</a:theme>", NS, theme).into_bytes(),
            ));
        }
        pkg.add_part(doc);
        pkg.add_relationship(rel_types::OFFICE_DOCUMENT, "word/document.xml");
        pkg
    }
}
