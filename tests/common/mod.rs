//! In-memory DOCX fixtures for integration tests

#![allow(dead_code)]

use docx_sweep::opc::{
    rel_types, Part, TargetMode, FONT_TABLE, MAIN_DOCUMENT, NUMBERING, SETTINGS, STYLES, THEME,
};
use docx_sweep::{Package, PartUri};

pub const NS: &str = concat!(
    r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main""#
);

pub const HEADER: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn uri(path: &str) -> PartUri {
    PartUri::new(path).unwrap()
}

/// Builds a minimal WordprocessingML package part by part
#[derive(Default)]
pub struct DocxBuilder {
    body: String,
    styles: Option<String>,
    settings: Option<String>,
    theme: Option<String>,
    fonts: Option<String>,
    numbering: Option<String>,
    /// (id, type, target, external) relationships of the main document
    rels: Vec<(String, String, String, bool)>,
    /// Extra parts: (path, content type, bytes)
    parts: Vec<(String, String, Vec<u8>)>,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content of `w:body`
    pub fn body(mut self, xml: &str) -> Self {
        self.body = xml.to_string();
        self
    }

    /// Children of `w:styles`
    pub fn styles(mut self, xml: &str) -> Self {
        self.styles = Some(xml.to_string());
        self
    }

    /// Children of `w:settings`
    pub fn settings(mut self, xml: &str) -> Self {
        self.settings = Some(xml.to_string());
        self
    }

    /// Children of `a:theme`
    pub fn theme(mut self, xml: &str) -> Self {
        self.theme = Some(xml.to_string());
        self
    }

    /// Children of `w:fonts`
    pub fn fonts(mut self, xml: &str) -> Self {
        self.fonts = Some(xml.to_string());
        self
    }

    /// Children of `w:numbering`
    pub fn numbering(mut self, xml: &str) -> Self {
        self.numbering = Some(xml.to_string());
        self
    }

    pub fn rel(mut self, id: &str, rel_type: &str, target: &str) -> Self {
        self.rels.push((id.into(), rel_type.into(), target.into(), false));
        self
    }

    pub fn external_rel(mut self, id: &str, rel_type: &str, target: &str) -> Self {
        self.rels.push((id.into(), rel_type.into(), target.into(), true));
        self
    }

    pub fn part(mut self, path: &str, content_type: &str, data: impl Into<Vec<u8>>) -> Self {
        self.parts.push((path.into(), content_type.into(), data.into()));
        self
    }

    pub fn build(self) -> Package {
        let mut pkg = Package::new();
        let mut doc = Part::new(
            uri("/word/document.xml"),
            MAIN_DOCUMENT,
            format!("<w:document {}><w:body>{}</w:body></w:document>", NS, self.body).into_bytes(),
        );
        let rels = doc.ensure_relationships();

        let fixed = [
            (self.styles, "styles", "w:styles", STYLES, rel_types::STYLES),
            (self.settings, "settings", "w:settings", SETTINGS, rel_types::SETTINGS),
            (self.fonts, "fontTable", "w:fonts", FONT_TABLE, rel_types::FONT_TABLE),
            (self.numbering, "numbering", "w:numbering", NUMBERING, rel_types::NUMBERING),
        ];
        for (content, name, root, content_type, rel_type) in fixed {
            if let Some(content) = content {
                let path = format!("/word/{}.xml", name);
                rels.add(rel_type, &format!("{}.xml", name));
                pkg.add_part(Part::new(
                    uri(&path),
                    content_type,
                    format!("<{root} {}>{}</{root}>", NS, content, root = root).into_bytes(),
                ));
            }
        }
        if let Some(theme) = self.theme {
            rels.add(rel_types::THEME, "theme/theme1.xml");
            pkg.add_part(Part::new(
                uri("/word/theme/theme1.xml"),
                THEME,
                format!("<a:theme {} name=\"Office\">{}</a:theme>", NS, theme).into_bytes(),
            ));
        }

        for (id, rel_type, target, external) in &self.rels {
            let mode = if *external {
                TargetMode::External
            } else {
                TargetMode::Internal
            };
            rels.add_with_id(id, rel_type, target, mode);
        }
        for (path, content_type, data) in self.parts {
            pkg.add_part(Part::new(uri(&path), content_type, data));
        }

        pkg.add_part(doc);
        pkg.add_relationship(rel_types::OFFICE_DOCUMENT, "word/document.xml");
        pkg
    }
}

/// Current XML of a part
pub fn part_xml(pkg: &Package, path: &str) -> String {
    String::from_utf8(pkg.part(&uri(path)).unwrap().data().to_vec()).unwrap()
}
