//! Resources that are never removed, whatever their reference count

use serde::Deserialize;
use std::collections::HashSet;

use crate::graph::{Definition, ResourceKind};

/// Built-in styles Word relies on even when nothing names them
const BUILTIN_STYLES: &[&str] = &[
    "Normal",
    "DefaultParagraphFont",
    "TableNormal",
    "NoList",
    "Heading1",
    "Heading2",
    "Heading3",
    "Heading4",
    "Heading5",
    "Heading6",
    "Heading7",
    "Heading8",
    "Heading9",
    "Title",
    "Subtitle",
    "TOC1",
    "TOC2",
    "TOC3",
    "TOC4",
    "TOC5",
    "TOC6",
    "TOC7",
    "TOC8",
    "TOC9",
    "Caption",
    "Hyperlink",
];

/// `w:numId="0"` means "no numbering" and must stay resolvable
const BUILTIN_NUMBERING: &[&str] = &["0"];

/// Relationship types resolved by type rather than by id
const IMPLICIT_RELATIONSHIPS: &[&str] = &[
    "officeDocument",
    "styles",
    "stylesWithEffects",
    "settings",
    "webSettings",
    "fontTable",
    "numbering",
    "theme",
    "footnotes",
    "endnotes",
    "comments",
    "commentsExtended",
    "commentsIds",
    "commentsExtensible",
    "people",
    "glossaryDocument",
    "customXml",
    "customXmlProps",
    "core-properties",
    "extended-properties",
    "custom-properties",
    "thumbnail",
    "diagramDrawing",
    "chartStyle",
    "chartColorStyle",
    "vbaProject",
];

/// User additions to the protected set
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProtectedConfig {
    /// Style ids or display names
    pub styles: Vec<String>,
    /// Relationship ids or type names (`"image"`, `"hyperlink"`, ...)
    pub relationships: Vec<String>,
    pub fonts: Vec<String>,
    /// Numbering ids (`"3"`, `"abstract:1"`)
    pub numbering: Vec<String>,
    pub bookmarks: Vec<String>,
    /// Media part paths (`/word/media/image1.png`)
    pub media: Vec<String>,
}

/// Protection rules, built once per run
#[derive(Clone, Debug)]
pub struct ProtectedSet {
    styles: HashSet<String>,
    relationships: HashSet<String>,
    fonts: HashSet<String>,
    numbering: HashSet<String>,
    bookmarks: HashSet<String>,
    media: HashSet<String>,
}

impl ProtectedSet {
    pub fn new(config: &ProtectedConfig) -> Self {
        let styles = BUILTIN_STYLES
            .iter()
            .map(|s| normalize_style(s))
            .chain(config.styles.iter().map(|s| normalize_style(s)))
            .collect();
        let relationships = IMPLICIT_RELATIONSHIPS
            .iter()
            .map(|s| s.to_string())
            .chain(config.relationships.iter().cloned())
            .collect();

        Self {
            styles,
            relationships,
            fonts: config.fonts.iter().cloned().collect(),
            numbering: BUILTIN_NUMBERING
                .iter()
                .map(|s| s.to_string())
                .chain(config.numbering.iter().cloned())
                .collect(),
            bookmarks: config.bookmarks.iter().cloned().collect(),
            media: config.media.iter().cloned().collect(),
        }
    }

    /// Whether `definition` must be kept
    pub fn covers(&self, definition: &Definition) -> bool {
        let id = definition.id.id.as_str();
        match definition.id.kind {
            ResourceKind::Part => true,
            ResourceKind::Style => {
                definition.meta.is_default
                    || self.styles.contains(&normalize_style(id))
                    || definition
                        .meta
                        .name
                        .as_deref()
                        .is_some_and(|name| self.styles.contains(&normalize_style(name)))
            }
            ResourceKind::Relationship => {
                self.relationships.contains(id)
                    || definition
                        .meta
                        .rel_type
                        .as_deref()
                        .and_then(|t| t.rsplit('/').next())
                        .is_some_and(|t| self.relationships.contains(t))
            }
            ResourceKind::Font => self.fonts.contains(id),
            ResourceKind::Numbering => self.numbering.contains(id),
            ResourceKind::Bookmark => !id.starts_with('_') || self.bookmarks.contains(id),
            ResourceKind::Media => self.media.contains(id),
        }
    }
}

/// `"heading 1"` and `"Heading1"` name the same built-in style
fn normalize_style(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
