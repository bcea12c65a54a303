//! What a part is for, inferred from its content type and name

use crate::opc::{Part, PartUri};

/// Role of a part inside a WordprocessingML package
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PartRole {
    MainDocument,
    Styles,
    Settings,
    Numbering,
    FontTable,
    Theme,
    Header,
    Footer,
    Footnotes,
    Endnotes,
    Comments,
    WebSettings,
    Media,
    Other,
}

/// (content type suffix, role), checked in order
const BY_CONTENT_TYPE: &[(&str, PartRole)] = &[
    (".main+xml", PartRole::MainDocument),
    ("wordprocessingml.styles+xml", PartRole::Styles),
    ("wordprocessingml.settings+xml", PartRole::Settings),
    ("wordprocessingml.numbering+xml", PartRole::Numbering),
    ("wordprocessingml.fontTable+xml", PartRole::FontTable),
    ("officedocument.theme+xml", PartRole::Theme),
    ("wordprocessingml.header+xml", PartRole::Header),
    ("wordprocessingml.footer+xml", PartRole::Footer),
    ("wordprocessingml.footnotes+xml", PartRole::Footnotes),
    ("wordprocessingml.endnotes+xml", PartRole::Endnotes),
    ("wordprocessingml.comments+xml", PartRole::Comments),
    ("wordprocessingml.webSettings+xml", PartRole::WebSettings),
];

impl PartRole {
    /// Role of `part`; `main` is the part named by the officeDocument relationship
    pub fn of(part: &Part, main: Option<&PartUri>) -> Self {
        let uri = part.uri();
        if main == Some(uri) {
            return PartRole::MainDocument;
        }
        if uri.is_media() {
            return PartRole::Media;
        }
        // Building-block parts carry their own styles and numbering
        if uri.as_str().contains("/glossary/") {
            return PartRole::Other;
        }

        let role = BY_CONTENT_TYPE
            .iter()
            .find(|(suffix, _)| part.content_type().ends_with(suffix))
            .map(|(_, role)| *role)
            .unwrap_or_else(|| Self::from_file_name(uri));

        // Only one part can be the main document
        match (role, main) {
            (PartRole::MainDocument, Some(_)) => PartRole::Other,
            _ => role,
        }
    }

    /// Fallback for packages with generic content types
    fn from_file_name(uri: &PartUri) -> Self {
        let Some(name) = uri.file_name() else {
            return PartRole::Other;
        };
        let stem = name.strip_suffix(".xml").unwrap_or(name);
        let numbered = |prefix: &str| {
            stem.strip_prefix(prefix)
                .is_some_and(|rest| rest.chars().all(|c| c.is_ascii_digit()))
        };

        match stem {
            "document" => PartRole::MainDocument,
            "styles" => PartRole::Styles,
            "settings" => PartRole::Settings,
            "numbering" => PartRole::Numbering,
            "fontTable" => PartRole::FontTable,
            "footnotes" => PartRole::Footnotes,
            "endnotes" => PartRole::Endnotes,
            "comments" => PartRole::Comments,
            "webSettings" => PartRole::WebSettings,
            _ if numbered("theme") => PartRole::Theme,
            _ if numbered("header") => PartRole::Header,
            _ if numbered("footer") => PartRole::Footer,
            _ => PartRole::Other,
        }
    }

    /// Parts holding document text
    pub fn is_story(self) -> bool {
        matches!(
            self,
            PartRole::MainDocument
                | PartRole::Header
                | PartRole::Footer
                | PartRole::Footnotes
                | PartRole::Endnotes
                | PartRole::Comments
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::{MAIN_DOCUMENT, STYLES};

    fn part(path: &str, content_type: &str) -> Part {
        Part::new(PartUri::new(path).unwrap(), content_type, Vec::new())
    }

    #[test]
    fn test_role_by_content_type() {
        assert_eq!(
            PartRole::of(&part("/word/styles.xml", STYLES), None),
            PartRole::Styles
        );
        assert_eq!(
            PartRole::of(&part("/word/media/image1.png", "image/png"), None),
            PartRole::Media
        );
    }

    #[test]
    fn test_role_by_file_name() {
        assert_eq!(
            PartRole::of(&part("/word/theme/theme1.xml", "application/xml"), None),
            PartRole::Theme
        );
        assert_eq!(
            PartRole::of(&part("/word/header12.xml", "application/xml"), None),
            PartRole::Header
        );
        assert_eq!(
            PartRole::of(&part("/word/headerx.xml", "application/xml"), None),
            PartRole::Other
        );
        assert_eq!(
            PartRole::of(&part("/word/glossary/styles.xml", STYLES), None),
            PartRole::Other
        );
    }

    #[test]
    fn test_main_document_follows_package_relationship() {
        let main = PartUri::new("/word/document2.xml").unwrap();
        let doc = part("/word/document.xml", MAIN_DOCUMENT);
        assert_eq!(PartRole::of(&doc, Some(&main)), PartRole::Other);

        let real = part("/word/document2.xml", MAIN_DOCUMENT);
        assert_eq!(PartRole::of(&real, Some(&main)), PartRole::MainDocument);
        assert!(PartRole::MainDocument.is_story());
        assert!(!PartRole::Styles.is_story());
    }
}
