//! Part URI handling for OPC packages

use crate::error::{Error, Result};
use std::fmt;

/// Represents a URI to a part within an OPC package.
///
/// Part URIs are always absolute paths starting with '/'.
/// Example: `/word/document.xml`
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartUri {
    path: String,
}

impl PartUri {
    /// Create a new PartUri from a string.
    ///
    /// The path will be normalized (leading '/' ensured, no trailing '/').
    pub fn new(path: &str) -> Result<Self> {
        let path = path.trim();

        if path.is_empty() {
            return Err(Error::InvalidPartUri("empty path".into()));
        }

        // Normalize: ensure leading '/', remove trailing '/'
        let normalized = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        let normalized = normalized.trim_end_matches('/').to_string();
        if normalized.is_empty() {
            return Err(Error::InvalidPartUri("root is not a part".into()));
        }

        // Validate: no double slashes, no '..' for now
        if normalized.contains("//") {
            return Err(Error::InvalidPartUri(format!(
                "invalid path '{}': contains double slashes",
                path
            )));
        }

        Ok(Self { path: normalized })
    }

    /// Get the path as a string slice
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// Get the file name portion
    pub fn file_name(&self) -> Option<&str> {
        self.path.rsplit('/').next()
    }

    /// Get the file extension
    pub fn extension(&self) -> Option<&str> {
        self.file_name()
            .and_then(|name| name.rsplit('.').next())
            .filter(|ext| !ext.is_empty() && !ext.contains('/'))
    }

    /// Get the parent directory URI
    pub fn parent(&self) -> Option<PartUri> {
        let pos = self.path.rfind('/')?;
        if pos == 0 {
            None
        } else {
            Some(PartUri {
                path: self.path[..pos].to_string(),
            })
        }
    }

    /// Get the relationships URI for this part.
    ///
    /// For `/word/document.xml`, returns `/word/_rels/document.xml.rels`
    pub fn relationships_uri(&self) -> PartUri {
        let file_name = self.file_name().unwrap_or("");
        let parent = self.parent().map(|p| p.path).unwrap_or_default();

        let rels_path = format!("{}/_rels/{}.rels", parent, file_name);
        PartUri { path: rels_path }
    }

    /// Resolve a relative path against this URI.
    ///
    /// For `/word/document.xml` and `../media/image1.png`, returns `/media/image1.png`
    pub fn resolve(&self, relative: &str) -> Result<PartUri> {
        let base_dir = self.parent().map(|p| p.path).unwrap_or_default();
        Self::resolve_in(&base_dir, relative)
    }

    /// Resolve a target of the package-level relationships (`/_rels/.rels`)
    pub fn resolve_from_root(relative: &str) -> Result<PartUri> {
        Self::resolve_in("", relative)
    }

    fn resolve_in(base_dir: &str, relative: &str) -> Result<PartUri> {
        if relative.starts_with('/') {
            // Absolute path
            return PartUri::new(relative);
        }

        let mut parts: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();

        for segment in relative.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    parts.pop();
                }
                s => parts.push(s),
            }
        }

        let resolved = format!("/{}", parts.join("/"));
        PartUri::new(&resolved)
    }

    /// Check if this URI points to a relationships file
    pub fn is_relationships(&self) -> bool {
        self.path.contains("/_rels/") && self.path.ends_with(".rels")
    }

    /// Check if this URI lives in a `media/` folder (images, audio, video)
    pub fn is_media(&self) -> bool {
        self.path.contains("/media/")
    }

    /// Percent-decode a relationship target (`my%20file.png`)
    pub fn decode_target(target: &str) -> String {
        let bytes = target.as_bytes();
        let mut out = Vec::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'%' && i + 2 < bytes.len() {
                let (hi, lo) = (bytes[i + 1], bytes[i + 2]);
                if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() {
                    out.push(hex_value(hi) << 4 | hex_value(lo));
                    i += 3;
                    continue;
                }
            }
            out.push(bytes[i]);
            i += 1;
        }
        String::from_utf8_lossy(&out).to_string()
    }
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}

impl fmt::Display for PartUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

impl std::str::FromStr for PartUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PartUri::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_with_leading_slash() {
        let uri = PartUri::new("/word/document.xml").unwrap();
        assert_eq!(uri.as_str(), "/word/document.xml");
    }

    #[test]
    fn test_new_without_leading_slash() {
        let uri = PartUri::new("word/document.xml").unwrap();
        assert_eq!(uri.as_str(), "/word/document.xml");
    }

    #[test]
    fn test_file_name() {
        let uri = PartUri::new("/word/document.xml").unwrap();
        assert_eq!(uri.file_name(), Some("document.xml"));
    }

    #[test]
    fn test_extension() {
        let uri = PartUri::new("/word/document.xml").unwrap();
        assert_eq!(uri.extension(), Some("xml"));
    }

    #[test]
    fn test_parent() {
        let uri = PartUri::new("/word/document.xml").unwrap();
        assert_eq!(uri.parent().unwrap().as_str(), "/word");
    }

    #[test]
    fn test_relationships_uri() {
        let uri = PartUri::new("/word/document.xml").unwrap();
        assert_eq!(uri.relationships_uri().as_str(), "/word/_rels/document.xml.rels");
    }

    #[test]
    fn test_resolve_relative() {
        let uri = PartUri::new("/word/document.xml").unwrap();
        let resolved = uri.resolve("../media/image1.png").unwrap();
        assert_eq!(resolved.as_str(), "/media/image1.png");
    }

    #[test]
    fn test_resolve_same_dir() {
        let uri = PartUri::new("/word/document.xml").unwrap();
        let resolved = uri.resolve("styles.xml").unwrap();
        assert_eq!(resolved.as_str(), "/word/styles.xml");
    }

    #[test]
    fn test_resolve_from_root() {
        let uri = PartUri::resolve_from_root("./word/document.xml").unwrap();
        assert_eq!(uri.as_str(), "/word/document.xml");
        assert!(PartUri::resolve_from_root("..").is_err());
    }

    #[test]
    fn test_is_media() {
        assert!(PartUri::new("/word/media/image1.png").unwrap().is_media());
        assert!(!PartUri::new("/word/document.xml").unwrap().is_media());
    }

    #[test]
    fn test_decode_target() {
        assert_eq!(PartUri::decode_target("media/my%20pic.png"), "media/my pic.png");
        assert_eq!(PartUri::decode_target("100%"), "100%");
    }

    #[test]
    fn test_ordering_follows_path() {
        let a = PartUri::new("/word/document.xml").unwrap();
        let b = PartUri::new("/word/styles.xml").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_is_relationships() {
        let rels = PartUri::new("/word/_rels/document.xml.rels").unwrap();
        assert!(rels.is_relationships());

        let doc = PartUri::new("/word/document.xml").unwrap();
        assert!(!doc.is_relationships());
    }
}
