//! Open Packaging Convention (OPC) implementation
//!
//! This module handles the ZIP-based package format used by DOCX files.

mod content_types;
mod package;
mod parsed;
mod part;
mod part_uri;
mod relationships;
mod role;

pub use content_types::{
    ContentTypes, FONT_TABLE, MAIN_DOCUMENT, NUMBERING, RELATIONSHIPS, SETTINGS, STYLES, THEME,
    XML,
};
pub use package::Package;
pub use parsed::{ParsedPackage, ParsedPart};
pub use part::Part;
pub use part_uri::PartUri;
pub use relationships::{rel_types, Relationship, Relationships, TargetMode};
pub use role::PartRole;
