//! Error types for docx-sweep

use thiserror::Error;

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML encoding error: {0}")]
    XmlEncoding(#[from] quick_xml::encoding::EncodingError),

    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing required part: {0}")]
    MissingPart(String),

    #[error("Invalid part URI: {0}")]
    InvalidPartUri(String),

    #[error("Invalid relationship: {0}")]
    InvalidRelationship(String),

    #[error("Missing attribute '{attr}' on element '{element}'")]
    MissingAttribute { element: String, attr: String },

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Part not found: {0}")]
    PartNotFound(String),

    /// A single part is not well-formed; other parts are still analyzed
    #[error("Part {part} could not be parsed: {message}")]
    PartParse { part: String, message: String },

    /// A definition is declared twice within its scope; the first one wins
    #[error("Duplicate definition of {id} in {part}")]
    DuplicateDefinition { id: String, part: String },

    /// A dependency chain loops back on itself; every member is kept
    #[error("Reference cycle in {relation} chain: {}", chain.join(" -> "))]
    ReferenceCycle { relation: String, chain: Vec<String> },

    /// A value shaped like a resource id in a position no extraction rule covers
    #[error("Unrecognized reference {attribute}=\"{value}\" on <{element}> in {part}")]
    UnknownResourceKind {
        part: String,
        element: String,
        attribute: String,
        value: String,
    },

    /// A planned edit could not be carried out against the package
    #[error("Could not apply removal in {part}: {message}")]
    Apply { part: String, message: String },

    #[error("Transaction is {state}, cannot {operation}")]
    TransactionState { state: String, operation: String },

    /// Post-apply structural check failed; the package was restored
    #[error("Validation failed ({check}); the original package was left unmodified")]
    Validation { check: String },

    /// Planner defect: a plan touched a protected resource
    #[error("Removal plan touches protected resource {0}")]
    ProtectedResourceViolation(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
