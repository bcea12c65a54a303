//! OPC Package implementation
//!
//! Handles reading and writing DOCX files as ZIP packages

use crate::error::{Error, Result};
use crate::opc::relationships::rel_types;
use crate::opc::{ContentTypes, Part, PartUri, Relationship, Relationships};
use log::warn;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;
use zip::read::ZipArchive;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

const CONTENT_TYPES_ENTRY: &str = "[Content_Types].xml";
const PACKAGE_RELS_ENTRY: &str = "_rels/.rels";

/// An OPC package (ZIP-based container for DOCX, XLSX, PPTX, etc.)
///
/// Parts are kept ordered by path so iteration and output are deterministic.
/// Cloning a package gives an independent copy.
#[derive(Clone, Debug)]
pub struct Package {
    /// All parts in the package
    parts: BTreeMap<PartUri, Part>,
    /// Package-level relationships (/_rels/.rels)
    relationships: Relationships,
    /// Content types ([Content_Types].xml)
    content_types: ContentTypes,
    /// `.rels` entries whose source part does not exist, kept verbatim
    loose_entries: BTreeMap<String, Vec<u8>>,
}

impl Package {
    /// Create a new empty package
    pub fn new() -> Self {
        Self {
            parts: BTreeMap::new(),
            relationships: Relationships::new(),
            content_types: ContentTypes::new(),
            loose_entries: BTreeMap::new(),
        }
    }

    /// Open a package from a file path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Self::from_reader(reader)
    }

    /// Open a package from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let cursor = Cursor::new(bytes);
        Self::from_reader(cursor)
    }

    /// Open a package from a reader
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut package = Self::new();

        // Step 1: Read [Content_Types].xml
        package.content_types = Self::read_content_types(&mut archive)?;

        // Step 2: Read package relationships (/_rels/.rels)
        package.relationships = Self::read_package_rels(&mut archive)?;

        // Step 3: Read all parts, setting .rels files aside
        let rels_entries = package.read_parts(&mut archive)?;

        // Step 4: Attach part relationships
        package.attach_part_relationships(rels_entries);

        Ok(package)
    }

    /// Save the package to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_to(file)
    }

    /// Save the package to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let cursor = Cursor::new(&mut buf);
        self.write_to(cursor)?;
        Ok(buf)
    }

    /// Write the package to a writer
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        let options: FileOptions<()> = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        for (name, data) in self.entries()? {
            zip.start_file(name, options)?;
            zip.write_all(&data)?;
        }

        zip.finish()?;
        Ok(())
    }

    /// Every ZIP entry this package would write, in output order
    pub fn entries(&self) -> Result<Vec<(String, Vec<u8>)>> {
        let mut entries = Vec::with_capacity(self.parts.len() * 2 + 2);

        entries.push((CONTENT_TYPES_ENTRY.to_string(), self.content_types.to_bytes()?));

        if !self.relationships.is_empty() {
            let mut buf = Vec::new();
            self.relationships.write_to(&mut buf)?;
            entries.push((PACKAGE_RELS_ENTRY.to_string(), buf));
        }

        for (uri, part) in &self.parts {
            entries.push((entry_name(uri), part.data().to_vec()));

            // Part relationships, when present
            let rels_name = entry_name(&uri.relationships_uri());
            if let Some(rels) = part.relationships() {
                if !rels.is_empty() {
                    let mut buf = Vec::new();
                    rels.write_to(&mut buf)?;
                    entries.push((rels_name, buf));
                }
            } else if let Some(raw) = part.opaque_relationships() {
                entries.push((rels_name, raw.to_vec()));
            }
        }

        for (name, data) in &self.loose_entries {
            entries.push((name.clone(), data.clone()));
        }

        Ok(entries)
    }

    /// Get a part by URI
    pub fn part(&self, uri: &PartUri) -> Option<&Part> {
        self.parts.get(uri)
    }

    /// Get a mutable part by URI
    pub fn part_mut(&mut self, uri: &PartUri) -> Option<&mut Part> {
        self.parts.get_mut(uri)
    }

    /// Add a part to the package
    pub fn add_part(&mut self, part: Part) {
        let uri = part.uri().clone();
        if self.content_types.get(&uri) != Some(part.content_type()) {
            self.content_types.add_override(&uri, part.content_type());
        }
        self.parts.insert(uri, part);
    }

    /// Remove a part from the package
    pub fn remove_part(&mut self, uri: &PartUri) -> Option<Part> {
        let part = self.parts.remove(uri)?;
        self.content_types.remove_override(uri);
        Some(part)
    }

    /// Whether a part exists
    pub fn contains(&self, uri: &PartUri) -> bool {
        self.parts.contains_key(uri)
    }

    /// Get all parts
    pub fn parts(&self) -> impl Iterator<Item = (&PartUri, &Part)> {
        self.parts.iter()
    }

    /// Get package-level relationships
    pub fn relationships(&self) -> &Relationships {
        &self.relationships
    }

    /// Get mutable package-level relationships
    pub fn relationships_mut(&mut self) -> &mut Relationships {
        &mut self.relationships
    }

    /// Get content types
    pub fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }

    /// Resolve an internal relationship target.
    ///
    /// `source` is the part owning the relationship, `None` for `/_rels/.rels`.
    pub fn resolve_target(source: Option<&PartUri>, rel: &Relationship) -> Result<PartUri> {
        let target = PartUri::decode_target(&rel.target);
        let target = target.split(['#', '?']).next().unwrap_or_default();
        match source {
            Some(uri) => uri.resolve(target),
            None => PartUri::resolve_from_root(target),
        }
    }

    /// URI of the main document part named by the officeDocument relationship
    pub fn main_document_uri(&self) -> Option<PartUri> {
        let rel = self.relationships.by_type(rel_types::OFFICE_DOCUMENT)?;
        Self::resolve_target(None, rel).ok()
    }

    /// Get the main document part
    pub fn main_document_part(&self) -> Option<&Part> {
        self.parts.get(&self.main_document_uri()?)
    }

    /// Add a package-level relationship
    pub fn add_relationship(&mut self, rel_type: &str, target: &str) -> String {
        self.relationships.add(rel_type, target)
    }

    // === Private methods ===

    fn read_content_types<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<ContentTypes> {
        let mut file = archive
            .by_name(CONTENT_TYPES_ENTRY)
            .map_err(|_| Error::MissingPart(CONTENT_TYPES_ENTRY.into()))?;

        let mut content = Vec::new();
        file.read_to_end(&mut content)?;

        ContentTypes::from_bytes(&content)
    }

    fn read_package_rels<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Relationships> {
        match archive.by_name(PACKAGE_RELS_ENTRY) {
            Ok(mut file) => {
                let mut content = Vec::new();
                file.read_to_end(&mut content)?;
                Relationships::from_bytes(&content)
            }
            Err(_) => Ok(Relationships::new()),
        }
    }

    /// Read every regular part; returns the part `.rels` entries by name
    fn read_parts<R: Read + Seek>(
        &mut self,
        archive: &mut ZipArchive<R>,
    ) -> Result<BTreeMap<String, Vec<u8>>> {
        let mut rels_entries = BTreeMap::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let name = file.name().to_string();

            // Skip directories
            if name.ends_with('/') {
                continue;
            }

            // Skip special files
            if name == CONTENT_TYPES_ENTRY || name == PACKAGE_RELS_ENTRY {
                continue;
            }

            // Read data
            let mut data = Vec::new();
            file.read_to_end(&mut data)?;

            // Relationship files are attached to their source part later
            if name.contains("_rels/") && name.ends_with(".rels") {
                rels_entries.insert(name, data);
                continue;
            }

            let uri = PartUri::new(&name)?;

            // Get content type
            let content_type = self
                .content_types
                .get(&uri)
                .unwrap_or("application/octet-stream")
                .to_string();

            let part = Part::new(uri.clone(), content_type, data);
            self.parts.insert(uri, part);
        }

        Ok(rels_entries)
    }

    fn attach_part_relationships(&mut self, mut rels_entries: BTreeMap<String, Vec<u8>>) {
        for (uri, part) in self.parts.iter_mut() {
            let Some(data) = rels_entries.remove(&entry_name(&uri.relationships_uri())) else {
                continue;
            };
            match Relationships::from_bytes(&data) {
                Ok(rels) => part.set_relationships(rels),
                Err(e) => {
                    warn!("keeping unparseable relationships of {} as-is: {}", uri, e);
                    part.set_opaque_relationships(data);
                }
            }
        }

        // Whatever is left has no source part
        self.loose_entries = rels_entries;
    }
}

impl Default for Package {
    fn default() -> Self {
        Self::new()
    }
}

fn entry_name(uri: &PartUri) -> String {
    uri.as_str().trim_start_matches('/').to_string()
}
