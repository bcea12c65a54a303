//! Extraction of definitions and references from every part

use log::{debug, info};
use rayon::prelude::*;
use std::collections::HashMap;

use super::{Definition, DefinitionMeta, Graph, Reference, Relation, ResourceId, ResourceKind};
use crate::error::Error;
use crate::opc::{Package, ParsedPackage, ParsedPart, PartRole, PartUri, Relationships};
use crate::xml::{parse_on_off, NamespaceScope, NodePath, RawXmlElement, Visit, A, O, R, W};

/// `w:rFonts` attributes naming a font directly
const RUN_FONT_ATTRS: [&str; 4] = ["ascii", "hAnsi", "cs", "eastAsia"];

/// Elements whose `w:val` names a style
const STYLE_REFS: [&str; 5] = ["pStyle", "rStyle", "tblStyle", "defaultTableStyle", "clickAndTypeStyle"];

/// Field keywords whose first argument is a bookmark name
const BOOKMARK_FIELDS: [&str; 3] = ["REF", "PAGEREF", "NOTEREF"];

/// Builds the raw graph: nodes, references and their direct edges
pub struct GraphBuilder<'a, 'p> {
    parsed: &'a ParsedPackage<'p>,
    graph: Graph,
}

impl<'a, 'p> GraphBuilder<'a, 'p> {
    pub fn new(parsed: &'a ParsedPackage<'p>) -> Self {
        Self {
            parsed,
            graph: Graph::default(),
        }
    }

    /// Collect every definition and reference; dependency chains are left
    /// to the resolver
    pub fn build(mut self) -> Graph {
        let package = self.parsed.package();

        self.add_part_nodes(package);
        self.add_relationships(package);

        let documents: Vec<&ParsedPart> = self.parsed.documents().collect();
        let extracts: Vec<PartExtract> = documents.par_iter().map(|part| extract(part)).collect();

        for extract in extracts {
            for definition in extract.definitions {
                self.graph.add_node(definition);
            }
            for reference in extract.references {
                self.graph.push_reference(reference);
            }
            for issue in extract.unknown {
                debug!("ignored: {}", issue);
                self.graph.push_issue(issue);
            }
        }

        self.link_references();

        info!(
            "reference graph: {} definitions, {} references, {} dangling",
            self.graph.len(),
            self.graph.references().len(),
            self.graph.dangling().count()
        );
        self.graph
    }

    /// One node per part; every non-media part is a root
    fn add_part_nodes(&mut self, package: &Package) {
        for (uri, part) in package.parts() {
            let definition = Definition {
                id: ResourceId::part(uri),
                part: uri.clone(),
                path: None,
                companions: Vec::new(),
                bytes: part.data().len(),
                meta: DefinitionMeta::default(),
            };
            let is_media = uri.is_media();
            if let Some(node) = self.graph.add_node(definition) {
                if !is_media {
                    self.graph.add_root(node);
                }
            }
        }
    }

    fn add_relationships(&mut self, package: &Package) {
        let package_rels = PartUri::new("/_rels/.rels").ok();
        if let Some(rels_part) = package_rels {
            self.add_relationship_set(None, &rels_part, package.relationships(), true);
        }

        for (uri, part) in package.parts() {
            let Some(rels) = part.relationships() else {
                continue;
            };
            // Nothing can be found referencing these, so keep them all
            let unread = self.parsed.get(uri).is_none();
            self.add_relationship_set(Some(uri), &uri.relationships_uri(), rels, unread);
        }
    }

    fn add_relationship_set(
        &mut self,
        owner: Option<&PartUri>,
        rels_part: &PartUri,
        rels: &Relationships,
        as_roots: bool,
    ) {
        for rel in rels.iter() {
            let definition = Definition {
                id: ResourceId::relationship(owner, rel.id.as_str()),
                part: rels_part.clone(),
                path: None,
                companions: Vec::new(),
                bytes: rel.serialized_len(),
                meta: DefinitionMeta {
                    rel_type: Some(rel.rel_type.clone()),
                    target: Some(rel.target.clone()),
                    external: rel.is_external(),
                    ..DefinitionMeta::default()
                },
            };
            let Some(node) = self.graph.add_node(definition) else {
                continue;
            };
            if as_roots {
                self.graph.add_root(node);
            }
            if rel.is_external() {
                continue;
            }

            match Package::resolve_target(owner, rel) {
                Ok(target) => match self.graph.find(&ResourceId::part(&target)) {
                    Some(to) => self.graph.add_edge(node, to, Relation::Target, None),
                    None => debug!("{} in {} points at missing part {}", rel.id, rels_part, target),
                },
                Err(e) => debug!("{} in {} has unusable target: {}", rel.id, rels_part, e),
            }
        }
    }

    /// Turn content references into edges from their holder
    fn link_references(&mut self) {
        for index in 0..self.graph.references().len() {
            let reference = &self.graph.references()[index];
            if reference.relation != Relation::Content {
                continue;
            }
            let holder = self
                .graph
                .find(&reference.holder)
                .or_else(|| self.graph.find(&ResourceId::part(&reference.part)));

            match (holder, self.graph.find(&reference.target)) {
                (Some(from), Some(to)) => {
                    self.graph.add_edge(from, to, Relation::Content, Some(index))
                }
                _ => {
                    debug!(
                        "dangling {} on <{}> in {}",
                        reference.target, reference.element, reference.part
                    );
                    self.graph.mark_dangling(index);
                }
            }
        }
    }
}

/// Everything found in one part
#[derive(Default)]
struct PartExtract {
    definitions: Vec<Definition>,
    references: Vec<Reference>,
    unknown: Vec<Error>,
}

fn extract(part: &ParsedPart) -> PartExtract {
    let mut extractor = Extractor::new(part);
    part.document.walk(|path, element, scope| extractor.visit(path, element, scope));
    extractor.finish()
}

struct Extractor<'a> {
    part: &'a ParsedPart,
    out: PartExtract,
    /// Definition element currently being walked
    holder: Option<(Vec<usize>, ResourceId)>,
    /// `a:majorFont` / `a:minorFont` currently being walked
    font_group: Option<Vec<usize>>,
    /// bookmark `w:id` -> definition index
    bookmark_starts: HashMap<String, usize>,
    /// bookmark `w:id` -> (path, size) of its end marker
    bookmark_ends: HashMap<String, (NodePath, usize)>,
}

impl<'a> Extractor<'a> {
    fn new(part: &'a ParsedPart) -> Self {
        Self {
            part,
            out: PartExtract::default(),
            holder: None,
            font_group: None,
            bookmark_starts: HashMap::new(),
            bookmark_ends: HashMap::new(),
        }
    }

    fn visit(&mut self, path: &[usize], el: &RawXmlElement, scope: &NamespaceScope) -> Visit {
        if self.holder.as_ref().is_some_and(|(p, _)| !path.starts_with(p)) {
            self.holder = None;
        }
        if self.font_group.as_ref().is_some_and(|p| !path.starts_with(p)) {
            self.font_group = None;
        }

        self.definitions(path, el, scope);
        self.references(path, el, scope);
        Visit::Descend
    }

    fn definitions(&mut self, path: &[usize], el: &RawXmlElement, scope: &NamespaceScope) {
        let role = self.part.role;
        let id = if role == PartRole::Styles && scope.is(el, W, "style") {
            scope.attr(el, W, "styleId").map(ResourceId::style)
        } else if role == PartRole::Numbering && scope.is(el, W, "num") {
            scope.attr(el, W, "numId").map(ResourceId::numbering)
        } else if role == PartRole::Numbering && scope.is(el, W, "abstractNum") {
            scope.attr(el, W, "abstractNumId").map(ResourceId::abstract_numbering)
        } else if role == PartRole::FontTable && scope.is(el, W, "font") {
            scope.attr(el, W, "name").map(ResourceId::font)
        } else if scope.is(el, W, "bookmarkStart") {
            scope.attr(el, W, "name").map(ResourceId::bookmark)
        } else {
            if scope.is(el, W, "bookmarkEnd") {
                if let Some(id) = scope.attr(el, W, "id") {
                    self.bookmark_ends
                        .insert(id.to_string(), (NodePath::from(path), el.serialized_len()));
                }
            } else if scope.is(el, A, "majorFont") || scope.is(el, A, "minorFont") {
                self.font_group = Some(path.to_vec());
            }
            None
        };
        let Some(id) = id else {
            return;
        };

        let meta = DefinitionMeta {
            name: el
                .child_elements()
                .find(|c| c.local_name() == "name")
                .and_then(|c| scope.w_val(c))
                .map(str::to_string),
            is_default: scope
                .attr(el, W, "default")
                .is_some_and(|v| parse_on_off(Some(v))),
            ..DefinitionMeta::default()
        };

        if id.kind == ResourceKind::Bookmark {
            if let Some(bookmark_id) = scope.attr(el, W, "id") {
                self.bookmark_starts
                    .insert(bookmark_id.to_string(), self.out.definitions.len());
            }
        } else {
            self.holder = Some((path.to_vec(), id.clone()));
        }

        self.out.definitions.push(Definition {
            id,
            part: self.part.uri.clone(),
            path: Some(NodePath::from(path)),
            companions: Vec::new(),
            bytes: el.serialized_len(),
            meta,
        });
    }

    fn references(&mut self, path: &[usize], el: &RawXmlElement, scope: &NamespaceScope) {
        // Relationship ids, in any element
        for (key, value) in &el.attributes {
            let is_rel = match scope.attr_namespace(key) {
                Some(ns) if ns == R => true,
                Some(ns) if ns == O => crate::xml::split_qname(key).1 == "relid",
                _ => false,
            };
            if is_rel {
                if !value.is_empty() {
                    let target = ResourceId::relationship(Some(&self.part.uri), value.as_str());
                    self.push(path, el, key, target, Relation::Content);
                }
            } else if looks_like_relationship_id(value) {
                self.out.unknown.push(Error::UnknownResourceKind {
                    part: self.part.uri.to_string(),
                    element: el.name.clone(),
                    attribute: key.clone(),
                    value: value.clone(),
                });
            }
        }

        let holder_kind = self.holder.as_ref().map(|(_, id)| id.kind);
        let in_style = holder_kind == Some(ResourceKind::Style);
        let in_abstract = self
            .holder
            .as_ref()
            .is_some_and(|(_, id)| id.kind == ResourceKind::Numbering && id.id.starts_with("abstract:"));

        if STYLE_REFS.iter().any(|name| scope.is(el, W, name)) {
            let relation = if in_abstract {
                Relation::LevelStyle
            } else {
                Relation::Content
            };
            self.push_val(path, el, scope, |v| ResourceId::style(v), relation);
        } else if in_style && scope.is(el, W, "basedOn") {
            self.push_val(path, el, scope, |v| ResourceId::style(v), Relation::BasedOn);
        } else if in_style && scope.is(el, W, "next") {
            self.push_val(path, el, scope, |v| ResourceId::style(v), Relation::Next);
        } else if in_style && scope.is(el, W, "link") {
            self.push_val(path, el, scope, |v| ResourceId::style(v), Relation::Link);
        } else if in_abstract && scope.is(el, W, "numStyleLink") {
            self.push_val(path, el, scope, |v| ResourceId::style(v), Relation::NumStyleLink);
        } else if in_abstract && scope.is(el, W, "styleLink") {
            self.push_val(path, el, scope, |v| ResourceId::style(v), Relation::StyleLink);
        } else if holder_kind == Some(ResourceKind::Numbering) && scope.is(el, W, "abstractNumId") {
            self.push_val(path, el, scope, ResourceId::abstract_numbering, Relation::AbstractNum);
        } else if holder_kind == Some(ResourceKind::Font) && scope.is(el, W, "altName") {
            self.push_val(path, el, scope, |v| ResourceId::font(v), Relation::AltName);
        } else if scope.is(el, W, "numId") {
            if scope.w_val(el).is_some_and(|v| v != "0") {
                self.push_val(path, el, scope, |v| ResourceId::numbering(v), Relation::Content);
            }
        } else if scope.is(el, W, "rFonts") {
            for attr in RUN_FONT_ATTRS {
                if let (Some(key), Some(name)) = (scope.attr_key(el, W, attr), scope.attr(el, W, attr)) {
                    self.push(path, el, key, ResourceId::font(name), Relation::Content);
                }
            }
        } else if scope.is(el, W, "sym") {
            if let (Some(key), Some(name)) = (scope.attr_key(el, W, "font"), scope.attr(el, W, "font")) {
                if !name.is_empty() {
                    self.push(path, el, key, ResourceId::font(name), Relation::Content);
                }
            }
        } else if self.font_group.is_some()
            && (scope.is(el, A, "latin") || scope.is(el, A, "ea") || scope.is(el, A, "cs"))
        {
            if let Some(typeface) = el.attr("typeface").filter(|t| !t.is_empty() && !t.starts_with('+')) {
                self.push(path, el, "typeface", ResourceId::font(typeface), Relation::Content);
            }
        } else if scope.is(el, W, "hyperlink") {
            if let Some(anchor) = scope.attr(el, W, "anchor") {
                let key = scope.attr_key(el, W, "anchor").unwrap_or("w:anchor");
                self.push(path, el, key, ResourceId::bookmark(anchor), Relation::Content);
            }
        } else if scope.is(el, W, "instrText") {
            for name in field_bookmarks(&el.text()) {
                self.push(path, el, "", ResourceId::bookmark(name), Relation::Content);
            }
        } else if scope.is(el, W, "fldSimple") {
            if let Some(instr) = scope.attr(el, W, "instr") {
                for name in field_bookmarks(instr) {
                    self.push(path, el, "", ResourceId::bookmark(name), Relation::Content);
                }
            }
        }
    }

    /// Reference carried by `w:val`
    fn push_val(
        &mut self,
        path: &[usize],
        el: &RawXmlElement,
        scope: &NamespaceScope,
        make: fn(&str) -> ResourceId,
        relation: Relation,
    ) {
        if let (Some(key), Some(value)) = (scope.attr_key(el, W, "val"), scope.w_val(el)) {
            if !value.is_empty() {
                self.push(path, el, key, make(value), relation);
            }
        }
    }

    fn push(&mut self, path: &[usize], el: &RawXmlElement, attribute: &str, target: ResourceId, relation: Relation) {
        let holder = match &self.holder {
            Some((_, id)) => id.clone(),
            None => ResourceId::part(&self.part.uri),
        };
        self.out.references.push(Reference {
            target,
            holder,
            part: self.part.uri.clone(),
            path: NodePath::from(path),
            element: el.name.clone(),
            attribute: attribute.to_string(),
            relation,
        });
    }

    /// Pair bookmark starts with their end markers
    fn finish(mut self) -> PartExtract {
        for (bookmark_id, index) in self.bookmark_starts {
            if let Some((path, bytes)) = self.bookmark_ends.remove(&bookmark_id) {
                let definition = &mut self.out.definitions[index];
                definition.companions.push(path);
                definition.bytes += bytes;
            }
        }
        self.out
    }
}

/// `rId` followed by digits
fn looks_like_relationship_id(value: &str) -> bool {
    value
        .strip_prefix("rId")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Bookmark names a field instruction points at
pub(crate) fn field_bookmarks(instr: &str) -> Vec<String> {
    let tokens: Vec<&str> = instr
        .split_whitespace()
        .map(|t| t.trim_matches('"'))
        .filter(|t| !t.is_empty())
        .collect();
    let Some(keyword) = tokens.first() else {
        return Vec::new();
    };
    let keyword = keyword.to_ascii_uppercase();

    if BOOKMARK_FIELDS.contains(&keyword.as_str()) {
        return tokens
            .get(1)
            .filter(|name| !name.starts_with('\\'))
            .map(|name| vec![name.to_string()])
            .unwrap_or_default();
    }
    if keyword == "HYPERLINK" {
        return tokens
            .windows(2)
            .filter(|pair| pair[0].eq_ignore_ascii_case("\\l"))
            .map(|pair| pair[1].to_string())
            .collect();
    }
    // `{ _Ref123 \h }` is an implicit REF
    if tokens[0].starts_with('_') {
        return vec![tokens[0].to_string()];
    }
    Vec::new()
}
