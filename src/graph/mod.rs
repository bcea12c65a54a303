//! Cross-part reference graph
//!
//! Nodes are resource definitions (relationships, styles, fonts, numbering,
//! bookmarks, media and parts). An edge `A -> B` means "if A is live, B must
//! stay live"; edges come from references found in content and from
//! dependency declarations between definitions.

mod builder;
mod reachability;
mod resolver;

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::error::Error;
use crate::opc::{ParsedPackage, PartUri};
use crate::xml::NodePath;

pub use builder::GraphBuilder;
pub use reachability::{Orphan, Reachability};
pub use resolver::MAX_CHAIN_DEPTH;

/// Index of a definition in a [`Graph`]
pub type NodeId = usize;

/// Kind of resource a definition declares
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Relationship,
    Style,
    Font,
    Numbering,
    Bookmark,
    Media,
    Part,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Relationship,
        ResourceKind::Style,
        ResourceKind::Font,
        ResourceKind::Numbering,
        ResourceKind::Bookmark,
        ResourceKind::Media,
        ResourceKind::Part,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Relationship => "relationship",
            ResourceKind::Style => "style",
            ResourceKind::Font => "font",
            ResourceKind::Numbering => "numbering",
            ResourceKind::Bookmark => "bookmark",
            ResourceKind::Media => "media",
            ResourceKind::Part => "part",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an identifier is unique
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    /// Package-wide (styles, fonts, numbering, bookmarks, parts)
    Global,
    /// Relationships of `/_rels/.rels`
    Package,
    /// Relationships owned by one source part
    Part(PartUri),
}

/// (kind, scope, identifier)
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId {
    pub kind: ResourceKind,
    pub scope: Scope,
    pub id: String,
}

impl ResourceId {
    pub fn global(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            scope: Scope::Global,
            id: id.into(),
        }
    }

    /// Relationship `id` owned by `owner` (`None` for package relationships)
    pub fn relationship(owner: Option<&PartUri>, id: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Relationship,
            scope: owner.map_or(Scope::Package, |uri| Scope::Part(uri.clone())),
            id: id.into(),
        }
    }

    pub fn style(id: impl Into<String>) -> Self {
        Self::global(ResourceKind::Style, id)
    }

    pub fn font(name: impl Into<String>) -> Self {
        Self::global(ResourceKind::Font, name)
    }

    pub fn numbering(id: impl Into<String>) -> Self {
        Self::global(ResourceKind::Numbering, id)
    }

    /// The abstract numbering definition `w:abstractNumId="id"`
    pub fn abstract_numbering(id: &str) -> Self {
        Self::global(ResourceKind::Numbering, format!("abstract:{}", id))
    }

    pub fn bookmark(name: impl Into<String>) -> Self {
        Self::global(ResourceKind::Bookmark, name)
    }

    /// Node of a whole part, `Media` for parts under a `media/` folder
    pub fn part(uri: &PartUri) -> Self {
        let kind = if uri.is_media() {
            ResourceKind::Media
        } else {
            ResourceKind::Part
        };
        Self::global(kind, uri.as_str())
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Scope::Part(uri) => write!(f, "{}:{}#{}", self.kind, uri, self.id),
            Scope::Package => write!(f, "{}:/#{}", self.kind, self.id),
            Scope::Global => write!(f, "{}:{}", self.kind, self.id),
        }
    }
}

/// Extra facts about a definition used by protection rules and reports
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DefinitionMeta {
    /// Display name (`w:name` of a style)
    pub name: Option<String>,
    /// Relationship type URI
    pub rel_type: Option<String>,
    /// Relationship target as written
    pub target: Option<String>,
    /// Relationship with `TargetMode="External"`
    pub external: bool,
    /// Style marked `w:default="1"`
    pub is_default: bool,
}

/// A declared resource
#[derive(Clone, Debug, PartialEq)]
pub struct Definition {
    pub id: ResourceId,
    /// Part holding the declaration (the `.rels` part for relationships)
    pub part: PartUri,
    /// Element declaring it, when it lives in an XML tree
    pub path: Option<NodePath>,
    /// Other elements removed together with it (a bookmark's end marker)
    pub companions: Vec<NodePath>,
    /// Serialized size
    pub bytes: usize,
    pub meta: DefinitionMeta,
}

/// How one definition depends on another
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Relation {
    /// Plain occurrence in content
    Content,
    /// Relationship to the part it targets
    Target,
    BasedOn,
    Next,
    Link,
    /// `w:num` to its `w:abstractNum`
    AbstractNum,
    NumStyleLink,
    StyleLink,
    /// `w:lvl/w:pStyle` of an abstract numbering
    LevelStyle,
    /// Font to its `w:altName`
    AltName,
}

impl Relation {
    pub fn as_str(self) -> &'static str {
        match self {
            Relation::Content => "content",
            Relation::Target => "target",
            Relation::BasedOn => "basedOn",
            Relation::Next => "next",
            Relation::Link => "link",
            Relation::AbstractNum => "abstractNumId",
            Relation::NumStyleLink => "numStyleLink",
            Relation::StyleLink => "styleLink",
            Relation::LevelStyle => "lvl/pStyle",
            Relation::AltName => "altName",
        }
    }
}

/// An occurrence pointing at a resource
#[derive(Clone, Debug, PartialEq)]
pub struct Reference {
    pub target: ResourceId,
    /// Enclosing definition, or the part itself
    pub holder: ResourceId,
    pub part: PartUri,
    pub path: NodePath,
    pub element: String,
    /// Attribute carrying the identifier; empty for field instructions
    pub attribute: String,
    pub relation: Relation,
}

/// A dependency edge
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub relation: Relation,
    /// Reference the edge was resolved from
    pub reference: Option<usize>,
}

/// The reference graph of one package
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Definition>,
    index: HashMap<ResourceId, NodeId>,
    edges: Vec<Edge>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
    references: Vec<Reference>,
    dangling: Vec<usize>,
    roots: BTreeSet<NodeId>,
    issues: Vec<Error>,
}

impl Graph {
    /// Build and resolve the graph of a parsed package
    pub fn build(parsed: &ParsedPackage<'_>) -> Self {
        let mut graph = GraphBuilder::new(parsed).build();
        resolver::resolve(&mut graph);
        graph
    }

    /// Add a definition; a duplicate id is reported and the first one kept
    pub(crate) fn add_node(&mut self, definition: Definition) -> Option<NodeId> {
        if self.index.contains_key(&definition.id) {
            self.issues.push(Error::DuplicateDefinition {
                id: definition.id.to_string(),
                part: definition.part.to_string(),
            });
            return None;
        }
        let node = self.nodes.len();
        self.index.insert(definition.id.clone(), node);
        self.nodes.push(definition);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        Some(node)
    }

    pub(crate) fn add_edge(&mut self, from: NodeId, to: NodeId, relation: Relation, reference: Option<usize>) {
        let edge = self.edges.len();
        self.edges.push(Edge {
            from,
            to,
            relation,
            reference,
        });
        self.outgoing[from].push(edge);
        self.incoming[to].push(edge);
    }

    pub(crate) fn add_root(&mut self, node: NodeId) {
        self.roots.insert(node);
    }

    pub(crate) fn push_reference(&mut self, reference: Reference) -> usize {
        self.references.push(reference);
        self.references.len() - 1
    }

    pub(crate) fn mark_dangling(&mut self, reference: usize) {
        self.dangling.push(reference);
    }

    pub(crate) fn push_issue(&mut self, issue: Error) {
        self.issues.push(issue);
    }

    pub fn node(&self, node: NodeId) -> &Definition {
        &self.nodes[node]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Definition)> {
        self.nodes.iter().enumerate()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn find(&self, id: &ResourceId) -> Option<NodeId> {
        self.index.get(id).copied()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn outgoing(&self, node: NodeId) -> impl Iterator<Item = &Edge> {
        self.outgoing[node].iter().map(move |&e| &self.edges[e])
    }

    pub fn incoming(&self, node: NodeId) -> impl Iterator<Item = &Edge> {
        self.incoming[node].iter().map(move |&e| &self.edges[e])
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// References whose target has no definition
    pub fn dangling(&self) -> impl Iterator<Item = &Reference> {
        self.dangling.iter().map(move |&r| &self.references[r])
    }

    pub fn roots(&self) -> &BTreeSet<NodeId> {
        &self.roots
    }

    /// Non-fatal problems found while building
    pub fn issues(&self) -> &[Error] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<Error> {
        self.issues
    }
}
