//! Merging orphans and cruft findings into one removal plan

use log::{debug, info, warn};
use std::collections::{BTreeMap, HashSet};

use crate::config::{Category, SweepConfig};
use crate::cruft::{Action, Finding};
use crate::error::{Error, Result};
use crate::graph::{Graph, Orphan, Reachability, ResourceId, ResourceKind, Scope};
use crate::opc::{ParsedPackage, PartUri};
use crate::protected::ProtectedSet;
use crate::xml::NodePath;

/// Ordered, deduplicated set of removals
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RemovalPlan {
    items: Vec<Finding>,
}

impl RemovalPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item as is; [`plan`] is the normal way to build one
    pub fn push(&mut self, item: Finding) {
        self.items.push(item);
    }

    pub fn items(&self) -> &[Finding] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Serialized size of everything the plan removes
    pub fn estimated_savings(&self) -> usize {
        self.items.iter().map(|item| item.bytes).sum()
    }

    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &Finding> {
        self.items.iter().filter(move |item| item.category == category)
    }

    /// Number of items per category, categories with none left out
    pub fn counts(&self) -> BTreeMap<Category, usize> {
        let mut counts = BTreeMap::new();
        for item in &self.items {
            *counts.entry(item.category).or_insert(0) += 1;
        }
        counts
    }
}

/// Category an orphan of the given kind is reported under
fn orphan_category(kind: ResourceKind) -> Option<Category> {
    match kind {
        ResourceKind::Relationship => Some(Category::OrphanRelationship),
        ResourceKind::Media => Some(Category::OrphanMedia),
        ResourceKind::Style => Some(Category::OrphanStyle),
        ResourceKind::Font => Some(Category::OrphanFont),
        ResourceKind::Numbering => Some(Category::OrphanNumbering),
        ResourceKind::Bookmark => Some(Category::Bookmark),
        ResourceKind::Part => None,
    }
}

/// Build the plan for one package.
///
/// Findings are filtered by toggles and protection first. References that sit
/// inside content the findings remove are then retired and reachability is
/// computed once more, so definitions only used by that content become
/// orphans in the same pass.
pub fn plan(
    parsed: &ParsedPackage<'_>,
    graph: &Graph,
    protected: &ProtectedSet,
    findings: Vec<Finding>,
    config: &SweepConfig,
) -> Result<RemovalPlan> {
    let is_protected = |resource: &Option<ResourceId>| {
        resource
            .as_ref()
            .and_then(|id| graph.find(id))
            .is_some_and(|node| protected.covers(graph.node(node)))
    };

    let findings: Vec<Finding> = findings
        .into_iter()
        .filter(|f| config.is_enabled(f.category))
        .filter(|f| {
            let keep = !is_protected(&f.resource);
            if !keep {
                debug!("{} {} is protected", f.category, f.id);
            }
            keep
        })
        .collect();

    let retired = retired_references(graph, &findings);
    let reach = Reachability::compute_retiring(graph, protected, retired);

    // A bookmark something still points at stays
    let mut items: Vec<Finding> = findings
        .into_iter()
        .filter(|f| match (&f.resource, f.category) {
            (Some(id), Category::Bookmark) => graph.find(id).map_or(true, |node| !reach.is_live(node)),
            _ => true,
        })
        .collect();

    // Any part may name a style, font, numbering or bookmark, so an unreadable
    // part leaves those unprovable
    let global_unknown = parsed.has_failures();
    if global_unknown {
        warn!("some parts could not be parsed; keeping unreferenced styles, fonts, numbering and bookmarks");
    }

    for orphan in reach.orphans(graph, protected) {
        let Some(category) = orphan_category(orphan.kind) else {
            continue;
        };
        if !config.is_enabled(category) {
            continue;
        }
        if global_unknown && orphan.kind != ResourceKind::Relationship && orphan.kind != ResourceKind::Media {
            debug!("keeping {} {}: an unparsed part may use it", orphan.kind, orphan.id);
            continue;
        }
        if orphan.kind == ResourceKind::Bookmark
            && !config
                .bookmark_prefixes
                .iter()
                .any(|prefix| orphan.id.starts_with(prefix.as_str()))
        {
            continue;
        }
        if let Some(item) = orphan_finding(parsed, graph, category, orphan) {
            items.push(item);
        }
    }

    let mut plan = RemovalPlan {
        items: keep_linked_media(dedupe(items), graph),
    };
    plan.items.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    verify(&plan, graph, protected)?;
    info!(
        "removal plan: {} items, {} bytes",
        plan.len(),
        plan.estimated_savings()
    );
    Ok(plan)
}

/// References located in content the findings remove
fn retired_references(graph: &Graph, findings: &[Finding]) -> HashSet<usize> {
    let mut retired = HashSet::new();
    for (index, reference) in graph.references().iter().enumerate() {
        let hit = findings
            .iter()
            .filter(|f| f.part == reference.part)
            .flat_map(|f| f.actions.iter())
            .any(|action| match action {
                Action::RemoveElement(path) => reference.path.starts_with(path),
                Action::UnwrapElement(path) => reference.path == *path,
                Action::StripAttribute(path, attr) => {
                    reference.path == *path && reference.attribute == *attr
                }
                Action::RemoveRelationship { .. } | Action::RemovePart => false,
            });
        if hit {
            retired.insert(index);
        }
    }
    retired
}

fn orphan_finding(
    parsed: &ParsedPackage<'_>,
    graph: &Graph,
    category: Category,
    orphan: Orphan,
) -> Option<Finding> {
    let definition = graph.node(orphan.node);

    let actions = match orphan.kind {
        ResourceKind::Relationship => {
            let owner = match &definition.id.scope {
                Scope::Part(uri) => Some(uri.clone()),
                Scope::Package | Scope::Global => None,
            };
            vec![Action::RemoveRelationship {
                owner,
                id: orphan.id.clone(),
            }]
        }
        ResourceKind::Media => vec![Action::RemovePart],
        ResourceKind::Style | ResourceKind::Font | ResourceKind::Numbering | ResourceKind::Bookmark => {
            // Only parsed parts can be edited
            if parsed.get(&definition.part).is_none() {
                return None;
            }
            let path = definition.path.clone()?;
            std::iter::once(path)
                .chain(definition.companions.iter().cloned())
                .map(Action::RemoveElement)
                .collect()
        }
        ResourceKind::Part => return None,
    };

    Some(Finding {
        category,
        part: orphan.part,
        actions,
        kind: orphan.kind.to_string(),
        id: orphan.id,
        detail: orphan.detail,
        reason: orphan.reason,
        bytes: orphan.bytes,
        resource: Some(definition.id.clone()),
    })
}

/// Drop repeated resources and edits already covered by a larger removal
fn dedupe(items: Vec<Finding>) -> Vec<Finding> {
    // Bookmark names are global, but each story part holds its own markers
    let mut seen = HashSet::new();
    let items: Vec<Finding> = items
        .into_iter()
        .filter(|item| match &item.resource {
            Some(id) => seen.insert((item.part.clone(), id.clone())),
            None => true,
        })
        .collect();

    let mut removals: BTreeMap<&PartUri, Vec<(usize, &NodePath)>> = BTreeMap::new();
    for (index, item) in items.iter().enumerate() {
        for action in &item.actions {
            if let Action::RemoveElement(path) = action {
                removals.entry(&item.part).or_default().push((index, path));
            }
        }
    }

    let covered: HashSet<usize> = items
        .iter()
        .enumerate()
        .filter(|(index, item)| {
            let Some(removed) = removals.get(&item.part) else {
                return false;
            };
            !item.actions.is_empty()
                && item.actions.iter().all(|action| {
                    let is_removal = matches!(action, Action::RemoveElement(_));
                    action.path().is_some_and(|path| {
                        removed.iter().any(|(other, outer)| {
                            // Of two removals of the same element the first one stays
                            *other != *index
                                && path.starts_with(outer)
                                && (path != *outer || !is_removal || other < index)
                        })
                    })
                })
        })
        .map(|(index, _)| index)
        .collect();

    items
        .into_iter()
        .enumerate()
        .filter(|(index, _)| !covered.contains(index))
        .map(|(_, item)| item)
        .collect()
}

/// A media part stays while any relationship pointing at it stays
fn keep_linked_media(items: Vec<Finding>, graph: &Graph) -> Vec<Finding> {
    let removed: HashSet<ResourceId> = items
        .iter()
        .filter_map(|item| item.resource.clone())
        .collect();

    items
        .into_iter()
        .filter(|item| {
            if item.category != Category::OrphanMedia {
                return true;
            }
            let Some(node) = item.resource.as_ref().and_then(|id| graph.find(id)) else {
                return true;
            };
            let linked = graph
                .incoming(node)
                .any(|edge| !removed.contains(&graph.node(edge.from).id));
            if linked {
                debug!("{} kept, a remaining relationship targets it", item.id);
            }
            !linked
        })
        .collect()
}

/// Defect guard: nothing protected may be in the plan
fn verify(plan: &RemovalPlan, graph: &Graph, protected: &ProtectedSet) -> Result<()> {
    for item in plan.items() {
        let Some(id) = &item.resource else {
            continue;
        };
        if let Some(node) = graph.find(id) {
            if protected.covers(graph.node(node)) {
                return Err(Error::ProtectedResourceViolation(id.to_string()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cruft::scan_all;
    use crate::cruft::test_support::NS;
    use crate::opc::{rel_types, Package, Part, MAIN_DOCUMENT, STYLES};
    use crate::protected::ProtectedConfig;
    use pretty_assertions::assert_eq;

    fn package(body: &str, styles: &str) -> Package {
        let mut pkg = Package::new();
        let mut doc = Part::new(
            PartUri::new("/word/document.xml").unwrap(),
            MAIN_DOCUMENT,
            format!("<w:document {}><w:body>{}</w:body></w:document>", NS, body).into_bytes(),
        );
        doc.ensure_relationships().add(rel_types::STYLES, "styles.xml");
        pkg.add_part(doc);
        pkg.add_part(Part::new(
            PartUri::new("/word/styles.xml").unwrap(),
            STYLES,
            format!("<w:styles {}>{}</w:styles>", NS, styles).into_bytes(),
        ));
        pkg.add_relationship(rel_types::OFFICE_DOCUMENT, "word/document.xml");
        pkg
    }

    fn plan_for(pkg: &Package, config: &SweepConfig) -> RemovalPlan {
        let parsed = ParsedPackage::new(pkg);
        let graph = Graph::build(&parsed);
        let protected = ProtectedSet::new(&config.protected);
        let findings = scan_all(&parsed, config);
        plan(&parsed, &graph, &protected, findings, config).unwrap()
    }

    const STYLES_XML: &str = r#"<w:style w:type="paragraph" w:styleId="Normal"><w:name w:val="Normal"/></w:style><w:style w:type="character" w:styleId="Quiet"><w:name w:val="Quiet"/></w:style><w:style w:type="paragraph" w:styleId="Used"><w:name w:val="Used"/></w:style>"#;

    #[test]
    fn test_style_only_used_by_removed_run_becomes_orphan() {
        let pkg = package(
            r#"<w:p><w:pPr><w:pStyle w:val="Used"/></w:pPr><w:r><w:rPr><w:rStyle w:val="Quiet"/></w:rPr></w:r></w:p>"#,
            STYLES_XML,
        );
        let plan = plan_for(&pkg, &SweepConfig::default());

        let ids: Vec<(Category, &str)> = plan
            .items()
            .iter()
            .map(|i| (i.category, i.id.as_str()))
            .collect();
        assert_eq!(
            ids,
            vec![
                (Category::EmptyElement, "w:r"),
                (Category::OrphanStyle, "Quiet"),
            ]
        );
        assert_eq!(
            plan.items()[1].reason,
            "only referenced from content being removed"
        );
    }

    #[test]
    fn test_toggles_and_protection() {
        let pkg = package(r#"<w:p><w:r><w:t>x</w:t></w:r></w:p>"#, STYLES_XML);

        let config = SweepConfig::default().categories(crate::config::CategorySet::none());
        assert!(plan_for(&pkg, &config).is_empty());

        let config = SweepConfig::default().protected(ProtectedConfig {
            styles: vec!["quiet".into()],
            ..ProtectedConfig::default()
        });
        let plan = plan_for(&pkg, &config);
        let ids: Vec<&str> = plan.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["Used"]);
    }

    #[test]
    fn test_strips_inside_removed_elements_are_dropped() {
        let pkg = package(
            r#"<w:p><w:r w:rsidR="00A1"><w:rPr w:rsidR="00A2"/></w:r></w:p>"#,
            "",
        );
        let plan = plan_for(&pkg, &SweepConfig::default());
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.items()[0].category, Category::EmptyElement);
        assert_eq!(plan.counts(), BTreeMap::from([(Category::EmptyElement, 1)]));
    }

    #[test]
    fn test_referenced_bookmark_is_kept() {
        let pkg = package(
            r#"<w:p><w:bookmarkStart w:id="0" w:name="_Ref1"/><w:bookmarkEnd w:id="0"/><w:bookmarkStart w:id="1" w:name="_GoBack"/><w:bookmarkEnd w:id="1"/></w:p><w:p><w:r><w:instrText xml:space="preserve"> REF _Ref1 \h </w:instrText></w:r></w:p>"#,
            "",
        );
        let plan = plan_for(&pkg, &SweepConfig::default());
        let ids: Vec<&str> = plan.by_category(Category::Bookmark).map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["_GoBack"]);
        assert_eq!(plan.items()[0].actions.len(), 2);
    }

    #[test]
    fn test_protected_item_is_a_defect() {
        let pkg = package("", STYLES_XML);
        let parsed = ParsedPackage::new(&pkg);
        let graph = Graph::build(&parsed);
        let protected = ProtectedSet::new(&ProtectedConfig::default());

        let mut plan = RemovalPlan::new();
        plan.push(Finding {
            category: Category::OrphanStyle,
            part: PartUri::new("/word/styles.xml").unwrap(),
            actions: vec![Action::RemoveElement(NodePath::from(vec![0]))],
            kind: "style".into(),
            id: "Normal".into(),
            detail: String::new(),
            reason: String::new(),
            bytes: 0,
            resource: Some(ResourceId::style("Normal")),
        });
        assert!(matches!(
            verify(&plan, &graph, &protected),
            Err(Error::ProtectedResourceViolation(_))
        ));
    }
}
