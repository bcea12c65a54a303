//! Transactional application of a removal plan
//!
//! A [`Transaction`] snapshots the package, applies every planned edit,
//! validates the result and either commits or puts the snapshot back. A
//! transaction dropped before commit restores the snapshot, so an early
//! return never leaves a half-edited package behind.

use log::{debug, info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::config::Category;
use crate::cruft::Action;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::opc::{rel_types, ContentTypes, Package, ParsedPackage, PartUri};
use crate::plan::RemovalPlan;
use crate::xml::{NodePath, XmlDocument};

/// Where a transaction is in its life cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxState {
    Idle,
    Snapshotted,
    Applied,
    Validated,
    Committed,
    RolledBack,
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxState::Idle => "idle",
            TxState::Snapshotted => "snapshotted",
            TxState::Applied => "applied",
            TxState::Validated => "validated",
            TxState::Committed => "committed",
            TxState::RolledBack => "rolled back",
        };
        f.write_str(name)
    }
}

/// What an apply (or a dry run) removed
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ApplyReport {
    /// Removed items per category
    pub removed: BTreeMap<Category, usize>,
    /// Reduction of the uncompressed package size; the estimate for dry runs
    pub bytes_saved: usize,
}

/// An edit session over one package
pub struct Transaction<'a> {
    package: &'a mut Package,
    snapshot: Option<Package>,
    state: TxState,
}

impl<'a> Transaction<'a> {
    pub fn new(package: &'a mut Package) -> Self {
        Self {
            package,
            snapshot: None,
            state: TxState::Idle,
        }
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    /// The package in its current state
    pub fn package(&self) -> &Package {
        &*self.package
    }

    /// Take the copy a failed apply is restored from
    pub fn snapshot(&mut self) -> Result<()> {
        self.require(TxState::Idle, "snapshot")?;
        self.snapshot = Some(self.package.clone());
        self.state = TxState::Snapshotted;
        Ok(())
    }

    /// Carry out every item of the plan. An edit that cannot be made restores
    /// the snapshot.
    pub fn apply(&mut self, plan: &RemovalPlan) -> Result<()> {
        self.require(TxState::Snapshotted, "apply")?;
        match apply_items(self.package, plan) {
            Ok(()) => {
                self.state = TxState::Applied;
                Ok(())
            }
            Err(e) => {
                warn!("apply failed, restoring the original package: {}", e);
                self.rollback();
                Err(e)
            }
        }
    }

    /// Check the edited package; any failed check restores the snapshot
    pub fn validate(&mut self) -> Result<()> {
        self.require(TxState::Applied, "validate")?;
        let outcome = match &self.snapshot {
            Some(before) => check(before, &*self.package),
            None => Err("snapshot: missing".to_string()),
        };
        match outcome {
            Ok(()) => {
                self.state = TxState::Validated;
                Ok(())
            }
            Err(check) => {
                warn!("validation failed ({}), restoring the original package", check);
                self.rollback();
                Err(Error::Validation { check })
            }
        }
    }

    /// Keep the changes and drop the snapshot
    pub fn commit(&mut self) -> Result<()> {
        self.require(TxState::Validated, "commit")?;
        self.snapshot = None;
        self.state = TxState::Committed;
        Ok(())
    }

    /// Put the snapshot back
    pub fn rollback(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.package = snapshot;
        }
        self.state = TxState::RolledBack;
    }

    fn require(&self, state: TxState, operation: &str) -> Result<()> {
        if self.state == state {
            Ok(())
        } else {
            Err(Error::TransactionState {
                state: self.state.to_string(),
                operation: operation.to_string(),
            })
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.snapshot.is_some() && self.state != TxState::Committed {
            warn!("transaction dropped while {}, restoring the original package", self.state);
            self.rollback();
        }
    }
}

/// Apply `plan` in one transaction
pub fn apply(package: &mut Package, plan: &RemovalPlan) -> Result<ApplyReport> {
    let size_before = uncompressed_size(package)?;

    let mut tx = Transaction::new(package);
    tx.snapshot()?;
    tx.apply(plan)?;
    tx.validate()?;
    tx.commit()?;
    let size_after = uncompressed_size(tx.package())?;

    let report = ApplyReport {
        removed: plan.counts(),
        bytes_saved: size_before.saturating_sub(size_after),
    };
    info!(
        "applied {} removals, package shrank by {} bytes",
        plan.len(),
        report.bytes_saved
    );
    Ok(report)
}

/// What `plan` would remove, without touching the package
pub fn dry_run(package: &Package, plan: &RemovalPlan) -> ApplyReport {
    for item in plan.items() {
        debug!(
            "would remove {} {} from {} ({} bytes)",
            item.kind, item.id, item.part, item.bytes
        );
    }
    let bytes_saved = plan.estimated_savings();
    if let Ok(total) = uncompressed_size(package) {
        info!("dry run: {} of {} bytes removable", bytes_saved, total);
    }
    ApplyReport {
        removed: plan.counts(),
        bytes_saved,
    }
}

fn uncompressed_size(package: &Package) -> Result<usize> {
    Ok(package.entries()?.iter().map(|(_, data)| data.len()).sum())
}

fn apply_items(package: &mut Package, plan: &RemovalPlan) -> Result<()> {
    let mut edits: BTreeMap<&PartUri, Vec<&Action>> = BTreeMap::new();
    let mut relationships = Vec::new();
    let mut parts = Vec::new();

    for item in plan.items() {
        for action in &item.actions {
            match action {
                Action::RemoveRelationship { owner, id } => relationships.push((owner.as_ref(), id.as_str())),
                Action::RemovePart => parts.push(&item.part),
                _ => edits.entry(&item.part).or_default().push(action),
            }
        }
    }

    for (uri, actions) in edits {
        edit_part(package, uri, actions)?;
    }

    for (owner, id) in relationships {
        let removed = match owner {
            Some(uri) => package
                .part_mut(uri)
                .and_then(|part| part.relationships_mut())
                .and_then(|rels| rels.remove(id)),
            None => package.relationships_mut().remove(id),
        };
        if removed.is_none() {
            let part = owner.map_or_else(|| "/_rels/.rels".to_string(), |uri| uri.relationships_uri().to_string());
            return Err(Error::Apply {
                part,
                message: format!("no relationship {}", id),
            });
        }
    }

    for uri in parts {
        if package.remove_part(uri).is_none() {
            return Err(Error::PartNotFound(uri.to_string()));
        }
    }
    Ok(())
}

/// Strip attributes, then remove and unwrap elements from the last in
/// document order to the first so earlier paths stay valid
fn edit_part(package: &mut Package, uri: &PartUri, actions: Vec<&Action>) -> Result<()> {
    let part = package
        .part_mut(uri)
        .ok_or_else(|| Error::PartNotFound(uri.to_string()))?;
    let mut doc = XmlDocument::parse(part.data()).map_err(|e| Error::Apply {
        part: uri.to_string(),
        message: e.to_string(),
    })?;
    let missing = |path: &NodePath| Error::Apply {
        part: uri.to_string(),
        message: format!("no element at {}", path),
    };

    let (strips, mut structural): (Vec<&Action>, Vec<&Action>) = actions
        .into_iter()
        .partition(|action| matches!(action, Action::StripAttribute(..)));

    for action in strips {
        if let Action::StripAttribute(path, attr) = action {
            doc.root
                .element_at_mut(path.indices())
                .ok_or_else(|| missing(path))?
                .remove_attr(attr);
        }
    }

    structural.sort_by(|a, b| b.path().cmp(&a.path()));
    structural.dedup();
    for action in structural {
        match action {
            Action::RemoveElement(path) => {
                doc.root.remove_at(path.indices()).ok_or_else(|| missing(path))?;
            }
            Action::UnwrapElement(path) => {
                doc.root.unwrap_at(path.indices()).ok_or_else(|| missing(path))?;
            }
            _ => {}
        }
    }

    part.set_data(doc.to_bytes()?);
    Ok(())
}

/// Post-apply checks; the error names the failed check
fn check(before: &Package, after: &Package) -> std::result::Result<(), String> {
    let fail = |check: &str, detail: String| format!("{}: {}", check, detail);

    let bytes = after
        .content_types()
        .to_bytes()
        .map_err(|e| fail("content-types", e.to_string()))?;
    ContentTypes::from_bytes(&bytes).map_err(|e| fail("content-types", e.to_string()))?;

    if after.relationships().by_type(rel_types::OFFICE_DOCUMENT).is_none() {
        return Err(fail(
            "package-relationships",
            "no officeDocument relationship".to_string(),
        ));
    }

    let owners = std::iter::once((None, after.relationships())).chain(
        after
            .parts()
            .filter_map(|(uri, part)| part.relationships().map(|rels| (Some(uri), rels))),
    );
    for (owner, rels) in owners {
        for rel in rels.iter().filter(|rel| !rel.is_external()) {
            let Ok(target) = Package::resolve_target(owner, rel) else {
                continue;
            };
            if before.contains(&target) && !after.contains(&target) {
                let check = if owner.is_none() {
                    "package-relationships"
                } else {
                    "relationship-targets"
                };
                return Err(fail(check, format!("{} points at removed {}", rel.id, target)));
            }
        }
    }

    let main = after
        .main_document_part()
        .ok_or_else(|| fail("main-document", "missing".to_string()))?;
    XmlDocument::parse(main.data()).map_err(|e| fail("main-document", e.to_string()))?;

    for (uri, part) in after.parts() {
        if part.is_modified() && part.is_xml() {
            XmlDocument::parse(part.data()).map_err(|e| fail("modified-parts", format!("{}: {}", uri, e)))?;
        }
    }

    let before_parsed = ParsedPackage::new(before);
    let before_graph = Graph::build(&before_parsed);
    let already_dangling: HashSet<String> = before_graph
        .dangling()
        .map(|r| format!("{}|{}", r.part, r.target))
        .collect();
    let after_parsed = ParsedPackage::new(after);
    let after_graph = Graph::build(&after_parsed);
    for reference in after_graph.dangling() {
        let key = format!("{}|{}", reference.part, reference.target);
        if before_graph.find(&reference.target).is_some() && !already_dangling.contains(&key) {
            return Err(fail(
                "dangling-references",
                format!("{} in {}", reference.target, reference.part),
            ));
        }
    }

    Ok(())
}
