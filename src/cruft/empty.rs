//! Runs and property containers that carry nothing

use super::Finding;
use crate::config::{Category, SweepConfig};
use crate::opc::ParsedPackage;
use crate::xml::{split_qname, NamespaceScope, RawXmlElement, RawXmlNode, Visit, W};

pub fn scan(parsed: &ParsedPackage<'_>, _config: &SweepConfig) -> Vec<Finding> {
    let mut findings = Vec::new();

    for part in parsed.documents().filter(|p| p.role.is_story()) {
        part.document.walk(|path, el, scope| {
            // Property-change records must keep their (possibly empty) snapshot
            if el.local_name().ends_with("PrChange") {
                return Visit::Skip;
            }
            if scope.is(el, W, "r") && is_empty_run(el, scope) {
                findings.push(Finding::element(
                    Category::EmptyElement,
                    &part.uri,
                    path,
                    el,
                    "run without content",
                ));
                return Visit::Skip;
            }
            if is_empty_container(el, scope) {
                findings.push(Finding::element(
                    Category::EmptyElement,
                    &part.uri,
                    path,
                    el,
                    "empty property container",
                ));
                return Visit::Skip;
            }
            Visit::Descend
        });
    }

    findings
}

/// A run whose only children are run properties
fn is_empty_run(run: &RawXmlElement, scope: &NamespaceScope) -> bool {
    run.children.iter().all(|child| match child {
        RawXmlNode::Element(e) => split_qname(&e.name).1 == "rPr" && has_w_prefix(e, scope),
        RawXmlNode::Text(t) => t.trim().is_empty(),
        RawXmlNode::Comment(_) => true,
        RawXmlNode::CData(_) => false,
    })
}

/// `w:rPr` / `w:pPr` with no attributes besides revision ids and no
/// children besides other empty containers
fn is_empty_container(el: &RawXmlElement, scope: &NamespaceScope) -> bool {
    if !(scope.is(el, W, "rPr") || scope.is(el, W, "pPr")) {
        return false;
    }
    let only_rsids = el
        .attributes
        .iter()
        .all(|(key, _)| split_qname(key).1.starts_with("rsid"));
    let children_empty = el.children.iter().all(|child| match child {
        RawXmlNode::Element(e) => is_empty_container(e, scope),
        RawXmlNode::Text(t) => t.trim().is_empty(),
        RawXmlNode::Comment(_) => true,
        RawXmlNode::CData(_) => false,
    });
    only_rsids && children_empty
}

fn has_w_prefix(el: &RawXmlElement, scope: &NamespaceScope) -> bool {
    scope.resolve(split_qname(&el.name).0) == Some(W)
}
