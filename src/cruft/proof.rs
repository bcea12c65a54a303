//! Spelling and grammar check markers

use super::Finding;
use crate::config::{Category, SweepConfig};
use crate::opc::{ParsedPackage, PartRole};
use crate::xml::{Visit, W};

pub fn scan(parsed: &ParsedPackage<'_>, _config: &SweepConfig) -> Vec<Finding> {
    let mut findings = Vec::new();

    for part in parsed.documents() {
        let story = part.role.is_story();
        let settings = part.role == PartRole::Settings;
        if !story && !settings {
            continue;
        }
        part.document.walk(|path, el, scope| {
            if story && scope.is(el, W, "proofErr") {
                findings.push(
                    Finding::element(Category::ProofState, &part.uri, path, el, "proofing error marker")
                        .with_detail(scope.attr(el, W, "type").unwrap_or_default()),
                );
                return Visit::Skip;
            }
            if settings && scope.is(el, W, "proofState") {
                findings.push(Finding::element(
                    Category::ProofState,
                    &part.uri,
                    path,
                    el,
                    "cached proofing state",
                ));
                return Visit::Skip;
            }
            Visit::Descend
        });
    }

    findings
}
