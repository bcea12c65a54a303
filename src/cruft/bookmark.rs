//! Bookmarks Word inserts for its own bookkeeping

use std::collections::HashMap;

use super::{Action, Finding};
use crate::config::{Category, SweepConfig};
use crate::graph::ResourceId;
use crate::opc::ParsedPackage;
use crate::xml::{NodePath, Visit, W};

fn reason(name: &str) -> &'static str {
    if name.starts_with("_GoBack") {
        "cursor position bookmark"
    } else if name.starts_with("_Hlk") {
        "hyperlink anchor bookmark"
    } else if name.starts_with("_Toc") {
        "table of contents anchor"
    } else if name.starts_with("_Ref") {
        "cross-reference target"
    } else {
        "internal Word bookmark"
    }
}

pub fn scan(parsed: &ParsedPackage<'_>, config: &SweepConfig) -> Vec<Finding> {
    let internal = |name: &str| {
        config
            .bookmark_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    };
    let mut findings = Vec::new();

    for part in parsed.documents() {
        let mut starts: Vec<(String, Finding)> = Vec::new();
        let mut ends: HashMap<String, (NodePath, usize)> = HashMap::new();

        part.document.walk(|path, el, scope| {
            if scope.is(el, W, "bookmarkStart") {
                let name = scope.attr(el, W, "name").unwrap_or_default();
                if internal(name) {
                    let mut finding =
                        Finding::element(Category::Bookmark, &part.uri, path, el, reason(name));
                    finding.kind = "bookmark".to_string();
                    finding.id = name.to_string();
                    finding.resource = Some(ResourceId::bookmark(name));
                    let id = scope.attr(el, W, "id").unwrap_or_default();
                    starts.push((id.to_string(), finding));
                }
                return Visit::Skip;
            }
            if scope.is(el, W, "bookmarkEnd") {
                if let Some(id) = scope.attr(el, W, "id") {
                    ends.entry(id.to_string())
                        .or_insert_with(|| (NodePath::from(path), el.serialized_len()));
                }
                return Visit::Skip;
            }
            Visit::Descend
        });

        for (id, mut finding) in starts {
            if let Some((path, bytes)) = ends.remove(&id) {
                finding.actions.push(Action::RemoveElement(path));
                finding.bytes += bytes;
            }
            findings.push(finding);
        }
    }

    findings
}
