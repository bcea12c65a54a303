//! Hyperlinks to configured external domains

use log::debug;

use super::{Action, Finding};
use crate::config::{Category, SweepConfig};
use crate::graph::ResourceId;
use crate::opc::{rel_types, ParsedPackage};
use crate::xml::{NodePath, Visit, R, W};

/// Lowercased host of an absolute URL, without userinfo or port
fn host(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = authority.rsplit('@').next().unwrap_or_default();
    let host = host.split(':').next().unwrap_or_default();
    (!host.is_empty()).then(|| host.to_ascii_lowercase())
}

fn matches_domain(host: &str, domain: &str) -> bool {
    let domain = domain.trim().trim_start_matches('.').to_ascii_lowercase();
    !domain.is_empty()
        && (host == domain
            || host
                .strip_suffix(domain.as_str())
                .is_some_and(|rest| rest.ends_with('.')))
}

pub fn scan(parsed: &ParsedPackage<'_>, config: &SweepConfig) -> Vec<Finding> {
    if config.link_domains.is_empty() {
        return Vec::new();
    }
    let mut findings = Vec::new();

    for part in parsed.documents() {
        let Some(rels) = parsed.package().part(&part.uri).and_then(|p| p.relationships()) else {
            continue;
        };

        for rel in rels.iter() {
            if !rel.is_external() || rel.rel_type != rel_types::HYPERLINK {
                continue;
            }
            let Some(host) = host(&rel.target) else {
                continue;
            };
            if !config.link_domains.iter().any(|d| matches_domain(&host, d)) {
                continue;
            }

            let mut holders: Vec<(NodePath, bool, usize)> = Vec::new();
            part.document.walk(|path, el, scope| {
                let refers = el
                    .attributes
                    .iter()
                    .any(|(key, value)| value == &rel.id && scope.attr_namespace(key) == Some(R));
                if refers {
                    let mut tag = el.clone();
                    tag.children.clear();
                    holders.push((NodePath::from(path), scope.is(el, W, "hyperlink"), tag.serialized_len()));
                }
                Visit::Descend
            });

            if holders.iter().any(|(_, is_link, _)| !is_link) {
                debug!(
                    "{} {} is used by more than hyperlinks, leaving it",
                    part.uri, rel.id
                );
                continue;
            }

            let mut actions: Vec<Action> = holders
                .iter()
                .map(|(path, _, _)| Action::UnwrapElement(path.clone()))
                .collect();
            actions.push(Action::RemoveRelationship {
                owner: Some(part.uri.clone()),
                id: rel.id.clone(),
            });

            findings.push(Finding {
                category: Category::ExternalLinkDomain,
                part: part.uri.clone(),
                actions,
                kind: "hyperlink".to_string(),
                id: rel.id.clone(),
                detail: rel.target.clone(),
                reason: format!("link to {}", host),
                bytes: rel.serialized_len() + holders.iter().map(|(_, _, bytes)| bytes).sum::<usize>(),
                resource: Some(ResourceId::relationship(Some(&part.uri), rel.id.as_str())),
            });
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cruft::test_support::package;
    use crate::opc::PartUri;

    fn linked(body: &str, targets: &[&str]) -> crate::opc::Package {
        let mut pkg = package(body, None, None);
        let doc = PartUri::new("/word/document.xml").unwrap();
        let rels = pkg.part_mut(&doc).unwrap().ensure_relationships();
        for target in targets {
            rels.add_external(rel_types::HYPERLINK, target);
        }
        pkg
    }

    #[test]
    fn test_host_extraction() {
        assert_eq!(host("https://User@Docs.Example.com:8080/a?b"), Some("docs.example.com".into()));
        assert_eq!(host("mailto:someone@example.com"), None);
        assert!(matches_domain("docs.example.com", "example.com"));
        assert!(matches_domain("example.com", ".Example.com"));
        assert!(!matches_domain("badexample.com", "example.com"));
    }

    #[test]
    fn test_hyperlinks_to_matching_domains_are_unwrapped() {
        let pkg = linked(
            r#"<w:p><w:hyperlink r:id="rId1"><w:r><w:t>tracker</w:t></w:r></w:hyperlink><w:hyperlink r:id="rId2"><w:r><w:t>keep</w:t></w:r></w:hyperlink></w:p>"#,
            &["https://track.ads.example/x", "https://rust-lang.org"],
        );
        let parsed = ParsedPackage::new(&pkg);

        assert!(scan(&parsed, &SweepConfig::default()).is_empty());

        let config = SweepConfig::default().link_domain("ads.example");
        let findings = scan(&parsed, &config);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].id, "rId1");
        let doc = PartUri::new("/word/document.xml").unwrap();
        assert_eq!(
            findings[0].actions,
            vec![
                Action::UnwrapElement(NodePath::from(vec![0, 0, 0])),
                Action::RemoveRelationship {
                    owner: Some(doc),
                    id: "rId1".into()
                },
            ]
        );
    }

    #[test]
    fn test_relationship_used_elsewhere_is_skipped() {
        let pkg = linked(
            r#"<w:p><w:hyperlink r:id="rId1"><w:r><w:t>a</w:t></w:r></w:hyperlink><w:r><w:object r:id="rId1"/></w:r></w:p>"#,
            &["https://example.com/"],
        );
        let parsed = ParsedPackage::new(&pkg);
        let config = SweepConfig::default().link_domain("example.com");
        assert!(scan(&parsed, &config).is_empty());
    }
}
