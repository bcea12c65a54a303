//! Revision-save ids (`w:rsid*`)

use super::{Action, Finding};
use crate::config::{Category, SweepConfig};
use crate::opc::{ParsedPackage, PartRole};
use crate::xml::{attribute_len, split_qname, NodePath, Visit, W};

pub fn scan(parsed: &ParsedPackage<'_>, _config: &SweepConfig) -> Vec<Finding> {
    let mut findings = Vec::new();

    for part in parsed.documents() {
        part.document.walk(|path, el, scope| {
            if part.role == PartRole::Settings && scope.is(el, W, "rsids") {
                findings.push(
                    Finding::element(
                        Category::Rsid,
                        &part.uri,
                        path,
                        el,
                        "revision save id table",
                    )
                    .with_detail(format!("{} entries", el.child_elements().count())),
                );
                return Visit::Skip;
            }

            for (key, value) in &el.attributes {
                let is_rsid = split_qname(key).1.starts_with("rsid")
                    && scope.attr_namespace(key) == Some(W);
                if is_rsid {
                    findings.push(Finding {
                        category: Category::Rsid,
                        part: part.uri.clone(),
                        actions: vec![Action::StripAttribute(NodePath::from(path), key.clone())],
                        kind: "attribute".to_string(),
                        id: key.clone(),
                        detail: format!("on <{}>", el.name),
                        reason: "revision save id".to_string(),
                        bytes: attribute_len(key, value),
                        resource: None,
                    });
                }
            }
            Visit::Descend
        });
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cruft::test_support::package;

    #[test]
    fn test_attributes_and_settings_table() {
        let pkg = package(
            r#"<w:p w:rsidR="00A77B3E" w:rsidRDefault="00A77B3E"><w:r w:rsidRPr="00B1"><w:t>a</w:t></w:r></w:p>"#,
            Some(r#"<w:rsids><w:rsidRoot w:val="00A77B3E"/><w:rsid w:val="00A77B3E"/></w:rsids>"#),
            None,
        );
        let parsed = ParsedPackage::new(&pkg);
        let findings = scan(&parsed, &SweepConfig::default());

        let ids: Vec<&str> = findings.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["w:rsidR", "w:rsidRDefault", "w:rsidRPr", "w:rsids"]);
        assert_eq!(findings[0].bytes, 19);
        assert_eq!(
            findings[2].actions,
            vec![Action::StripAttribute(NodePath::from(vec![0, 0, 0]), "w:rsidRPr".into())]
        );
    }
}
