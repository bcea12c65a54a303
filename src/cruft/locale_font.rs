//! Theme font entries for scripts the document does not use

use super::Finding;
use crate::config::{Category, SweepConfig};
use crate::opc::{ParsedPackage, PartRole};
use crate::xml::{Visit, A};

pub fn scan(parsed: &ParsedPackage<'_>, config: &SweepConfig) -> Vec<Finding> {
    let keep = |script: &str| {
        config
            .keep_scripts
            .iter()
            .any(|k| k.eq_ignore_ascii_case(script))
    };
    let mut findings = Vec::new();

    for part in parsed.by_role(PartRole::Theme) {
        part.document.walk(|path, el, scope| {
            if !scope.is(el, A, "font") {
                return Visit::Descend;
            }
            let script = el.attr("script").unwrap_or_default();
            if !script.is_empty() && !keep(script) {
                findings.push(
                    Finding::element(
                        Category::LocaleFont,
                        &part.uri,
                        path,
                        el,
                        format!("font mapping for script {}", script),
                    )
                    .with_detail(el.attr("typeface").unwrap_or_default()),
                );
            }
            Visit::Skip
        });
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cruft::test_support::package;

    fn theme(scripts: &[&str]) -> String {
        let fonts: String = scripts
            .iter()
            .map(|s| format!(r#"<a:font script="{}" typeface="Font {}"/>"#, s, s))
            .collect();
        format!(
            r#"<a:themeElements><a:fontScheme name="Office"><a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/>{}</a:majorFont></a:fontScheme></a:themeElements>"#,
            fonts
        )
    }

    #[test]
    fn test_keep_set_is_case_insensitive() {
        let pkg = package("", None, Some(&theme(&["Jpan", "Hang", "Arab", "Latn"])));
        let parsed = ParsedPackage::new(&pkg);

        let config = SweepConfig::default().keep_scripts(["jpan", "LATN"]);
        let findings = scan(&parsed, &config);
        let flagged: Vec<&str> = findings.iter().map(|f| f.detail.as_str()).collect();
        assert_eq!(flagged, ["Font Hang", "Font Arab"]);
    }

    #[test]
    fn test_sizes_are_serialized_lengths() {
        let pkg = package("", None, Some(&theme(&["Thai"])));
        let parsed = ParsedPackage::new(&pkg);
        let findings = scan(&parsed, &SweepConfig::default());
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].bytes,
            r#"<a:font script="Thai" typeface="Font Thai"/>"#.len()
        );
    }
}
