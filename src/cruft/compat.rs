//! Legacy compatibility flags in the settings part

use super::Finding;
use crate::config::{Category, SweepConfig};
use crate::opc::{ParsedPackage, PartRole};
use crate::xml::{Visit, W};

/// Layout flags kept only for older Word versions, with what they emulate
const LEGACY_FLAGS: &[(&str, &str)] = &[
    ("useFELayout", "Far East layout compatibility"),
    ("useWord2002TableStyleRules", "Word 2002 table style compatibility"),
    ("growAutofit", "legacy autofit behavior"),
    ("useWord97LineBreakRules", "Word 97 line break compatibility"),
    ("doNotUseIndentAsNumberingTabStop", "legacy numbering tab stops"),
    ("useAltKinsokuLineBreakRules", "legacy kinsoku line breaking"),
    ("allowSpaceOfSameStyleInTable", "legacy table spacing"),
    ("doNotSuppressParagraphBorders", "legacy paragraph borders"),
    ("doNotAutofitConstrainedTables", "legacy table autofit"),
    ("autofitToFirstFixedWidthCell", "legacy table autofit"),
    ("displayHangulFixedWidth", "legacy Hangul width"),
    ("splitPgBreakAndParaMark", "legacy page break placement"),
    ("doNotVertAlignCellWithSp", "legacy cell alignment"),
    ("doNotBreakConstrainedForcedTable", "legacy table breaking"),
    ("doNotVertAlignInTxbx", "legacy text box alignment"),
    ("useAnsiKerningPairs", "legacy kerning"),
    ("cachedColBalance", "cached column balance"),
];

/// `w:compatSetting` names that change how the document is laid out today
const KEPT_SETTINGS: &[&str] = &["compatibilityMode", "overrideTableStyleFontSizeAndJustification"];

pub fn scan(parsed: &ParsedPackage<'_>, config: &SweepConfig) -> Vec<Finding> {
    let mut findings = Vec::new();

    for part in parsed.by_role(PartRole::Settings) {
        part.document.walk(|path, el, scope| {
            if !scope.is(el, W, "compat") {
                return Visit::Descend;
            }
            if config.aggressive_compat {
                findings.push(
                    Finding::element(
                        Category::CompatSetting,
                        &part.uri,
                        path,
                        el,
                        "whole compatibility block",
                    )
                    .with_detail(format!("{} settings", el.child_elements().count())),
                );
                return Visit::Skip;
            }

            for (index, child) in el.children.iter().enumerate() {
                let crate::xml::RawXmlNode::Element(child) = child else {
                    continue;
                };
                let mut child_path = path.to_vec();
                child_path.push(index);

                let local = child.local_name();
                if local == "compatSetting" {
                    let name = scope.attr(child, W, "name").unwrap_or_default();
                    if !KEPT_SETTINGS.contains(&name) {
                        findings.push(
                            Finding::element(
                                Category::CompatSetting,
                                &part.uri,
                                &child_path,
                                child,
                                "compatibility setting for legacy behavior",
                            )
                            .with_detail(name),
                        );
                    }
                } else if let Some((_, reason)) = LEGACY_FLAGS.iter().find(|(flag, _)| *flag == local) {
                    findings.push(Finding::element(
                        Category::CompatSetting,
                        &part.uri,
                        &child_path,
                        child,
                        *reason,
                    ));
                }
            }
            Visit::Skip
        });
    }

    findings
}
