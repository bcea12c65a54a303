//! Run configuration, passed explicitly to every stage

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{Error, Result};
pub use crate::protected::ProtectedConfig;

/// One independently toggle-able kind of removal
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    OrphanRelationship,
    OrphanMedia,
    OrphanStyle,
    OrphanFont,
    OrphanNumbering,
    Rsid,
    EmptyElement,
    LocaleFont,
    CompatSetting,
    Bookmark,
    ProofState,
    ExternalLinkDomain,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Category::OrphanRelationship,
        Category::OrphanMedia,
        Category::OrphanStyle,
        Category::OrphanFont,
        Category::OrphanNumbering,
        Category::Rsid,
        Category::EmptyElement,
        Category::LocaleFont,
        Category::CompatSetting,
        Category::Bookmark,
        Category::ProofState,
        Category::ExternalLinkDomain,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::OrphanRelationship => "orphan-relationship",
            Category::OrphanMedia => "orphan-media",
            Category::OrphanStyle => "orphan-style",
            Category::OrphanFont => "orphan-font",
            Category::OrphanNumbering => "orphan-numbering",
            Category::Rsid => "rsid",
            Category::EmptyElement => "empty-element",
            Category::LocaleFont => "locale-font",
            Category::CompatSetting => "compat-setting",
            Category::Bookmark => "bookmark",
            Category::ProofState => "proof-state",
            Category::ExternalLinkDomain => "external-link-domain",
        }
    }

    /// Categories decided by reachability rather than by a scanner
    pub fn is_orphan(self) -> bool {
        matches!(
            self,
            Category::OrphanRelationship
                | Category::OrphanMedia
                | Category::OrphanStyle
                | Category::OrphanFont
                | Category::OrphanNumbering
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::Config(format!("unknown category '{}'", s)))
    }
}

/// Enabled categories
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategorySet(BTreeSet<Category>);

impl CategorySet {
    pub fn all() -> Self {
        Self(Category::ALL.into_iter().collect())
    }

    pub fn none() -> Self {
        Self(BTreeSet::new())
    }

    /// Just one category
    pub fn only(category: Category) -> Self {
        Self(BTreeSet::from([category]))
    }

    pub fn with(mut self, category: Category) -> Self {
        self.0.insert(category);
        self
    }

    pub fn without(mut self, category: Category) -> Self {
        self.0.remove(&category);
        self
    }

    pub fn contains(&self, category: Category) -> bool {
        self.0.contains(&category)
    }

    pub fn iter(&self) -> impl Iterator<Item = Category> + '_ {
        self.0.iter().copied()
    }
}

impl Default for CategorySet {
    fn default() -> Self {
        Self::all()
    }
}

/// What a run does with the package
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Report orphans and every cruft finding
    #[default]
    Analyze,
    /// Report the removal plan without touching the package
    DryRun,
    /// Apply the plan inside a transaction
    Apply,
}

/// How much of the manifest is echoed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

/// Immutable configuration of one run
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub mode: Mode,
    pub verbosity: Verbosity,
    pub categories: CategorySet,
    /// Remove the whole `w:compat` block instead of individual flags
    pub aggressive_compat: bool,
    /// Hosts whose hyperlinks are unlinked (subdomains included)
    pub link_domains: Vec<String>,
    /// Theme font scripts to keep, compared case-insensitively
    pub keep_scripts: Vec<String>,
    /// Bookmark name prefixes Word uses for its own markers
    pub bookmark_prefixes: Vec<String>,
    pub protected: ProtectedConfig,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            verbosity: Verbosity::default(),
            categories: CategorySet::all(),
            aggressive_compat: false,
            link_domains: Vec::new(),
            keep_scripts: vec!["Latn".to_string()],
            bookmark_prefixes: ["_GoBack", "_Ref", "_Toc", "_Hlk", "_PictureBullets"]
                .into_iter()
                .map(String::from)
                .collect(),
            protected: ProtectedConfig::default(),
        }
    }
}

impl SweepConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn categories(mut self, categories: CategorySet) -> Self {
        self.categories = categories;
        self
    }

    pub fn aggressive_compat(mut self, aggressive: bool) -> Self {
        self.aggressive_compat = aggressive;
        self
    }

    /// Add a domain for external-link removal
    pub fn link_domain(mut self, domain: impl Into<String>) -> Self {
        self.link_domains.push(domain.into());
        self
    }

    pub fn keep_scripts<I, S>(mut self, scripts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keep_scripts = scripts.into_iter().map(Into::into).collect();
        self
    }

    pub fn protected(mut self, protected: ProtectedConfig) -> Self {
        self.protected = protected;
        self
    }

    pub fn is_enabled(&self, category: Category) -> bool {
        self.categories.contains(category)
    }

    /// Reject values that cannot mean anything
    pub fn validate(&self) -> Result<()> {
        if let Some(domain) = self
            .link_domains
            .iter()
            .find(|d| d.trim().is_empty() || d.contains('/'))
        {
            return Err(Error::Config(format!("invalid link domain '{}'", domain)));
        }
        if self.bookmark_prefixes.iter().any(|p| !p.starts_with('_')) {
            return Err(Error::Config(
                "internal bookmark prefixes must start with '_'".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = SweepConfig::default();
        assert_eq!(config.mode, Mode::Analyze);
        assert_eq!(config.keep_scripts, vec!["Latn".to_string()]);
        assert!(Category::ALL.iter().all(|c| config.is_enabled(*c)));
    }

    #[test]
    fn test_from_json() {
        let config = SweepConfig::from_json(
            r#"{
                "mode": "dry-run",
                "categories": ["rsid", "orphan-style"],
                "link_domains": ["tracker.example.com"],
                "protected": { "styles": ["Quote"] }
            }"#,
        )
        .unwrap();

        assert_eq!(config.mode, Mode::DryRun);
        assert_eq!(
            config.categories,
            CategorySet::only(Category::Rsid).with(Category::OrphanStyle)
        );
        assert_eq!(config.protected.styles, vec!["Quote".to_string()]);
        assert_eq!(config.keep_scripts, vec!["Latn".to_string()]);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(matches!(
            SweepConfig::from_json(r#"{ "link_domains": ["https://x.com/"] }"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            SweepConfig::from_json(r#"{ "categories": ["nope"] }"#),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_category_names() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
        assert!(CategorySet::none().without(Category::Rsid).iter().next().is_none());
    }
}
