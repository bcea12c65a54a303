//! Orphan manifest: what a run found or removed, as JSON or text

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::config::{Category, Mode, Verbosity};
use crate::cruft::Finding;
use crate::error::{Error, Result};
use crate::graph::{Graph, Reachability, ResourceKind};

/// One removable (or removed) item
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ManifestEntry {
    pub category: Category,
    pub kind: String,
    pub id: String,
    pub part: String,
    pub detail: String,
    pub reason: String,
    pub bytes: usize,
}

impl From<&Finding> for ManifestEntry {
    fn from(finding: &Finding) -> Self {
        Self {
            category: finding.category,
            kind: finding.kind.clone(),
            id: finding.id.clone(),
            part: finding.part.to_string(),
            detail: finding.detail.clone(),
            reason: finding.reason.clone(),
            bytes: finding.bytes,
        }
    }
}

/// Defined and live definitions of one kind
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct KindStats {
    pub defined: usize,
    pub live: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Manifest {
    pub mode: Mode,
    #[serde(skip)]
    pub verbosity: Verbosity,
    pub entries: Vec<ManifestEntry>,
    pub counts: BTreeMap<Category, usize>,
    pub statistics: BTreeMap<ResourceKind, KindStats>,
    /// Non-fatal problems, as messages
    pub issues: Vec<String>,
    pub estimated_savings_bytes: usize,
}

impl Manifest {
    pub fn new(mode: Mode, verbosity: Verbosity) -> Self {
        Self {
            mode,
            verbosity,
            entries: Vec::new(),
            counts: BTreeMap::new(),
            statistics: BTreeMap::new(),
            issues: Vec::new(),
            estimated_savings_bytes: 0,
        }
    }

    /// Add entries for `findings`, keeping counts and savings current
    pub fn with_findings<'f>(mut self, findings: impl IntoIterator<Item = &'f Finding>) -> Self {
        for finding in findings {
            *self.counts.entry(finding.category).or_insert(0) += 1;
            self.estimated_savings_bytes += finding.bytes;
            self.entries.push(ManifestEntry::from(finding));
        }
        self
    }

    /// Record defined and live counts per resource kind
    pub fn with_statistics(mut self, graph: &Graph, reach: &Reachability) -> Self {
        for (node, definition) in graph.nodes() {
            let stats = self.statistics.entry(definition.id.kind).or_default();
            stats.defined += 1;
            if reach.is_live(node) {
                stats.live += 1;
            }
        }
        self
    }

    pub fn with_issues<'e>(mut self, issues: impl IntoIterator<Item = &'e Error>) -> Self {
        self.issues.extend(issues.into_iter().map(|e| e.to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries of one category
    pub fn category(&self, category: Category) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter().filter(move |e| e.category == category)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let savings = self.estimated_savings_bytes;
        if self.verbosity == Verbosity::Quiet {
            return writeln!(
                f,
                "{} items, {} bytes ({:.1} KB)",
                self.entries.len(),
                savings,
                savings as f64 / 1024.0
            );
        }

        let rule = "=".repeat(60);
        writeln!(f, "{}", rule)?;
        let title = match self.mode {
            Mode::Analyze => "Orphan analysis",
            Mode::DryRun => "Removal plan (dry run)",
            Mode::Apply => "Removed",
        };
        writeln!(f, "{}", title)?;
        writeln!(f, "{}", rule)?;

        if !self.statistics.is_empty() {
            writeln!(f)?;
            writeln!(f, "Definitions (live / defined):")?;
            for (kind, stats) in &self.statistics {
                writeln!(f, "  {:<14}{:>6} / {}", kind.as_str(), stats.live, stats.defined)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "By category:")?;
        if self.counts.is_empty() {
            writeln!(f, "  nothing to remove")?;
        }
        for (category, count) in &self.counts {
            writeln!(f, "  {:<22}{:>6}", category.as_str(), count)?;
        }

        if !self.entries.is_empty() {
            writeln!(f)?;
            for (i, entry) in self.entries.iter().enumerate() {
                writeln!(
                    f,
                    "{:>4}. [{}] {} {} in {} ({} bytes)",
                    i + 1,
                    entry.category,
                    entry.kind,
                    entry.id,
                    entry.part,
                    entry.bytes
                )?;
                if self.verbosity == Verbosity::Verbose {
                    if !entry.detail.is_empty() {
                        writeln!(f, "      {}", entry.detail)?;
                    }
                    writeln!(f, "      reason: {}", entry.reason)?;
                }
            }
        }

        if !self.issues.is_empty() {
            writeln!(f)?;
            writeln!(f, "Warnings:")?;
            for issue in &self.issues {
                writeln!(f, "  - {}", issue)?;
            }
        }

        writeln!(f)?;
        writeln!(
            f,
            "Estimated bytes saved: {} ({:.1} KB)",
            savings,
            savings as f64 / 1024.0
        )
    }
}
