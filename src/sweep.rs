//! The sweep pipeline: analyze, plan, then report or apply

use log::{debug, info};
use std::path::Path;

use crate::config::{Mode, SweepConfig, Verbosity};
use crate::cruft::scan_all;
use crate::error::{Error, Result};
use crate::executor::{self, ApplyReport};
use crate::graph::{Graph, Reachability};
use crate::opc::{Package, ParsedPackage};
use crate::plan::{plan, RemovalPlan};
use crate::protected::ProtectedSet;
use crate::report::Manifest;

/// Everything the read-only stages learned about a package
#[derive(Debug)]
pub struct Analysis {
    pub plan: RemovalPlan,
    pub manifest: Manifest,
    /// Parse failures, duplicates, cycles and ignored references
    pub issues: Vec<Error>,
}

/// Result of [`Sweeper::run`]
#[derive(Debug)]
pub struct SweepOutcome {
    pub mode: Mode,
    pub manifest: Manifest,
    pub report: ApplyReport,
    /// The package after the run; unchanged unless the mode is apply
    pub package: Package,
}

/// Runs the pipeline with one configuration
#[derive(Clone, Debug)]
pub struct Sweeper {
    config: SweepConfig,
    protected: ProtectedSet,
}

impl Sweeper {
    pub fn new(config: SweepConfig) -> Result<Self> {
        config.validate()?;
        let protected = ProtectedSet::new(&config.protected);
        Ok(Self { config, protected })
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Parse, build the graph, scan and plan. Nothing is modified.
    pub fn analyze(&self, package: &Package) -> Result<Analysis> {
        let parsed = ParsedPackage::new(package);
        let graph = Graph::build(&parsed);
        let reach = Reachability::compute(&graph, &self.protected);
        info!(
            "{} of {} definitions are reachable",
            reach.live_count(),
            graph.len()
        );

        let findings = scan_all(&parsed, &self.config);
        let plan = plan(&parsed, &graph, &self.protected, findings, &self.config)?;

        let mut issues: Vec<Error> = parsed.failures().collect();
        let statistics = Manifest::new(self.config.mode, self.config.verbosity).with_statistics(&graph, &reach);
        issues.extend(graph.into_issues());

        let manifest = statistics
            .with_findings(plan.items())
            .with_issues(issues.iter());
        Ok(Analysis {
            plan,
            manifest,
            issues,
        })
    }

    /// Run the configured mode. Apply goes through a transaction; on a
    /// validation failure the error is returned and the input is dropped
    /// untouched.
    pub fn run(&self, mut package: Package) -> Result<SweepOutcome> {
        let analysis = self.analyze(&package)?;
        self.echo(&analysis);

        let report = match self.config.mode {
            Mode::Analyze | Mode::DryRun => executor::dry_run(&package, &analysis.plan),
            Mode::Apply => executor::apply(&mut package, &analysis.plan)?,
        };

        Ok(SweepOutcome {
            mode: self.config.mode,
            manifest: analysis.manifest,
            report,
            package,
        })
    }

    /// Read `input`, run, and write `output` when the mode is apply and the
    /// transaction committed
    pub fn sweep_file<P: AsRef<Path>, Q: AsRef<Path>>(&self, input: P, output: Q) -> Result<SweepOutcome> {
        let package = Package::open(input.as_ref())?;
        let outcome = self.run(package)?;
        if outcome.mode == Mode::Apply {
            outcome.package.save(output.as_ref())?;
            info!("wrote {}", output.as_ref().display());
        }
        Ok(outcome)
    }

    fn echo(&self, analysis: &Analysis) {
        for entry in &analysis.manifest.entries {
            match self.config.verbosity {
                Verbosity::Verbose => info!(
                    "{} {} {} in {}: {}",
                    entry.category, entry.kind, entry.id, entry.part, entry.reason
                ),
                Verbosity::Normal => debug!("{} {} {} in {}", entry.category, entry.kind, entry.id, entry.part),
                Verbosity::Quiet => {}
            }
        }
    }
}
