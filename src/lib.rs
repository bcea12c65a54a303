//! # docx-sweep
//!
//! Finds and removes what a DOCX package no longer uses.
//!
//! ## Features
//!
//! - Cross-part reference graph over relationships, styles, fonts, numbering,
//!   bookmarks and media, with a mark-and-sweep reachability pass
//! - Cruft scanners for revision ids, empty runs, unused theme fonts, legacy
//!   compatibility flags, internal bookmarks, proofing marks and tracked links
//! - Transactional apply: snapshot, edit, validate, then commit or restore
//! - Unmodified parts are written back byte-for-byte
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docx_sweep::{Mode, SweepConfig, Sweeper};
//!
//! // See what could go
//! let sweeper = Sweeper::new(SweepConfig::default())?;
//! let outcome = sweeper.run(docx_sweep::Package::open("report.docx")?)?;
//! println!("{}", outcome.manifest);
//!
//! // Remove it
//! let sweeper = Sweeper::new(SweepConfig::default().mode(Mode::Apply))?;
//! sweeper.sweep_file("report.docx", "report.clean.docx")?;
//! ```

pub mod config;
pub mod cruft;
pub mod error;
pub mod executor;
pub mod graph;
pub mod opc;
pub mod plan;
pub mod protected;
pub mod report;
pub mod sweep;
pub mod xml;

pub use config::{Category, CategorySet, Mode, SweepConfig, Verbosity};
pub use error::{Error, Result};
pub use executor::{ApplyReport, Transaction, TxState};
pub use graph::{Graph, Reachability, ResourceId, ResourceKind};
pub use opc::{Package, ParsedPackage, Part, PartUri};
pub use plan::RemovalPlan;
pub use protected::{ProtectedConfig, ProtectedSet};
pub use report::Manifest;
pub use sweep::{Analysis, SweepOutcome, Sweeper};
