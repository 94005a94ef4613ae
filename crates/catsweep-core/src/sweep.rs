//! Run coordination: mode selection, fixed pass order, the write boundary.

use catsweep_error::Result;
use serde::{Deserialize, Serialize};

use crate::passes::{self, PassCtx};
use crate::ports::{CatalogDirectory, ObjectStore, TxnControl, UniqueKeyGenerator};
use crate::report::{Reporter, RunReport};

/// Whether a run only reports or actually mutates. Chosen once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Detect and count only; the run's write unit is discarded at the end.
    DryRun,
    /// Perform the repairs; the write unit commits normally.
    Commit,
}

impl Mode {
    /// Tri-state request parameter parse.
    ///
    /// Only the literal `false`, case-insensitively, opts into commit mode;
    /// absent and every other value mean dry run. One specific way into
    /// destructive mode, on purpose.
    #[must_use]
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some(value) if value.eq_ignore_ascii_case("false") => Self::Commit,
            _ => Self::DryRun,
        }
    }

    #[must_use]
    pub const fn commits(self) -> bool {
        matches!(self, Self::Commit)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DryRun => "dry_run",
            Self::Commit => "commit",
        }
    }
}

impl From<bool> for Mode {
    fn from(dry_run: bool) -> Self {
        if dry_run { Self::DryRun } else { Self::Commit }
    }
}

/// How one catalog is treated by the final pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    /// Gets duplicate-key repair.
    #[default]
    Content,
    /// Gets the reference check instead; duplicate repair is not idempotent
    /// for reference records.
    Reference,
}

/// One catalog to process, in configuration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSpec {
    pub name: String,
    pub kind: CatalogKind,
}

impl CatalogSpec {
    #[must_use]
    pub fn content(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: CatalogKind::Content,
        }
    }

    #[must_use]
    pub fn reference(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: CatalogKind::Reference,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Catalogs to process, in this order.
    pub catalogs: Vec<CatalogSpec>,
    /// Name of the unique-key attribute in the catalogs.
    pub key_attribute: String,
    /// Reserved path segment for objects still under construction.
    pub pending_segment: String,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            catalogs: Vec::new(),
            key_attribute: "uid".to_owned(),
            pending_segment: "pending".to_owned(),
        }
    }
}

/// Drives the passes across the configured catalogs and owns the
/// all-or-nothing write boundary.
pub struct Sweeper<'a> {
    directory: &'a dyn CatalogDirectory,
    store: &'a dyn ObjectStore,
    generator: &'a dyn UniqueKeyGenerator,
    txn: &'a dyn TxnControl,
    config: SweepConfig,
}

impl<'a> Sweeper<'a> {
    pub fn new(
        directory: &'a dyn CatalogDirectory,
        store: &'a dyn ObjectStore,
        generator: &'a dyn UniqueKeyGenerator,
        txn: &'a dyn TxnControl,
        config: SweepConfig,
    ) -> Self {
        Self {
            directory,
            store,
            generator,
            txn,
            config,
        }
    }

    /// Run one full reconciliation in the given mode.
    ///
    /// Always completes with a full report unless a conflict or interrupt
    /// propagates; those abort the run for the enclosing retry machinery.
    pub fn sweep(&self, mode: Mode) -> Result<RunReport> {
        let mut reporter = Reporter::new();
        reporter.line("Starting catalog sweep.");
        reporter.blank();
        if mode.commits() {
            reporter.warn_line("Commit mode selected. Changes are permanent.");
            // Our mutations carry no origin form token; say so up front.
            self.txn.bypass_write_protection()?;
        } else {
            reporter.line(
                "Dry run selected, so only reporting. \
                 Pass dry_run=false to make changes permanent.",
            );
        }
        reporter.blank();

        for spec in &self.config.catalogs {
            reporter.blank();
            let Some(catalog) = self.directory.catalog(&spec.name) else {
                reporter.line(format!("Ignored non existing catalog {}.", spec.name));
                continue;
            };
            reporter.line(format!("Handling catalog {}.", spec.name));

            let ctx = PassCtx {
                catalog_name: &spec.name,
                catalog,
                store: self.store,
                mode,
                pending_segment: &self.config.pending_segment,
            };
            let mut problems = 0u64;
            problems += passes::size::check(&ctx, &mut reporter)?;
            problems += passes::orphans::missing_key(&ctx, &mut reporter)?;
            problems += passes::orphans::missing_object(&ctx, &mut reporter)?;
            problems += match spec.kind {
                CatalogKind::Content => passes::duplicates::reconcile(
                    &ctx,
                    self.generator,
                    &self.config.key_attribute,
                    &mut reporter,
                )?,
                CatalogKind::Reference => passes::references::check(&ctx, &mut reporter)?,
            };
            reporter.line(format!("{}: total problems: {problems}.", spec.name));
            reporter.add_problems(&spec.name, problems);
        }

        reporter.blank();
        reporter.line("Done with catalog sweep.");
        if !mode.commits() {
            // We should not have written anything, but back out any
            // inadvertent changes anyway.
            self.txn.abort()?;
            reporter.line("Dry run selected: aborted any transaction changes.");
        }
        Ok(reporter.finish(mode))
    }

    /// Entry point with the tri-state `dry_run` request parameter.
    pub fn sweep_with_param(&self, dry_run: Option<&str>) -> Result<RunReport> {
        self.sweep(Mode::from_param(dry_run))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{
        CatalogSnapshot, MemoryKeyGenerator, MemoryStore, ObjectSnapshot, RecordSnapshot, Snapshot,
    };

    fn snapshot() -> Snapshot {
        Snapshot {
            catalogs: vec![
                CatalogSnapshot {
                    name: "primary".to_owned(),
                    kind: CatalogKind::Content,
                    indexed_attributes: vec!["uid".to_owned()],
                    reported_count: None,
                    records: vec![
                        RecordSnapshot::new("/a/doc1", Some("K1")),
                        RecordSnapshot::new("/a/b/doc1", Some("K1")),
                        RecordSnapshot::new("/a/gone", Some("K2")),
                        RecordSnapshot::new("/a/keyless", None),
                    ],
                },
                CatalogSnapshot {
                    name: "uid".to_owned(),
                    kind: CatalogKind::Content,
                    indexed_attributes: vec!["uid".to_owned()],
                    reported_count: None,
                    records: vec![RecordSnapshot::new("/a/doc1", Some("K1"))],
                },
            ],
            objects: vec![
                ObjectSnapshot::live("/a/doc1", Some("K1")),
                ObjectSnapshot::live("/a/b/doc1", Some("K1")),
                ObjectSnapshot::live("/a/keyless", Some("K9")),
            ],
            write_protected: false,
        }
    }

    fn config() -> SweepConfig {
        SweepConfig {
            catalogs: vec![
                CatalogSpec::content("primary"),
                CatalogSpec::content("uid"),
                CatalogSpec::reference("reference"),
            ],
            ..SweepConfig::default()
        }
    }

    fn sweeper<'a>(store: &'a MemoryStore, generator: &'a MemoryKeyGenerator) -> Sweeper<'a> {
        Sweeper::new(store, store, generator, store, config())
    }

    #[test]
    fn mode_parse_is_default_safe() {
        assert_eq!(Mode::from_param(None), Mode::DryRun);
        assert_eq!(Mode::from_param(Some("true")), Mode::DryRun);
        assert_eq!(Mode::from_param(Some("0")), Mode::DryRun);
        assert_eq!(Mode::from_param(Some("no")), Mode::DryRun);
        assert_eq!(Mode::from_param(Some("false")), Mode::Commit);
        assert_eq!(Mode::from_param(Some("FALSE")), Mode::Commit);
        assert_eq!(Mode::from_param(Some("False")), Mode::Commit);
        assert_eq!(Mode::from(true), Mode::DryRun);
        assert_eq!(Mode::from(false), Mode::Commit);
    }

    #[test]
    fn missing_catalog_is_ignored_and_run_continues() {
        let store = MemoryStore::load(&snapshot());
        let generator = MemoryKeyGenerator::default();
        let report = sweeper(&store, &generator).sweep(Mode::DryRun).unwrap();
        let text = report.render();
        assert!(text.contains("Ignored non existing catalog reference."));
        assert!(text.contains("Done with catalog sweep."));
    }

    #[test]
    fn dry_run_reports_and_leaves_state_untouched() {
        let store = MemoryStore::load(&snapshot());
        let generator = MemoryKeyGenerator::default();
        let before = store.to_snapshot();
        let report = sweeper(&store, &generator).sweep(Mode::DryRun).unwrap();
        assert_eq!(store.to_snapshot(), before);

        // One orphan, one keyless, one duplicate in the primary catalog.
        assert_eq!(report.problems_for("primary"), 3);
        assert_eq!(report.problems_for("uid"), 0);
        let text = report.render();
        assert!(text.contains("Dry run selected, so only reporting."));
        assert!(text.contains("Dry run selected: aborted any transaction changes."));
        assert!(text.contains("primary: total problems: 3."));
    }

    #[test]
    fn commit_repairs_and_is_idempotent() {
        let store = MemoryStore::load(&snapshot());
        let generator = MemoryKeyGenerator::default();
        let report = sweeper(&store, &generator).sweep(Mode::Commit).unwrap();
        assert_eq!(report.problems_for("primary"), 3);
        assert!(report.render().contains("Commit mode selected."));

        let settled = store.to_snapshot();
        let second = sweeper(&store, &generator).sweep(Mode::Commit).unwrap();
        assert_eq!(second.total_problems(), 0);
        assert_eq!(store.to_snapshot(), settled);
    }

    #[test]
    fn commit_declares_write_protection_bypass() {
        let mut snap = snapshot();
        snap.write_protected = true;
        let store = MemoryStore::load(&snap);
        let generator = MemoryKeyGenerator::default();
        // Without the bypass every removal would fail; the run succeeding at
        // all proves the declaration happened first.
        let report = sweeper(&store, &generator).sweep(Mode::Commit).unwrap();
        assert_eq!(report.problems_for("primary"), 3);
    }

    #[test]
    fn param_entry_point_matches_mode_parse() {
        let store = MemoryStore::load(&snapshot());
        let generator = MemoryKeyGenerator::default();
        let report = sweeper(&store, &generator)
            .sweep_with_param(Some("maybe"))
            .unwrap();
        assert_eq!(report.mode, Mode::DryRun);
    }
}
