//! Ordered, human-readable run reporting.
//!
//! Every line is accumulated for the returned report and mirrored to the
//! logging sink, INFO for normal lines and WARN for the ones flagging size
//! mismatches or broken objects.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::sweep::Mode;

/// Severity of one report line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
}

/// Accumulates report lines and per-catalog problem counts during a run.
#[derive(Debug, Default)]
pub struct Reporter {
    lines: Vec<String>,
    problems: BTreeMap<String, u64>,
}

impl Reporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an INFO line.
    pub fn line(&mut self, message: impl Into<String>) {
        self.emit(Severity::Info, message.into());
    }

    /// Append a WARN line.
    pub fn warn_line(&mut self, message: impl Into<String>) {
        self.emit(Severity::Warning, message.into());
    }

    /// Append a blank section separator. Not logged.
    pub fn blank(&mut self) {
        self.lines.push(String::new());
    }

    /// Record the problem total for one catalog.
    pub fn add_problems(&mut self, catalog: &str, count: u64) {
        *self.problems.entry(catalog.to_owned()).or_insert(0) += count;
    }

    /// Seal the accumulated state into an immutable report.
    #[must_use]
    pub fn finish(self, mode: Mode) -> RunReport {
        RunReport {
            mode,
            lines: self.lines,
            problems: self.problems,
        }
    }

    fn emit(&mut self, severity: Severity, message: String) {
        match severity {
            Severity::Info => info!("{message}"),
            Severity::Warning => warn!("{message}"),
        }
        self.lines.push(message);
    }
}

/// Report of one reconciliation run. Immutable once returned.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Mode the run executed in.
    pub mode: Mode,
    /// Ordered message lines; blank lines separate sections.
    pub lines: Vec<String>,
    /// Problems found, keyed by catalog name.
    pub problems: BTreeMap<String, u64>,
}

impl RunReport {
    /// Newline-joined report text.
    #[must_use]
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }

    /// Problems found for one catalog (0 for unknown catalogs).
    #[must_use]
    pub fn problems_for(&self, catalog: &str) -> u64 {
        self.problems.get(catalog).copied().unwrap_or(0)
    }

    /// Problems found across all catalogs.
    #[must_use]
    pub fn total_problems(&self) -> u64 {
        self.problems.values().sum()
    }
}
