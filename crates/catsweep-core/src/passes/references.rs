//! Checks reference catalogs: both ends of every reference must resolve.
//!
//! Reference catalogs get this pass instead of duplicate repair, because
//! re-keying reference records is not idempotent there: every run would keep
//! minting new keys.

use std::collections::BTreeMap;

use catsweep_error::Result;

use crate::passes::PassCtx;
use crate::ports::Accessor;
use crate::report::Reporter;
use crate::resolver::{ResolutionOutcome, resolve};

/// Remove reference records whose source or target object is corrupt.
///
/// A record that itself fails to resolve counts as a reference error without
/// being removed here; in commit mode the orphan passes already pruned those.
pub fn check(ctx: &PassCtx<'_>, reporter: &mut Reporter) -> Result<u64> {
    let name = ctx.catalog_name;
    let mut tallies: BTreeMap<&'static str, u64> = BTreeMap::new();
    let mut ref_errors = 0u64;

    for record in ctx.catalog.all_records()? {
        let own = resolve(ctx.store, &record, Accessor::Own, ctx.pending_segment)?;
        if own.is_corrupt() {
            ref_errors += 1;
            continue;
        }
        if !matches!(own, ResolutionOutcome::Resolved(_)) {
            // No error, but no reference object either. Accept it.
            continue;
        }

        for accessor in [Accessor::ReferenceSource, Accessor::ReferenceTarget] {
            let outcome = resolve(ctx.store, &record, accessor, ctx.pending_segment)?;
            if !outcome.is_corrupt() {
                continue;
            }
            *tallies.entry(outcome.label()).or_insert(0) += 1;
            if ctx.mode.commits() && !record.path.is_empty() {
                ctx.catalog.remove_by_path(&record.path)?;
            }
            // No need to try the second end once the first already failed.
            break;
        }
    }

    if ref_errors > 0 {
        reporter.line(format!("{name}: problem getting {ref_errors} references."));
    }
    if tallies.is_empty() {
        reporter.line(format!("{name}: removed no records in the reference check."));
    } else {
        for (label, count) in &tallies {
            reporter.line(format!(
                "{name}: removed {count} records with status {label} for the source or target object."
            ));
        }
    }
    Ok(tallies.values().sum::<u64>() + ref_errors)
}
