//! Removes records with no usable unique key or no resolvable object.
//!
//! Both passes iterate eagerly materialized record lists so that removals
//! mid-traversal never cause skipped or duplicated work.

use std::collections::BTreeMap;

use catsweep_error::Result;

use crate::passes::PassCtx;
use crate::ports::Accessor;
use crate::report::Reporter;
use crate::resolver::resolve;

/// Remove every record whose unique key is absent.
///
/// Records whose path is empty are already unreachable: the removal is
/// skipped but the record still counts as a problem.
pub fn missing_key(ctx: &PassCtx<'_>, reporter: &mut Reporter) -> Result<u64> {
    let name = ctx.catalog_name;
    let mut removed = 0u64;
    for record in ctx.catalog.records_missing_key()? {
        if ctx.mode.commits() && !record.path.is_empty() {
            ctx.catalog.remove_by_path(&record.path)?;
        }
        removed += 1;
    }
    reporter.line(format!(
        "{name}: removed {removed} records without a unique key."
    ));
    Ok(removed)
}

/// Remove every record that resolves to a corrupt outcome.
///
/// `NoObject` and `TransientFactory` are expected states, not corruption, and
/// are never removed. Removals are tallied per outcome kind for the report.
pub fn missing_object(ctx: &PassCtx<'_>, reporter: &mut Reporter) -> Result<u64> {
    let name = ctx.catalog_name;
    let mut tallies: BTreeMap<&'static str, u64> = BTreeMap::new();
    for record in ctx.catalog.all_records()? {
        let outcome = resolve(ctx.store, &record, Accessor::Own, ctx.pending_segment)?;
        if !outcome.is_corrupt() {
            continue;
        }
        if ctx.mode.commits() && !record.path.is_empty() {
            ctx.catalog.remove_by_path(&record.path)?;
        }
        *tallies.entry(outcome.label()).or_insert(0) += 1;
    }

    if tallies.is_empty() {
        reporter.line(format!("{name}: removed no records in the object check."));
    } else {
        for (label, count) in &tallies {
            reporter.line(format!(
                "{name}: removed {count} records with status {label}."
            ));
        }
    }
    Ok(tallies.values().sum())
}
