//! Resolves unique-key collisions: one survivor per key, fresh keys for the
//! rest.
//!
//! The survivor is the group member with the shortest path (ties keep the
//! original enumeration order). That is a fixed tie-break chosen for
//! repeatable output across runs, not a quality judgment.

use catsweep_error::Result;
use tracing::info;

use crate::passes::PassCtx;
use crate::ports::{Accessor, UniqueKeyGenerator};
use crate::record::IndexRecord;
use crate::report::Reporter;
use crate::resolver::{ResolutionOutcome, resolve};

/// Find and repair colliding unique keys in one catalog.
///
/// Returns `object_errors + changed` as the catalog's problem contribution.
/// A failing key generator aborts this catalog's duplicate repair entirely
/// (one problem, reported) rather than repairing a group partially.
pub fn reconcile(
    ctx: &PassCtx<'_>,
    generator: &dyn UniqueKeyGenerator,
    key_attribute: &str,
    reporter: &mut Reporter,
) -> Result<u64> {
    let name = ctx.catalog_name;
    if !ctx.catalog.indexed_attributes()?.contains(key_attribute) {
        reporter.line(format!("{name}: no {key_attribute} index."));
        return Ok(0);
    }

    // Functional probe before touching anything; a half-repaired duplicate
    // group is worse than an untouched one.
    if let Err(err) = generator.generate() {
        if err.must_propagate() {
            return Err(err);
        }
        reporter.warn_line(format!(
            "{name}: skipped duplicate repair, unique key generator unavailable: {err}"
        ));
        return Ok(1);
    }

    let mut records = ctx.catalog.all_records()?;
    records.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));

    let mut non_unique = 0u64;
    let mut changed = 0u64;
    let mut object_errors = 0u64;

    for group in contiguous_groups(&records) {
        // Keyless records are the missing-key pass's problem, not a collision.
        if group[0].sort_key().is_empty() {
            continue;
        }
        let key = group[0].sort_key();
        non_unique += 1;
        info!(catalog = name, key, items = group.len(), "non unique key");

        let mut members: Vec<&IndexRecord> = group.iter().collect();
        members.sort_by_key(|record| record.path_len());
        info!(
            catalog = name,
            key,
            survivor = %members[0].path,
            "unique key is kept for the shortest path"
        );

        for &member in &members[1..] {
            let object =
                match resolve(ctx.store, member, Accessor::Own, ctx.pending_segment)? {
                    ResolutionOutcome::Resolved(object) => object,
                    ResolutionOutcome::NoObject | ResolutionOutcome::TransientFactory => continue,
                    ResolutionOutcome::NotFound
                    | ResolutionOutcome::Broken
                    | ResolutionOutcome::WrongPath { .. } => {
                        // Left for a future run once the object itself is
                        // fixed; in commit mode the orphan pass usually got
                        // here first.
                        object_errors += 1;
                        continue;
                    }
                };

            match object.own_unique_key()? {
                None => {
                    // The record inherited its key from a container without
                    // owning one. No new key is minted; a refresh matters
                    // because the container may have been re-keyed above.
                    if ctx.mode.commits() {
                        object.refresh_index_projection(&[key_attribute])?;
                        info!(
                            catalog = name,
                            path = %member.path,
                            "inherited unique key, projection refreshed"
                        );
                    }
                }
                Some(own) if own.as_str() == key => {
                    changed += 1;
                    if ctx.mode.commits() {
                        let fresh = generator.generate()?;
                        object.set_unique_key(&fresh)?;
                        object.refresh_index_projection(&[key_attribute])?;
                        info!(
                            catalog = name,
                            path = %member.path,
                            old = key,
                            new = %fresh,
                            "assigned a fresh unique key"
                        );
                    }
                }
                Some(own) => {
                    // The object's own key already differs from the indexed
                    // one; the projection is stale, not duplicated.
                    if ctx.mode.commits() {
                        object.refresh_index_projection(&[key_attribute])?;
                        info!(
                            catalog = name,
                            path = %member.path,
                            indexed = key,
                            own = %own,
                            "stale key projection refreshed"
                        );
                    }
                }
            }
        }
    }

    if object_errors > 0 {
        reporter.line(format!("{name}: problem getting {object_errors} objects."));
    }
    reporter.line(format!("{name}: {non_unique} non unique keys found."));
    if ctx.mode.commits() {
        reporter.line(format!("{name}: {changed} records given new unique keys."));
    } else {
        reporter.line(format!("{name}: {changed} records need new unique keys."));
    }
    Ok(object_errors + changed)
}

/// Contiguous runs of records sharing a sort key. Input must be sorted.
fn contiguous_groups(records: &[IndexRecord]) -> impl Iterator<Item = &[IndexRecord]> {
    records
        .chunk_by(|a, b| a.sort_key() == b.sort_key())
        .filter(|group| group.len() > 1)
}
