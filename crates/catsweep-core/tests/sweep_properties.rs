//! Property checks over randomly corrupted snapshots.
//!
//! Each case builds one content catalog: a record per object (carrying the
//! object's own key, possibly absent) plus a handful of stale records whose
//! paths resolve to nothing.

use std::collections::BTreeMap;

use catsweep_core::memory::{
    CatalogSnapshot, MemoryKeyGenerator, MemoryStore, ObjectSnapshot, RecordSnapshot, Snapshot,
};
use catsweep_core::ports::{Accessor, CatalogDirectory};
use catsweep_core::resolver::resolve;
use catsweep_core::{CatalogKind, CatalogSpec, Mode, RunReport, SweepConfig, Sweeper};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct ObjectPlan {
    key: Option<&'static str>,
    broken: bool,
}

fn segment() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("a"), Just("b"), Just("c"), Just("d")]
}

fn object_path() -> impl Strategy<Value = String> {
    proptest::collection::vec(segment(), 1..=3).prop_map(|segments| format!("/{}", segments.join("/")))
}

fn key() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("K1"), Just("K2"), Just("K3")]
}

fn object_map() -> impl Strategy<Value = BTreeMap<String, ObjectPlan>> {
    proptest::collection::btree_map(
        object_path(),
        (proptest::option::of(key()), proptest::bool::weighted(0.15))
            .prop_map(|(key, broken)| ObjectPlan { key, broken }),
        1..8,
    )
}

/// Records whose paths never hit an object; the `/x` prefix is outside the
/// object path alphabet.
fn stale_list() -> impl Strategy<Value = Vec<(String, Option<&'static str>)>> {
    proptest::collection::vec((object_path(), proptest::option::of(key())), 0..4)
}

fn build_snapshot(
    objects: &BTreeMap<String, ObjectPlan>,
    stale: &[(String, Option<&'static str>)],
) -> Snapshot {
    let mut records: Vec<RecordSnapshot> = objects
        .iter()
        .map(|(path, plan)| RecordSnapshot::new(path, plan.key))
        .collect();
    for (path, key) in stale {
        records.push(RecordSnapshot::new(&format!("/x{path}"), *key));
    }
    Snapshot {
        catalogs: vec![CatalogSnapshot {
            name: "primary".to_owned(),
            kind: CatalogKind::Content,
            indexed_attributes: vec!["uid".to_owned()],
            reported_count: None,
            records,
        }],
        objects: objects
            .iter()
            .map(|(path, plan)| {
                if plan.broken {
                    ObjectSnapshot::broken(path)
                } else {
                    ObjectSnapshot::live(path, plan.key)
                }
            })
            .collect(),
        write_protected: false,
    }
}

fn run_sweep(store: &MemoryStore, mode: Mode) -> RunReport {
    let generator = MemoryKeyGenerator::default();
    let config = SweepConfig {
        catalogs: vec![CatalogSpec::content("primary")],
        ..SweepConfig::default()
    };
    Sweeper::new(store, store, &generator, store, config)
        .sweep(mode)
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn dry_run_never_mutates(
        (objects, stale) in (object_map(), stale_list())
    ) {
        let store = MemoryStore::load(&build_snapshot(&objects, &stale));
        let before = store.to_snapshot();
        run_sweep(&store, Mode::DryRun);
        prop_assert_eq!(store.to_snapshot(), before);
    }

    #[test]
    fn commit_reaches_a_fixed_point(
        (objects, stale) in (object_map(), stale_list())
    ) {
        let store = MemoryStore::load(&build_snapshot(&objects, &stale));
        run_sweep(&store, Mode::Commit);
        let settled = store.to_snapshot();

        let second = run_sweep(&store, Mode::Commit);
        prop_assert_eq!(store.to_snapshot(), settled);
        prop_assert_eq!(second.total_problems(), 0);
    }

    #[test]
    fn commit_restores_resolvability_and_key_uniqueness(
        (objects, stale) in (object_map(), stale_list())
    ) {
        let store = MemoryStore::load(&build_snapshot(&objects, &stale));
        run_sweep(&store, Mode::Commit);

        let records = store.catalog("primary").unwrap().all_records().unwrap();
        let mut seen: BTreeMap<String, u64> = BTreeMap::new();
        for record in &records {
            let outcome = resolve(&store, record, Accessor::Own, "pending").unwrap();
            prop_assert!(!outcome.is_corrupt(), "still corrupt: {}", record.path);

            prop_assert!(
                record.unique_key.is_some(),
                "keyless record survived: {}",
                record.path
            );
            if let Some(key) = &record.unique_key {
                *seen.entry(key.as_str().to_owned()).or_insert(0) += 1;
            }
        }
        for (key, count) in seen {
            prop_assert_eq!(count, 1, "key {} carried by {} records", key, count);
        }
    }

    #[test]
    fn dry_run_report_is_deterministic(
        (objects, stale) in (object_map(), stale_list())
    ) {
        let snapshot = build_snapshot(&objects, &stale);
        let first = run_sweep(&MemoryStore::load(&snapshot), Mode::DryRun);
        let second = run_sweep(&MemoryStore::load(&snapshot), Mode::DryRun);
        prop_assert_eq!(first.render(), second.render());
    }
}
