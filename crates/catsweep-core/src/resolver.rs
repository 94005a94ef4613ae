//! Classifies record-to-object resolution into an exhaustive outcome.
//!
//! Every caller switches on all six arms. The policy for failures the
//! taxonomy does not know is fail-loud: log with full context and re-raise,
//! never silently skip an object that might need operator attention.

use std::fmt;
use std::sync::Arc;

use catsweep_error::{Result, SweepError};
use tracing::{error, warn};

use crate::ports::{Accessor, BackingObject, Fetched, ObjectStore};
use crate::record::{IndexRecord, RecordPath};

/// Result of resolving one index record against the backing store.
///
/// The six arms are mutually exclusive and exhaustive. Only `NotFound`,
/// `Broken` and `WrongPath` mark the record as corrupt; `NoObject` and
/// `TransientFactory` are expected states.
pub enum ResolutionOutcome {
    /// The record resolves to a live object at its own path.
    Resolved(Arc<dyn BackingObject>),
    /// The record is unreachable or its object is gone.
    NotFound,
    /// The object is still under construction and not yet committed.
    TransientFactory,
    /// Explicit empty resolution; legitimate for reference-type records.
    NoObject,
    /// Placeholder for a vanished implementation class, or a type fault.
    Broken,
    /// The object is live but its canonical path disagrees with the record's
    /// indexed path, usually an acquisition/aliasing artifact.
    WrongPath { actual: RecordPath },
}

impl ResolutionOutcome {
    /// Whether this outcome marks the record as corrupt (removable).
    #[must_use]
    pub const fn is_corrupt(&self) -> bool {
        matches!(
            self,
            Self::NotFound | Self::Broken | Self::WrongPath { .. }
        )
    }

    /// Short label used in report tallies.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Resolved(_) => "resolved",
            Self::NotFound => "notfound",
            Self::TransientFactory => "factory",
            Self::NoObject => "none",
            Self::Broken => "broken",
            Self::WrongPath { .. } => "wrong_path",
        }
    }
}

impl fmt::Debug for ResolutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongPath { actual } => write!(f, "WrongPath {{ actual: {actual} }}"),
            other => f.write_str(other.label()),
        }
    }
}

/// Resolve `record` through `accessor`, classifying every known failure.
///
/// `pending_segment` is the reserved path segment marking objects still under
/// construction. Conflict and interrupt signals from the store propagate
/// uncaught; unclassified errors are logged and re-raised.
pub fn resolve(
    store: &dyn ObjectStore,
    record: &IndexRecord,
    accessor: Accessor,
    pending_segment: &str,
) -> Result<ResolutionOutcome> {
    if record.path.is_empty() {
        return Ok(ResolutionOutcome::NotFound);
    }
    if record.path.contains_segment(pending_segment) {
        return Ok(ResolutionOutcome::TransientFactory);
    }

    let fetched = match store.fetch(record, accessor) {
        Ok(fetched) => fetched,
        Err(err) if err.must_propagate() => return Err(err),
        Err(SweepError::RecordGone { .. }) => return Ok(ResolutionOutcome::NotFound),
        Err(SweepError::TypeFault { detail }) => {
            warn!(
                path = %record.path,
                record_id = record.record_id,
                detail,
                "type fault resolving record, classifying as broken"
            );
            return Ok(ResolutionOutcome::Broken);
        }
        Err(err) => {
            error!(
                path = %record.path,
                record_id = record.record_id,
                %err,
                "cannot handle record, re-raising"
            );
            return Err(err);
        }
    };

    match fetched {
        Fetched::None => Ok(ResolutionOutcome::NoObject),
        Fetched::Broken { class } => {
            warn!(path = %record.path, class, "broken placeholder object");
            Ok(ResolutionOutcome::Broken)
        }
        Fetched::Object(object) => {
            // Source/target objects of a reference legitimately live at
            // unrelated paths; the aliasing check only applies to the
            // record's own object.
            if accessor != Accessor::Own {
                return Ok(ResolutionOutcome::Resolved(object));
            }
            let actual = object.canonical_path();
            if actual == record.path {
                Ok(ResolutionOutcome::Resolved(object))
            } else {
                warn!(
                    path = %record.path,
                    actual = %actual,
                    "wrong path: record leads to a different canonical path"
                );
                Ok(ResolutionOutcome::WrongPath { actual })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryStore, ObjectSnapshot, Snapshot};

    fn store_with(objects: Vec<ObjectSnapshot>) -> MemoryStore {
        MemoryStore::load(&Snapshot {
            catalogs: Vec::new(),
            objects,
            write_protected: false,
        })
    }

    fn record(path: &str, key: Option<&str>) -> IndexRecord {
        IndexRecord {
            record_id: 1,
            path: RecordPath::new(path),
            unique_key: key.and_then(crate::record::UniqueKey::new),
        }
    }

    #[test]
    fn empty_path_is_not_found() {
        let store = store_with(Vec::new());
        let outcome = resolve(&store, &record("", None), Accessor::Own, "pending").unwrap();
        assert!(matches!(outcome, ResolutionOutcome::NotFound));
    }

    #[test]
    fn pending_segment_is_transient() {
        let store = store_with(Vec::new());
        let outcome = resolve(
            &store,
            &record("/plone/pending/doc", None),
            Accessor::Own,
            "pending",
        )
        .unwrap();
        assert!(matches!(outcome, ResolutionOutcome::TransientFactory));
    }

    #[test]
    fn missing_object_is_not_found() {
        let store = store_with(Vec::new());
        let outcome = resolve(&store, &record("/plone/doc", None), Accessor::Own, "pending")
            .unwrap();
        assert!(matches!(outcome, ResolutionOutcome::NotFound));
    }

    #[test]
    fn live_object_resolves() {
        let store = store_with(vec![ObjectSnapshot::live("/plone/doc", Some("k1"))]);
        let outcome = resolve(&store, &record("/plone/doc", Some("k1")), Accessor::Own, "pending")
            .unwrap();
        match outcome {
            ResolutionOutcome::Resolved(object) => {
                assert_eq!(object.canonical_path(), RecordPath::new("/plone/doc"));
            }
            other => panic!("expected resolved, got {other:?}"),
        }
    }

    #[test]
    fn explicit_empty_resolution_is_no_object() {
        let store = store_with(vec![ObjectSnapshot::empty("/plone/ref-proxy")]);
        let outcome = resolve(
            &store,
            &record("/plone/ref-proxy", None),
            Accessor::Own,
            "pending",
        )
        .unwrap();
        assert!(matches!(outcome, ResolutionOutcome::NoObject));
    }

    #[test]
    fn broken_placeholder_classifies_as_broken() {
        let store = store_with(vec![ObjectSnapshot::broken("/plone/relic")]);
        let outcome = resolve(&store, &record("/plone/relic", None), Accessor::Own, "pending")
            .unwrap();
        assert!(matches!(outcome, ResolutionOutcome::Broken));
    }

    #[test]
    fn alias_record_is_wrong_path() {
        let mut object = ObjectSnapshot::live("/plone/folder", Some("k1"));
        object.aliases = vec!["/plone/folder/folder".to_owned()];
        let store = store_with(vec![object]);
        let outcome = resolve(
            &store,
            &record("/plone/folder/folder", Some("k1")),
            Accessor::Own,
            "pending",
        )
        .unwrap();
        match outcome {
            ResolutionOutcome::WrongPath { actual } => {
                assert_eq!(actual, RecordPath::new("/plone/folder"));
            }
            other => panic!("expected wrong path, got {other:?}"),
        }
    }

    #[test]
    fn conflict_propagates_uncaught() {
        let store = store_with(vec![ObjectSnapshot::live("/plone/doc", Some("k1"))]);
        store.inject_conflict("/plone/doc");
        let err = resolve(&store, &record("/plone/doc", Some("k1")), Accessor::Own, "pending")
            .unwrap_err();
        assert!(err.must_propagate());
    }

    #[test]
    fn unclassified_store_fault_re_raises() {
        let store = store_with(vec![ObjectSnapshot::live("/plone/doc", Some("k1"))]);
        store.inject_fault("/plone/doc", "storage layer returned garbage");
        let err = resolve(&store, &record("/plone/doc", Some("k1")), Accessor::Own, "pending")
            .unwrap_err();
        assert!(matches!(err, SweepError::Internal(_)));
    }

    #[test]
    fn corrupt_classification() {
        assert!(ResolutionOutcome::NotFound.is_corrupt());
        assert!(ResolutionOutcome::Broken.is_corrupt());
        assert!(
            ResolutionOutcome::WrongPath {
                actual: RecordPath::new("/a")
            }
            .is_corrupt()
        );
        assert!(!ResolutionOutcome::NoObject.is_corrupt());
        assert!(!ResolutionOutcome::TransientFactory.is_corrupt());
    }
}
