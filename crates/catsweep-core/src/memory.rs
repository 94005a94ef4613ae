//! In-memory implementation of every port, plus its serde snapshot form.
//!
//! This is the fixture the unit and integration tests run against, and the
//! backend the CLI loads JSON snapshots into. It models just enough store
//! behavior to exercise the engine: broken placeholder objects, explicit
//! empty resolutions, path aliases, key inheritance through containers,
//! write protection, and scripted conflict injection. It is not a storage
//! product.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use catsweep_error::{Result, SweepError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ports::{
    Accessor, BackingObject, Catalog, CatalogDirectory, Fetched, ObjectStore, TxnControl,
    UniqueKeyGenerator,
};
use crate::record::{IndexRecord, RecordPath, UniqueKey};
use crate::sweep::CatalogKind;

// ---------------------------------------------------------------------------
// Snapshot form
// ---------------------------------------------------------------------------

/// Serializable state of the whole fixture: catalogs plus object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub catalogs: Vec<CatalogSnapshot>,
    pub objects: Vec<ObjectSnapshot>,
    #[serde(default)]
    pub write_protected: bool,
}

/// One catalog: its records and the attributes it indexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub name: String,
    #[serde(default)]
    pub kind: CatalogKind,
    #[serde(default)]
    pub indexed_attributes: Vec<String>,
    /// Overrides the cheap cardinality query, for exercising the size check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_count: Option<usize>,
    pub records: Vec<RecordSnapshot>,
}

/// One index record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_key: Option<String>,
}

impl RecordSnapshot {
    #[must_use]
    pub fn new(path: &str, unique_key: Option<&str>) -> Self {
        Self {
            path: path.to_owned(),
            unique_key: unique_key.map(str::to_owned),
        }
    }
}

/// What a fetch of this object yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectForm {
    /// A live object.
    #[default]
    Live,
    /// A placeholder for an implementation class that no longer exists.
    Broken,
    /// An explicit empty resolution, as reference proxies produce.
    Empty,
}

/// One backing object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSnapshot {
    /// The object's canonical path.
    pub path: String,
    /// The key the object itself owns; `None` means the key its records show
    /// is inherited from the nearest keyed container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_key: Option<String>,
    #[serde(default)]
    pub form: ObjectForm,
    /// Extra indexed paths this object answers at; fetching through one of
    /// them yields a wrong-path outcome.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_target: Option<String>,
}

impl ObjectSnapshot {
    #[must_use]
    pub fn live(path: &str, unique_key: Option<&str>) -> Self {
        Self {
            path: path.to_owned(),
            unique_key: unique_key.map(str::to_owned),
            form: ObjectForm::Live,
            aliases: Vec::new(),
            reference_source: None,
            reference_target: None,
        }
    }

    #[must_use]
    pub fn broken(path: &str) -> Self {
        Self {
            form: ObjectForm::Broken,
            ..Self::live(path, None)
        }
    }

    #[must_use]
    pub fn empty(path: &str) -> Self {
        Self {
            form: ObjectForm::Empty,
            ..Self::live(path, None)
        }
    }
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct RecordState {
    record_id: u64,
    path: String,
    unique_key: Option<String>,
}

#[derive(Debug, Clone)]
struct CatalogState {
    kind: CatalogKind,
    indexed_attributes: BTreeSet<String>,
    reported_count: Option<usize>,
    records: Vec<RecordState>,
}

#[derive(Debug, Clone)]
struct ObjectState {
    unique_key: Option<String>,
    form: ObjectForm,
    aliases: Vec<String>,
    reference_source: Option<String>,
    reference_target: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct State {
    catalog_order: Vec<String>,
    catalogs: BTreeMap<String, CatalogState>,
    objects: BTreeMap<String, ObjectState>,
    /// Paths whose store operations fail with a write conflict.
    conflicts: BTreeSet<String>,
    /// Paths whose fetch fails with an unclassified internal error.
    faults: BTreeMap<String, String>,
    write_protected: bool,
    bypass_declared: bool,
}

impl State {
    fn check_writable(&self, what: &str) -> Result<()> {
        if self.write_protected && !self.bypass_declared {
            return Err(SweepError::write_protected(format!(
                "no bypass declared for mutation of {what}"
            )));
        }
        Ok(())
    }

    fn check_conflict(&self, path: &str) -> Result<()> {
        if self.conflicts.contains(path) {
            return Err(SweepError::conflict(format!(
                "{path} is held by another writer"
            )));
        }
        Ok(())
    }

    fn check_fault(&self, path: &str) -> Result<()> {
        if let Some(detail) = self.faults.get(path) {
            return Err(SweepError::internal(detail.clone()));
        }
        Ok(())
    }

    fn catalog(&self, name: &str) -> Result<&CatalogState> {
        self.catalogs
            .get(name)
            .ok_or_else(|| SweepError::internal(format!("no such catalog: {name}")))
    }

    fn catalog_mut(&mut self, name: &str) -> Result<&mut CatalogState> {
        self.catalogs
            .get_mut(name)
            .ok_or_else(|| SweepError::internal(format!("no such catalog: {name}")))
    }

    /// Canonical path of the object answering at `path`, directly or via an
    /// alias.
    fn canonical_for(&self, path: &str) -> Option<&str> {
        if let Some((canonical, _)) = self.objects.get_key_value(path) {
            return Some(canonical.as_str());
        }
        self.objects
            .iter()
            .find(|(_, object)| object.aliases.iter().any(|alias| alias == path))
            .map(|(canonical, _)| canonical.as_str())
    }

    /// The key an object displays: its own, or the nearest keyed container's.
    fn effective_key(&self, path: &str) -> Option<String> {
        let mut current = Some(RecordPath::new(path));
        while let Some(step) = current {
            if let Some(object) = self.objects.get(step.as_str()) {
                if let Some(key) = &object.unique_key {
                    if !key.is_empty() {
                        return Some(key.clone());
                    }
                }
            }
            current = step.parent();
        }
        None
    }
}

fn record_from_state(state: &RecordState) -> IndexRecord {
    IndexRecord {
        record_id: state.record_id,
        path: RecordPath::new(state.path.as_str()),
        unique_key: state.unique_key.as_deref().and_then(UniqueKey::new),
    }
}

struct Inner {
    state: Mutex<State>,
    /// The state `abort` rolls back to.
    baseline: Mutex<State>,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Shared-state fixture implementing catalog directory, object store and
/// transaction control.
pub struct MemoryStore {
    inner: Arc<Inner>,
    handles: BTreeMap<String, MemoryCatalog>,
}

impl MemoryStore {
    /// Build a store from a snapshot. Record ids are assigned in enumeration
    /// order.
    #[must_use]
    pub fn load(snapshot: &Snapshot) -> Self {
        let mut state = State {
            write_protected: snapshot.write_protected,
            ..State::default()
        };
        let mut next_record_id = 1u64;
        for catalog in &snapshot.catalogs {
            let records = catalog
                .records
                .iter()
                .map(|record| {
                    let record_id = next_record_id;
                    next_record_id += 1;
                    RecordState {
                        record_id,
                        path: record.path.clone(),
                        unique_key: record.unique_key.clone(),
                    }
                })
                .collect();
            state.catalog_order.push(catalog.name.clone());
            state.catalogs.insert(
                catalog.name.clone(),
                CatalogState {
                    kind: catalog.kind,
                    indexed_attributes: catalog.indexed_attributes.iter().cloned().collect(),
                    reported_count: catalog.reported_count,
                    records,
                },
            );
        }
        for object in &snapshot.objects {
            state.objects.insert(
                object.path.clone(),
                ObjectState {
                    unique_key: object.unique_key.clone(),
                    form: object.form,
                    aliases: object.aliases.clone(),
                    reference_source: object.reference_source.clone(),
                    reference_target: object.reference_target.clone(),
                },
            );
        }

        let inner = Arc::new(Inner {
            baseline: Mutex::new(state.clone()),
            state: Mutex::new(state),
        });
        let handles = snapshot
            .catalogs
            .iter()
            .map(|catalog| {
                (
                    catalog.name.clone(),
                    MemoryCatalog {
                        name: catalog.name.clone(),
                        inner: Arc::clone(&inner),
                    },
                )
            })
            .collect();
        Self { inner, handles }
    }

    /// Export the current state. Conflict and fault injections are test-only
    /// and not part of the snapshot.
    #[must_use]
    pub fn to_snapshot(&self) -> Snapshot {
        let state = self.inner.state.lock();
        let catalogs = state
            .catalog_order
            .iter()
            .filter_map(|name| {
                let catalog = state.catalogs.get(name)?;
                Some(CatalogSnapshot {
                    name: name.clone(),
                    kind: catalog.kind,
                    indexed_attributes: catalog.indexed_attributes.iter().cloned().collect(),
                    reported_count: catalog.reported_count,
                    records: catalog
                        .records
                        .iter()
                        .map(|record| RecordSnapshot {
                            path: record.path.clone(),
                            unique_key: record.unique_key.clone(),
                        })
                        .collect(),
                })
            })
            .collect();
        let objects = state
            .objects
            .iter()
            .map(|(path, object)| ObjectSnapshot {
                path: path.clone(),
                unique_key: object.unique_key.clone(),
                form: object.form,
                aliases: object.aliases.clone(),
                reference_source: object.reference_source.clone(),
                reference_target: object.reference_target.clone(),
            })
            .collect();
        Snapshot {
            catalogs,
            objects,
            write_protected: state.write_protected,
        }
    }

    /// Kinds of the loaded catalogs, in snapshot order.
    #[must_use]
    pub fn catalog_kinds(&self) -> Vec<(String, CatalogKind)> {
        let state = self.inner.state.lock();
        state
            .catalog_order
            .iter()
            .filter_map(|name| {
                state
                    .catalogs
                    .get(name)
                    .map(|catalog| (name.clone(), catalog.kind))
            })
            .collect()
    }

    /// Make every store operation on `path` fail with a write conflict.
    pub fn inject_conflict(&self, path: &str) {
        self.inner.state.lock().conflicts.insert(path.to_owned());
    }

    /// Make fetches of `path` fail with an unclassified internal error, for
    /// exercising the fail-loud propagation path.
    pub fn inject_fault(&self, path: &str, detail: &str) {
        self.inner
            .state
            .lock()
            .faults
            .insert(path.to_owned(), detail.to_owned());
    }

    /// Seal the current state as the new abort baseline, the way the
    /// enclosing transaction machinery does when a unit of work commits.
    pub fn checkpoint(&self) {
        let state = self.inner.state.lock().clone();
        *self.inner.baseline.lock() = state;
    }
}

impl CatalogDirectory for MemoryStore {
    fn catalog(&self, name: &str) -> Option<&dyn Catalog> {
        self.handles.get(name).map(|handle| handle as &dyn Catalog)
    }
}

impl ObjectStore for MemoryStore {
    fn fetch(&self, record: &IndexRecord, accessor: Accessor) -> Result<Fetched> {
        let state = self.inner.state.lock();
        let path = record.path.as_str();
        state.check_conflict(path)?;
        state.check_fault(path)?;

        let Some(canonical) = state.canonical_for(path) else {
            return Err(SweepError::record_gone(path));
        };
        let object = &state.objects[canonical];

        match accessor {
            Accessor::Own => match object.form {
                ObjectForm::Broken => Ok(Fetched::Broken {
                    class: "unknown".to_owned(),
                }),
                ObjectForm::Empty => Ok(Fetched::None),
                ObjectForm::Live => Ok(Fetched::Object(Arc::new(MemoryObject {
                    path: canonical.to_owned(),
                    inner: Arc::clone(&self.inner),
                }))),
            },
            Accessor::ReferenceSource | Accessor::ReferenceTarget => {
                let end = if accessor == Accessor::ReferenceSource {
                    object.reference_source.as_deref()
                } else {
                    object.reference_target.as_deref()
                };
                let Some(end_path) = end else {
                    return Ok(Fetched::None);
                };
                match state.objects.get(end_path) {
                    None => Err(SweepError::record_gone(end_path)),
                    Some(end_object) => match end_object.form {
                        ObjectForm::Broken => Ok(Fetched::Broken {
                            class: "unknown".to_owned(),
                        }),
                        ObjectForm::Empty => Ok(Fetched::None),
                        ObjectForm::Live => Ok(Fetched::Object(Arc::new(MemoryObject {
                            path: end_path.to_owned(),
                            inner: Arc::clone(&self.inner),
                        }))),
                    },
                }
            }
        }
    }
}

impl TxnControl for MemoryStore {
    fn abort(&self) -> Result<()> {
        let baseline = self.inner.baseline.lock().clone();
        *self.inner.state.lock() = baseline;
        Ok(())
    }

    fn bypass_write_protection(&self) -> Result<()> {
        self.inner.state.lock().bypass_declared = true;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Catalog handle
// ---------------------------------------------------------------------------

/// Handle onto one catalog inside a [`MemoryStore`].
pub struct MemoryCatalog {
    name: String,
    inner: Arc<Inner>,
}

impl Catalog for MemoryCatalog {
    fn record_count(&self) -> Result<usize> {
        let state = self.inner.state.lock();
        let catalog = state.catalog(&self.name)?;
        Ok(catalog.reported_count.unwrap_or(catalog.records.len()))
    }

    fn all_records(&self) -> Result<Vec<IndexRecord>> {
        let state = self.inner.state.lock();
        Ok(state
            .catalog(&self.name)?
            .records
            .iter()
            .map(record_from_state)
            .collect())
    }

    fn records_missing_key(&self) -> Result<Vec<IndexRecord>> {
        let state = self.inner.state.lock();
        Ok(state
            .catalog(&self.name)?
            .records
            .iter()
            .filter(|record| record.unique_key.as_deref().is_none_or(str::is_empty))
            .map(record_from_state)
            .collect())
    }

    fn remove_by_path(&self, path: &RecordPath) -> Result<()> {
        let mut state = self.inner.state.lock();
        state.check_writable(path.as_str())?;
        state.check_conflict(path.as_str())?;
        let catalog = state.catalog_mut(&self.name)?;
        catalog
            .records
            .retain(|record| record.path != path.as_str());
        Ok(())
    }

    fn indexed_attributes(&self) -> Result<BTreeSet<String>> {
        let state = self.inner.state.lock();
        Ok(state.catalog(&self.name)?.indexed_attributes.clone())
    }
}

// ---------------------------------------------------------------------------
// Object handle
// ---------------------------------------------------------------------------

struct MemoryObject {
    path: String,
    inner: Arc<Inner>,
}

impl BackingObject for MemoryObject {
    fn canonical_path(&self) -> RecordPath {
        RecordPath::new(self.path.as_str())
    }

    fn own_unique_key(&self) -> Result<Option<UniqueKey>> {
        let state = self.inner.state.lock();
        let object = state
            .objects
            .get(&self.path)
            .ok_or_else(|| SweepError::record_gone(&self.path))?;
        Ok(object.unique_key.as_deref().and_then(UniqueKey::new))
    }

    fn set_unique_key(&self, key: &UniqueKey) -> Result<()> {
        let mut state = self.inner.state.lock();
        state.check_writable(&self.path)?;
        state.check_conflict(&self.path)?;
        let object = state
            .objects
            .get_mut(&self.path)
            .ok_or_else(|| SweepError::record_gone(&self.path))?;
        object.unique_key = Some(key.as_str().to_owned());
        Ok(())
    }

    fn refresh_index_projection(&self, _attributes: &[&str]) -> Result<()> {
        // The fixture projects exactly one attribute, the unique key, so the
        // attribute list is accepted but not consulted.
        let mut state = self.inner.state.lock();
        state.check_writable(&self.path)?;
        state.check_conflict(&self.path)?;
        let effective = state.effective_key(&self.path);
        for catalog in state.catalogs.values_mut() {
            for record in &mut catalog.records {
                if record.path == self.path {
                    record.unique_key = effective.clone();
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Key generator
// ---------------------------------------------------------------------------

/// Mints uuid-v4 unique keys; can be poisoned to fail every call.
#[derive(Debug, Default)]
pub struct MemoryKeyGenerator {
    poisoned: Option<String>,
}

impl MemoryKeyGenerator {
    /// A generator that fails every call with the given detail.
    #[must_use]
    pub fn poisoned(detail: &str) -> Self {
        Self {
            poisoned: Some(detail.to_owned()),
        }
    }
}

impl UniqueKeyGenerator for MemoryKeyGenerator {
    fn generate(&self) -> Result<UniqueKey> {
        if let Some(detail) = &self.poisoned {
            return Err(SweepError::generator_unavailable(detail.clone()));
        }
        UniqueKey::new(Uuid::new_v4().simple().to_string())
            .ok_or_else(|| SweepError::internal("generator produced an empty key"))
    }
}
