//! Narrow interfaces onto the subsystems this engine audits but does not own.
//!
//! The catalog's query implementation, the store's persistence machinery, and
//! the CMS object lifecycle all live elsewhere; the engine consumes them only
//! through these traits. The in-memory fixture in [`crate::memory`] implements
//! every one of them.

use std::collections::BTreeSet;
use std::sync::Arc;

use catsweep_error::Result;

use crate::record::{IndexRecord, RecordPath, UniqueKey};

/// Which object a resolution should reach.
///
/// Reference-type records point at two other objects besides their own; the
/// reference pass resolves those through the non-default accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Accessor {
    /// The record's own backing object.
    #[default]
    Own,
    /// The source object of a reference record.
    ReferenceSource,
    /// The target object of a reference record.
    ReferenceTarget,
}

/// What the store handed back for a fetch that did not fail outright.
pub enum Fetched {
    /// A live backing object.
    Object(Arc<dyn BackingObject>),
    /// Explicitly no object. Not an error: some reference-type records
    /// legitimately resolve to nothing.
    None,
    /// A placeholder standing in for an implementation class that no longer
    /// exists. Treated as corruption.
    Broken { class: String },
}

impl std::fmt::Debug for Fetched {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Object(object) => f
                .debug_tuple("Object")
                .field(&object.canonical_path())
                .finish(),
            Self::None => f.write_str("None"),
            Self::Broken { class } => {
                f.debug_struct("Broken").field("class", class).finish()
            }
        }
    }
}

/// The authoritative entity a catalog record should point to.
///
/// Mutating methods may fail with a conflict when another writer holds the
/// object; such failures propagate uncaught.
pub trait BackingObject {
    /// The object's own canonical path. Disagreement with the record's
    /// indexed path marks the record as an aliasing artifact.
    fn canonical_path(&self) -> RecordPath;

    /// The unique key the object itself carries, if any. `None` means the
    /// key shown by its record was only ever inherited from a container.
    fn own_unique_key(&self) -> Result<Option<UniqueKey>>;

    fn set_unique_key(&self, key: &UniqueKey) -> Result<()>;

    /// Refresh the object's catalog projection for the named attributes.
    fn refresh_index_projection(&self, attributes: &[&str]) -> Result<()>;
}

/// A named, queryable collection of index records.
pub trait Catalog {
    /// Cheap cardinality query. Can legitimately disagree with the length of
    /// [`Catalog::all_records`] (language filters, embargo dates); the size
    /// check reports that divergence.
    fn record_count(&self) -> Result<usize>;

    /// Full, unrestricted enumeration, materialized eagerly. Never a lazy
    /// cursor: passes remove records while iterating this list.
    fn all_records(&self) -> Result<Vec<IndexRecord>>;

    /// All records whose unique key is absent.
    fn records_missing_key(&self) -> Result<Vec<IndexRecord>>;

    fn remove_by_path(&self, path: &RecordPath) -> Result<()>;

    /// Names of the attributes this catalog indexes, used to check whether a
    /// unique-key attribute exists at all.
    fn indexed_attributes(&self) -> Result<BTreeSet<String>>;
}

/// Lookup of a catalog by name; absent means the catalog is skipped.
pub trait CatalogDirectory {
    fn catalog(&self, name: &str) -> Option<&dyn Catalog>;
}

/// Resolution of records to live objects.
pub trait ObjectStore {
    /// Fetch the object behind `record` through the given accessor.
    ///
    /// Lookup failures surface as `RecordGone` or `TypeFault` errors and are
    /// classified by the resolver; conflicts and interrupts pass through.
    fn fetch(&self, record: &IndexRecord, accessor: Accessor) -> Result<Fetched>;
}

/// Mints globally unique keys for duplicate repair.
pub trait UniqueKeyGenerator {
    fn generate(&self) -> Result<UniqueKey>;
}

/// Hooks into the enclosing all-or-nothing write unit.
pub trait TxnControl {
    /// Discard every write made during this run.
    fn abort(&self) -> Result<()>;

    /// Declare that this run's mutations carry no origin form token and must
    /// not be rejected by the protective framework layer.
    fn bypass_write_protection(&self) -> Result<()>;
}
