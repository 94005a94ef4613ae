//! The reconciliation passes, in their fixed execution order.
//!
//! Per catalog the coordinator runs: size check, missing-key pass,
//! missing-object pass, then duplicate-key repair (content catalogs) or the
//! reference check (reference catalogs). The order matters: later passes
//! assume earlier ones already pruned unusable records.

pub mod duplicates;
pub mod orphans;
pub mod references;
pub mod size;

use crate::ports::{Catalog, ObjectStore};
use crate::sweep::Mode;

/// Shared context handed to every pass for one catalog.
pub struct PassCtx<'a> {
    pub catalog_name: &'a str,
    pub catalog: &'a dyn Catalog,
    pub store: &'a dyn ObjectStore,
    pub mode: Mode,
    /// Reserved path segment marking objects still under construction.
    pub pending_segment: &'a str,
}
