//! Catalog-to-store reconciliation engine.
//!
//! A catalog is a derived, queryable index whose records are supposed to
//! mirror a backing object store. The two drift apart: objects get deleted
//! without the catalog hearing about it, records lose their unique key, and
//! unique keys end up shared between records. This crate detects and repairs
//! that drift.
//!
//! The engine is deliberately single-threaded: catalogs are processed
//! strictly in order and every pass materializes its record list eagerly so
//! removals mid-traversal never skip work. Safety under concurrent external
//! mutation comes from letting write conflicts abort and retry the whole run,
//! never from fine-grained locking.

#![forbid(unsafe_code)]

pub mod memory;
pub mod passes;
pub mod ports;
pub mod record;
pub mod report;
pub mod resolver;
pub mod sweep;

pub use catsweep_error::{Result, SweepError};
pub use record::{IndexRecord, RecordPath, UniqueKey};
pub use report::RunReport;
pub use resolver::ResolutionOutcome;
pub use sweep::{CatalogKind, CatalogSpec, Mode, SweepConfig, Sweeper};
