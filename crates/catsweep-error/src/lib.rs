//! Error taxonomy shared by every catsweep crate.
//!
//! The split that matters here is transiency: a `Conflict` means another
//! writer touched the same object mid-run and the enclosing retry machinery
//! must re-run the whole unit of work, so conflicts (and interrupts) are never
//! caught or reclassified anywhere in the engine. Everything else is either
//! classified locally into a resolution outcome by the caller or logged and
//! re-raised.

use thiserror::Error;

/// Primary error type for catsweep operations.
#[derive(Error, Debug)]
pub enum SweepError {
    // === Record / store lookup ===
    /// The record's backing object vanished between enumeration and fetch.
    #[error("record gone: '{path}'")]
    RecordGone { path: String },

    /// The store handed back something of an unexpected shape.
    #[error("type fault resolving record: {detail}")]
    TypeFault { detail: String },

    // === Must-propagate signals ===
    /// Concurrent writer touched the same object; the enclosing transaction
    /// machinery retries the whole run.
    #[error("write conflict: {detail}")]
    Conflict { detail: String },

    /// The run was interrupted from outside.
    #[error("interrupted")]
    Interrupted,

    // === Preconditions ===
    /// The unique key generator failed its functional probe.
    #[error("unique key generator unavailable: {detail}")]
    GeneratorUnavailable { detail: String },

    /// A mutation was attempted while write protection was active and no
    /// bypass had been declared for the run.
    #[error("write protected: {detail}")]
    WriteProtected { detail: String },

    // === Outer surfaces (CLI snapshot handling) ===
    /// Snapshot file could not be decoded or encoded.
    #[error("snapshot error: {detail}")]
    Snapshot { detail: String },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Internal ===
    /// Internal logic error (should never happen).
    #[error("internal error: {0}")]
    Internal(String),
}

impl SweepError {
    /// Whether this is a transient error that may succeed on retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Whether this error must propagate uncaught through the engine.
    ///
    /// Conflicts and interrupts abort the whole run so the store's
    /// retry/abort machinery can re-run the unit of work.
    #[must_use]
    pub const fn must_propagate(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Interrupted)
    }

    /// Create a record-gone error.
    pub fn record_gone(path: impl Into<String>) -> Self {
        Self::RecordGone { path: path.into() }
    }

    /// Create a type-fault error.
    pub fn type_fault(detail: impl Into<String>) -> Self {
        Self::TypeFault {
            detail: detail.into(),
        }
    }

    /// Create a conflict error.
    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::Conflict {
            detail: detail.into(),
        }
    }

    /// Create a generator-unavailable error.
    pub fn generator_unavailable(detail: impl Into<String>) -> Self {
        Self::GeneratorUnavailable {
            detail: detail.into(),
        }
    }

    /// Create a write-protected error.
    pub fn write_protected(detail: impl Into<String>) -> Self {
        Self::WriteProtected {
            detail: detail.into(),
        }
    }

    /// Create a snapshot error.
    pub fn snapshot(detail: impl Into<String>) -> Self {
        Self::Snapshot {
            detail: detail.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using `SweepError`.
pub type Result<T> = std::result::Result<T, SweepError>;
