//! Record-level types shared by the reconciliation passes.

use std::fmt;

/// Slash-separated location of a record inside the content tree.
///
/// An empty path marks a record that is already unreachable; such records are
/// counted but never removed (there is no path to remove them by).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordPath(String);

impl RecordPath {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Byte length of the path, the duplicate-survivor tie-break metric.
    #[must_use]
    pub fn len_bytes(&self) -> usize {
        self.0.len()
    }

    /// Iterate the non-empty `/`-separated segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|segment| !segment.is_empty())
    }

    /// Whether any segment of the path equals `segment` exactly.
    #[must_use]
    pub fn contains_segment(&self, segment: &str) -> bool {
        !segment.is_empty() && self.segments().any(|s| s == segment)
    }

    /// Path of the enclosing container, if there is one.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let trimmed = self.0.trim_end_matches('/');
        let cut = trimmed.rfind('/')?;
        if cut == 0 {
            return None;
        }
        Some(Self(trimmed[..cut].to_owned()))
    }
}

impl fmt::Display for RecordPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordPath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A non-empty unique key value.
///
/// Absent and empty keys are both represented as `Option::None`; the empty
/// string is never a valid key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UniqueKey(String);

impl UniqueKey {
    /// Returns `None` for an empty input.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() { None } else { Some(Self(value)) }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UniqueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lightweight projection of one backing object, as held by a catalog.
///
/// Becomes stale when the backing object is deleted without updating the
/// catalog; that staleness is the core inconsistency this crate repairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    /// Opaque identifier the store can fall back to when the path is unusable.
    pub record_id: u64,
    pub path: RecordPath,
    pub unique_key: Option<UniqueKey>,
}

impl IndexRecord {
    /// Grouping key for the duplicate pass.
    ///
    /// Absent keys map to the empty string so sorting a mixed record list
    /// never has to compare a key against a missing key.
    #[must_use]
    pub fn sort_key(&self) -> &str {
        self.unique_key.as_ref().map_or("", UniqueKey::as_str)
    }

    /// Tie-break metric for survivor election.
    ///
    /// Unreachable records (empty path) rank last so they never win
    /// survivorship over a record that can actually be kept.
    #[must_use]
    pub fn path_len(&self) -> usize {
        if self.path.is_empty() {
            usize::MAX
        } else {
            self.path.len_bytes()
        }
    }
}
