use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path::PathKey;

/// An ordered list of elementary operations transforming one document into
/// another, scoped to a single container level.
///
/// Nested changes are represented by `patch`/`patchrange` ops carrying their
/// own child `Diff`. An empty diff means the two documents are structurally
/// equal. Ops within one diff reference non-overlapping positions of the
/// *original* container, in ascending position order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct Diff(Vec<DiffOp>);

impl Diff {
    /// An empty diff: the documents are structurally equal.
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The ops of this diff, in application order.
    #[must_use]
    pub fn ops(&self) -> &[DiffOp] {
        &self.0
    }

    #[must_use]
    pub fn into_ops(self) -> Vec<DiffOp> {
        self.0
    }

    pub fn push(&mut self, op: DiffOp) {
        self.0.push(op);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DiffOp> {
        self.0.iter()
    }

    /// Wrap the diff in a chain of `patch` ops so that it applies at `path`
    /// below the container it is rooted at.
    #[must_use]
    pub(crate) fn nested_under(self, path: &[PathKey]) -> Self {
        path.iter().rev().fold(self, |diff, key| {
            Diff(vec![DiffOp::Patch {
                key: key.clone(),
                diff,
            }])
        })
    }
}

impl From<Vec<DiffOp>> for Diff {
    fn from(ops: Vec<DiffOp>) -> Self {
        Self(ops)
    }
}

impl From<DiffOp> for Diff {
    fn from(op: DiffOp) -> Self {
        Self(vec![op])
    }
}

impl FromIterator<DiffOp> for Diff {
    fn from_iter<I: IntoIterator<Item = DiffOp>>(ops: I) -> Self {
        Self(ops.into_iter().collect())
    }
}

impl IntoIterator for Diff {
    type Item = DiffOp;
    type IntoIter = std::vec::IntoIter<DiffOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diff {
    type Item = &'a DiffOp;
    type IntoIter = std::slice::Iter<'a, DiffOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// One elementary change at a single position of one container.
///
/// The serialized form is the diff wire format: an object tagged by `"op"`,
/// with an addressing field `"key"` (a string for mapping positions, an
/// integer for sequence positions) and an op-specific payload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum DiffOp {
    /// Add a new mapping entry, or a single sequence element before `key`.
    Insert { key: PathKey, value: Value },

    /// Remove an existing mapping entry or sequence element.
    Delete { key: PathKey },

    /// Substitute the whole value at a position.
    ///
    /// A `null` key addresses the document root itself: the degraded form of
    /// a root-level shape mismatch, which has no addressable position. A
    /// root replace is only legal as the sole op of its diff.
    Replace { key: Option<PathKey>, value: Value },

    /// Recurse into a container (or a string diffed as lines) whose internal
    /// structure changed.
    Patch { key: PathKey, diff: Diff },

    /// Insert a run of elements before base index `key`.
    AddRange { key: usize, values: Vec<Value> },

    /// Remove `length` elements starting at base index `key`.
    RemoveRange { key: usize, length: usize },

    /// Patch a contiguous run of elements: `diffs[k]` applies to the element
    /// at base index `key + k`.
    PatchRange { key: usize, diffs: Vec<Diff> },
}

impl DiffOp {
    pub fn insert(key: impl Into<PathKey>, value: Value) -> Self {
        DiffOp::Insert {
            key: key.into(),
            value,
        }
    }

    pub fn delete(key: impl Into<PathKey>) -> Self {
        DiffOp::Delete { key: key.into() }
    }

    pub fn replace(key: impl Into<PathKey>, value: Value) -> Self {
        DiffOp::Replace {
            key: Some(key.into()),
            value,
        }
    }

    /// A whole-document replacement; see [`DiffOp::Replace`].
    #[must_use]
    pub fn replace_root(value: Value) -> Self {
        DiffOp::Replace { key: None, value }
    }

    pub fn patch(key: impl Into<PathKey>, diff: Diff) -> Self {
        DiffOp::Patch {
            key: key.into(),
            diff,
        }
    }

    #[must_use]
    pub fn add_range(index: usize, values: Vec<Value>) -> Self {
        DiffOp::AddRange {
            key: index,
            values,
        }
    }

    #[must_use]
    pub fn remove_range(index: usize, length: usize) -> Self {
        DiffOp::RemoveRange {
            key: index,
            length,
        }
    }

    #[must_use]
    pub fn patch_range(index: usize, diffs: Vec<Diff>) -> Self {
        DiffOp::PatchRange { key: index, diffs }
    }

    /// The op discriminant as it appears on the wire.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            DiffOp::Insert { .. } => "insert",
            DiffOp::Delete { .. } => "delete",
            DiffOp::Replace { .. } => "replace",
            DiffOp::Patch { .. } => "patch",
            DiffOp::AddRange { .. } => "addrange",
            DiffOp::RemoveRange { .. } => "removerange",
            DiffOp::PatchRange { .. } => "patchrange",
        }
    }

    /// The original-sequence index this op is anchored at, if it addresses a
    /// sequence position.
    #[must_use]
    pub(crate) fn base_index(&self) -> Option<usize> {
        match self {
            DiffOp::Insert {
                key: PathKey::Index(index),
                ..
            }
            | DiffOp::Delete {
                key: PathKey::Index(index),
                ..
            }
            | DiffOp::Patch {
                key: PathKey::Index(index),
                ..
            }
            | DiffOp::Replace {
                key: Some(PathKey::Index(index)),
                ..
            } => Some(*index),
            DiffOp::AddRange { key, .. }
            | DiffOp::RemoveRange { key, .. }
            | DiffOp::PatchRange { key, .. } => Some(*key),
            _ => None,
        }
    }

    /// Insertions do not consume any original element, so at a shared base
    /// index they apply before consuming ops.
    #[must_use]
    pub(crate) fn is_insertion(&self) -> bool {
        matches!(self, DiffOp::Insert { .. } | DiffOp::AddRange { .. })
    }

    #[must_use]
    pub(crate) fn is_root_replace(&self) -> bool {
        matches!(self, DiffOp::Replace { key: None, .. })
    }
}
