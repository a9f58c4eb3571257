mod differ;
pub mod op;
pub mod sequence;

pub use op::{Diff, DiffOp};
pub use sequence::Relation;

use serde_json::Value;

use crate::strategies::Strategies;

pub(crate) use differ::{diff_root, text_diff};

/// Compute the structural diff transforming document `a` into document `b`.
///
/// The diff is total: it is defined for every pair of documents, and
/// applying it to `a` with [`apply_patch`](crate::apply_patch)
/// deterministically yields `b` whenever the two roots have the same kind.
/// An empty diff means the documents are structurally equal.
///
/// ```
/// use reconcile_tree::{apply_patch, diff};
/// use serde_json::json;
///
/// let a = json!({"foo": [1, 2, 3]});
/// let b = json!({"foo": [1, 3, 4]});
///
/// let d = diff(&a, &b);
/// assert_eq!(apply_patch(&a, &d).unwrap(), b);
/// ```
#[must_use]
pub fn diff(a: &Value, b: &Value) -> Diff {
    diff_root(a, b, &Strategies::default())
}

/// Compute a structural diff under a caller-supplied strategy table, which
/// maps path patterns to comparison policy (recurse, atomic replace,
/// line-based text diff, or ignore).
#[must_use]
pub fn diff_with_strategies(a: &Value, b: &Value, strategies: &Strategies) -> Diff {
    diff_root(a, b, strategies)
}
