//! Structural diffing, patching and three-way merging of JSON-like
//! documents, with a ready-made driver for Jupyter notebooks.
//!
//! The differ compares two documents node by node and produces a [`Diff`]:
//! an ordered script of elementary operations with a stable JSON wire
//! format. [`apply_patch`] is its exact inverse. [`merge`] performs a
//! three-way merge of two revisions against their common ancestor, emitting
//! [`MergeDecision`]s that either resolve automatically or report a precise,
//! path-addressed conflict. A [`Strategies`] table adapts all of it to a
//! document schema without teaching the engine anything about the schema
//! itself.
//!
//! ```
//! use reconcile_tree::{apply_patch, diff, merge};
//! use serde_json::json;
//!
//! let base = json!({"title": "draft", "tags": ["a"]});
//! let local = json!({"title": "draft", "tags": ["a", "b"]});
//! let remote = json!({"title": "final", "tags": ["a"]});
//!
//! let patch = diff(&base, &local);
//! assert_eq!(apply_patch(&base, &patch).unwrap(), local);
//!
//! let outcome = merge(&base, &local, &remote).unwrap();
//! assert!(!outcome.has_conflicts());
//! assert_eq!(outcome.merged, json!({"title": "final", "tags": ["a", "b"]}));
//! ```

mod diff;
mod error;
mod merging;
mod notebooks;
mod patching;
mod path;
mod strategies;
mod value;

pub use diff::{Diff, DiffOp, Relation, diff, diff_with_strategies};
pub use error::PatchError;
pub use merging::{
    MergeAction, MergeDecision, MergeOutcome, apply_decisions, decide_merge,
    decide_merge_with_strategies, merge, merge_with_strategies,
};
pub use notebooks::{
    decide_notebook_merge, diff_notebooks, merge_notebooks, notebook_strategies,
};
pub use patching::apply_patch;
pub use path::{PathKey, PathPattern};
pub use strategies::{CompareMode, MergeMode, Policy, Strategies};
