mod decisions;
mod engine;

pub use decisions::{MergeAction, MergeDecision, apply_decisions};

use serde_json::Value;

use crate::{diff::diff_with_strategies, error::PatchError, strategies::Strategies};

/// A fully materialized merge: the merged document together with the
/// decisions that produced it.
///
/// Conflicted decisions contribute nothing to `merged` (the base value
/// stays), so a conflicted outcome is still a valid document plus a precise
/// record of what could not be resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub merged: Value,
    pub decisions: Vec<MergeDecision>,
}

impl MergeOutcome {
    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        self.decisions.iter().any(|decision| decision.conflict)
    }
}

/// Compute the merge decisions for a three-way merge of `local` and `remote`
/// against their common ancestor `base`.
///
/// Decisions partition the changes: positions changed by one side only
/// resolve to that side, identical changes resolve to either, and
/// overlapping incompatible changes become conflict decisions carrying both
/// diffs. The result is deterministic for identical inputs.
#[must_use]
pub fn decide_merge(base: &Value, local: &Value, remote: &Value) -> Vec<MergeDecision> {
    decide_merge_with_strategies(base, local, remote, &Strategies::default())
}

/// Like [`decide_merge`], under a caller-supplied strategy table controlling
/// per-path comparison and merge behavior.
#[must_use]
pub fn decide_merge_with_strategies(
    base: &Value,
    local: &Value,
    remote: &Value,
    strategies: &Strategies,
) -> Vec<MergeDecision> {
    let local_diff = diff_with_strategies(base, local, strategies);
    let remote_diff = diff_with_strategies(base, remote, strategies);
    engine::decide(base, &local_diff, &remote_diff, strategies)
}

/// Perform a three-way merge and materialize the result.
///
/// When both sides made only compatible changes, `merged` contains them all
/// and [`MergeOutcome::has_conflicts`] is `false`. Conflicting positions
/// keep their base value and are reported through the decisions.
///
/// ```
/// use reconcile_tree::merge;
/// use serde_json::json;
///
/// let base = json!({"a": 1, "b": 2});
/// let local = json!({"a": 10, "b": 2});
/// let remote = json!({"a": 1, "b": 20});
///
/// let outcome = merge(&base, &local, &remote).unwrap();
/// assert!(!outcome.has_conflicts());
/// assert_eq!(outcome.merged, json!({"a": 10, "b": 20}));
/// ```
///
/// # Errors
///
/// Returns a [`PatchError`] when the resolved decisions do not fit the base
/// document; decisions computed by this call always fit.
pub fn merge(base: &Value, local: &Value, remote: &Value) -> Result<MergeOutcome, PatchError> {
    merge_with_strategies(base, local, remote, &Strategies::default())
}

/// Like [`merge`], under a caller-supplied strategy table.
///
/// # Errors
///
/// Returns a [`PatchError`] when the resolved decisions do not fit the base
/// document.
pub fn merge_with_strategies(
    base: &Value,
    local: &Value,
    remote: &Value,
    strategies: &Strategies,
) -> Result<MergeOutcome, PatchError> {
    let decisions = decide_merge_with_strategies(base, local, remote, strategies);
    let merged = apply_decisions(base, &decisions)?;
    Ok(MergeOutcome { merged, decisions })
}
