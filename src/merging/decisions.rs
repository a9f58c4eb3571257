//! Merge decisions: the unit of output of the three-way merge, and the
//! machinery for materializing a resolved merge.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    diff::{Diff, DiffOp},
    error::PatchError,
    patching::apply_patch,
    path::PathKey,
};

/// What to do at one path of the merge.
///
/// The engine only ever emits `base` (for conflicts and merge-ignored
/// fields), `local`, `remote`, `either`, and `custom`. The two ordering
/// actions exist for external tools: resolving a conflicted decision means
/// flipping its action to the wanted source and feeding the decisions back
/// to [`apply_decisions`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MergeAction {
    /// Keep the base value; for a conflicted decision this means "leave
    /// unresolved".
    Base,
    /// Apply the local side's diff.
    Local,
    /// Apply the remote side's diff.
    Remote,
    /// Both sides made the identical change; either diff applies.
    Either,
    /// Apply `custom_diff`, a reconciliation computed from both sides.
    Custom,
    /// Apply the local diff, then the remote diff.
    LocalThenRemote,
    /// Apply the remote diff, then the local diff.
    RemoteThenLocal,
}

/// One resolved-or-conflicting unit of a three-way merge, keyed by a path
/// into the base document.
///
/// Its serialized form is the merge-decision wire format. `conflict = true`
/// means the two sides cannot be reconciled automatically: both diffs are
/// retained unresolved, the action is advisory (`base`), and nothing is
/// auto-applied for this path.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MergeDecision {
    /// Path into the base document that both diffs are relative to.
    pub common_path: Vec<PathKey>,
    pub action: MergeAction,
    pub conflict: bool,
    #[serde(default, skip_serializing_if = "Diff::is_empty")]
    pub local_diff: Diff,
    #[serde(default, skip_serializing_if = "Diff::is_empty")]
    pub remote_diff: Diff,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_diff: Option<Diff>,
}

impl MergeDecision {
    /// The diff this decision resolves to under its current action.
    /// Conflicted decisions emitted by the engine carry the advisory `base`
    /// action and therefore resolve to nothing until an external tool flips
    /// the action.
    #[must_use]
    pub fn resolved_diff(&self) -> Diff {
        match self.action {
            MergeAction::Base => Diff::new(),
            MergeAction::Local | MergeAction::Either => self.local_diff.clone(),
            MergeAction::Remote => self.remote_diff.clone(),
            MergeAction::Custom => self.custom_diff.clone().unwrap_or_default(),
            MergeAction::LocalThenRemote => {
                concat(self.local_diff.clone(), self.remote_diff.clone())
            }
            MergeAction::RemoteThenLocal => {
                concat(self.remote_diff.clone(), self.local_diff.clone())
            }
        }
    }
}

fn concat(first: Diff, second: Diff) -> Diff {
    let mut ops = first.into_ops();
    // An op shared by both sides (an agreed removal folded into a conflict)
    // applies once; only insertions stack.
    for op in second {
        if op.is_insertion() || !ops.contains(&op) {
            ops.push(op);
        }
    }
    ops.into()
}

/// Collects decisions during the merge walk, normalizing each one before it
/// is stored: a chain of single `patch` ops shared by every non-empty diff
/// is moved out of the diffs and onto `common_path`, so decisions sit as
/// deep in the tree as they can.
#[derive(Debug, Default)]
pub(crate) struct DecisionBuilder {
    decisions: Vec<MergeDecision>,
}

impl DecisionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_decisions(self) -> Vec<MergeDecision> {
        self.decisions
    }

    pub fn has_conflicts(&self) -> bool {
        self.decisions.iter().any(|decision| decision.conflict)
    }

    /// One side changed, the other did not.
    pub fn onesided(&mut self, path: &[PathKey], local_diff: Diff, remote_diff: Diff) {
        debug_assert!(local_diff.is_empty() != remote_diff.is_empty());
        let action = if remote_diff.is_empty() {
            MergeAction::Local
        } else {
            MergeAction::Remote
        };
        self.add(path, action, false, local_diff, remote_diff, None);
    }

    /// Both sides made the identical change.
    pub fn agreement(&mut self, path: &[PathKey], local_diff: Diff, remote_diff: Diff) {
        self.add(path, MergeAction::Either, false, local_diff, remote_diff, None);
    }

    /// The two sides cannot be reconciled; record both, resolve nothing.
    pub fn conflict(&mut self, path: &[PathKey], local_diff: Diff, remote_diff: Diff) {
        self.add(path, MergeAction::Base, true, local_diff, remote_diff, None);
    }

    /// Both sides changed and a reconciliation was computed from them.
    pub fn custom(
        &mut self,
        path: &[PathKey],
        local_diff: Diff,
        remote_diff: Diff,
        custom_diff: Diff,
    ) {
        self.add(
            path,
            MergeAction::Custom,
            false,
            local_diff,
            remote_diff,
            Some(custom_diff),
        );
    }

    /// Keep the base value without conflicting (merge-ignored fields).
    pub fn keep_base(&mut self, path: &[PathKey], local_diff: Diff, remote_diff: Diff) {
        self.add(path, MergeAction::Base, false, local_diff, remote_diff, None);
    }

    /// A policy decision that takes one side wholesale.
    pub fn take_side(
        &mut self,
        path: &[PathKey],
        action: MergeAction,
        local_diff: Diff,
        remote_diff: Diff,
    ) {
        self.add(path, action, false, local_diff, remote_diff, None);
    }

    fn add(
        &mut self,
        path: &[PathKey],
        action: MergeAction,
        conflict: bool,
        local_diff: Diff,
        remote_diff: Diff,
        custom_diff: Option<Diff>,
    ) {
        let mut common_path = path.to_vec();
        let (local_diff, remote_diff, custom_diff) =
            push_down(&mut common_path, local_diff, remote_diff, custom_diff);

        self.decisions.push(MergeDecision {
            common_path,
            action,
            conflict,
            local_diff,
            remote_diff,
            custom_diff,
        });
    }
}

/// Move any chain of single `patch` ops shared by all non-empty diffs from
/// the diffs onto the common path.
fn push_down(
    path: &mut Vec<PathKey>,
    mut local_diff: Diff,
    mut remote_diff: Diff,
    mut custom_diff: Option<Diff>,
) -> (Diff, Diff, Option<Diff>) {
    loop {
        let mut shared_key: Option<&PathKey> = None;
        let mut can_pop = true;

        let present = [Some(&local_diff), Some(&remote_diff), custom_diff.as_ref()];
        for diff in present.into_iter().flatten() {
            if diff.is_empty() {
                continue;
            }
            match diff.ops() {
                [DiffOp::Patch { key, .. }] if shared_key.is_none_or(|shared| shared == key) => {
                    shared_key = Some(key);
                }
                _ => {
                    can_pop = false;
                    break;
                }
            }
        }

        let Some(key) = shared_key.filter(|_| can_pop).cloned() else {
            return (local_diff, remote_diff, custom_diff);
        };

        path.push(key);
        local_diff = unwrap_patch(local_diff);
        remote_diff = unwrap_patch(remote_diff);
        custom_diff = custom_diff.map(unwrap_patch);
    }
}

fn unwrap_patch(diff: Diff) -> Diff {
    if diff.is_empty() {
        return diff;
    }
    match diff.into_ops().pop() {
        Some(DiffOp::Patch { diff, .. }) => diff,
        _ => unreachable!("push_down only unwraps single-patch diffs"),
    }
}

/// Apply a list of merge decisions to the base document, materializing the
/// merge.
///
/// Each decision contributes the diff its `action` resolves to (conflicted
/// decisions with the advisory `base` action contribute nothing); the
/// fragments are re-rooted along their `common_path`, combined into a single
/// diff, and applied in one pass.
///
/// # Errors
///
/// Returns a [`PatchError`] when a resolved fragment does not fit the base
/// document, for example when decisions produced against a different base
/// are replayed.
pub fn apply_decisions(base: &Value, decisions: &[MergeDecision]) -> Result<Value, PatchError> {
    let rooted = decisions
        .iter()
        .map(|decision| decision.resolved_diff().nested_under(&decision.common_path))
        .collect();
    apply_patch(base, &combine(rooted))
}

/// Combine per-decision diff fragments into one diff tree.
///
/// `patch` ops addressing the same position merge recursively; everything
/// else is kept and ordered by position (insertions first at a shared
/// index, mapping keys by name). The sort is stable, so fragments at the
/// same boundary keep decision order, which is what puts local insertions
/// before remote ones when both were taken.
fn combine(diffs: Vec<Diff>) -> Diff {
    let mut ops: Vec<DiffOp> = Vec::new();

    for diff in diffs {
        for op in diff {
            if let DiffOp::Patch { key, diff: child } = op {
                // Merge into an already-collected patch at the same key.
                let existing = ops.iter_mut().find_map(|collected| match collected {
                    DiffOp::Patch {
                        key: collected_key,
                        diff,
                    } if *collected_key == key => Some(diff),
                    _ => None,
                });
                match existing {
                    Some(target) => *target = combine(vec![std::mem::take(target), child]),
                    None => ops.push(DiffOp::Patch { key, diff: child }),
                }
            } else {
                ops.push(op);
            }
        }
    }

    ops.sort_by(|a, b| position_order(a).cmp(&position_order(b)));
    ops.into()
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum PositionOrder<'a> {
    Root,
    Index(usize, u8),
    Name(&'a str),
}

fn position_order(op: &DiffOp) -> PositionOrder<'_> {
    match op.base_index() {
        Some(index) => PositionOrder::Index(index, u8::from(!op.is_insertion())),
        None => match op {
            DiffOp::Insert {
                key: PathKey::Name(name),
                ..
            }
            | DiffOp::Delete {
                key: PathKey::Name(name),
            }
            | DiffOp::Replace {
                key: Some(PathKey::Name(name)),
                ..
            }
            | DiffOp::Patch {
                key: PathKey::Name(name),
                ..
            } => PositionOrder::Name(name),
            _ => PositionOrder::Root,
        },
    }
}
