//! The merge decision engine: a simultaneous walk of the base document and
//! the two diffs taken against it.
//!
//! Both diffs are relative to the same base, so they can be compared
//! position by position. Positions changed by one side only resolve to that
//! side; identical changes resolve to either; genuinely overlapping changes
//! become conflict decisions that keep the base and retain both diffs for an
//! external resolution step.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use super::decisions::{DecisionBuilder, MergeAction, MergeDecision, apply_decisions};
use crate::{
    diff::{
        Diff, DiffOp, Relation,
        sequence::{self, AlignStep},
        text_diff,
    },
    path::PathKey,
    strategies::{MergeMode, Strategies},
    value::split_lines,
};

/// Diffs nested deeper than this stop being walked and conflict wholesale,
/// which keeps the engine total on adversarial wire diffs.
const MAX_NESTING: usize = 128;

/// Produce the merge decisions for `base` under two diffs taken against it.
pub(crate) fn decide(
    base: &Value,
    local: &Diff,
    remote: &Diff,
    strategies: &Strategies,
) -> Vec<MergeDecision> {
    let mut builder = DecisionBuilder::new();
    let mut path = Vec::new();
    merge_node(base, local, remote, strategies, &mut path, &mut builder);
    builder.into_decisions()
}

fn merge_node(
    base: &Value,
    local: &Diff,
    remote: &Diff,
    strategies: &Strategies,
    path: &mut Vec<PathKey>,
    builder: &mut DecisionBuilder,
) {
    if local.is_empty() && remote.is_empty() {
        return;
    }

    // Whole-document replacements have no interior to walk.
    let has_root_replace = local.iter().any(DiffOp::is_root_replace)
        || remote.iter().any(DiffOp::is_root_replace);

    // Containers are walked per position even when only one side changed or
    // both made the identical change, so per-path merge policies apply no
    // matter what the other side did elsewhere.
    if !has_root_replace && path.len() < MAX_NESTING {
        match base {
            Value::Object(mapping) => {
                merge_mapping(mapping, local, remote, strategies, path, builder);
                return;
            }
            Value::Array(items) => {
                merge_sequence(items, local, remote, strategies, path, builder);
                return;
            }
            Value::String(text) if !local.is_empty() && !remote.is_empty() && local != remote => {
                merge_text(text, local, remote, path, builder);
                return;
            }
            _ => {}
        }
    }

    if local == remote {
        builder.agreement(path, local.clone(), remote.clone());
    } else if local.is_empty() || remote.is_empty() {
        builder.onesided(path, local.clone(), remote.clone());
    } else {
        builder.conflict(path, local.clone(), remote.clone());
    }
}

/// The mapping position a top-level op addresses, when well formed.
fn mapping_key(op: &DiffOp) -> Option<&str> {
    match op {
        DiffOp::Insert {
            key: PathKey::Name(name),
            ..
        }
        | DiffOp::Delete {
            key: PathKey::Name(name),
        }
        | DiffOp::Patch {
            key: PathKey::Name(name),
            ..
        }
        | DiffOp::Replace {
            key: Some(PathKey::Name(name)),
            ..
        } => Some(name),
        _ => None,
    }
}

/// Merge two mapping diffs key by key. Mapping keys are independent
/// positions, so each key resolves on its own; only the same key changed in
/// incompatible ways on both sides conflicts.
fn merge_mapping(
    mapping: &Map<String, Value>,
    local: &Diff,
    remote: &Diff,
    strategies: &Strategies,
    path: &mut Vec<PathKey>,
    builder: &mut DecisionBuilder,
) {
    let mut entries: BTreeMap<&str, (Option<&DiffOp>, Option<&DiffOp>)> = BTreeMap::new();
    for op in local {
        let Some(name) = mapping_key(op) else {
            debug_assert!(false, "mapping diff carries a non-mapping op");
            builder.conflict(path, local.clone(), remote.clone());
            return;
        };
        entries.entry(name).or_default().0 = Some(op);
    }
    for op in remote {
        let Some(name) = mapping_key(op) else {
            debug_assert!(false, "mapping diff carries a non-mapping op");
            builder.conflict(path, local.clone(), remote.clone());
            return;
        };
        entries.entry(name).or_default().1 = Some(op);
    }

    for (name, (local_op, remote_op)) in entries {
        let local_part = local_op.cloned().map_or_else(Diff::new, Diff::from);
        let remote_part = remote_op.cloned().map_or_else(Diff::new, Diff::from);

        path.push(PathKey::Name(name.to_owned()));
        let mode = strategies.policy(path).merge;
        path.pop();

        match mode {
            MergeMode::Ignore => {
                builder.keep_base(path, local_part, remote_part);
                continue;
            }
            MergeMode::UseLocal => {
                let action = if local_op.is_some() {
                    MergeAction::Local
                } else {
                    MergeAction::Base
                };
                builder.take_side(path, action, local_part, remote_part);
                continue;
            }
            MergeMode::UseRemote => {
                let action = if remote_op.is_some() {
                    MergeAction::Remote
                } else {
                    MergeAction::Base
                };
                builder.take_side(path, action, local_part, remote_part);
                continue;
            }
            MergeMode::Merge => {}
        }

        match (local_op, remote_op) {
            // One-sided patches still descend: a deeper path may carry its
            // own merge policy.
            (Some(op), None) | (None, Some(op)) => {
                if let (DiffOp::Patch { diff, .. }, Some(child)) = (op, mapping.get(name)) {
                    let empty = Diff::new();
                    let (local_child, remote_child) = if local_op.is_some() {
                        (diff, &empty)
                    } else {
                        (&empty, diff)
                    };
                    path.push(PathKey::Name(name.to_owned()));
                    merge_node(child, local_child, remote_child, strategies, path, builder);
                    path.pop();
                } else {
                    builder.onesided(path, local_part, remote_part);
                }
            }
            (Some(l), Some(r)) if l == r => builder.agreement(path, local_part, remote_part),
            (
                Some(DiffOp::Patch {
                    diff: local_child, ..
                }),
                Some(DiffOp::Patch {
                    diff: remote_child, ..
                }),
            ) => match mapping.get(name) {
                Some(child) => {
                    path.push(PathKey::Name(name.to_owned()));
                    merge_node(child, local_child, remote_child, strategies, path, builder);
                    path.pop();
                }
                None => {
                    debug_assert!(false, "patch op addresses a missing key");
                    builder.conflict(path, local_part, remote_part);
                }
            },
            (
                Some(DiffOp::Insert {
                    value: local_value, ..
                }),
                Some(DiffOp::Insert {
                    value: remote_value,
                    ..
                }),
            ) => match reconcile_insertions(local_value, remote_value) {
                Some(merged) => builder.custom(
                    path,
                    local_part,
                    remote_part,
                    Diff::from(DiffOp::insert(name, merged)),
                ),
                None => builder.conflict(path, local_part, remote_part),
            },
            (None, None) => unreachable!("entry comes from at least one side"),
            _ => builder.conflict(path, local_part, remote_part),
        }
    }
}

/// Reconcile two concurrent insertions of different values at the same new
/// position by merging them against an empty base of their shared kind.
/// Unmergeable pairs (different kinds, scalars, or interior conflicts) are
/// `None` and conflict at the insertion position.
fn reconcile_insertions(local_value: &Value, remote_value: &Value) -> Option<Value> {
    let empty = match (local_value, remote_value) {
        (Value::Object(_), Value::Object(_)) => Value::Object(Map::new()),
        (Value::Array(_), Value::Array(_)) => Value::Array(Vec::new()),
        (Value::String(_), Value::String(_)) => Value::String(String::new()),
        _ => return None,
    };

    let defaults = Strategies::new();
    let local_diff = crate::diff::diff(&empty, local_value);
    let remote_diff = crate::diff::diff(&empty, remote_value);
    let decisions = decide(&empty, &local_diff, &remote_diff, &defaults);
    if decisions.iter().any(|decision| decision.conflict) {
        return None;
    }

    match apply_decisions(&empty, &decisions) {
        Ok(merged) => Some(merged),
        Err(error) => {
            debug_assert!(false, "reconciled insertion failed to apply: {error}");
            None
        }
    }
}

/// One side's sequence diff, expanded to per-position form: values inserted
/// before each base index, removed indices, and per-index nested patches.
#[derive(Default)]
struct SideOps {
    inserts: BTreeMap<usize, Vec<Value>>,
    removed: BTreeSet<usize>,
    patched: BTreeMap<usize, Diff>,
}

impl SideOps {
    /// `None` when the diff carries ops that do not address positions of a
    /// sequence of the given length.
    fn expand(diff: &Diff, length: usize) -> Option<Self> {
        let mut side = Self::default();
        for op in diff {
            match op {
                DiffOp::AddRange { key, values } if *key <= length => {
                    side.inserts
                        .entry(*key)
                        .or_default()
                        .extend(values.iter().cloned());
                }
                DiffOp::Insert {
                    key: PathKey::Index(index),
                    value,
                } if *index <= length => {
                    side.inserts.entry(*index).or_default().push(value.clone());
                }
                DiffOp::Delete {
                    key: PathKey::Index(index),
                } if *index < length => {
                    side.removed.insert(*index);
                }
                DiffOp::RemoveRange { key, length: count }
                    if key.checked_add(*count).is_some_and(|end| end <= length) =>
                {
                    side.removed.extend(*key..*key + *count);
                }
                DiffOp::Patch {
                    key: PathKey::Index(index),
                    diff,
                } if *index < length => {
                    side.patched.insert(*index, diff.clone());
                }
                DiffOp::PatchRange { key, diffs }
                    if key.checked_add(diffs.len()).is_some_and(|end| end <= length) =>
                {
                    for (offset, child) in diffs.iter().enumerate() {
                        side.patched.insert(key + offset, child.clone());
                    }
                }
                DiffOp::Replace {
                    key: Some(PathKey::Index(index)),
                    value,
                } if *index < length => {
                    side.removed.insert(*index);
                    side.inserts.entry(*index).or_default().push(value.clone());
                }
                _ => return None,
            }
        }
        Some(side)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum PendingKind {
    LocalRemove,
    RemoteRemove,
    BothRemove,
}

/// An in-progress run of element removals, coalesced into one `removerange`
/// decision when it ends.
struct PendingRun {
    kind: PendingKind,
    start: usize,
    length: usize,
}

fn extend_pending(
    pending: &mut Option<PendingRun>,
    kind: PendingKind,
    index: usize,
    path: &[PathKey],
    builder: &mut DecisionBuilder,
) {
    match pending {
        Some(run) if run.kind == kind && run.start + run.length == index => run.length += 1,
        _ => {
            flush_pending(pending, path, builder);
            *pending = Some(PendingRun {
                kind,
                start: index,
                length: 1,
            });
        }
    }
}

fn flush_pending(pending: &mut Option<PendingRun>, path: &[PathKey], builder: &mut DecisionBuilder) {
    let Some(run) = pending.take() else { return };
    let removal = Diff::from(DiffOp::remove_range(run.start, run.length));
    match run.kind {
        PendingKind::LocalRemove => builder.onesided(path, removal, Diff::new()),
        PendingKind::RemoteRemove => builder.onesided(path, Diff::new(), removal),
        PendingKind::BothRemove => builder.agreement(path, removal.clone(), removal),
    }
}

/// Merge two sequence diffs by walking every base position and every
/// insertion boundary in order.
fn merge_sequence(
    items: &[Value],
    local: &Diff,
    remote: &Diff,
    strategies: &Strategies,
    path: &mut Vec<PathKey>,
    builder: &mut DecisionBuilder,
) {
    // Elements of one sequence share a policy in practice, as in the differ.
    path.push(PathKey::Index(0));
    let mode = strategies.policy(path).merge;
    path.pop();
    match mode {
        MergeMode::Ignore => {
            builder.keep_base(path, local.clone(), remote.clone());
            return;
        }
        MergeMode::UseLocal => {
            builder.take_side(path, MergeAction::Local, local.clone(), remote.clone());
            return;
        }
        MergeMode::UseRemote => {
            builder.take_side(path, MergeAction::Remote, local.clone(), remote.clone());
            return;
        }
        MergeMode::Merge => {}
    }

    let length = items.len();
    let (Some(local_side), Some(remote_side)) =
        (SideOps::expand(local, length), SideOps::expand(remote, length))
    else {
        debug_assert!(false, "sequence diff carries non-sequence ops");
        builder.conflict(path, local.clone(), remote.clone());
        return;
    };

    let mut pending: Option<PendingRun> = None;

    for index in 0..=length {
        let local_inserts = local_side.inserts.get(&index);
        let remote_inserts = remote_side.inserts.get(&index);
        match (local_inserts, remote_inserts) {
            (None, None) => {}
            (Some(values), None) => {
                flush_pending(&mut pending, path, builder);
                builder.onesided(
                    path,
                    Diff::from(DiffOp::add_range(index, values.clone())),
                    Diff::new(),
                );
            }
            (None, Some(values)) => {
                flush_pending(&mut pending, path, builder);
                builder.onesided(
                    path,
                    Diff::new(),
                    Diff::from(DiffOp::add_range(index, values.clone())),
                );
            }
            (Some(local_values), Some(remote_values)) if local_values == remote_values => {
                flush_pending(&mut pending, path, builder);
                let op = Diff::from(DiffOp::add_range(index, local_values.clone()));
                builder.agreement(path, op.clone(), op);
            }
            (Some(local_values), Some(remote_values)) => {
                // A removal run both sides agreed on, ending exactly at this
                // boundary, is the remove half of two diverging replacements.
                // Hand it to the chunker so it stays tied to the conflict.
                let abuts = matches!(
                    &pending,
                    Some(run)
                        if run.kind == PendingKind::BothRemove && run.start + run.length == index
                );
                let shared_removal = if abuts {
                    pending.take()
                } else {
                    flush_pending(&mut pending, path, builder);
                    None
                };
                chunk_insertions(
                    index,
                    local_values,
                    remote_values,
                    shared_removal,
                    path,
                    builder,
                );
            }
        }

        if index == length {
            break;
        }

        let local_removed = local_side.removed.contains(&index);
        let remote_removed = remote_side.removed.contains(&index);
        let local_patch = local_side.patched.get(&index);
        let remote_patch = remote_side.patched.get(&index);

        match ((local_removed, local_patch), (remote_removed, remote_patch)) {
            ((false, None), (false, None)) => flush_pending(&mut pending, path, builder),
            ((true, None), (true, None)) => {
                extend_pending(&mut pending, PendingKind::BothRemove, index, path, builder);
            }
            ((true, None), (false, None)) => {
                extend_pending(&mut pending, PendingKind::LocalRemove, index, path, builder);
            }
            ((false, None), (true, None)) => {
                extend_pending(&mut pending, PendingKind::RemoteRemove, index, path, builder);
            }
            ((true, None), (false, Some(patch))) => {
                flush_pending(&mut pending, path, builder);
                builder.conflict(
                    path,
                    Diff::from(DiffOp::remove_range(index, 1)),
                    Diff::from(DiffOp::patch(index, patch.clone())),
                );
            }
            ((false, Some(patch)), (true, None)) => {
                flush_pending(&mut pending, path, builder);
                builder.conflict(
                    path,
                    Diff::from(DiffOp::patch(index, patch.clone())),
                    Diff::from(DiffOp::remove_range(index, 1)),
                );
            }
            ((false, Some(local_child)), (false, Some(remote_child))) => {
                flush_pending(&mut pending, path, builder);
                if local_child == remote_child {
                    let op = Diff::from(DiffOp::patch(index, local_child.clone()));
                    builder.agreement(path, op.clone(), op);
                } else {
                    path.push(PathKey::Index(index));
                    merge_node(&items[index], local_child, remote_child, strategies, path, builder);
                    path.pop();
                }
            }
            ((false, Some(patch)), (false, None)) => {
                flush_pending(&mut pending, path, builder);
                let empty = Diff::new();
                path.push(PathKey::Index(index));
                merge_node(&items[index], patch, &empty, strategies, path, builder);
                path.pop();
            }
            ((false, None), (false, Some(patch))) => {
                flush_pending(&mut pending, path, builder);
                let empty = Diff::new();
                path.push(PathKey::Index(index));
                merge_node(&items[index], &empty, patch, strategies, path, builder);
                path.pop();
            }
            _ => {
                flush_pending(&mut pending, path, builder);
                debug_assert!(false, "one side both removes and patches an element");
                builder.conflict(path, local.clone(), remote.clone());
            }
        }
    }

    flush_pending(&mut pending, path, builder);
}

/// One aligned stretch of two insertion runs: inserted by both sides
/// identically, or diverging between them.
enum InsertChunk {
    Agreed(Vec<Value>),
    Split {
        local: Vec<Value>,
        remote: Vec<Value>,
    },
}

/// Both sides inserted different runs at the same boundary. Align the two
/// runs: values both sides inserted are taken once by agreement, and the
/// disagreeing stretches between them conflict pairwise (or resolve
/// one-sided when only one side contributes).
///
/// `shared_removal` is a removal run both sides made right before the
/// boundary. The differ writes a replacement as removal plus insertion, so
/// that run belongs to whichever chunk conflicts: it is folded into the first
/// two-sided split, keeping the removed base elements in place until the
/// conflict is resolved. With no two-sided split the removal really was
/// independent and is emitted as its own agreement.
fn chunk_insertions(
    boundary: usize,
    local_values: &[Value],
    remote_values: &[Value],
    shared_removal: Option<PendingRun>,
    path: &[PathKey],
    builder: &mut DecisionBuilder,
) {
    let equal_only = |a: &Value, b: &Value| {
        if a == b {
            Relation::Equal
        } else {
            Relation::Unrelated
        }
    };
    let steps = sequence::align(local_values, remote_values, &equal_only);

    let mut chunks = Vec::new();
    let mut index = 0;
    while index < steps.len() {
        if matches!(steps[index], AlignStep::Match { .. }) {
            let mut values = Vec::new();
            while let Some(AlignStep::Match { a_index, .. }) = steps.get(index).copied() {
                values.push(local_values[a_index].clone());
                index += 1;
            }
            chunks.push(InsertChunk::Agreed(values));
        } else {
            let mut local_chunk = Vec::new();
            let mut remote_chunk = Vec::new();
            loop {
                match steps.get(index).copied() {
                    Some(AlignStep::Delete { a_index }) => {
                        local_chunk.push(local_values[a_index].clone());
                        index += 1;
                    }
                    Some(AlignStep::Insert { b_index }) => {
                        remote_chunk.push(remote_values[b_index].clone());
                        index += 1;
                    }
                    _ => break,
                }
            }
            chunks.push(InsertChunk::Split {
                local: local_chunk,
                remote: remote_chunk,
            });
        }
    }

    let fold_into = chunks.iter().position(|chunk| {
        matches!(
            chunk,
            InsertChunk::Split { local, remote } if !local.is_empty() && !remote.is_empty()
        )
    });
    let mut removal = shared_removal.map(|run| DiffOp::remove_range(run.start, run.length));
    if fold_into.is_none() {
        if let Some(op) = removal.take() {
            let agreed = Diff::from(op);
            builder.agreement(path, agreed.clone(), agreed);
        }
    }

    for (chunk_index, chunk) in chunks.into_iter().enumerate() {
        match chunk {
            InsertChunk::Agreed(values) => {
                let op = Diff::from(DiffOp::add_range(boundary, values));
                builder.agreement(path, op.clone(), op);
            }
            InsertChunk::Split { local, remote } => {
                let mut local_ops = Vec::new();
                let mut remote_ops = Vec::new();
                if fold_into == Some(chunk_index) {
                    if let Some(op) = removal.take() {
                        local_ops.push(op.clone());
                        remote_ops.push(op);
                    }
                }
                if !local.is_empty() {
                    local_ops.push(DiffOp::add_range(boundary, local));
                }
                if !remote.is_empty() {
                    remote_ops.push(DiffOp::add_range(boundary, remote));
                }

                let local_diff = Diff::from(local_ops);
                let remote_diff = Diff::from(remote_ops);
                if local_diff.is_empty() || remote_diff.is_empty() {
                    builder.onesided(path, local_diff, remote_diff);
                } else {
                    builder.conflict(path, local_diff, remote_diff);
                }
            }
        }
    }
}

/// Merge two line diffs of the same base string by merging the line
/// pseudo-sequences. A clean line merge becomes a `custom` decision carrying
/// the combined text diff; any line-level conflict surfaces as one conflict
/// on the whole string.
fn merge_text(
    text: &str,
    local: &Diff,
    remote: &Diff,
    path: &[PathKey],
    builder: &mut DecisionBuilder,
) {
    let lines = split_lines(text);
    let mut line_builder = DecisionBuilder::new();
    let mut line_path = Vec::new();
    merge_sequence(
        &lines,
        local,
        remote,
        &Strategies::new(),
        &mut line_path,
        &mut line_builder,
    );

    if line_builder.has_conflicts() {
        builder.conflict(path, local.clone(), remote.clone());
        return;
    }

    let merged = match apply_decisions(&Value::Array(lines), &line_builder.into_decisions()) {
        Ok(merged) => merged,
        Err(error) => {
            debug_assert!(false, "line merge failed to apply: {error}");
            builder.conflict(path, local.clone(), remote.clone());
            return;
        }
    };

    let Value::Array(merged_lines) = merged else {
        unreachable!("patching a sequence yields a sequence")
    };
    let mut merged_text = String::new();
    for line in &merged_lines {
        let Some(line) = line.as_str() else {
            debug_assert!(false, "line diffs insert only strings");
            builder.conflict(path, local.clone(), remote.clone());
            return;
        };
        merged_text.push_str(line);
    }

    builder.custom(
        path,
        local.clone(),
        remote.clone(),
        text_diff(text, &merged_text),
    );
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::{
        diff::diff_with_strategies,
        strategies::{CompareMode, Policy},
    };

    fn decide_values(
        base: &Value,
        local: &Value,
        remote: &Value,
        strategies: &Strategies,
    ) -> Vec<MergeDecision> {
        let local_diff = diff_with_strategies(base, local, strategies);
        let remote_diff = diff_with_strategies(base, remote, strategies);
        decide(base, &local_diff, &remote_diff, strategies)
    }

    fn merge_values(base: &Value, local: &Value, remote: &Value) -> (Value, Vec<MergeDecision>) {
        let decisions = decide_values(base, local, remote, &Strategies::new());
        let merged = apply_decisions(base, &decisions).unwrap();
        (merged, decisions)
    }

    #[test]
    fn disjoint_edits_merge_cleanly() {
        let base = json!({"a": 1, "b": 2});
        let local = json!({"a": 10, "b": 2});
        let remote = json!({"a": 1, "b": 20});

        let (merged, decisions) = merge_values(&base, &local, &remote);
        assert!(decisions.iter().all(|decision| !decision.conflict));
        assert_eq!(merged, json!({"a": 10, "b": 20}));
    }

    #[test]
    fn identical_edits_resolve_to_either() {
        let base = json!({"x": 1});
        let changed = json!({"x": 2});

        let (merged, decisions) = merge_values(&base, &changed, &changed);
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].action, MergeAction::Either);
        assert!(!decisions[0].conflict);
        assert_eq!(merged, changed);
    }

    #[test]
    fn conflicting_scalar_edits_keep_the_base() {
        let base = json!({"x": 1});
        let local = json!({"x": 2});
        let remote = json!({"x": 3});

        let (merged, decisions) = merge_values(&base, &local, &remote);
        assert_eq!(decisions.len(), 1);
        assert!(decisions[0].conflict);
        assert_eq!(decisions[0].action, MergeAction::Base);
        assert_eq!(
            decisions[0].local_diff,
            Diff::from(DiffOp::replace("x", json!(2)))
        );
        assert_eq!(merged, base);
    }

    #[test]
    fn concurrent_mapping_insertions_reconcile_recursively() {
        let base = json!({});
        let local = json!({"n": {"s": 7, "l": 2}});
        let remote = json!({"n": {"s": 7, "r": 3}});

        let (merged, decisions) = merge_values(&base, &local, &remote);
        assert!(decisions.iter().all(|decision| !decision.conflict));
        assert_eq!(decisions[0].action, MergeAction::Custom);
        assert_eq!(merged, json!({"n": {"l": 2, "r": 3, "s": 7}}));
    }

    #[test]
    fn concurrent_incompatible_insertions_conflict() {
        let base = json!({});
        let local = json!({"n": 1});
        let remote = json!({"n": [1]});

        let (merged, decisions) = merge_values(&base, &local, &remote);
        assert_eq!(decisions.len(), 1);
        assert!(decisions[0].conflict);
        assert_eq!(merged, base);
    }

    #[test]
    fn same_boundary_insertions_conflict_and_agree_per_chunk() {
        let base = json!([1]);
        let local = json!([1, 2, 7]);
        let remote = json!([1, 3, 7]);

        let (merged, decisions) = merge_values(&base, &local, &remote);
        assert_eq!(decisions.len(), 2);

        assert!(decisions[0].conflict);
        assert_eq!(
            decisions[0].local_diff,
            Diff::from(DiffOp::add_range(1, vec![json!(2)]))
        );
        assert_eq!(
            decisions[0].remote_diff,
            Diff::from(DiffOp::add_range(1, vec![json!(3)]))
        );

        assert!(!decisions[1].conflict);
        assert_eq!(decisions[1].action, MergeAction::Either);
        assert_eq!(
            decisions[1].local_diff,
            Diff::from(DiffOp::add_range(1, vec![json!(7)]))
        );

        // Unresolved, the shared suffix still lands.
        assert_eq!(merged, json!([1, 7]));
    }

    #[test]
    fn resolving_a_boundary_conflict_keeps_insertion_order() {
        let base = json!([1]);
        let local = json!([1, 2, 7]);
        let remote = json!([1, 3, 7]);

        let mut decisions = decide_values(&base, &local, &remote, &Strategies::new());
        decisions[0].action = MergeAction::Local;
        assert_eq!(apply_decisions(&base, &decisions).unwrap(), json!([1, 2, 7]));

        decisions[0].action = MergeAction::LocalThenRemote;
        assert_eq!(
            apply_decisions(&base, &decisions).unwrap(),
            json!([1, 2, 3, 7])
        );
    }

    #[test]
    fn conflicting_replacements_of_an_element_keep_the_base() {
        let base = json!([5]);
        let local = json!([6]);
        let remote = json!([7]);

        let (merged, decisions) = merge_values(&base, &local, &remote);
        assert_eq!(decisions.len(), 1);
        assert!(decisions[0].conflict);
        assert_eq!(
            decisions[0].local_diff,
            Diff::from(vec![
                DiffOp::remove_range(0, 1),
                DiffOp::add_range(1, vec![json!(6)]),
            ])
        );
        assert_eq!(
            decisions[0].remote_diff,
            Diff::from(vec![
                DiffOp::remove_range(0, 1),
                DiffOp::add_range(1, vec![json!(7)]),
            ])
        );

        // Unresolved, the disputed element stays in place.
        assert_eq!(merged, base);

        let mut decisions = decisions;
        decisions[0].action = MergeAction::Local;
        assert_eq!(apply_decisions(&base, &decisions).unwrap(), local);
    }

    #[test]
    fn agreed_removals_away_from_a_conflict_stay_independent() {
        let base = json!([5, 6]);
        let local = json!([6, "x"]);
        let remote = json!([6, "y"]);

        let (merged, decisions) = merge_values(&base, &local, &remote);
        assert_eq!(decisions.len(), 2);

        assert!(!decisions[0].conflict);
        assert_eq!(decisions[0].action, MergeAction::Either);
        assert_eq!(
            decisions[0].local_diff,
            Diff::from(DiffOp::remove_range(0, 1))
        );

        assert!(decisions[1].conflict);
        assert_eq!(
            decisions[1].local_diff,
            Diff::from(DiffOp::add_range(2, vec![json!("x")]))
        );

        assert_eq!(merged, json!([6]));
    }

    #[test]
    fn overlapping_removals_coalesce_without_conflict() {
        let base = json!([1, 2, 3]);
        let local = json!([1]);
        let remote = json!([1, 3]);

        let (merged, decisions) = merge_values(&base, &local, &remote);
        assert!(decisions.iter().all(|decision| !decision.conflict));
        assert_eq!(merged, json!([1]));
    }

    #[test]
    fn removing_a_patched_element_conflicts() {
        let base = json!([{"n": 1}]);
        let local = json!([]);
        let remote = json!([{"n": 2}]);

        let (merged, decisions) = merge_values(&base, &local, &remote);
        assert_eq!(decisions.len(), 1);
        assert!(decisions[0].conflict);
        assert_eq!(merged, base);
    }

    #[test]
    fn nested_edits_get_deep_decision_paths() {
        let base = json!({"a": {"x": 1, "y": 2}});
        let local = json!({"a": {"x": 10, "y": 2}});
        let remote = json!({"a": {"x": 1, "y": 20}});

        let (merged, decisions) = merge_values(&base, &local, &remote);
        assert!(decisions.iter().all(|decision| !decision.conflict));
        assert!(
            decisions
                .iter()
                .all(|decision| decision.common_path == vec![PathKey::from("a")])
        );
        assert_eq!(merged, json!({"a": {"x": 10, "y": 20}}));
    }

    #[test]
    fn edits_to_different_lines_merge_as_text() {
        let strategies = Strategies::new().with("/source", Policy::compare(CompareMode::TextLines));
        let base = json!({"source": "a\nb\nc\n"});
        let local = json!({"source": "A\nb\nc\n"});
        let remote = json!({"source": "a\nb\nC\n"});

        let decisions = decide_values(&base, &local, &remote, &strategies);
        assert!(decisions.iter().all(|decision| !decision.conflict));
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].action, MergeAction::Custom);
        assert_eq!(decisions[0].common_path, vec![PathKey::from("source")]);

        let merged = apply_decisions(&base, &decisions).unwrap();
        assert_eq!(merged, json!({"source": "A\nb\nC\n"}));
    }

    #[test]
    fn edits_to_the_same_line_conflict_as_text() {
        let strategies = Strategies::new().with("/source", Policy::compare(CompareMode::TextLines));
        let base = json!({"source": "a\nb\n"});
        let local = json!({"source": "a\nlocal\n"});
        let remote = json!({"source": "a\nremote\n"});

        let decisions = decide_values(&base, &local, &remote, &strategies);
        assert_eq!(decisions.len(), 1);
        assert!(decisions[0].conflict);
        assert_eq!(decisions[0].common_path, vec![PathKey::from("source")]);
        assert_eq!(apply_decisions(&base, &decisions).unwrap(), base);
    }

    #[test]
    fn merge_ignored_fields_keep_base_without_conflict() {
        let strategies = Strategies::new().with("/count", Policy::merge(MergeMode::Ignore));
        let base = json!({"count": 1});
        let local = json!({"count": 2});
        let remote = json!({"count": 3});

        let decisions = decide_values(&base, &local, &remote, &strategies);
        assert_eq!(decisions.len(), 1);
        assert!(!decisions[0].conflict);
        assert_eq!(decisions[0].action, MergeAction::Base);
        assert_eq!(apply_decisions(&base, &decisions).unwrap(), base);
    }

    #[test]
    fn merge_policies_apply_to_one_sided_changes() {
        let strategies = Strategies::new().with("/count", Policy::merge(MergeMode::Ignore));
        let base = json!({"count": 1, "v": 1});
        let local = json!({"count": 2, "v": 2});

        // Remote untouched: the ignored field still keeps its base value.
        let decisions = decide_values(&base, &local, &base, &strategies);
        assert_eq!(decisions.len(), 2);
        assert!(decisions.iter().all(|decision| !decision.conflict));
        assert_eq!(decisions[0].action, MergeAction::Base);
        assert_eq!(decisions[1].action, MergeAction::Local);
        assert_eq!(
            apply_decisions(&base, &decisions).unwrap(),
            json!({"count": 1, "v": 2})
        );
    }

    #[test]
    fn use_local_policy_never_conflicts() {
        let strategies = Strategies::new().with("/meta", Policy::merge(MergeMode::UseLocal));
        let base = json!({"meta": 1});

        let decisions = decide_values(&base, &json!({"meta": 2}), &json!({"meta": 3}), &strategies);
        assert_eq!(decisions.len(), 1);
        assert!(!decisions[0].conflict);
        assert_eq!(
            apply_decisions(&base, &decisions).unwrap(),
            json!({"meta": 2})
        );

        // With no local change the base stays, even though remote changed.
        let decisions = decide_values(&base, &base, &json!({"meta": 3}), &strategies);
        assert_eq!(decisions[0].action, MergeAction::Base);
        assert_eq!(apply_decisions(&base, &decisions).unwrap(), base);
    }

    #[test]
    fn concurrent_string_insertions_reconcile_linewise() {
        let base = json!({});
        let local = json!({"s": "shared\nlocal\n"});
        let remote = json!({"s": "shared\n"});

        let (merged, decisions) = merge_values(&base, &local, &remote);
        assert!(decisions.iter().all(|decision| !decision.conflict));
        assert_eq!(merged, json!({"s": "shared\nlocal\n"}));
    }

    #[test]
    fn delete_versus_edit_of_a_mapping_key_conflicts() {
        let base = json!({"k": 1});
        let local = json!({});
        let remote = json!({"k": 2});

        let (merged, decisions) = merge_values(&base, &local, &remote);
        assert_eq!(decisions.len(), 1);
        assert!(decisions[0].conflict);
        assert_eq!(merged, base);
    }
}
