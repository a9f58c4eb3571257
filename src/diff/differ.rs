//! The structural differ: recursive, kind-paired diffing of two documents.

use serde_json::{Map, Value};

use super::{
    op::{Diff, DiffOp},
    sequence::{self, Relation},
};
use crate::{
    path::PathKey,
    strategies::{CompareMode, Strategies},
    value::split_lines,
};

/// Containers nested deeper than this are no longer recursed into and are
/// replaced wholesale instead, which keeps the differ total on adversarial
/// inputs without an explicit stack.
pub(crate) const MAX_NESTING: usize = 128;

/// Diff two documents at the root level.
///
/// The root has no addressable position, so the shape-mismatch degradation
/// takes a special form here: mismatched root kinds (and unequal scalar
/// roots) produce a single whole-document `replace`. String roots are diffed
/// as line pseudo-sequences, the only way the wire format can address inside
/// a string.
pub(crate) fn diff_root(a: &Value, b: &Value, strategies: &Strategies) -> Diff {
    if a == b {
        return Diff::new();
    }

    let mut path = Vec::new();
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => diff_mappings(a, b, strategies, &mut path),
        (Value::Array(a), Value::Array(b)) => diff_elements(a, b, strategies, &mut path),
        (Value::String(a), Value::String(b)) => text_diff(a, b),
        _ => Diff::from(DiffOp::replace_root(b.clone())),
    }
}

/// Diff two mappings key by key. Emits ops in sorted key order so the output
/// does not depend on insertion order.
fn diff_mappings(
    a: &Map<String, Value>,
    b: &Map<String, Value>,
    strategies: &Strategies,
    path: &mut Vec<PathKey>,
) -> Diff {
    let mut keys: Vec<&String> = a.keys().collect();
    keys.extend(b.keys().filter(|key| !a.contains_key(*key)));
    keys.sort_unstable();

    let mut ops = Vec::new();
    for key in keys {
        path.push(PathKey::Name(key.clone()));
        let mode = strategies.policy(path).compare;

        if mode != CompareMode::Ignore {
            match (a.get(key), b.get(key)) {
                (None, Some(added)) => ops.push(DiffOp::insert(key.clone(), added.clone())),
                (Some(_), None) => ops.push(DiffOp::delete(key.clone())),
                (Some(old), Some(new)) if old == new => {}
                (Some(old), Some(new)) => {
                    if let Some(op) = diff_entry(key, old, new, mode, strategies, path) {
                        ops.push(op);
                    }
                }
                (None, None) => unreachable!("key comes from the union of both mappings"),
            }
        }

        path.pop();
    }

    ops.into()
}

/// Diff one changed mapping entry; `old` and `new` are known to be unequal.
fn diff_entry(
    key: &str,
    old: &Value,
    new: &Value,
    mode: CompareMode,
    strategies: &Strategies,
    path: &mut Vec<PathKey>,
) -> Option<DiffOp> {
    if mode == CompareMode::Atomic || path.len() >= MAX_NESTING {
        return Some(DiffOp::replace(key, new.clone()));
    }

    match (old, new) {
        (Value::Object(old), Value::Object(new)) => {
            let diff = diff_mappings(old, new, strategies, path);
            (!diff.is_empty()).then(|| DiffOp::patch(key, diff))
        }
        (Value::Array(old), Value::Array(new)) => {
            let diff = diff_elements(old, new, strategies, path);
            (!diff.is_empty()).then(|| DiffOp::patch(key, diff))
        }
        (Value::String(old), Value::String(new)) if mode == CompareMode::TextLines => {
            Some(DiffOp::patch(key, text_diff(old, new)))
        }
        // Unequal scalars, or a shape mismatch: degrade to a whole-value
        // replace so the diff stays total.
        _ => Some(DiffOp::replace(key, new.clone())),
    }
}

/// Diff two sequences via the aligner, with recursive diffing of matched
/// elements as the sub-diff predicate.
pub(crate) fn diff_elements(
    a: &[Value],
    b: &[Value],
    strategies: &Strategies,
    path: &mut Vec<PathKey>,
) -> Diff {
    if path.len() >= MAX_NESTING {
        return if a == b {
            Diff::new()
        } else {
            sequence::diff_sequences(a, b, &equal_only, |_, _| Diff::new())
        };
    }

    // All elements of one sequence share a policy in practice (patterns
    // address them with `*`), so the lookup uses a representative index.
    path.push(PathKey::Index(0));
    let mode = strategies.policy(path).compare;
    path.pop();

    let relation = move |x: &Value, y: &Value| element_relation(x, y, mode);
    sequence::diff_sequences(a, b, &relation, |a_index, b_index| {
        path.push(PathKey::Index(a_index));
        let diff = diff_matched(&a[a_index], &b[b_index], mode, strategies, path);
        path.pop();
        diff
    })
}

/// The default element relation: scalars pair only when equal; containers
/// pair when their kinds match; strings pair as text when a line policy is
/// in effect. Atomic elements never pair unequal.
fn element_relation(a: &Value, b: &Value, mode: CompareMode) -> Relation {
    if a == b {
        return Relation::Equal;
    }
    if mode == CompareMode::Atomic {
        return Relation::Unrelated;
    }

    match (a, b) {
        (Value::Object(_), Value::Object(_)) | (Value::Array(_), Value::Array(_)) => {
            Relation::Related
        }
        (Value::String(_), Value::String(_)) if mode == CompareMode::TextLines => Relation::Related,
        _ => Relation::Unrelated,
    }
}

fn equal_only(a: &Value, b: &Value) -> Relation {
    if a == b {
        Relation::Equal
    } else {
        Relation::Unrelated
    }
}

/// The nested diff for a matched (related) pair of sequence elements.
fn diff_matched(
    old: &Value,
    new: &Value,
    mode: CompareMode,
    strategies: &Strategies,
    path: &mut Vec<PathKey>,
) -> Diff {
    if old == new {
        return Diff::new();
    }

    match (old, new) {
        (Value::Object(old), Value::Object(new)) => diff_mappings(old, new, strategies, path),
        (Value::Array(old), Value::Array(new)) => diff_elements(old, new, strategies, path),
        (Value::String(old), Value::String(new)) if mode == CompareMode::TextLines => {
            text_diff(old, new)
        }
        _ => {
            debug_assert!(false, "only related pairs are matched");
            Diff::new()
        }
    }
}

/// Diff two strings as sequences of lines. Lines keep their terminators, so
/// applying the result reassembles the string by plain concatenation.
pub(crate) fn text_diff(a: &str, b: &str) -> Diff {
    let a_lines = split_lines(a);
    let b_lines = split_lines(b);
    sequence::diff_sequences(&a_lines, &b_lines, &equal_only, |_, _| Diff::new())
}
