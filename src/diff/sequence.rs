//! Alignment of two ordered sequences.
//!
//! A full O(n·m) LCS table with an explicit backtrace, rather than a
//! divide-and-conquer diff: compared documents are bounded (notebook-sized),
//! and the table makes the deterministic tie-break order easy to state
//! directly. Among equal-cost alignments the backtrace prefers, in order:
//! an equal match (which maximizes the matched prefix and matches elements
//! left-to-right greedily), a deletion, an insertion, and only then a
//! related-but-unequal match. The result is stable and reproducible for
//! identical inputs.

use serde_json::Value;

use super::op::{Diff, DiffOp};

/// Relationship between two sequence elements, as judged by the pluggable
/// comparison predicate.
///
/// `Related` elements are unequal but diffable as the same kind, so the
/// aligner may pair them up and express the difference as a nested patch.
/// `Unrelated` elements never pair: one is deleted, the other inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Equal,
    Related,
    Unrelated,
}

/// One step of an alignment between sequences `a` and `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AlignStep {
    /// `a[a_index]` corresponds to `b[b_index]` (equal or related).
    Match { a_index: usize, b_index: usize },
    /// `a[a_index]` has no counterpart and is removed.
    Delete { a_index: usize },
    /// `b[b_index]` has no counterpart and is inserted.
    Insert { b_index: usize },
}

/// Compute the deterministic minimal alignment between `a` and `b` under the
/// given element relation.
pub(crate) fn align(
    a: &[Value],
    b: &[Value],
    relation: &dyn Fn(&Value, &Value) -> Relation,
) -> Vec<AlignStep> {
    let n = a.len();
    let m = b.len();

    // The relation can be expensive (it may compare whole subtrees), so it
    // is evaluated once per pair and reused by the backtrace.
    let mut relations = vec![Relation::Unrelated; n * m];
    for i in 0..n {
        for j in 0..m {
            relations[i * m + j] = relation(&a[i], &b[j]);
        }
    }

    // matched[i][j] = the maximal number of matched pairs when aligning
    // a[i..] with b[j..], flattened row-major over (n + 1) x (m + 1).
    let width = m + 1;
    let mut matched = vec![0_usize; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            let mut best = matched[(i + 1) * width + j].max(matched[i * width + j + 1]);
            if relations[i * m + j] != Relation::Unrelated {
                best = best.max(matched[(i + 1) * width + j + 1] + 1);
            }
            matched[i * width + j] = best;
        }
    }

    let mut steps = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        let here = matched[i * width + j];
        let relation = relations[i * m + j];
        let pairable =
            relation != Relation::Unrelated && here == matched[(i + 1) * width + j + 1] + 1;

        if pairable && relation == Relation::Equal {
            steps.push(AlignStep::Match {
                a_index: i,
                b_index: j,
            });
            i += 1;
            j += 1;
        } else if here == matched[(i + 1) * width + j] {
            steps.push(AlignStep::Delete { a_index: i });
            i += 1;
        } else if here == matched[i * width + j + 1] {
            steps.push(AlignStep::Insert { b_index: j });
            j += 1;
        } else {
            debug_assert!(pairable, "the LCS table admits no other move");
            steps.push(AlignStep::Match {
                a_index: i,
                b_index: j,
            });
            i += 1;
            j += 1;
        }
    }
    while i < n {
        steps.push(AlignStep::Delete { a_index: i });
        i += 1;
    }
    while j < m {
        steps.push(AlignStep::Insert { b_index: j });
        j += 1;
    }

    steps
}

/// Produce the coalesced op script transforming `a` into `b`.
///
/// Unit steps from [`align`] are batched: contiguous deletions become one
/// `removerange`, insertions at a shared boundary become one `addrange`, and
/// runs of two or more adjacent element patches become one `patchrange`.
/// `sub_diff(a_index, b_index)` supplies the nested diff for a matched pair;
/// an empty sub-diff means the pair needs no op at all.
pub(crate) fn diff_sequences(
    a: &[Value],
    b: &[Value],
    relation: &dyn Fn(&Value, &Value) -> Relation,
    mut sub_diff: impl FnMut(usize, usize) -> Diff,
) -> Diff {
    let steps = align(a, b, relation);
    let mut ops: Vec<DiffOp> = Vec::new();

    // Index into `a` of the next element not yet accounted for; insertions
    // are anchored at this position.
    let mut cursor = 0;
    let mut index = 0;
    while index < steps.len() {
        match steps[index] {
            AlignStep::Delete { a_index } => {
                let start = a_index;
                let mut length = 0;
                while let Some(AlignStep::Delete { a_index }) = steps.get(index).copied() {
                    debug_assert_eq!(a_index, start + length);
                    length += 1;
                    index += 1;
                }
                ops.push(DiffOp::remove_range(start, length));
                cursor = start + length;
            }
            AlignStep::Insert { .. } => {
                let mut values = Vec::new();
                while let Some(AlignStep::Insert { b_index }) = steps.get(index).copied() {
                    values.push(b[b_index].clone());
                    index += 1;
                }
                ops.push(DiffOp::add_range(cursor, values));
            }
            AlignStep::Match { a_index, b_index } => {
                let diff = sub_diff(a_index, b_index);
                if diff.is_empty() {
                    index += 1;
                    cursor = a_index + 1;
                    continue;
                }

                let start = a_index;
                let mut diffs = vec![diff];
                index += 1;
                while let Some(AlignStep::Match { a_index, b_index }) = steps.get(index).copied() {
                    if a_index != start + diffs.len() {
                        break;
                    }
                    let next = sub_diff(a_index, b_index);
                    if next.is_empty() {
                        break;
                    }
                    diffs.push(next);
                    index += 1;
                }

                if diffs.len() == 1 {
                    let diff = diffs.pop().unwrap_or_default();
                    ops.push(DiffOp::patch(start, diff));
                    cursor = start + 1;
                } else {
                    cursor = start + diffs.len();
                    ops.push(DiffOp::patch_range(start, diffs));
                }
            }
        }
    }

    ops.into()
}
