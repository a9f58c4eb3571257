//! The patch applier: the algorithmic inverse of the differ.
//!
//! Sequence ops address positions of the *original* sequence. The applier
//! walks the op list front to back with a cursor into the original elements,
//! so earlier insertions and deletions never shift the positions of later
//! ops. Any op whose target is absent or of the wrong kind is a fatal
//! [`PatchError`].

use serde_json::{Map, Value};

use crate::{
    diff::{Diff, DiffOp},
    error::PatchError,
    path::PathKey,
    value::{Kind, split_lines},
};

/// How deep the applier will recurse into nested patch ops. Documents of
/// practical interest nest far shallower; the limit guards against
/// adversarial diffs from the wire.
const MAX_NESTING: usize = 192;

/// Apply `diff` to `base`, producing the patched document.
///
/// This is the inverse of [`diff`](crate::diff): for documents of matching
/// root kind, `apply_patch(&a, &diff(&a, &b)) == b`, and applying an empty
/// diff returns `base` unchanged.
///
/// # Errors
///
/// Returns a [`PatchError`] when an op addresses a missing key, an
/// out-of-bounds index, or a node of the wrong kind. The applier never
/// guesses: a diff that does not fit the document is a fatal mismatch.
pub fn apply_patch(base: &Value, diff: &Diff) -> Result<Value, PatchError> {
    apply_at(base, diff, 0)
}

fn apply_at(base: &Value, diff: &Diff, depth: usize) -> Result<Value, PatchError> {
    if depth > MAX_NESTING {
        return Err(PatchError::NestingTooDeep { limit: MAX_NESTING });
    }
    if diff.is_empty() {
        return Ok(base.clone());
    }

    // The whole-document replacement has no addressable position; it stands
    // alone or not at all.
    if let [DiffOp::Replace { key: None, value }] = diff.ops() {
        return Ok(value.clone());
    }
    if diff.iter().any(DiffOp::is_root_replace) {
        return Err(PatchError::MisplacedRootReplace);
    }

    match base {
        Value::Object(mapping) => patch_mapping(mapping, diff, depth).map(Value::Object),
        Value::Array(elements) => patch_elements(elements, diff, depth).map(Value::Array),
        Value::String(text) => patch_text(text, diff, depth).map(Value::String),
        other => Err(PatchError::WrongKind {
            expected: "a mapping, a sequence or a string",
            found: Kind::of(other).name(),
        }),
    }
}

fn patch_mapping(
    mapping: &Map<String, Value>,
    diff: &Diff,
    depth: usize,
) -> Result<Map<String, Value>, PatchError> {
    let mut patched = mapping.clone();

    for op in diff {
        match op {
            DiffOp::Insert {
                key: PathKey::Name(key),
                value,
            } => {
                if patched.contains_key(key) {
                    return Err(PatchError::UnexpectedKey { key: key.clone() });
                }
                patched.insert(key.clone(), value.clone());
            }
            DiffOp::Delete {
                key: PathKey::Name(key),
            } => {
                if patched.shift_remove(key).is_none() {
                    return Err(PatchError::MissingKey { key: key.clone() });
                }
            }
            DiffOp::Replace {
                key: Some(PathKey::Name(key)),
                value,
            } => {
                let target = patched
                    .get_mut(key)
                    .ok_or_else(|| PatchError::MissingKey { key: key.clone() })?;
                *target = value.clone();
            }
            DiffOp::Patch {
                key: PathKey::Name(key),
                diff,
            } => {
                let child = patched
                    .get(key)
                    .ok_or_else(|| PatchError::MissingKey { key: key.clone() })?;
                let child = apply_at(child, diff, depth + 1)?;
                patched.insert(key.clone(), child);
            }
            other => {
                return Err(PatchError::MisplacedOp {
                    op: other.name(),
                    target: "mapping",
                });
            }
        }
    }

    Ok(patched)
}

fn patch_elements(
    elements: &[Value],
    diff: &Diff,
    depth: usize,
) -> Result<Vec<Value>, PatchError> {
    let length = elements.len();
    let mut patched = Vec::with_capacity(length);

    // Next original index not yet copied or consumed.
    let mut cursor = 0;

    for op in diff {
        let at = op.base_index().ok_or_else(|| PatchError::MisplacedOp {
            op: op.name(),
            target: "sequence",
        })?;
        if at < cursor {
            return Err(PatchError::OverlappingOps { index: at });
        }
        if at > length {
            return Err(PatchError::IndexOutOfBounds { index: at, length });
        }
        patched.extend_from_slice(&elements[cursor..at]);
        cursor = at;

        match op {
            DiffOp::AddRange { values, .. } => patched.extend_from_slice(values),
            DiffOp::Insert { value, .. } => patched.push(value.clone()),
            DiffOp::RemoveRange { length: count, .. } => {
                let end = at.checked_add(*count).filter(|end| *end <= length).ok_or(
                    PatchError::IndexOutOfBounds {
                        index: at + count.saturating_sub(1),
                        length,
                    },
                )?;
                cursor = end;
            }
            DiffOp::Delete { .. } => {
                ensure_element(at, length)?;
                cursor = at + 1;
            }
            DiffOp::Replace { value, .. } => {
                ensure_element(at, length)?;
                patched.push(value.clone());
                cursor = at + 1;
            }
            DiffOp::Patch { diff, .. } => {
                ensure_element(at, length)?;
                patched.push(apply_at(&elements[at], diff, depth + 1)?);
                cursor = at + 1;
            }
            DiffOp::PatchRange { diffs, .. } => {
                let end = at.checked_add(diffs.len()).filter(|end| *end <= length).ok_or(
                    PatchError::IndexOutOfBounds {
                        index: at + diffs.len().saturating_sub(1),
                        length,
                    },
                )?;
                for (offset, child_diff) in diffs.iter().enumerate() {
                    patched.push(apply_at(&elements[at + offset], child_diff, depth + 1)?);
                }
                cursor = end;
            }
        }
    }

    patched.extend_from_slice(&elements[cursor..]);
    Ok(patched)
}

fn ensure_element(index: usize, length: usize) -> Result<(), PatchError> {
    if index < length {
        Ok(())
    } else {
        Err(PatchError::IndexOutOfBounds { index, length })
    }
}

/// Patch a string through its line pseudo-sequence.
fn patch_text(text: &str, diff: &Diff, depth: usize) -> Result<String, PatchError> {
    let lines = split_lines(text);
    let patched = patch_elements(&lines, diff, depth)?;

    let mut assembled = String::new();
    for line in &patched {
        match line {
            Value::String(line) => assembled.push_str(line),
            other => {
                return Err(PatchError::WrongKind {
                    expected: "a string line",
                    found: Kind::of(other).name(),
                });
            }
        }
    }
    Ok(assembled)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_case::test_case;

    use super::*;
    use crate::diff::diff;

    #[test]
    fn empty_diff_is_identity() {
        let doc = json!({"a": [1, 2, {"b": null}]});
        assert_eq!(apply_patch(&doc, &Diff::new()).unwrap(), doc);
    }

    #[test_case(
        json!({"foo": [1, 2, 3], "bar": {"ting": 7, "tang": 123}}),
        json!({"foo": [1, 3, 4], "bar": {"tang": 126, "hello": "world"}});
        "object scenario"
    )]
    #[test_case(json!([2, 3, 4]), json!([1, 2, 4, 6]); "array scenario")]
    #[test_case(json!({}), json!({"k": [1, [2, {"x": "y"}]]}); "growing from empty")]
    #[test_case(json!([[1], [2]]), json!([[2], [1]]); "swapped nested")]
    #[test_case(json!("a\nb\nc\n"), json!("a\nx\nc\n"); "string root")]
    #[test_case(json!({"n": 1}), json!({"n": 1}); "equal documents")]
    fn applying_a_diff_reproduces_the_target(a: Value, b: Value) {
        let d = diff(&a, &b);
        assert_eq!(apply_patch(&a, &d).unwrap(), b);
    }

    #[test]
    fn missing_key_is_fatal() {
        let base = json!({"a": 1});
        let d = Diff::from(DiffOp::replace("b", json!(2)));
        assert_eq!(
            apply_patch(&base, &d),
            Err(PatchError::MissingKey { key: "b".into() })
        );
    }

    #[test]
    fn inserting_an_existing_key_is_fatal() {
        let base = json!({"a": 1});
        let d = Diff::from(DiffOp::insert("a", json!(2)));
        assert_eq!(
            apply_patch(&base, &d),
            Err(PatchError::UnexpectedKey { key: "a".into() })
        );
    }

    #[test]
    fn out_of_bounds_index_is_fatal() {
        let base = json!([1, 2]);
        let d = Diff::from(DiffOp::remove_range(1, 4));
        assert_eq!(
            apply_patch(&base, &d),
            Err(PatchError::IndexOutOfBounds { index: 4, length: 2 })
        );
    }

    #[test]
    fn mapping_op_on_a_sequence_is_fatal() {
        let base = json!([1, 2]);
        let d = Diff::from(DiffOp::delete("a"));
        assert_eq!(
            apply_patch(&base, &d),
            Err(PatchError::MisplacedOp {
                op: "delete",
                target: "sequence"
            })
        );
    }

    #[test]
    fn overlapping_sequence_ops_are_fatal() {
        let base = json!([1, 2, 3]);
        let d: Diff = vec![DiffOp::remove_range(0, 2), DiffOp::delete(1)].into();
        assert_eq!(
            apply_patch(&base, &d),
            Err(PatchError::OverlappingOps { index: 1 })
        );
    }

    #[test]
    fn root_replace_applies_to_any_root() {
        let d = Diff::from(DiffOp::replace_root(json!({"fresh": true})));
        assert_eq!(
            apply_patch(&json!(17), &d).unwrap(),
            json!({"fresh": true})
        );
    }

    #[test]
    fn root_replace_must_stand_alone() {
        let d: Diff = vec![
            DiffOp::replace_root(json!(1)),
            DiffOp::insert("a", json!(2)),
        ]
        .into();
        assert_eq!(
            apply_patch(&json!({}), &d),
            Err(PatchError::MisplacedRootReplace)
        );
    }

    #[test]
    fn sequence_insertion_order_is_preserved_at_a_boundary() {
        let base = json!([1, 9]);
        let d: Diff = vec![
            DiffOp::add_range(1, vec![json!(2)]),
            DiffOp::add_range(1, vec![json!(7)]),
        ]
        .into();
        assert_eq!(apply_patch(&base, &d).unwrap(), json!([1, 2, 7, 9]));
    }

    #[test]
    fn patchrange_patches_a_contiguous_run() {
        let base = json!([{"n": 1}, {"n": 2}, {"n": 3}]);
        let d = Diff::from(DiffOp::patch_range(
            1,
            vec![
                Diff::from(DiffOp::replace("n", json!(20))),
                Diff::from(DiffOp::replace("n", json!(30))),
            ],
        ));
        assert_eq!(
            apply_patch(&base, &d).unwrap(),
            json!([{"n": 1}, {"n": 20}, {"n": 30}])
        );
    }

    #[test]
    fn patching_a_scalar_is_fatal() {
        let d = Diff::from(DiffOp::replace("a", json!(1)));
        assert_eq!(
            apply_patch(&json!(true), &d),
            Err(PatchError::WrongKind {
                expected: "a mapping, a sequence or a string",
                found: "a scalar"
            })
        );
    }
}
