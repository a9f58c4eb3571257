//! A ready-made strategy table for Jupyter notebooks, plus notebook-flavored
//! entry points.
//!
//! The engine itself is schema-agnostic; everything notebook-specific lives
//! in the table below. Cell sources and textual outputs diff and merge line
//! by line, rich output payloads (base64 blobs, HTML) are opaque, and
//! execution counts are transient bookkeeping that never conflicts.

use serde_json::Value;

use crate::{
    diff::{Diff, diff_with_strategies},
    error::PatchError,
    merging::{MergeDecision, MergeOutcome, decide_merge_with_strategies, merge_with_strategies},
    strategies::{CompareMode, MergeMode, Policy, Strategies},
};

/// The strategy table applied by the notebook entry points.
#[must_use]
pub fn notebook_strategies() -> Strategies {
    Strategies::new()
        .with("/cells/*/source", Policy::compare(CompareMode::TextLines))
        .with(
            "/cells/*/outputs/*/text",
            Policy::compare(CompareMode::TextLines),
        )
        .with(
            "/cells/*/outputs/*/data/*",
            Policy::compare(CompareMode::Atomic),
        )
        .with(
            "/cells/*/attachments/*/*",
            Policy::compare(CompareMode::Atomic),
        )
        .with(
            "/cells/*/execution_count",
            Policy::merge(MergeMode::Ignore),
        )
}

/// Diff two notebooks under [`notebook_strategies`].
#[must_use]
pub fn diff_notebooks(a: &Value, b: &Value) -> Diff {
    diff_with_strategies(a, b, &notebook_strategies())
}

/// Compute merge decisions for two notebook revisions against their common
/// ancestor, under [`notebook_strategies`].
#[must_use]
pub fn decide_notebook_merge(base: &Value, local: &Value, remote: &Value) -> Vec<MergeDecision> {
    decide_merge_with_strategies(base, local, remote, &notebook_strategies())
}

/// Merge two notebook revisions and materialize the result, under
/// [`notebook_strategies`].
///
/// # Errors
///
/// Returns a [`PatchError`] when the resolved decisions do not fit the base
/// notebook; decisions computed by this call always fit.
pub fn merge_notebooks(
    base: &Value,
    local: &Value,
    remote: &Value,
) -> Result<MergeOutcome, PatchError> {
    merge_with_strategies(base, local, remote, &notebook_strategies())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::diff::DiffOp;

    fn notebook(cells: Vec<Value>) -> Value {
        json!({
            "nbformat": 4,
            "nbformat_minor": 5,
            "metadata": {},
            "cells": cells,
        })
    }

    fn code_cell(source: &str, execution_count: Value) -> Value {
        json!({
            "cell_type": "code",
            "execution_count": execution_count,
            "metadata": {},
            "outputs": [],
            "source": source,
        })
    }

    #[test]
    fn cell_sources_diff_line_by_line() {
        let a = notebook(vec![code_cell("x = 1\nprint(x)\n", json!(1))]);
        let b = notebook(vec![code_cell("x = 2\nprint(x)\n", json!(1))]);

        let diff = diff_notebooks(&a, &b);
        assert_eq!(
            diff.ops(),
            &[DiffOp::patch(
                "cells",
                Diff::from(DiffOp::patch(
                    0,
                    Diff::from(DiffOp::patch(
                        "source",
                        vec![
                            DiffOp::remove_range(0, 1),
                            DiffOp::add_range(1, vec![json!("x = 2\n")]),
                        ]
                        .into()
                    ))
                ))
            )]
        );
    }

    #[test]
    fn diverging_execution_counts_never_conflict() {
        let base = notebook(vec![code_cell("x = 1\n", json!(1))]);
        let local = notebook(vec![code_cell("x = 1\n", json!(2))]);
        let remote = notebook(vec![code_cell("x = 1\n", json!(5))]);

        let outcome = merge_notebooks(&base, &local, &remote).unwrap();
        assert!(!outcome.has_conflicts());
        assert_eq!(outcome.merged, base);
    }

    #[test]
    fn one_sided_execution_count_changes_keep_base() {
        let base = notebook(vec![code_cell("x = 1\n", json!(1))]);
        let local = notebook(vec![code_cell("x = 1\n", json!(2))]);

        let outcome = merge_notebooks(&base, &local, &base).unwrap();
        assert!(!outcome.has_conflicts());
        assert_eq!(outcome.merged, base);
    }

    #[test]
    fn edits_to_different_cells_merge_cleanly() {
        let base = notebook(vec![
            code_cell("a = 1\n", json!(1)),
            code_cell("b = 2\n", json!(2)),
        ]);
        let local = notebook(vec![
            code_cell("a = 10\n", json!(1)),
            code_cell("b = 2\n", json!(2)),
        ]);
        let remote = notebook(vec![
            code_cell("a = 1\n", json!(1)),
            code_cell("b = 20\n", json!(2)),
        ]);

        let outcome = merge_notebooks(&base, &local, &remote).unwrap();
        assert!(!outcome.has_conflicts());
        assert_eq!(
            outcome.merged,
            notebook(vec![
                code_cell("a = 10\n", json!(1)),
                code_cell("b = 20\n", json!(2)),
            ])
        );
    }

    #[test]
    fn rich_output_payloads_replace_wholesale() {
        let cell_with_data = |payload: &str| {
            json!({
                "cell_type": "code",
                "execution_count": 1,
                "metadata": {},
                "outputs": [{
                    "output_type": "execute_result",
                    "data": {"image/png": payload},
                    "metadata": {},
                }],
                "source": "plot()\n",
            })
        };
        let a = notebook(vec![cell_with_data("aWKBOR")]);
        let b = notebook(vec![cell_with_data("aXNOTHER")]);

        let diff = diff_notebooks(&a, &b);
        assert_eq!(
            diff.ops(),
            &[DiffOp::patch(
                "cells",
                Diff::from(DiffOp::patch(
                    0,
                    Diff::from(DiffOp::patch(
                        "outputs",
                        Diff::from(DiffOp::patch(
                            0,
                            Diff::from(DiffOp::patch(
                                "data",
                                Diff::from(DiffOp::replace("image/png", json!("aXNOTHER")))
                            ))
                        ))
                    ))
                ))
            )]
        );
    }
}
