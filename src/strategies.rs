//! The strategy adapter: an explicit policy table mapping path patterns to
//! comparison and merge behavior.
//!
//! The engine has no built-in knowledge of any document schema. A
//! document-type-aware caller (such as the notebook driver in
//! [`notebooks`](crate::notebooks)) supplies a table; the differ and merge
//! engine consult it at every path.

use crate::path::{PathKey, PathPattern};

/// How the values at a path are compared when diffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompareMode {
    /// Recurse into containers; the default.
    #[default]
    Recurse,
    /// Treat the value as an opaque blob: any change is a whole-value
    /// replace.
    Atomic,
    /// Diff strings at this path line by line, as a pseudo-sequence, so a
    /// one-line edit surfaces as a one-line diff.
    TextLines,
    /// Pretend the field never changes; it produces no diff ops at all.
    Ignore,
}

/// How concurrent changes to a path are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// Full three-way semantics; the default.
    #[default]
    Merge,
    /// Keep the base value, discarding both sides' changes, and never
    /// conflict.
    Ignore,
    /// Take the local change whenever local changed, and never conflict.
    UseLocal,
    /// Take the remote change whenever remote changed, and never conflict.
    UseRemote,
}

/// Comparison and merge policy for one path pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Policy {
    pub compare: CompareMode,
    pub merge: MergeMode,
}

impl Policy {
    #[must_use]
    pub const fn compare(mode: CompareMode) -> Self {
        Self {
            compare: mode,
            merge: MergeMode::Merge,
        }
    }

    #[must_use]
    pub const fn merge(mode: MergeMode) -> Self {
        Self {
            compare: CompareMode::Recurse,
            merge: mode,
        }
    }
}

/// An ordered policy table; the first matching pattern wins, and paths with
/// no match get the default policy (recurse, full merge).
///
/// ```
/// use reconcile_tree::{CompareMode, Policy, Strategies};
///
/// let strategies =
///     Strategies::new().with("/description", Policy::compare(CompareMode::TextLines));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Strategies {
    entries: Vec<(PathPattern, Policy)>,
}

impl Strategies {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pattern and its policy; builder-style.
    #[must_use]
    pub fn with(mut self, pattern: &str, policy: Policy) -> Self {
        self.insert(pattern, policy);
        self
    }

    /// Append a pattern and its policy.
    pub fn insert(&mut self, pattern: &str, policy: Policy) {
        self.entries.push((PathPattern::new(pattern), policy));
    }

    /// Look up the policy for a path.
    #[must_use]
    pub fn policy(&self, path: &[PathKey]) -> Policy {
        self.entries
            .iter()
            .find(|(pattern, _)| pattern.matches(path))
            .map(|(_, policy)| *policy)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn first_matching_pattern_wins() {
        let strategies = Strategies::new()
            .with("/a/*", Policy::compare(CompareMode::Atomic))
            .with("/a/b", Policy::compare(CompareMode::TextLines));

        let path = [PathKey::from("a"), PathKey::from("b")];
        assert_eq!(strategies.policy(&path).compare, CompareMode::Atomic);
    }

    #[test]
    fn unmatched_paths_get_the_default_policy() {
        let strategies = Strategies::new().with("/a", Policy::compare(CompareMode::Ignore));

        let path = [PathKey::from("elsewhere")];
        assert_eq!(strategies.policy(&path), Policy::default());
    }
}
