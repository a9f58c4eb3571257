use serde_json::Value;

/// The three structural kinds a document node can take.
///
/// Documents are `serde_json::Value` trees; for diffing and merging only the
/// distinction between mappings, ordered sequences, and everything else
/// matters. Strings count as scalars unless a text policy diffs them as
/// lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Mapping,
    Sequence,
    Scalar,
}

impl Kind {
    /// The structural kind of a document node.
    #[must_use]
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => Kind::Mapping,
            Value::Array(_) => Kind::Sequence,
            _ => Kind::Scalar,
        }
    }

    /// Human-readable kind name, used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Kind::Mapping => "a mapping",
            Kind::Sequence => "a sequence",
            Kind::Scalar => "a scalar",
        }
    }
}

/// Split a string into lines, keeping the terminators, so that concatenating
/// the parts restores the original string exactly. An empty string has no
/// lines.
pub(crate) fn split_lines(text: &str) -> Vec<Value> {
    text.split_inclusive('\n')
        .map(|line| Value::String(line.to_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn kind_of_covers_all_shapes() {
        assert_eq!(Kind::of(&json!({})), Kind::Mapping);
        assert_eq!(Kind::of(&json!([])), Kind::Sequence);
        assert_eq!(Kind::of(&json!(null)), Kind::Scalar);
        assert_eq!(Kind::of(&json!(1.5)), Kind::Scalar);
        assert_eq!(Kind::of(&json!("text")), Kind::Scalar);
    }

    #[test]
    fn split_lines_round_trips_through_concatenation() {
        for text in ["", "one line", "a\nb\n", "a\nb", "\n\n"] {
            let lines = split_lines(text);
            let rejoined: String = lines
                .iter()
                .map(|line| line.as_str().unwrap())
                .collect();
            assert_eq!(rejoined, text);
        }
    }

    #[test]
    fn split_lines_counts() {
        assert_eq!(split_lines("").len(), 0);
        assert_eq!(split_lines("a").len(), 1);
        assert_eq!(split_lines("a\n").len(), 1);
        assert_eq!(split_lines("a\nb").len(), 2);
    }
}
