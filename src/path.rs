use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// One step into a document: a mapping key or a sequence index.
///
/// On the wire a step is either a plain string or a plain integer, so the
/// enum is serde-untagged.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(untagged)]
pub enum PathKey {
    Index(usize),
    Name(String),
}

impl PathKey {
    /// The mapping key, if this step addresses a mapping.
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            PathKey::Name(name) => Some(name),
            PathKey::Index(_) => None,
        }
    }

    /// The sequence index, if this step addresses a sequence.
    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            PathKey::Index(index) => Some(*index),
            PathKey::Name(_) => None,
        }
    }
}

impl From<&str> for PathKey {
    fn from(name: &str) -> Self {
        PathKey::Name(name.to_owned())
    }
}

impl From<String> for PathKey {
    fn from(name: String) -> Self {
        PathKey::Name(name)
    }
}

impl From<usize> for PathKey {
    fn from(index: usize) -> Self {
        PathKey::Index(index)
    }
}

impl Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKey::Name(name) => write!(f, "{name}"),
            PathKey::Index(index) => write!(f, "{index}"),
        }
    }
}

/// A pattern over document paths, used by the strategy table.
///
/// Segments are separated by `/` and matched one-to-one against path steps.
/// A `*` segment matches any single step; a literal segment matches a mapping
/// key of the same name, or a sequence index written in decimal.
///
/// ```
/// use reconcile_tree::{PathKey, PathPattern};
///
/// let pattern = PathPattern::new("/cells/*/source");
/// assert!(pattern.matches(&[
///     PathKey::from("cells"),
///     PathKey::from(3),
///     PathKey::from("source"),
/// ]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Any,
    Literal(String),
}

impl PathPattern {
    /// Parse a pattern. Leading and trailing slashes are ignored, so
    /// `/cells/*` and `cells/*` are the same pattern.
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                if segment == "*" {
                    Segment::Any
                } else {
                    Segment::Literal(segment.to_owned())
                }
            })
            .collect();

        Self { segments }
    }

    /// Whether the pattern matches the full path, segment for segment.
    #[must_use]
    pub fn matches(&self, path: &[PathKey]) -> bool {
        self.segments.len() == path.len()
            && self
                .segments
                .iter()
                .zip(path)
                .all(|(segment, key)| match segment {
                    Segment::Any => true,
                    Segment::Literal(literal) => match key {
                        PathKey::Name(name) => name == literal,
                        PathKey::Index(index) => literal.parse() == Ok(*index),
                    },
                })
    }
}
