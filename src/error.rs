use thiserror::Error;

/// Error type for applying a diff, or a list of merge decisions, to a
/// document.
///
/// Applying an op whose addressed position is absent or of the wrong kind is
/// always fatal: patching blindly over mismatched data risks silent
/// corruption, so the applier never guesses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// The diff addresses a mapping key that the document does not contain.
    #[error("key {key:?} is not present in the mapping being patched")]
    MissingKey {
        /// The addressed mapping key
        key: String,
    },

    /// An insert op addresses a mapping key that already exists.
    #[error("key {key:?} already exists in the mapping being patched")]
    UnexpectedKey {
        /// The addressed mapping key
        key: String,
    },

    /// The diff addresses a sequence position past the end of the sequence.
    #[error("index {index} is out of bounds for a sequence of length {length}")]
    IndexOutOfBounds {
        /// The addressed sequence index
        index: usize,
        /// The length of the sequence being patched
        length: usize,
    },

    /// The document node at the addressed position has a different kind than
    /// the op requires.
    #[error("expected {expected} at the patched position but found {found}")]
    WrongKind {
        /// The kind the op can be applied to
        expected: &'static str,
        /// The kind actually found in the document
        found: &'static str,
    },

    /// An op was addressed at a container kind it cannot apply to, for
    /// example a string-keyed op on a sequence.
    #[error("a {op} op cannot address a position inside a {target}")]
    MisplacedOp {
        /// The op discriminant
        op: &'static str,
        /// The kind of the container being patched
        target: &'static str,
    },

    /// Two ops of one diff reference overlapping positions of the original
    /// sequence.
    #[error("ops overlap at index {index} of the original sequence")]
    OverlappingOps {
        /// The first original index claimed twice
        index: usize,
    },

    /// A whole-document replace (a `replace` op with a `null` key) appeared
    /// alongside other ops, or below the document root.
    #[error("a whole-document replace must be the only op of its diff")]
    MisplacedRootReplace,

    /// The diff nests deeper than the applier is willing to recurse.
    #[error("the diff nests deeper than the supported limit of {limit} levels")]
    NestingTooDeep {
        /// The recursion limit that was exceeded
        limit: usize,
    },
}
