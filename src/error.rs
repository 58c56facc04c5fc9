//! Error and warning types shared by the document, history and sync layers.

use std::fmt;

/// Specialized `Result` for document operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to the caller of a document or history operation.
///
/// None of these are fatal to an editing session: the document stays at its
/// last valid revision.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// An operation addressed a child index that does not exist, or tried to
    /// reach into the children of a leaf block.
    #[error("invalid block path {path:?}")]
    InvalidPath { path: Vec<usize> },

    /// A reorder did not name every child of the parent exactly once.
    #[error("order {order:?} is not a permutation of {len} children at {parent:?}")]
    InvalidPermutation {
        parent: Vec<usize>,
        order: Vec<usize>,
        len: usize,
    },

    /// A heading level outside 1-6.
    #[error("heading level {level} at {path:?} is outside 1-6")]
    InvalidHeadingLevel { path: Vec<usize>, level: u8 },

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,
}

impl Error {
    pub(crate) fn invalid_path(path: &[usize]) -> Self {
        Self::InvalidPath {
            path: path.to_vec(),
        }
    }

    /// True for the undo/redo boundary conditions.
    pub const fn is_boundary(&self) -> bool {
        matches!(self, Self::NothingToUndo | Self::NothingToRedo)
    }
}

/// Markdown construct that failed to parse and was kept as paragraph text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construct {
    CodeFence,
    Table,
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CodeFence => f.write_str("code fence"),
            Self::Table => f.write_str("table"),
        }
    }
}

/// Non-fatal parse warning: malformed input was normalized to plain text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: malformed {construct} kept as text ({reason})")]
pub struct ParseDegraded {
    /// One-based source line of the malformed construct.
    pub line: usize,
    pub construct: Construct,
    pub reason: String,
}
