//! Recorded edits and the operations they carry.

use crate::document::{Block, BlockKind, Document};
use crate::error::Result;

/// Identifies the edits applied in response to one event.
pub type GroupId = u64;

/// Which surface an edit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// The block tree (WYSIWYG) surface, or undo/redo.
    Structured,
    /// The raw Markdown text surface, via parse and diff.
    RawText,
}

/// One structural change, carrying enough state to be inverted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp {
    Insert { path: Vec<usize>, block: Block },
    /// `block` is the subtree that was removed.
    Delete { path: Vec<usize>, block: Block },
    ReplaceAttributes {
        path: Vec<usize>,
        before: BlockKind,
        after: BlockKind,
    },
    /// `new_children[i] = old_children[order[i]]`
    Reorder { parent: Vec<usize>, order: Vec<usize> },
}

impl EditOp {
    /// Apply this operation to `doc`, producing the next revision.
    ///
    /// # Errors
    /// Propagates [`crate::Error::InvalidPath`] and
    /// [`crate::Error::InvalidPermutation`] from the document.
    pub fn apply(&self, doc: &Document) -> Result<Document> {
        match self {
            Self::Insert { path, block } => doc.insert(path, block.clone()),
            Self::Delete { path, .. } => doc.delete(path).map(|(next, _)| next),
            Self::ReplaceAttributes { path, after, .. } => doc
                .replace_attributes(path, after.clone())
                .map(|(next, _)| next),
            Self::Reorder { parent, order } => doc.reorder(parent, order),
        }
    }

    /// The operation that undoes this one.
    #[must_use]
    pub fn inverse(&self) -> Self {
        match self {
            Self::Insert { path, block } => Self::Delete {
                path: path.clone(),
                block: block.clone(),
            },
            Self::Delete { path, block } => Self::Insert {
                path: path.clone(),
                block: block.clone(),
            },
            Self::ReplaceAttributes {
                path,
                before,
                after,
            } => Self::ReplaceAttributes {
                path: path.clone(),
                before: after.clone(),
                after: before.clone(),
            },
            Self::Reorder { parent, order } => Self::Reorder {
                parent: parent.clone(),
                order: invert_permutation(order),
            },
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Insert { .. } => "insert",
            Self::Delete { .. } => "delete",
            Self::ReplaceAttributes { .. } => "replace_attributes",
            Self::Reorder { .. } => "reorder",
        }
    }
}

/// A logged operation with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub op: EditOp,
    pub origin: Origin,
    /// Revision the operation produced when first applied.
    pub revision: u64,
    pub group: GroupId,
}

impl Edit {
    /// Undo this edit on `doc`.
    ///
    /// # Errors
    /// Fails if `doc` no longer has the shape this edit left behind.
    pub fn revert(&self, doc: &Document) -> Result<Document> {
        self.op.inverse().apply(doc)
    }

    /// Re-apply this edit on `doc`.
    ///
    /// # Errors
    /// Fails if `doc` does not have the shape this edit was recorded against.
    pub fn reapply(&self, doc: &Document) -> Result<Document> {
        self.op.apply(doc)
    }
}

pub(crate) fn invert_permutation(order: &[usize]) -> Vec<usize> {
    let mut inverse = vec![0; order.len()];
    for (i, &from) in order.iter().enumerate() {
        if let Some(slot) = inverse.get_mut(from) {
            *slot = i;
        }
    }
    inverse
}
