//! The block model.
//!
//! This module handles:
//! - The block tree types ([`Block`], [`BlockKind`])
//! - [`Document`], an immutable revision of the tree
//! - Pure structural mutations that produce the next revision

mod ops;
mod types;

use std::sync::Arc;

pub use types::{Alignment, Block, BlockKind};

use crate::error::{Error, Result};

/// An immutable snapshot of the document tree at one revision.
///
/// The top-level sequence is shared behind an `Arc`, so cloning a document
/// (or taking a [`Document::snapshot`]) is cheap and a reader holding an old
/// revision is never affected by later edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    blocks: Arc<Vec<Block>>,
    revision: u64,
}

impl Document {
    /// The empty document at revision 0.
    pub fn empty() -> Self {
        Self::from_blocks(Vec::new())
    }

    /// Create a revision-0 document from an existing block sequence.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self {
            blocks: Arc::new(blocks),
            revision: 0,
        }
    }

    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// The top-level block sequence.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// A shared handle to the top-level sequence of this revision.
    pub fn snapshot(&self) -> Arc<Vec<Block>> {
        Arc::clone(&self.blocks)
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Look up the block at `path`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidPath`] if any index along the path is out of range.
    pub fn get(&self, path: &[usize]) -> Result<&Block> {
        ops::block_at(&self.blocks, path).ok_or_else(|| Error::invalid_path(path))
    }

    /// Children of the block at `parent`, or the top-level sequence for `[]`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidPath`] if the parent does not exist.
    pub fn children(&self, parent: &[usize]) -> Result<&[Block]> {
        if parent.is_empty() {
            return Ok(&self.blocks);
        }
        self.get(parent).map(|block| block.children.as_slice())
    }

    /// Insert `block` so that it ends up at `path`.
    ///
    /// The last index may equal the current child count (append).
    ///
    /// # Errors
    /// Returns [`Error::InvalidPath`] if the parent does not exist, is a leaf,
    /// or the index is past the end.
    pub fn insert(&self, path: &[usize], block: Block) -> Result<Self> {
        let (parent, index) = split_path(path)?;
        if let Some((relative, level)) = ops::invalid_heading(&block) {
            let mut path = path.to_vec();
            path.extend(relative);
            return Err(Error::InvalidHeadingLevel { path, level });
        }
        let mut blocks = self.clone_blocks();
        let siblings = ops::children_mut(&mut blocks, parent)
            .ok_or_else(|| Error::invalid_path(path))?;
        if index > siblings.len() {
            return Err(Error::invalid_path(path));
        }
        siblings.insert(index, block);
        Ok(self.next(blocks))
    }

    /// Remove the block at `path`, returning the new revision and the removed block.
    ///
    /// # Errors
    /// Returns [`Error::InvalidPath`] if there is no block at `path`.
    pub fn delete(&self, path: &[usize]) -> Result<(Self, Block)> {
        let (parent, index) = split_path(path)?;
        let mut blocks = self.clone_blocks();
        let siblings = ops::children_mut(&mut blocks, parent)
            .ok_or_else(|| Error::invalid_path(path))?;
        if index >= siblings.len() {
            return Err(Error::invalid_path(path));
        }
        let removed = siblings.remove(index);
        Ok((self.next(blocks), removed))
    }

    /// Replace the kind and attributes of the block at `path`, keeping its children.
    ///
    /// Returns the new revision and the previous kind.
    ///
    /// # Errors
    /// Returns [`Error::InvalidPath`] if there is no block at `path`, or if the
    /// new kind is a leaf while the block still has children.
    pub fn replace_attributes(&self, path: &[usize], kind: BlockKind) -> Result<(Self, BlockKind)> {
        if path.is_empty() {
            return Err(Error::invalid_path(path));
        }
        if let Some(level) = kind.invalid_heading_level() {
            return Err(Error::InvalidHeadingLevel {
                path: path.to_vec(),
                level,
            });
        }
        let mut blocks = self.clone_blocks();
        let block = ops::block_at_mut(&mut blocks, path).ok_or_else(|| Error::invalid_path(path))?;
        if kind.is_leaf() && !block.children.is_empty() {
            return Err(Error::invalid_path(path));
        }
        let previous = std::mem::replace(&mut block.kind, kind);
        Ok((self.next(blocks), previous))
    }

    /// Reorder the children of `parent` so that `new[i] = old[order[i]]`.
    ///
    /// An empty `parent` reorders the top-level sequence.
    ///
    /// # Errors
    /// Returns [`Error::InvalidPath`] if the parent does not exist and
    /// [`Error::InvalidPermutation`] if `order` is not a permutation of its children.
    pub fn reorder(&self, parent: &[usize], order: &[usize]) -> Result<Self> {
        let mut blocks = self.clone_blocks();
        let siblings = ops::children_mut(&mut blocks, parent)
            .ok_or_else(|| Error::invalid_path(parent))?;
        if !ops::is_permutation(order, siblings.len()) {
            return Err(Error::InvalidPermutation {
                parent: parent.to_vec(),
                order: order.to_vec(),
                len: siblings.len(),
            });
        }
        let old = std::mem::take(siblings);
        let mut slots: Vec<Option<Block>> = old.into_iter().map(Some).collect();
        siblings.extend(order.iter().filter_map(|&i| slots[i].take()));
        Ok(self.next(blocks))
    }

    fn clone_blocks(&self) -> Vec<Block> {
        self.blocks.as_ref().clone()
    }

    fn next(&self, blocks: Vec<Block>) -> Self {
        Self {
            blocks: Arc::new(blocks),
            revision: self.revision + 1,
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

fn split_path(path: &[usize]) -> Result<(&[usize], usize)> {
    path.split_last()
        .map(|(&index, parent)| (parent, index))
        .ok_or_else(|| Error::invalid_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        Document::from_blocks(vec![
            Block::heading(1, vec![Block::text("Title")]),
            Block::bullet_list(vec![
                Block::list_item(vec![Block::paragraph(vec![Block::text("one")])]),
                Block::list_item(vec![Block::paragraph(vec![Block::text("two")])]),
            ]),
        ])
    }

    #[test]
    fn test_empty_document() {
        let doc = Document::empty();
        assert!(doc.is_empty());
        assert_eq!(doc.revision(), 0);
    }

    #[test]
    fn test_get_nested_path() {
        let doc = sample();
        let item = doc.get(&[1, 1]).unwrap();
        assert_eq!(item.plain_text(), "two");
    }

    #[test]
    fn test_get_out_of_range_is_invalid_path() {
        let doc = sample();
        assert_eq!(doc.get(&[1, 5]), Err(Error::invalid_path(&[1, 5])));
        assert_eq!(doc.get(&[]), Err(Error::invalid_path(&[])));
    }

    #[test]
    fn test_insert_produces_new_revision_and_keeps_old() {
        let doc = sample();
        let item = Block::list_item(vec![Block::paragraph(vec![Block::text("new")])]);
        let next = doc.insert(&[1, 1], item).unwrap();

        assert_eq!(next.revision(), doc.revision() + 1);
        assert_eq!(next.get(&[1]).unwrap().children.len(), 3);
        assert_eq!(next.get(&[1, 1]).unwrap().plain_text(), "new");
        // The old revision is untouched.
        assert_eq!(doc.get(&[1]).unwrap().children.len(), 2);
    }

    #[test]
    fn test_insert_at_end_appends() {
        let doc = sample();
        let next = doc.insert(&[2], Block::leaf(BlockKind::ThematicBreak)).unwrap();
        assert_eq!(next.blocks().len(), 3);
    }

    #[test]
    fn test_insert_past_end_fails() {
        let doc = sample();
        let err = doc.insert(&[5], Block::text("x")).unwrap_err();
        assert_eq!(err, Error::invalid_path(&[5]));
    }

    #[test]
    fn test_insert_into_leaf_fails() {
        let doc = Document::from_blocks(vec![Block::code_block(None, "x")]);
        assert!(doc.insert(&[0, 0], Block::text("y")).is_err());
    }

    #[test]
    fn test_delete_returns_removed_block() {
        let doc = sample();
        let (next, removed) = doc.delete(&[0]).unwrap();
        assert_eq!(removed.plain_text(), "Title");
        assert_eq!(next.blocks().len(), 1);
        assert!(doc.delete(&[3]).is_err());
    }

    #[test]
    fn test_replace_attributes_keeps_children() {
        let doc = sample();
        let (next, previous) = doc
            .replace_attributes(&[0], BlockKind::Heading { level: 3 })
            .unwrap();
        assert_eq!(previous, BlockKind::Heading { level: 1 });
        assert_eq!(next.get(&[0]).unwrap().kind, BlockKind::Heading { level: 3 });
        assert_eq!(next.get(&[0]).unwrap().plain_text(), "Title");
    }

    #[test]
    fn test_replace_attributes_rejects_leaf_with_children() {
        let doc = sample();
        let err = doc
            .replace_attributes(&[0], BlockKind::ThematicBreak)
            .unwrap_err();
        assert_eq!(err, Error::invalid_path(&[0]));
    }

    #[test]
    fn test_heading_level_outside_range_is_rejected() {
        let doc = sample();
        let err = doc
            .replace_attributes(&[0], BlockKind::Heading { level: 9 })
            .unwrap_err();
        assert_eq!(
            err,
            Error::InvalidHeadingLevel {
                path: vec![0],
                level: 9
            }
        );
        assert!(doc.replace_attributes(&[0], BlockKind::Heading { level: 0 }).is_err());

        let quote = Block::blockquote(vec![
            Block::paragraph(vec![Block::text("intro")]),
            Block::heading(7, vec![Block::text("deep")]),
        ]);
        let err = doc.insert(&[2], quote).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidHeadingLevel {
                path: vec![2, 1],
                level: 7
            }
        );
        assert_eq!(doc.blocks().len(), 2);
    }

    #[test]
    fn test_reorder_children() {
        let doc = sample();
        let next = doc.reorder(&[1], &[1, 0]).unwrap();
        assert_eq!(next.get(&[1, 0]).unwrap().plain_text(), "two");
        assert_eq!(next.get(&[1, 1]).unwrap().plain_text(), "one");
    }

    #[test]
    fn test_reorder_top_level() {
        let doc = sample();
        let next = doc.reorder(&[], &[1, 0]).unwrap();
        assert!(matches!(next.blocks()[1].kind, BlockKind::Heading { .. }));
    }

    #[test]
    fn test_reorder_rejects_non_permutation() {
        let doc = sample();
        let err = doc.reorder(&[1], &[0, 0]).unwrap_err();
        assert!(matches!(err, Error::InvalidPermutation { len: 2, .. }));
        assert!(doc.reorder(&[1], &[0]).is_err());
    }

    #[test]
    fn test_snapshot_survives_later_revisions() {
        let doc = sample();
        let snapshot = doc.snapshot();
        let (next, _) = doc.delete(&[1]).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(next.blocks().len(), 1);
    }
}
