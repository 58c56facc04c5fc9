//! The structured block tree pane.

use std::sync::Arc;

use crate::document::{Block, BlockKind};
use crate::error::{Error, Result};
use crate::sync::{Effect, Message, StructuredEdit};

/// A heading in the outline of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingRef {
    /// Heading level (1-6)
    pub level: u8,
    /// Heading text (plain, no formatting)
    pub text: String,
    pub path: Vec<usize>,
}

/// The block tree surface: a read-only snapshot of one revision plus
/// builders for structured edit messages.
#[derive(Debug, Clone, Default)]
pub struct TreeView {
    blocks: Arc<Vec<Block>>,
    revision: u64,
}

impl TreeView {
    pub fn new(blocks: Arc<Vec<Block>>, revision: u64) -> Self {
        Self { blocks, revision }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply a session effect. Returns `true` if the snapshot changed.
    pub fn apply(&mut self, effect: &Effect) -> bool {
        match effect {
            Effect::PublishTree { revision, blocks } if *revision >= self.revision => {
                self.revision = *revision;
                self.blocks = Arc::clone(blocks);
                true
            }
            _ => false,
        }
    }

    /// Headings in document order, including those nested in quotes and lists.
    pub fn outline(&self) -> Vec<HeadingRef> {
        let mut headings = Vec::new();
        let mut path = Vec::new();
        collect_headings(&self.blocks, &mut path, &mut headings);
        headings
    }

    pub fn insert(path: &[usize], block: Block) -> Message {
        Message::Structured(StructuredEdit::Insert {
            path: path.to_vec(),
            block,
        })
    }

    pub fn delete(path: &[usize]) -> Message {
        Message::Structured(StructuredEdit::Delete {
            path: path.to_vec(),
        })
    }

    pub fn set_kind(path: &[usize], kind: BlockKind) -> Message {
        Message::Structured(StructuredEdit::ReplaceAttributes {
            path: path.to_vec(),
            kind,
        })
    }

    /// A reorder message moving child `from` of `parent` to position `to`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidPath`] if `parent` is not in this snapshot or
    /// either index is out of range.
    pub fn move_child(&self, parent: &[usize], from: usize, to: usize) -> Result<Message> {
        let len = self.children(parent)?.len();
        if from >= len || to >= len {
            let mut path = parent.to_vec();
            path.push(from.max(to));
            return Err(Error::InvalidPath { path });
        }
        let mut order: Vec<usize> = (0..len).collect();
        let moved = order.remove(from);
        order.insert(to, moved);
        Ok(Message::Structured(StructuredEdit::Reorder {
            parent: parent.to_vec(),
            order,
        }))
    }

    fn children(&self, parent: &[usize]) -> Result<&[Block]> {
        let mut children = self.blocks.as_slice();
        for &index in parent {
            children = children
                .get(index)
                .map(|block| block.children.as_slice())
                .ok_or_else(|| Error::invalid_path(parent))?;
        }
        Ok(children)
    }
}

fn collect_headings(blocks: &[Block], path: &mut Vec<usize>, out: &mut Vec<HeadingRef>) {
    for (idx, block) in blocks.iter().enumerate() {
        path.push(idx);
        match block.kind {
            BlockKind::Heading { level } => out.push(HeadingRef {
                level,
                text: block.plain_text(),
                path: path.clone(),
            }),
            BlockKind::Blockquote | BlockKind::List { .. } | BlockKind::ListItem => {
                collect_headings(&block.children, path, out);
            }
            _ => {}
        }
        path.pop();
    }
}
