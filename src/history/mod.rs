//! Edit history.
//!
//! Every change to a [`Document`] is recorded as an [`Edit`] in an
//! [`EditLog`]. The log keeps a cursor: edits before it are applied, edits
//! after it form the redo tail. Replaying the applied edits from the empty
//! document reproduces the current blocks.

mod edit;

pub use edit::{Edit, EditOp, GroupId, Origin};

use crate::document::Document;
use crate::error::{Error, Result};

/// Ordered edits plus an undo/redo cursor.
#[derive(Debug, Clone, Default)]
pub struct EditLog {
    edits: Vec<Edit>,
    cursor: usize,
    next_group: GroupId,
}

impl EditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a group id for the edits of one event.
    pub fn begin_group(&mut self) -> GroupId {
        let group = self.next_group;
        self.next_group += 1;
        group
    }

    /// Record an edit and advance the cursor, discarding any redo tail.
    pub fn append(&mut self, edit: Edit) {
        if self.cursor < self.edits.len() {
            tracing::debug!(
                dropped = self.edits.len() - self.cursor,
                "history: truncating redo tail"
            );
            self.edits.truncate(self.cursor);
        }
        self.edits.push(edit);
        self.cursor = self.edits.len();
    }

    /// Step the cursor back, returning the edit to invert.
    ///
    /// # Errors
    /// Returns [`Error::NothingToUndo`] at the start of the log.
    pub fn undo(&mut self) -> Result<Edit> {
        if self.cursor == 0 {
            return Err(Error::NothingToUndo);
        }
        self.cursor -= 1;
        Ok(self.edits[self.cursor].clone())
    }

    /// Step the cursor forward, returning the edit to reapply.
    ///
    /// # Errors
    /// Returns [`Error::NothingToRedo`] when there is no redo tail.
    pub fn redo(&mut self) -> Result<Edit> {
        let edit = self.edits.get(self.cursor).cloned().ok_or(Error::NothingToRedo)?;
        self.cursor += 1;
        Ok(edit)
    }

    /// Undo every edit sharing the group of the last applied edit.
    ///
    /// Edits come back newest first, the order they must be inverted in.
    ///
    /// # Errors
    /// Returns [`Error::NothingToUndo`] at the start of the log.
    pub fn undo_group(&mut self) -> Result<Vec<Edit>> {
        let first = self.undo()?;
        let group = first.group;
        let mut edits = vec![first];
        while self.cursor > 0 && self.edits[self.cursor - 1].group == group {
            edits.push(self.undo()?);
        }
        Ok(edits)
    }

    /// Redo every edit sharing the group of the next redo edit, oldest first.
    ///
    /// # Errors
    /// Returns [`Error::NothingToRedo`] when there is no redo tail.
    pub fn redo_group(&mut self) -> Result<Vec<Edit>> {
        let first = self.redo()?;
        let group = first.group;
        let mut edits = vec![first];
        while self.edits.get(self.cursor).is_some_and(|e| e.group == group) {
            edits.push(self.redo()?);
        }
        Ok(edits)
    }

    /// Move the cursor back after a failed undo or redo.
    pub(crate) fn restore_cursor(&mut self, cursor: usize) {
        self.cursor = cursor.min(self.edits.len());
    }

    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    pub const fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.edits.len()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Edits before the cursor.
    pub fn applied(&self) -> &[Edit] {
        &self.edits[..self.cursor]
    }

    /// Rebuild the document by applying every applied edit to the empty document.
    ///
    /// # Errors
    /// Fails only if the log is inconsistent with itself.
    pub fn replay(&self) -> Result<Document> {
        self.applied()
            .iter()
            .try_fold(Document::empty(), |doc, edit| edit.reapply(&doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Block, BlockKind};

    fn para(text: &str) -> Block {
        Block::paragraph(vec![Block::text(text)])
    }

    /// Apply `op` to `doc` and record it, returning the new document.
    fn record(log: &mut EditLog, doc: &Document, op: EditOp, group: GroupId) -> Document {
        let next = op.apply(doc).unwrap();
        log.append(Edit {
            op,
            origin: Origin::Structured,
            revision: next.revision(),
            group,
        });
        next
    }

    fn insert(path: &[usize], block: Block) -> EditOp {
        EditOp::Insert {
            path: path.to_vec(),
            block,
        }
    }

    #[test]
    fn test_empty_log_boundaries() {
        let mut log = EditLog::new();
        assert_eq!(log.undo(), Err(Error::NothingToUndo));
        assert_eq!(log.redo(), Err(Error::NothingToRedo));
        assert!(log.undo_group().is_err());
        assert!(log.replay().unwrap().is_empty());
    }

    #[test]
    fn test_undo_redo_moves_cursor() {
        let mut log = EditLog::new();
        let doc = Document::empty();
        let g = log.begin_group();
        let doc = record(&mut log, &doc, insert(&[0], para("a")), g);
        let g = log.begin_group();
        let doc = record(&mut log, &doc, insert(&[1], para("b")), g);

        let edit = log.undo().unwrap();
        assert_eq!(edit.op.name(), "insert");
        let doc = edit.revert(&doc).unwrap();
        assert_eq!(doc.blocks(), &[para("a")]);
        assert_eq!(log.cursor(), 1);
        assert!(log.can_redo());

        let edit = log.redo().unwrap();
        let doc = edit.reapply(&doc).unwrap();
        assert_eq!(doc.blocks().len(), 2);
        assert_eq!(log.redo(), Err(Error::NothingToRedo));
    }

    #[test]
    fn test_append_truncates_redo_tail() {
        let mut log = EditLog::new();
        let doc = Document::empty();
        let doc = record(&mut log, &doc, insert(&[0], para("a")), 0);
        let doc = record(&mut log, &doc, insert(&[1], para("b")), 1);
        let edit = log.undo().unwrap();
        let doc = edit.revert(&doc).unwrap();

        let doc = record(&mut log, &doc, insert(&[1], para("c")), 2);
        assert_eq!(log.len(), 2);
        assert!(!log.can_redo());
        assert_eq!(log.replay().unwrap().blocks(), doc.blocks());
    }

    #[test]
    fn test_group_undo_and_redo() {
        let mut log = EditLog::new();
        let doc = Document::empty();
        let load = log.begin_group();
        let doc = record(&mut log, &doc, insert(&[0], para("a")), load);
        let doc = record(&mut log, &doc, insert(&[1], para("b")), load);
        let edit_group = log.begin_group();
        let doc = record(
            &mut log,
            &doc,
            EditOp::ReplaceAttributes {
                path: vec![0],
                before: BlockKind::Paragraph,
                after: BlockKind::Heading { level: 1 },
            },
            edit_group,
        );

        let undone = log.undo_group().unwrap();
        assert_eq!(undone.len(), 1);
        let doc = undone.iter().try_fold(doc, |d, e| e.revert(&d)).unwrap();

        let undone = log.undo_group().unwrap();
        assert_eq!(undone.len(), 2);
        assert_eq!(undone[0].op.name(), "insert");
        let doc = undone.iter().try_fold(doc, |d, e| e.revert(&d)).unwrap();
        assert!(doc.is_empty());

        let redone = log.redo_group().unwrap();
        assert_eq!(redone.len(), 2);
        let doc = redone.iter().try_fold(doc, |d, e| e.reapply(&d)).unwrap();
        assert_eq!(doc.blocks(), &[para("a"), para("b")]);
    }

    #[test]
    fn test_replay_matches_after_undo() {
        let mut log = EditLog::new();
        let doc = Document::empty();
        let doc = record(&mut log, &doc, insert(&[0], para("a")), 0);
        let doc = record(
            &mut log,
            &doc,
            EditOp::Reorder {
                parent: vec![0],
                order: vec![0],
            },
            1,
        );
        let edit = log.undo().unwrap();
        let doc = edit.revert(&doc).unwrap();
        assert_eq!(log.replay().unwrap().blocks(), doc.blocks());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        /// Turn a random `(kind, a, b)` triple into an op valid for `doc`.
        fn op_for(doc: &Document, kind: u8, a: usize, b: usize) -> Option<EditOp> {
            let len = doc.blocks().len();
            match kind % 5 {
                0 => Some(insert(&[a % (len + 1)], para(&format!("p{b}")))),
                1 if len > 0 => {
                    let path = vec![a % len];
                    let block = doc.get(&path).ok()?.clone();
                    Some(EditOp::Delete { path, block })
                }
                2 if len > 0 => {
                    let path = vec![a % len];
                    let before = doc.get(&path).ok()?.kind.clone();
                    let after = BlockKind::Heading {
                        level: u8::try_from(b % 6).ok()? + 1,
                    };
                    Some(EditOp::ReplaceAttributes { path, before, after })
                }
                3 if len > 1 => {
                    let shift = b % len;
                    let order = (0..len).map(|i| (i + shift) % len).collect();
                    Some(EditOp::Reorder {
                        parent: vec![],
                        order,
                    })
                }
                4 if len > 0 => {
                    let parent = a % len;
                    let count = doc.get(&[parent]).ok()?.children.len();
                    Some(insert(&[parent, b % (count + 1)], Block::text("x")))
                }
                _ => None,
            }
        }

        proptest! {
            #[test]
            fn prop_apply_then_undo_restores_blocks(
                steps in prop::collection::vec((any::<u8>(), any::<usize>(), any::<usize>()), 0..40)
            ) {
                let initial = Document::from_blocks(vec![para("one"), para("two")]);
                let mut log = EditLog::new();
                let mut doc = initial.clone();
                let mut applied = 0;
                for (kind, a, b) in steps {
                    if let Some(op) = op_for(&doc, kind, a, b) {
                        let group = log.begin_group();
                        doc = record(&mut log, &doc, op, group);
                        applied += 1;
                    }
                }
                for _ in 0..applied {
                    let edit = log.undo().unwrap();
                    doc = edit.revert(&doc).unwrap();
                }
                prop_assert_eq!(doc.blocks(), initial.blocks());
                prop_assert_eq!(log.undo(), Err(Error::NothingToUndo));
            }

            #[test]
            fn prop_replay_reproduces_current_blocks(
                steps in prop::collection::vec((any::<u8>(), any::<usize>(), any::<usize>()), 0..30)
            ) {
                let mut log = EditLog::new();
                let mut doc = Document::empty();
                for (kind, a, b) in steps {
                    if let Some(op) = op_for(&doc, kind, a, b) {
                        let group = log.begin_group();
                        doc = record(&mut log, &doc, op, group);
                    }
                }
                let replayed = log.replay().unwrap();
                prop_assert_eq!(replayed.blocks(), doc.blocks());
            }
        }
    }
}
