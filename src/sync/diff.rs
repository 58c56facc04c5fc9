//! Tree diff and merge between block sequences.
//!
//! Sibling sequences are aligned by longest common subsequence. Inside a
//! mismatched run, old and new blocks are paired up in order; a pair of the
//! same kind and child count is refined (attribute replacement plus a
//! recursive child diff), anything else is replaced whole.

use crate::document::Block;
use crate::history::EditOp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Keep,
    Delete(usize),
    Insert(usize),
}

/// Operations that turn `old` into `new` when applied in order to a document
/// whose top-level sequence is `old`.
pub fn diff(old: &[Block], new: &[Block]) -> Vec<EditOp> {
    let mut ops = Vec::new();
    diff_sequence(&[], old, new, &mut ops);
    tracing::trace!(ops = ops.len(), "sync.diff");
    ops
}

fn diff_sequence(parent: &[usize], old: &[Block], new: &[Block], ops: &mut Vec<EditOp>) {
    let steps = align(old, new);
    let mut pos = 0;
    let mut i = 0;
    while i < steps.len() {
        if steps[i] == Step::Keep {
            pos += 1;
            i += 1;
            continue;
        }
        let mut deleted = Vec::new();
        let mut inserted = Vec::new();
        while let Some(&step) = steps.get(i) {
            match step {
                Step::Delete(a) => deleted.push(a),
                Step::Insert(b) => inserted.push(b),
                Step::Keep => break,
            }
            i += 1;
        }
        let pairs = deleted.len().min(inserted.len());
        for (&a, &b) in deleted.iter().zip(&inserted) {
            substitute(&child_path(parent, pos), &old[a], &new[b], ops);
            pos += 1;
        }
        for &a in &deleted[pairs..] {
            ops.push(EditOp::Delete {
                path: child_path(parent, pos),
                block: old[a].clone(),
            });
        }
        for &b in &inserted[pairs..] {
            ops.push(EditOp::Insert {
                path: child_path(parent, pos),
                block: new[b].clone(),
            });
            pos += 1;
        }
    }
}

fn substitute(path: &[usize], old: &Block, new: &Block, ops: &mut Vec<EditOp>) {
    let refinable =
        old.kind.same_variant(&new.kind) && old.children.len() == new.children.len();
    if !refinable {
        ops.push(EditOp::Delete {
            path: path.to_vec(),
            block: old.clone(),
        });
        ops.push(EditOp::Insert {
            path: path.to_vec(),
            block: new.clone(),
        });
        return;
    }
    if old.kind != new.kind {
        ops.push(EditOp::ReplaceAttributes {
            path: path.to_vec(),
            before: old.kind.clone(),
            after: new.kind.clone(),
        });
    }
    diff_sequence(path, &old.children, &new.children, ops);
}

/// Three-way merge of top-level sequences.
///
/// `theirs` was derived from `base`; `current` is `base` plus other edits.
/// Top-level blocks `theirs` removed or replaced must still be present,
/// unchanged, in `current`. Blocks `theirs` added are placed after the
/// nearest preceding base block that survives in `current`. Returns `None`
/// when both sides changed the same block.
pub fn merge(base: &[Block], current: &[Block], theirs: &[Block]) -> Option<Vec<Block>> {
    // Where each base block sits in `current`, if it is there unchanged.
    let mut in_current = vec![None; base.len()];
    let mut base_of_current = vec![None; current.len()];
    let (mut i, mut j) = (0, 0);
    for step in align(base, current) {
        match step {
            Step::Keep => {
                in_current[i] = Some(j);
                base_of_current[j] = Some(i);
                i += 1;
                j += 1;
            }
            Step::Delete(_) => i += 1,
            Step::Insert(_) => j += 1,
        }
    }

    // Slot 0 is the start, slot `b + 1` follows base block `b`.
    let mut removed = vec![false; base.len()];
    let mut inserted: Vec<Vec<&Block>> = vec![Vec::new(); base.len() + 1];
    let mut slot = 0;
    let mut i = 0;
    for step in align(base, theirs) {
        match step {
            Step::Keep => {
                i += 1;
                slot = i;
            }
            Step::Delete(a) => {
                if in_current[a].is_none() {
                    return None;
                }
                removed[a] = true;
                i += 1;
                slot = i;
            }
            Step::Insert(b) => {
                // Anchor past base blocks that are gone from `current`.
                let mut anchor = slot;
                while anchor > 0 && in_current[anchor - 1].is_none() {
                    anchor -= 1;
                }
                inserted[anchor].push(&theirs[b]);
            }
        }
    }

    let mut merged: Vec<Block> = inserted[0].iter().map(|&block| block.clone()).collect();
    for (block, origin) in current.iter().zip(base_of_current) {
        match origin {
            Some(b) => {
                if !removed[b] {
                    merged.push(block.clone());
                }
                merged.extend(inserted[b + 1].iter().map(|&block| block.clone()));
            }
            None => merged.push(block.clone()),
        }
    }
    Some(merged)
}

/// Forward edit script from a suffix LCS table.
fn align(old: &[Block], new: &[Block]) -> Vec<Step> {
    let (n, m) = (old.len(), new.len());
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if old[i] == new[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut steps = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i] == new[j] {
            steps.push(Step::Keep);
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            steps.push(Step::Delete(i));
            i += 1;
        } else {
            steps.push(Step::Insert(j));
            j += 1;
        }
    }
    steps.extend((i..n).map(Step::Delete));
    steps.extend((j..m).map(Step::Insert));
    steps
}

fn child_path(parent: &[usize], index: usize) -> Vec<usize> {
    let mut path = Vec::with_capacity(parent.len() + 1);
    path.extend_from_slice(parent);
    path.push(index);
    path
}
