//! Path navigation over a block sequence.

use super::types::Block;

pub(super) fn block_at<'a>(blocks: &'a [Block], path: &[usize]) -> Option<&'a Block> {
    let (&first, rest) = path.split_first()?;
    let mut block = blocks.get(first)?;
    for &index in rest {
        block = block.children.get(index)?;
    }
    Some(block)
}

pub(super) fn block_at_mut<'a>(blocks: &'a mut [Block], path: &[usize]) -> Option<&'a mut Block> {
    let (&first, rest) = path.split_first()?;
    let mut block = blocks.get_mut(first)?;
    for &index in rest {
        block = block.children.get_mut(index)?;
    }
    Some(block)
}

/// Mutable children of the block at `parent`; `[]` names the top level.
///
/// Leaf blocks have no child list to hand out.
pub(super) fn children_mut<'a>(
    blocks: &'a mut Vec<Block>,
    parent: &[usize],
) -> Option<&'a mut Vec<Block>> {
    if parent.is_empty() {
        return Some(blocks);
    }
    let block = block_at_mut(blocks, parent)?;
    if block.is_leaf() {
        return None;
    }
    Some(&mut block.children)
}

/// Path (relative to `block`) and level of the first out-of-range heading.
pub(super) fn invalid_heading(block: &Block) -> Option<(Vec<usize>, u8)> {
    if let Some(level) = block.kind.invalid_heading_level() {
        return Some((Vec::new(), level));
    }
    block.children.iter().enumerate().find_map(|(idx, child)| {
        invalid_heading(child).map(|(mut path, level)| {
            path.insert(0, idx);
            (path, level)
        })
    })
}

pub(super) fn is_permutation(order: &[usize], len: usize) -> bool {
    if order.len() != len {
        return false;
    }
    let mut seen = vec![false; len];
    for &i in order {
        match seen.get_mut(i) {
            Some(slot) if !*slot => *slot = true,
            _ => return false,
        }
    }
    true
}
