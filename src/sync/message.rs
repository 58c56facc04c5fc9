//! What the surfaces send to a session and what it sends back.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::document::{Block, BlockKind};
use crate::error::{Error, ParseDegraded};

/// A structural edit requested by the tree surface.
///
/// Paths address blocks by child index from the top level; `parent: []`
/// names the top-level sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StructuredEdit {
    Insert { path: Vec<usize>, block: Block },
    Delete { path: Vec<usize> },
    ReplaceAttributes { path: Vec<usize>, kind: BlockKind },
    Reorder { parent: Vec<usize>, order: Vec<usize> },
}

/// Events consumed by the sync engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // Structured channel
    /// Apply a structural edit
    Structured(StructuredEdit),
    /// Undo the last edit group
    Undo,
    /// Redo the next edit group
    Redo,

    // Raw channel
    /// The raw text surface changed; `base_revision` is the revision its
    /// text was last synchronized with.
    RawTextChanged { text: String, base_revision: u64 },
}

impl Message {
    pub const fn is_raw(&self) -> bool {
        matches!(self, Self::RawTextChanged { .. })
    }
}

impl From<StructuredEdit> for Message {
    fn from(edit: StructuredEdit) -> Self {
        Self::Structured(edit)
    }
}

/// Output of processing a batch, for the caller to route to the surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// New canonical text for the raw surface.
    PublishText { revision: u64, text: String },
    /// New block tree for the tree surface.
    PublishTree {
        revision: u64,
        blocks: Arc<Vec<Block>>,
    },
    Warning(ParseDegraded),
    /// A command failed; the document is unchanged by it.
    Rejected(Error),
    /// Raw text typed against an older revision could not be merged with the
    /// structured edits made since; the raw text won.
    Conflict { revision: u64 },
}

impl Effect {
    pub const fn revision(&self) -> Option<u64> {
        match self {
            Self::PublishText { revision, .. }
            | Self::PublishTree { revision, .. }
            | Self::Conflict { revision } => Some(*revision),
            Self::Warning(_) | Self::Rejected(_) => None,
        }
    }
}
