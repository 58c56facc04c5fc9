// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. sync::SyncState)
    clippy::module_name_repetitions
)]

//! # mdsync
//!
//! One Markdown document, two views kept in sync: a raw text surface and a
//! structured block tree surface.
//!
//! - Edits on the tree are applied to the document and re-serialized as
//!   canonical Markdown for the text surface.
//! - Edits on the text are parsed, diffed against the document and applied
//!   as structural edits for the tree surface.
//! - Every change is recorded in an undoable edit log.
//!
//! ## Architecture
//!
//! Surfaces never mutate the document. They send typed messages to a
//! [`sync::Session`], which queues and coalesces them, applies them, and
//! returns typed effects for the surfaces to apply.
//!
//! ## Modules
//!
//! - [`document`]: Block tree and immutable document revisions
//! - [`markdown`]: Markdown parser and canonical serializer
//! - [`history`]: Edits, inverses and the undo/redo log
//! - [`sync`]: The session state machine and tree diff
//! - [`surface`]: Raw text and block tree views
//! - [`render`]: HTML preview
//! - [`config`]: Flag-file configuration
//! - [`watcher`]: File watching

pub mod config;
pub mod document;
pub mod error;
pub mod history;
pub mod markdown;
pub mod render;
pub mod surface;
pub mod sync;
pub mod watcher;

pub use error::{Error, ParseDegraded, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::document::{Block, BlockKind, Document};
    pub use crate::error::{Error, ParseDegraded};
    pub use crate::history::{Edit, EditLog, EditOp, Origin};
    pub use crate::markdown::{parse, serialize};
    pub use crate::surface::{RawView, TreeView};
    pub use crate::sync::{Effect, Message, Session, StructuredEdit};
}
