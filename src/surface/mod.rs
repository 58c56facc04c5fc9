//! The two views of a session.
//!
//! [`RawView`] holds Markdown text and produces raw text change messages;
//! [`TreeView`] holds a block tree snapshot and produces structured edit
//! messages. Both are updated only by applying the session's effects.

mod raw;
mod tree;

pub use raw::{Cursor, RawView};
pub use tree::{HeadingRef, TreeView};
