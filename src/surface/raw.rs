//! The raw Markdown pane.

use ropey::Rope;

use crate::sync::{Effect, Message};

/// Cursor position in the raw text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    /// Zero-based line index.
    pub line: usize,
    /// Zero-based column (byte offset within the line).
    pub col: usize,
}

/// The raw Markdown surface: a rope-backed text buffer that knows which
/// document revision its text was last synchronized with.
pub struct RawView {
    rope: Rope,
    cursor: Cursor,
    base_revision: u64,
    /// Edited since the last [`RawView::take_change`].
    dirty: bool,
}

impl RawView {
    /// An empty view synchronized with revision 0.
    pub fn new() -> Self {
        Self::from_text("", 0)
    }

    pub fn from_text(text: &str, revision: u64) -> Self {
        Self {
            rope: Rope::from_str(text),
            cursor: Cursor::default(),
            base_revision: revision,
            dirty: false,
        }
    }

    pub const fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub const fn base_revision(&self) -> u64 {
        self.base_revision
    }

    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Content of a line without its trailing newline.
    pub fn line_at(&self, line_idx: usize) -> Option<String> {
        if line_idx >= self.rope.len_lines() {
            return None;
        }
        let line = self.rope.line(line_idx).to_string();
        Some(line.trim_end_matches('\n').trim_end_matches('\r').to_string())
    }

    fn line_len(&self, line_idx: usize) -> usize {
        self.line_at(line_idx).map_or(0, |s| s.len())
    }

    /// Insert a string at the cursor and move the cursor past it.
    pub fn insert_str(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        let char_idx = self.cursor_char_idx();
        self.rope.insert(char_idx, s);
        match s.rsplit_once('\n') {
            Some((head, tail)) => {
                self.cursor.line += head.matches('\n').count() + 1;
                self.cursor.col = tail.len();
            }
            None => self.cursor.col += s.len(),
        }
        self.dirty = true;
    }

    /// Delete the character before the cursor (Backspace).
    ///
    /// Returns `true` if a character was deleted.
    pub fn delete_back(&mut self) -> bool {
        if self.cursor.col == 0 && self.cursor.line == 0 {
            return false;
        }
        let char_idx = self.cursor_char_idx();
        if self.cursor.col == 0 {
            let prev_len = self.line_len(self.cursor.line - 1);
            self.rope.remove(char_idx - 1..char_idx);
            self.cursor.line -= 1;
            self.cursor.col = prev_len;
        } else {
            let line = self.line_at(self.cursor.line).unwrap_or_default();
            let prev_char_len = line[..self.cursor.col]
                .chars()
                .next_back()
                .map_or(1, char::len_utf8);
            self.rope.remove(char_idx - 1..char_idx);
            self.cursor.col -= prev_char_len;
        }
        self.dirty = true;
        true
    }

    /// Move the cursor, clamped to the buffer.
    pub fn move_to(&mut self, line: usize, col: usize) {
        let max_line = self.line_count().saturating_sub(1);
        self.cursor.line = line.min(max_line);
        let line_text = self.line_at(self.cursor.line).unwrap_or_default();
        let mut col = col.min(line_text.len());
        while !line_text.is_char_boundary(col) {
            col -= 1;
        }
        self.cursor.col = col;
    }

    /// Replace the whole text, as a paste or external file change would.
    pub fn set_text(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        self.move_to(self.cursor.line, self.cursor.col);
        self.dirty = true;
    }

    /// The pending change as a message for the session, if any.
    pub fn take_change(&mut self) -> Option<Message> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(Message::RawTextChanged {
            text: self.text(),
            base_revision: self.base_revision,
        })
    }

    /// Apply a session effect. Returns `true` if the text was replaced.
    ///
    /// Published text replaces the buffer and a published tree only advances
    /// the base revision. A dirty view ignores both: its unsent text keeps
    /// the base it was typed on, and the session merges it when it arrives.
    pub fn apply(&mut self, effect: &Effect) -> bool {
        if self.dirty {
            tracing::trace!(base = self.base_revision, "raw view: holding unsent edits");
            return false;
        }
        match effect {
            Effect::PublishText { revision, text } if *revision >= self.base_revision => {
                self.base_revision = *revision;
                if self.rope == text.as_str() {
                    return false;
                }
                self.rope = Rope::from_str(text);
                self.move_to(self.cursor.line, self.cursor.col);
                self.dirty = false;
                true
            }
            Effect::PublishTree { revision, .. } => {
                self.base_revision = self.base_revision.max(*revision);
                false
            }
            _ => false,
        }
    }

    fn cursor_char_idx(&self) -> usize {
        let line_start = self.rope.line_to_char(self.cursor.line);
        let line = self.line_at(self.cursor.line).unwrap_or_default();
        let byte_col = self.cursor.col.min(line.len());
        line_start + line[..byte_col].chars().count()
    }
}

impl Default for RawView {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RawView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawView")
            .field(
                "rope",
                &format_args!("Rope({} lines)", self.rope.len_lines()),
            )
            .field("cursor", &self.cursor)
            .field("base_revision", &self.base_revision)
            .field("dirty", &self.dirty)
            .finish()
    }
}
