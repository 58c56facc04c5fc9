//! Two-way synchronization between the raw text and block tree surfaces.
//!
//! A [`Session`] owns the current [`Document`], its [`EditLog`] and the
//! engine state. Surfaces talk to it only through typed [`Message`]s and
//! receive typed [`Effect`]s back; nothing registers callbacks.
//!
//! Messages are queued in an inbox and processed in batches. Structured
//! commands are applied in arrival order; of the raw text changes only the
//! latest is parsed.

mod diff;
mod message;
mod queue;


use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

pub use diff::{diff, merge};
pub use message::{Effect, Message, StructuredEdit};

use crate::document::{Block, Document};
use crate::error::{Error, Result};
use crate::history::{Edit, EditLog, EditOp, GroupId, Origin};
use crate::markdown;
use queue::{Command, Inbox, RawChange};

/// Recent revisions the raw surface may still be typing against.
const SNAPSHOT_HISTORY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncState {
    Idle,
    ApplyingStructured,
    ApplyingRawText,
}

/// Counters for observing the engine's work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub parses: usize,
    pub serializations: usize,
    /// Raw text changes superseded in the inbox before being parsed
    pub coalesced_raw: usize,
    /// Raw text changes dropped because they matched the last synchronized text
    pub dropped_echoes: usize,
    pub conflicts: usize,
}

/// An editing session over one document.
#[derive(Debug)]
pub struct Session {
    document: Document,
    log: EditLog,
    state: SyncState,
    inbox: Inbox,
    sender: Sender<Message>,
    receiver: Receiver<Message>,
    /// Text the raw surface is known to hold.
    synced_text: String,
    snapshots: VecDeque<(u64, Arc<Vec<Block>>)>,
    stats: SyncStats,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A session over the empty document.
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        let document = Document::empty();
        let mut snapshots = VecDeque::with_capacity(SNAPSHOT_HISTORY);
        snapshots.push_back((document.revision(), document.snapshot()));
        Self {
            document,
            log: EditLog::new(),
            state: SyncState::Idle,
            inbox: Inbox::default(),
            sender,
            receiver,
            synced_text: String::new(),
            snapshots,
            stats: SyncStats::default(),
        }
    }

    /// Open a session on existing Markdown text.
    ///
    /// The text is loaded as a raw text change, so the load is recorded in the
    /// edit log as one group and replaying the log reproduces the document.
    pub fn from_markdown(text: &str) -> (Self, Vec<Effect>) {
        let mut session = Self::new();
        let effects = session.dispatch(Message::RawTextChanged {
            text: text.to_string(),
            base_revision: 0,
        });
        (session, effects)
    }

    pub const fn document(&self) -> &Document {
        &self.document
    }

    pub const fn revision(&self) -> u64 {
        self.document.revision()
    }

    pub const fn log(&self) -> &EditLog {
        &self.log
    }

    pub const fn state(&self) -> SyncState {
        self.state
    }

    pub const fn stats(&self) -> SyncStats {
        self.stats
    }

    /// Number of queued messages not yet processed.
    pub fn pending(&self) -> usize {
        self.inbox.len()
    }

    /// Canonical Markdown for the current revision.
    pub fn markdown(&self) -> String {
        markdown::serialize(self.document.blocks())
    }

    /// A handle for submitting messages from other threads.
    pub fn sender(&self) -> Sender<Message> {
        self.sender.clone()
    }

    /// Queue a message without processing it.
    pub fn submit(&mut self, msg: Message) {
        if self.state != SyncState::Idle {
            tracing::debug!(state = ?self.state, "sync: queued while busy");
        }
        if self.inbox.push(msg) {
            self.stats.coalesced_raw += 1;
            tracing::trace!("sync: superseded pending raw text");
        }
    }

    /// Queue a message and process everything pending.
    pub fn dispatch(&mut self, msg: Message) -> Vec<Effect> {
        self.submit(msg);
        self.process()
    }

    /// Process pending messages until the inbox and channel are empty.
    pub fn process(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        loop {
            self.drain_channel();
            let batch = self.inbox.take();
            if batch.is_empty() {
                break;
            }
            tracing::debug!(
                commands = batch.commands.len(),
                raw = batch.raw.is_some(),
                revision = self.document.revision(),
                "sync: processing batch"
            );
            if !batch.commands.is_empty() {
                self.transition(SyncState::ApplyingStructured);
                self.apply_commands(batch.commands, &mut effects);
                self.transition(SyncState::Idle);
            }
            if let Some(raw) = batch.raw {
                self.transition(SyncState::ApplyingRawText);
                self.apply_raw(raw, &mut effects);
                self.transition(SyncState::Idle);
            }
        }
        effects
    }

    fn drain_channel(&mut self) {
        while let Ok(msg) = self.receiver.try_recv() {
            self.submit(msg);
        }
    }

    fn transition(&mut self, next: SyncState) {
        tracing::debug!(from = ?self.state, to = ?next, "sync: state");
        self.state = next;
    }

    fn apply_commands(&mut self, commands: Vec<Command>, effects: &mut Vec<Effect>) {
        let before = self.document.revision();
        for command in commands {
            let result = match command {
                Command::Edit(edit) => self.apply_structured(edit),
                Command::Undo => self.undo(),
                Command::Redo => self.redo(),
            };
            if let Err(err) = result {
                if err.is_boundary() {
                    tracing::debug!(%err, "sync: command rejected");
                } else {
                    tracing::warn!(%err, "sync: command rejected");
                }
                effects.push(Effect::Rejected(err));
            }
        }
        if self.document.revision() != before {
            self.publish_text(effects);
            self.publish_tree(effects);
        }
    }

    fn apply_structured(&mut self, edit: StructuredEdit) -> Result<()> {
        let op = match edit {
            StructuredEdit::Insert { path, block } => EditOp::Insert { path, block },
            StructuredEdit::Delete { path } => {
                let block = self.document.get(&path)?.clone();
                EditOp::Delete { path, block }
            }
            StructuredEdit::ReplaceAttributes { path, kind } => {
                let before = self.document.get(&path)?.kind.clone();
                EditOp::ReplaceAttributes {
                    path,
                    before,
                    after: kind,
                }
            }
            StructuredEdit::Reorder { parent, order } => EditOp::Reorder { parent, order },
        };
        self.commit(vec![op], Origin::Structured)
    }

    fn undo(&mut self) -> Result<()> {
        let cursor = self.log.cursor();
        let edits = self.log.undo_group()?;
        let reverted = edits
            .iter()
            .try_fold(self.document.clone(), |doc, edit| edit.revert(&doc));
        self.finish_history_step(reverted, cursor, edits.len(), "undo")
    }

    fn redo(&mut self) -> Result<()> {
        let cursor = self.log.cursor();
        let edits = self.log.redo_group()?;
        let reapplied = edits
            .iter()
            .try_fold(self.document.clone(), |doc, edit| edit.reapply(&doc));
        self.finish_history_step(reapplied, cursor, edits.len(), "redo")
    }

    fn finish_history_step(
        &mut self,
        result: Result<Document>,
        cursor: usize,
        count: usize,
        action: &str,
    ) -> Result<()> {
        match result {
            Ok(doc) => {
                tracing::debug!(edits = count, revision = doc.revision(), "sync: {action}");
                self.document = doc;
                Ok(())
            }
            Err(err) => {
                self.log.restore_cursor(cursor);
                Err(err)
            }
        }
    }

    /// Apply `ops` as one edit group. Nothing is committed unless every op applies.
    fn commit(&mut self, ops: Vec<EditOp>, origin: Origin) -> Result<()> {
        if ops.is_empty() {
            return Ok(());
        }
        let group = self.log.begin_group();
        let (doc, edits) = stage(&self.document, ops, origin, group)?;
        for edit in edits {
            tracing::trace!(op = edit.op.name(), revision = edit.revision, "sync: edit");
            self.log.append(edit);
        }
        self.document = doc;
        Ok(())
    }

    fn apply_raw(&mut self, raw: RawChange, effects: &mut Vec<Effect>) {
        if raw.text == self.synced_text {
            self.stats.dropped_echoes += 1;
            tracing::trace!("sync: dropped echoed raw text");
            return;
        }
        let parsed = markdown::parse(&raw.text);
        self.stats.parses += 1;
        for warning in parsed.warnings {
            tracing::warn!(%warning, "sync: degraded parse");
            effects.push(Effect::Warning(warning));
        }

        let before = self.document.revision();
        let mut merged = false;
        if raw.base_revision == before {
            let ops = diff(self.document.blocks(), &parsed.blocks);
            if let Err(err) = self.commit(ops, Origin::RawText) {
                tracing::warn!(%err, "sync: raw diff failed to apply");
                effects.push(Effect::Rejected(err));
                return;
            }
        } else {
            merged = true;
            if !self.rebase(raw.base_revision, &parsed.blocks) {
                self.stats.conflicts += 1;
                tracing::warn!(
                    base = raw.base_revision,
                    revision = before,
                    "sync: raw text conflicts with structured edits, raw text wins"
                );
                let ops = diff(self.document.blocks(), &parsed.blocks);
                if let Err(err) = self.commit(ops, Origin::RawText) {
                    effects.push(Effect::Rejected(err));
                    return;
                }
                effects.push(Effect::Conflict {
                    revision: self.document.revision(),
                });
            }
        }

        self.synced_text = raw.text;
        // A merge changed what the raw surface should show.
        if merged {
            self.publish_text(effects);
        } else {
            self.remember_snapshot();
        }
        if self.document.revision() != before || merged {
            self.publish_tree(effects);
        }
    }

    /// Merge the raw change made against `base` with the edits made since.
    fn rebase(&mut self, base: u64, parsed: &[Block]) -> bool {
        let Some(base_blocks) = self.snapshot_at(base) else {
            tracing::debug!(base, "sync: base revision no longer available");
            return false;
        };
        let Some(merged) = merge(&base_blocks, self.document.blocks(), parsed) else {
            return false;
        };
        let ops = diff(self.document.blocks(), &merged);
        match self.commit(ops, Origin::RawText) {
            Ok(()) => {
                tracing::debug!(base, revision = self.revision(), "sync: rebased raw text");
                true
            }
            Err(err) => {
                tracing::debug!(%err, "sync: rebase failed");
                false
            }
        }
    }

    fn snapshot_at(&self, revision: u64) -> Option<Arc<Vec<Block>>> {
        self.snapshots
            .iter()
            .rev()
            .find(|(rev, _)| *rev == revision)
            .map(|(_, blocks)| Arc::clone(blocks))
    }

    fn remember_snapshot(&mut self) {
        let revision = self.document.revision();
        if self.snapshots.back().is_some_and(|(rev, _)| *rev == revision) {
            return;
        }
        if self.snapshots.len() == SNAPSHOT_HISTORY {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back((revision, self.document.snapshot()));
    }

    fn publish_text(&mut self, effects: &mut Vec<Effect>) {
        let text = markdown::serialize(self.document.blocks());
        self.stats.serializations += 1;
        self.synced_text.clone_from(&text);
        self.remember_snapshot();
        effects.push(Effect::PublishText {
            revision: self.document.revision(),
            text,
        });
    }

    fn publish_tree(&self, effects: &mut Vec<Effect>) {
        effects.push(Effect::PublishTree {
            revision: self.document.revision(),
            blocks: self.document.snapshot(),
        });
    }
}

/// Apply `ops` in order on top of `start`.
///
/// Deletes and attribute replacements must find exactly the block or kind
/// they were computed against.
fn stage(
    start: &Document,
    ops: Vec<EditOp>,
    origin: Origin,
    group: GroupId,
) -> Result<(Document, Vec<Edit>)> {
    let mut doc = start.clone();
    let mut edits = Vec::with_capacity(ops.len());
    for op in ops {
        let stale = match &op {
            EditOp::Delete { path, block } => (doc.get(path)? != block).then_some(path),
            EditOp::ReplaceAttributes { path, before, .. } => {
                (&doc.get(path)?.kind != before).then_some(path)
            }
            EditOp::Insert { .. } | EditOp::Reorder { .. } => None,
        };
        if let Some(path) = stale {
            return Err(Error::invalid_path(path));
        }
        doc = op.apply(&doc)?;
        edits.push(Edit {
            op,
            origin,
            revision: doc.revision(),
            group,
        });
    }
    Ok((doc, edits))
}

/// Convenience for callers that only care about failures.
pub fn rejections(effects: &[Effect]) -> impl Iterator<Item = &Error> {
    effects.iter().filter_map(|effect| match effect {
        Effect::Rejected(err) => Some(err),
        _ => None,
    })
}
