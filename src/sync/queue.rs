//! The inbox: structured commands in order, raw text coalesced to the latest.

use std::collections::VecDeque;

use super::message::{Message, StructuredEdit};

/// A structured-channel command, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Command {
    Edit(StructuredEdit),
    Undo,
    Redo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct RawChange {
    pub text: String,
    pub base_revision: u64,
}

/// Work taken from the inbox in one go.
#[derive(Debug, Default)]
pub(super) struct Batch {
    pub commands: Vec<Command>,
    pub raw: Option<RawChange>,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.raw.is_none()
    }
}

/// Pending messages. Structured commands queue in order; raw text keeps
/// only the latest value.
#[derive(Debug, Default)]
pub(super) struct Inbox {
    commands: VecDeque<Command>,
    raw: Option<RawChange>,
}

impl Inbox {
    /// Queue a message. Returns true when it superseded a pending raw change.
    pub fn push(&mut self, msg: Message) -> bool {
        match msg {
            Message::Structured(edit) => self.commands.push_back(Command::Edit(edit)),
            Message::Undo => self.commands.push_back(Command::Undo),
            Message::Redo => self.commands.push_back(Command::Redo),
            Message::RawTextChanged {
                text,
                base_revision,
            } => {
                // The oldest base wins: the replaced text was typed on top of it.
                let base_revision = self
                    .raw
                    .as_ref()
                    .map_or(base_revision, |prev| prev.base_revision.min(base_revision));
                return self
                    .raw
                    .replace(RawChange {
                        text,
                        base_revision,
                    })
                    .is_some();
            }
        }
        false
    }

    pub fn len(&self) -> usize {
        self.commands.len() + usize::from(self.raw.is_some())
    }

    pub fn take(&mut self) -> Batch {
        Batch {
            commands: self.commands.drain(..).collect(),
            raw: self.raw.take(),
        }
    }
}
