//! Split-pane scenarios: a raw text view and a tree view driving one session.

use mdsync::document::{Block, BlockKind};
use mdsync::sync::{Effect, Message, Session};
use mdsync::surface::{RawView, TreeView};

const WELCOME: &str = include_str!("fixtures/welcome.md");

struct Panes {
    session: Session,
    raw: RawView,
    tree: TreeView,
}

impl Panes {
    fn open(text: &str) -> Self {
        let (session, effects) = Session::from_markdown(text);
        let mut panes = Self {
            session,
            raw: RawView::from_text(text, 0),
            tree: TreeView::default(),
        };
        panes.route(&effects);
        panes
    }

    fn route(&mut self, effects: &[Effect]) {
        for effect in effects {
            self.raw.apply(effect);
            self.tree.apply(effect);
        }
    }

    fn send(&mut self, msg: Message) -> Vec<Effect> {
        let effects = self.session.dispatch(msg);
        self.route(&effects);
        effects
    }

    fn flush_raw(&mut self) -> Vec<Effect> {
        match self.raw.take_change() {
            Some(msg) => self.send(msg),
            None => Vec::new(),
        }
    }

    fn assert_in_sync(&self) {
        assert_eq!(self.tree.revision(), self.session.revision());
        assert_eq!(self.tree.blocks(), self.session.document().blocks());
        let replayed = self.session.log().replay().unwrap();
        assert_eq!(replayed.blocks(), self.session.document().blocks());
    }
}

#[test]
fn test_open_fixture_populates_tree() {
    let panes = Panes::open(WELCOME);
    panes.assert_in_sync();
    let outline = panes.tree.outline();
    assert_eq!(outline[0].text, "Welcome");
    assert_eq!(outline[1].text, "Features");
    assert_eq!(outline[1].level, 2);
}

#[test]
fn test_typing_in_raw_view_updates_tree() {
    let mut panes = Panes::open("# Notes\n\nfirst");
    panes.raw.move_to(2, 5);
    panes.raw.insert_str("\n\n- todo");
    panes.flush_raw();

    panes.assert_in_sync();
    let last = panes.tree.blocks().last().unwrap();
    assert!(matches!(last.kind, BlockKind::List { ordered: false, .. }));
    // The raw view keeps what was typed and is now based on the new revision.
    assert_eq!(panes.raw.text(), "# Notes\n\nfirst\n\n- todo");
    assert_eq!(panes.raw.base_revision(), panes.session.revision());
}

#[test]
fn test_tree_edit_rewrites_raw_view_without_echo_loop() {
    let mut panes = Panes::open("a\n\nb\n\nc");
    let msg = panes.tree.move_child(&[], 2, 0).unwrap();
    panes.send(msg);

    assert_eq!(panes.raw.text(), "c\n\na\n\nb\n");
    assert!(!panes.raw.is_dirty());
    assert!(panes.flush_raw().is_empty());
    assert_eq!(panes.session.stats().dropped_echoes, 0);
    panes.assert_in_sync();
}

#[test]
fn test_structured_list_item_insert_is_indented_in_raw_view() {
    let mut panes = Panes::open("- parent\n  - child");
    let item = Block::list_item(vec![Block::paragraph(vec![Block::text("sibling")])]);
    panes.send(TreeView::insert(&[0, 0, 1, 1], item));
    assert_eq!(panes.raw.text(), "- parent\n  - child\n  - sibling\n");
    panes.assert_in_sync();
}

#[test]
fn test_typing_elsewhere_keeps_nested_ordered_list() {
    let mut panes = Panes::open("1. a\n   - b\n     - c\n\npara");
    let list = panes.tree.blocks()[0].clone();

    panes.send(TreeView::set_kind(&[1], BlockKind::Heading { level: 2 }));
    assert_eq!(panes.raw.text(), "1. a\n  - b\n    - c\n\n## para\n");
    panes.raw.move_to(4, usize::MAX);
    panes.raw.insert_str("x");
    panes.flush_raw();

    assert_eq!(panes.tree.blocks()[0], list);
    assert_eq!(panes.tree.blocks()[1].plain_text(), "parax");
    panes.assert_in_sync();
}

#[test]
fn test_unsent_typing_survives_structured_edit() {
    let mut panes = Panes::open("# H\n\na");
    let base = panes.raw.base_revision();
    panes.raw.move_to(2, 1);
    panes.raw.insert_str(" typed");

    let para = Block::paragraph(vec![Block::text("b")]);
    panes.send(TreeView::insert(&[2], para));
    assert_eq!(panes.raw.text(), "# H\n\na typed");
    assert_eq!(panes.raw.base_revision(), base);

    let effects = panes.flush_raw();
    assert!(!effects.iter().any(|e| matches!(e, Effect::Conflict { .. })));
    assert_eq!(panes.raw.text(), "# H\n\na typed\n\nb\n");
    let texts: Vec<String> = panes.tree.blocks().iter().map(Block::plain_text).collect();
    assert_eq!(texts, vec!["H", "a typed", "b"]);
    panes.assert_in_sync();
}

#[test]
fn test_keystrokes_queued_while_busy_parse_once() {
    let mut panes = Panes::open("# Draft");
    let parses = panes.session.stats().parses;
    panes.raw.move_to(0, 7);
    for ch in [" ", "o", "n", "e"] {
        panes.raw.insert_str(ch);
        let msg = panes.raw.take_change().unwrap();
        panes.session.submit(msg);
    }
    let effects = panes.session.process();
    panes.route(&effects);

    assert_eq!(panes.session.stats().parses, parses + 1);
    assert_eq!(panes.session.stats().coalesced_raw, 3);
    assert_eq!(panes.tree.blocks()[0].plain_text(), "Draft one");
    panes.assert_in_sync();
}

#[test]
fn test_undo_from_tree_restores_raw_text() {
    let mut panes = Panes::open("# Title\n\nbody");
    panes.send(TreeView::set_kind(&[0], BlockKind::Heading { level: 3 }));
    assert_eq!(panes.raw.text(), "### Title\n\nbody\n");

    panes.send(Message::Undo);
    assert_eq!(panes.raw.text(), "# Title\n\nbody\n");
    panes.send(Message::Redo);
    assert_eq!(panes.raw.text(), "### Title\n\nbody\n");
    panes.assert_in_sync();
}

#[test]
fn test_raw_and_tree_edits_in_same_batch_merge() {
    let mut panes = Panes::open("# Title\n\none\n\ntwo");
    panes.raw.move_to(4, 3);
    panes.raw.insert_str("!");
    let raw_msg = panes.raw.take_change().unwrap();

    panes.session.submit(TreeView::delete(&[1]));
    panes.session.submit(raw_msg);
    let effects = panes.session.process();
    panes.route(&effects);

    assert!(!effects.iter().any(|e| matches!(e, Effect::Conflict { .. })));
    assert_eq!(panes.raw.text(), "# Title\n\ntwo!\n");
    panes.assert_in_sync();
}

#[test]
fn test_sender_from_watcher_thread() {
    let mut panes = Panes::open("start");
    let sender = panes.session.sender();
    let base = panes.session.revision();
    std::thread::spawn(move || {
        sender
            .send(Message::RawTextChanged {
                text: "changed on disk".to_string(),
                base_revision: base,
            })
            .unwrap();
    })
    .join()
    .unwrap();

    let effects = panes.session.process();
    panes.route(&effects);
    assert_eq!(panes.tree.blocks()[0].plain_text(), "changed on disk");
    panes.assert_in_sync();
}
