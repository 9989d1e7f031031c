//! Editor session state and content sync
//!
//! One session per open document. The session owns the document, the
//! selection, and the echo-suppression state, and is the only place tree
//! mutations happen: every edit either validates and commits or leaves
//! the document untouched.

use log::debug;

use md4h_core::doc::Document;
use md4h_core::markdown::alert;
use md4h_core::node::Node;
use md4h_core::selection::{Selection, SelectionState};
use md4h_core::sync::{InboundDisposition, SyncController};
use md4h_core::{render_markdown, Config};

pub struct EditorSession {
    doc: Document,
    selection: SelectionState,
    /// Bumped on every selection assignment, so interaction state keyed
    /// to a selection (like an armed delete) can tell "still the same
    /// selection" from "moved away and back".
    sel_gen: u64,
    sync: SyncController,
    dirty: bool,
    typing: bool,
}

impl EditorSession {
    /// Open a session over Markdown text.
    pub fn open(text: &str, config: &Config) -> Self {
        Self {
            doc: Document::from_markdown(text),
            selection: SelectionState::Text(Selection::caret(0)),
            sel_gen: 0,
            sync: SyncController::new(config.sync.echo_window()),
            dirty: false,
            typing: false,
        }
    }

    pub fn tree(&self) -> &Node {
        &self.doc.tree
    }

    pub fn rev(&self) -> u64 {
        self.doc.rev
    }

    pub fn selection(&self) -> SelectionState {
        self.selection
    }

    pub fn selection_generation(&self) -> u64 {
        self.sel_gen
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The Markdown text as last loaded or serialized.
    pub fn markdown(&self) -> String {
        self.doc.markdown()
    }

    /// What the editor would serialize right now, without committing the
    /// normalization to session state.
    pub fn current_serialization(&self) -> String {
        let mut tree = self.doc.tree.clone();
        md4h_core::normalize::strip_empty_paragraphs(&mut tree);
        render_markdown(&tree)
    }

    pub fn set_selection(&mut self, sel: SelectionState) {
        let clamped = match sel {
            SelectionState::Text(s) => SelectionState::Text(s.clamp_to(&self.doc.tree)),
            SelectionState::NodeOn(pos) => {
                if self.doc.tree.node_starting_at(pos).is_some() {
                    SelectionState::NodeOn(pos)
                } else {
                    SelectionState::Text(Selection::caret(self.doc.tree.clamp_pos(pos)))
                }
            }
            SelectionState::Gap(pos) => SelectionState::Gap(self.doc.tree.clamp_pos(pos)),
        };
        self.assign_selection(clamped);
    }

    fn assign_selection(&mut self, sel: SelectionState) {
        self.selection = sel;
        self.sel_gen += 1;
    }

    /// Flag the start or end of a keystroke burst. Ending a burst runs the
    /// live alert-promotion guard, which is suppressed while typing.
    pub fn set_typing(&mut self, typing: bool) {
        self.typing = typing;
        if !typing && alert::promote_live(&mut self.doc.tree, false) {
            self.doc.rev += 1;
            self.dirty = true;
            self.reclamp_selection();
        }
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    /// Record that an edit made editor state diverge from the file.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Serialize for an outbound push, remembering the fingerprint so the
    /// update bouncing back through the host is recognized as an echo.
    /// Returns `None` when there is nothing to push.
    pub fn flush_outbound(&mut self) -> Option<String> {
        if !self.dirty {
            return None;
        }
        let text = self.doc.serialize();
        self.sync.track_sent(&text);
        self.dirty = false;
        self.reclamp_selection();
        Some(text)
    }

    /// Handle an inbound full-document update. On a genuine change the
    /// content is replaced and the previous selection re-applied, clamped
    /// to the new document's bounds.
    pub fn apply_inbound(&mut self, text: &str) -> InboundDisposition {
        let disposition = self.sync.classify(text, &self.current_serialization());
        match disposition {
            InboundDisposition::Echo => {
                debug!("discarding echoed update");
            }
            InboundDisposition::Unchanged => {}
            InboundDisposition::Apply => {
                self.doc.replace_content(text);
                self.restore_selection_after_replace();
            }
        }
        disposition
    }

    /// Insert an empty paragraph immediately after the top-level block
    /// containing `pos`, placing the caret inside it. Declines (returns
    /// `None`, document untouched) when the computed position is not a
    /// valid block boundary.
    pub fn insert_paragraph_after_block(&mut self, pos: usize) -> Option<usize> {
        let (_, end, _) = self.doc.tree.top_block_around(pos)?;
        if !self.doc.tree.can_insert_block_at(end) {
            return None;
        }
        if !self.doc.tree.insert_block_at(end, Node::paragraph(Vec::new())) {
            return None;
        }
        self.doc.rev += 1;
        self.dirty = true;
        let caret = end + 1;
        self.assign_selection(SelectionState::Text(Selection::caret(caret)));
        Some(caret)
    }

    /// Point every image node at `src` to a new source, or remove those
    /// nodes when `new_src` is `None` (a placeholder whose save failed).
    /// Returns whether anything changed; removal invalidates positions.
    pub fn rewrite_image_src(&mut self, src: &str, new_src: Option<&str>) -> bool {
        fn rewrite(node: &mut Node, src: &str, new_src: Option<&str>) -> bool {
            let Some(children) = node.children_mut() else {
                return false;
            };
            let mut changed = false;
            children.retain_mut(|child| match child {
                Node::Image { src: s, .. } if s == src => match new_src {
                    Some(replacement) => {
                        *s = replacement.to_string();
                        changed = true;
                        true
                    }
                    None => {
                        changed = true;
                        false
                    }
                },
                _ => {
                    if rewrite(child, src, new_src) {
                        changed = true;
                    }
                    true
                }
            });
            changed
        }
        let changed = rewrite(&mut self.doc.tree, src, new_src);
        if changed {
            self.doc.rev += 1;
            self.dirty = true;
            self.reclamp_selection();
        }
        changed
    }

    /// Delete the node starting at `pos`, collapsing the caret there.
    pub fn delete_node_at(&mut self, pos: usize) -> bool {
        if self.doc.tree.remove_node_at(pos).is_none() {
            return false;
        }
        self.doc.rev += 1;
        self.dirty = true;
        self.assign_selection(SelectionState::Text(Selection::caret(
            self.doc.tree.clamp_pos(pos),
        )));
        true
    }

    fn reclamp_selection(&mut self) {
        self.set_selection(self.selection);
    }

    fn restore_selection_after_replace(&mut self) {
        let restored = match self.selection {
            SelectionState::Text(sel) => SelectionState::Text(sel.clamp_to(&self.doc.tree)),
            // Node and gap positions rarely survive a content replace;
            // fall back to a clamped caret at the same spot.
            SelectionState::NodeOn(pos) | SelectionState::Gap(pos) => {
                SelectionState::Text(Selection::caret(self.doc.tree.clamp_pos(pos)))
            }
        };
        self.assign_selection(restored);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(text: &str) -> EditorSession {
        EditorSession::open(text, &Config::default())
    }

    #[test]
    fn test_open_parses_tree() {
        let s = session("# Title\n\nbody\n");
        assert_eq!(s.tree().children().len(), 2);
        assert_eq!(s.rev(), 1);
        assert!(!s.is_dirty());
    }

    #[test]
    fn test_flush_outbound_noop_when_clean() {
        let mut s = session("a\n");
        assert!(s.flush_outbound().is_none());
    }

    #[test]
    fn test_flush_then_echo_is_discarded() {
        let mut s = session("# Doc\n");
        s.mark_dirty();
        let pushed = s.flush_outbound().unwrap();
        assert_eq!(pushed, "# Doc\n");

        let rev = s.rev();
        assert_eq!(s.apply_inbound(&pushed), InboundDisposition::Echo);
        assert_eq!(s.rev(), rev);
    }

    #[test]
    fn test_genuine_external_change_applies() {
        let mut s = session("# Doc\n");
        let rev = s.rev();
        assert_eq!(
            s.apply_inbound("# Edited\n"),
            InboundDisposition::Apply
        );
        assert_eq!(s.rev(), rev + 1);
        assert_eq!(s.markdown(), "# Edited\n");
    }

    #[test]
    fn test_identical_content_is_noop() {
        let mut s = session("# Doc\n");
        let rev = s.rev();
        assert_eq!(s.apply_inbound("# Doc\n"), InboundDisposition::Unchanged);
        assert_eq!(s.rev(), rev);
    }

    #[test]
    fn test_selection_clamped_after_apply() {
        let mut s = session("a long paragraph of text\n");
        s.set_selection(SelectionState::Text(Selection::caret(20)));
        s.apply_inbound("ab\n");
        let SelectionState::Text(sel) = s.selection() else {
            panic!("expected text selection");
        };
        assert_eq!(sel.from, s.tree().content_size());
    }

    #[test]
    fn test_insert_paragraph_after_block() {
        let mut s = session("![a](a.png)\n\nnext\n");
        // Position 1 is inside the first paragraph, at the image.
        let caret = s.insert_paragraph_after_block(1).unwrap();
        assert_eq!(s.tree().children().len(), 3);
        assert!(matches!(s.tree().children()[1], Node::Paragraph { .. }));
        assert_eq!(caret, 4);
        assert!(s.is_dirty());
    }

    #[test]
    fn test_delete_node_at() {
        let mut s = session("![a](a.png)\n");
        assert!(s.delete_node_at(1));
        assert!(!s.delete_node_at(99));
        assert_eq!(s.tree().children()[0].children().len(), 0);
    }

    #[test]
    fn test_typing_guard_defers_alert_promotion() {
        let mut s = session("> plain quote\n");
        // Simulate the quote's first line being edited into a marker.
        if let Some(children) = s.doc.tree.children_mut() {
            children[0] = Node::Blockquote {
                children: vec![Node::paragraph(vec![Node::text("[!NOTE] now marked")])],
            };
        }
        s.set_typing(true);
        assert!(matches!(s.tree().children()[0], Node::Blockquote { .. }));
        s.set_typing(false);
        assert!(matches!(s.tree().children()[0], Node::GithubAlert { .. }));
    }

    #[test]
    fn test_normalization_on_flush_strips_empties() {
        let mut s = session("keep\n");
        if let Some(children) = s.doc.tree.children_mut() {
            children.push(Node::paragraph(vec![Node::text("  ")]));
        }
        s.mark_dirty();
        assert_eq!(s.flush_outbound().unwrap(), "keep\n");
    }
}
