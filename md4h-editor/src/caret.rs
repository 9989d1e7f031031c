//! Keystroke interception around atomic image nodes
//!
//! Images sit in text flows but have no interior caret positions, so the
//! default key handling either skips over them or deletes them too
//! eagerly. This plugin classifies the selection relative to the nearest
//! image on every keydown and decides whether to handle the key itself or
//! let default behavior proceed. Deletion is two-step: the first
//! Backspace/Delete beside an image only selects it; the deletion happens
//! on an immediately repeated press of the same key.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::debug;

use md4h_core::node::Node;
use md4h_core::selection::{Selection, SelectionState};

use crate::session::EditorSession;

/// Whether a key event was consumed by the plugin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyIntent {
    Handled,
    Pass,
}

/// Where the event landed. Controls layered over an image (resize handle,
/// context-menu button) keep their own key handling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventTarget {
    Editor,
    ImageOverlayControl,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ArmedDelete {
    image_pos: usize,
    key: KeyCode,
    rev: u64,
    sel_gen: u64,
}

/// Per-session plugin state. Instances are independent, so two open
/// editors can never cross-contaminate each other's armed state.
#[derive(Debug, Default)]
pub struct ImageCaretPlugin {
    armed: Option<ArmedDelete>,
}

impl ImageCaretPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn disarm(&mut self) {
        self.armed = None;
    }

    /// Intercept a keydown. Returns [`KeyIntent::Pass`] whenever default
    /// behavior should proceed, including every case where a computed
    /// insertion point fails validation.
    pub fn handle_key(
        &mut self,
        session: &mut EditorSession,
        key: KeyEvent,
        target: EventTarget,
    ) -> KeyIntent {
        if target == EventTarget::ImageOverlayControl {
            return KeyIntent::Pass;
        }
        if key.modifiers != KeyModifiers::NONE && key.modifiers != KeyModifiers::SHIFT {
            self.disarm();
            return KeyIntent::Pass;
        }

        match key.code {
            KeyCode::Enter => self.handle_enter(session),
            KeyCode::Left | KeyCode::Right => self.handle_arrow(session, key.code),
            KeyCode::Backspace | KeyCode::Delete => self.handle_delete_key(session, key.code),
            _ => {
                self.disarm();
                KeyIntent::Pass
            }
        }
    }

    fn handle_enter(&mut self, session: &mut EditorSession) -> KeyIntent {
        self.disarm();
        let image_pos = match selected_image(session) {
            Some(pos) => pos,
            None => {
                let neighbors = caret_neighbors(session);
                match neighbors.before.or(neighbors.after) {
                    Some(pos) => pos,
                    None => return KeyIntent::Pass,
                }
            }
        };
        match session.insert_paragraph_after_block(image_pos) {
            Some(_) => KeyIntent::Handled,
            None => {
                debug!("declining Enter: no valid insertion point after image block");
                KeyIntent::Pass
            }
        }
    }

    fn handle_arrow(&mut self, session: &mut EditorSession, code: KeyCode) -> KeyIntent {
        self.disarm();
        let Some(pos) = selected_image(session) else {
            return KeyIntent::Pass;
        };
        let caret = if code == KeyCode::Left { pos } else { pos + 1 };
        session.set_selection(SelectionState::Text(Selection::caret(caret)));
        KeyIntent::Handled
    }

    fn handle_delete_key(&mut self, session: &mut EditorSession, code: KeyCode) -> KeyIntent {
        if let Some(pos) = selected_image(session) {
            if self.armed_matches(session, pos, code) {
                self.disarm();
                if session.delete_node_at(pos) {
                    return KeyIntent::Handled;
                }
                return KeyIntent::Pass;
            }
            // A node selection reached some other way (or armed with the
            // other key) re-arms for this key first.
            self.arm(session, pos, code);
            return KeyIntent::Handled;
        }

        // Backspace targets the image before the caret, Delete the one
        // after; with images on both sides each key protects its own.
        let neighbors = caret_neighbors(session);
        let target = if code == KeyCode::Backspace {
            neighbors.before
        } else {
            neighbors.after
        };
        match target {
            Some(pos) => self.arm_and_select(session, pos, code),
            None => {
                self.disarm();
                KeyIntent::Pass
            }
        }
    }

    fn arm_and_select(
        &mut self,
        session: &mut EditorSession,
        image_pos: usize,
        code: KeyCode,
    ) -> KeyIntent {
        session.set_selection(SelectionState::NodeOn(image_pos));
        self.arm(session, image_pos, code);
        KeyIntent::Handled
    }

    fn arm(&mut self, session: &EditorSession, image_pos: usize, code: KeyCode) {
        self.armed = Some(ArmedDelete {
            image_pos,
            key: code,
            rev: session.rev(),
            sel_gen: session.selection_generation(),
        });
    }

    /// The armed state only fires while the exact node selection from the
    /// arming press is still active on the same document revision. Moving
    /// the selection away and back produces a new selection generation,
    /// which disqualifies the old arming press.
    fn armed_matches(&self, session: &EditorSession, image_pos: usize, code: KeyCode) -> bool {
        let Some(armed) = self.armed else {
            return false;
        };
        armed.image_pos == image_pos
            && armed.key == code
            && armed.rev == session.rev()
            && armed.sel_gen == session.selection_generation()
            && session.selection() == SelectionState::NodeOn(image_pos)
    }
}

/// Start positions of the image nodes immediately before and after a
/// boundary position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct ImageNeighbors {
    before: Option<usize>,
    after: Option<usize>,
}

/// The image under a node selection, if that is the current selection.
fn selected_image(session: &EditorSession) -> Option<usize> {
    let SelectionState::NodeOn(pos) = session.selection() else {
        return None;
    };
    match session.tree().node_starting_at(pos) {
        Some(node) if node.is_image() => Some(pos),
        _ => None,
    }
}

/// Image adjacency of the current caret or gap cursor. Positions inside
/// text runs have no adjacency.
fn caret_neighbors(session: &EditorSession) -> ImageNeighbors {
    let pos = match session.selection() {
        SelectionState::Text(sel) if sel.is_caret() => sel.from,
        SelectionState::Gap(pos) => pos,
        _ => return ImageNeighbors::default(),
    };
    image_neighbors(session.tree(), pos)
}

fn image_neighbors(tree: &Node, pos: usize) -> ImageNeighbors {
    let Some(resolved) = tree.resolve(pos) else {
        return ImageNeighbors::default();
    };
    if resolved.in_text {
        return ImageNeighbors::default();
    }
    let Some(parent) = tree.node_at_path(&resolved.path) else {
        return ImageNeighbors::default();
    };
    let mut neighbors = ImageNeighbors::default();
    if let Some(before) = resolved.before_pos {
        if resolved.index > 0 && parent.children()[resolved.index - 1].is_image() {
            neighbors.before = Some(before);
        }
    }
    if let Some(after) = resolved.after_pos {
        if parent.children()[resolved.index].is_image() {
            neighbors.after = Some(after);
        }
    }
    neighbors
}
