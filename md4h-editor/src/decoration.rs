//! Caret-adjacency decorations for image nodes
//!
//! Purely visual affordance: when the caret sits against an image, the
//! image is marked so the UI can show which side the caret is on. The
//! decorations are derived from the selection on every state transition
//! and always span the image node's full extent.

use md4h_core::node::Node;
use md4h_core::selection::SelectionState;

pub const IMAGE_CARET_BEFORE: &str = "image-caret-before";
pub const IMAGE_CARET_AFTER: &str = "image-caret-after";

/// A decorated document range with a CSS-class-like marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decoration {
    pub from: usize,
    pub to: usize,
    pub class: &'static str,
}

/// Compute the image-adjacency decorations for the current selection.
pub fn compute_decorations(tree: &Node, selection: &SelectionState) -> Vec<Decoration> {
    let pos = match selection {
        SelectionState::Text(sel) if sel.is_caret() => sel.from,
        SelectionState::Gap(pos) => *pos,
        _ => return Vec::new(),
    };
    let Some(resolved) = tree.resolve(pos) else {
        return Vec::new();
    };
    if resolved.in_text {
        return Vec::new();
    }
    let Some(parent) = tree.node_at_path(&resolved.path) else {
        return Vec::new();
    };

    let mut decorations = Vec::new();
    if let Some(before) = resolved.before_pos {
        if let Some(node) = parent.children().get(resolved.index.wrapping_sub(1)) {
            if node.is_image() {
                decorations.push(Decoration {
                    from: before,
                    to: before + node.size(),
                    class: IMAGE_CARET_AFTER,
                });
            }
        }
    }
    if let Some(after) = resolved.after_pos {
        if let Some(node) = parent.children().get(resolved.index) {
            if node.is_image() {
                decorations.push(Decoration {
                    from: after,
                    to: after + node.size(),
                    class: IMAGE_CARET_BEFORE,
                });
            }
        }
    }
    decorations
}
