//! Document normalization before serialization
//!
//! Structural edits around atomic nodes leave semantically-empty
//! paragraphs behind; serialized as-is they accumulate blank lines on
//! every save and pollute the file's diff history. Normalization removes
//! them at the document level only — paragraphs nested inside list items,
//! blockquotes, and alerts carry meaning there and are left alone.

use crate::node::Node;

/// Remove top-level paragraphs whose content is empty or consists only of
/// whitespace text and hard breaks. Returns whether anything was removed.
/// Idempotent.
pub fn strip_empty_paragraphs(doc: &mut Node) -> bool {
    let Some(children) = doc.children_mut() else {
        return false;
    };
    let before = children.len();
    children.retain(|child| !is_empty_paragraph(child));
    children.len() != before
}

fn is_empty_paragraph(node: &Node) -> bool {
    let Node::Paragraph { children } = node else {
        return false;
    };
    children.iter().all(|c| match c {
        Node::HardBreak => true,
        Node::Text { text, .. } => text.trim().is_empty(),
        _ => false,
    })
}
