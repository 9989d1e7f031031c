//! Fenced mermaid block mapping

use crate::node::Node;

pub const LANGUAGE: &str = "mermaid";

/// Only fenced blocks qualify; indented code is never reinterpreted, even
/// if its content mentions mermaid.
pub fn is_mermaid_fence(fenced: bool, info: &str) -> bool {
    fenced && info.split_whitespace().next() == Some(LANGUAGE)
}

/// Build a mermaid node carrying the fence body verbatim.
pub fn node_from_body(body: &str) -> Node {
    let text = body.strip_suffix('\n').unwrap_or(body).to_string();
    Node::Mermaid { text }
}

/// Re-wrap the body in a mermaid fence, trimming only trailing whitespace.
pub fn render(text: &str) -> String {
    format!("```{}\n{}\n```", LANGUAGE, text.trim_end())
}
