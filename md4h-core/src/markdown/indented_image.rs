//! Indented-image disambiguation
//!
//! CommonMark turns any 4-space (or tab) indented block into a code block.
//! When such a block consists purely of single-line image references it is
//! reinterpreted as inline images instead, one per line joined by hard
//! breaks, each keeping its exact original leading whitespace so the file
//! serializes back byte-for-byte. Any other indented content falls through
//! to normal code-block handling.

use regex::Regex;
use std::sync::OnceLock;

use crate::node::Node;

fn image_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^!\[([^\]]*)\]\((.+)\)$").unwrap())
}

/// Try to reinterpret the raw source of an indented code block as a run of
/// image lines. Returns `None` when any line is not a single image
/// reference, leaving the block to be parsed as code.
pub fn reinterpret(raw: &str) -> Option<Vec<Node>> {
    let mut lines: Vec<&str> = raw.lines().collect();
    while matches!(lines.last(), Some(l) if l.trim().is_empty()) {
        lines.pop();
    }
    if lines.is_empty() {
        return None;
    }

    let mut nodes = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            // An interior blank line means real code, not an image run.
            return None;
        }
        let content = line.trim_start_matches([' ', '\t']);
        let prefix = &line[..line.len() - content.len()];
        if prefix.is_empty() {
            return None;
        }
        let content = content.trim_end();
        let caps = image_line_re().captures(content)?;
        let alt = caps.get(1).map_or("", |m| m.as_str()).to_string();
        let src = unwrap_angle_brackets(caps.get(2).map_or("", |m| m.as_str()));

        if i > 0 {
            nodes.push(Node::HardBreak);
        }
        nodes.push(Node::Image {
            src,
            alt,
            indent_prefix: prefix.to_string(),
        });
    }
    Some(nodes)
}

fn unwrap_angle_brackets(path: &str) -> String {
    path.strip_prefix('<')
        .and_then(|p| p.strip_suffix('>'))
        .unwrap_or(path)
        .to_string()
}
