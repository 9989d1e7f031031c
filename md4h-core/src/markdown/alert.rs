//! GitHub alert blockquotes
//!
//! A blockquote whose first line is `[!TYPE]` (case-insensitive, one of
//! the five GitHub callout types) becomes an alert node. Any other bracket
//! tag stays a plain blockquote. The marker may sit on its own first line
//! or be folded into the first text token; stripping it must not leave a
//! ghost empty paragraph behind, and an alert is never childless.

use regex::Regex;
use std::sync::OnceLock;

use crate::node::{AlertKind, Node};

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\[!([A-Za-z]+)\][ \t]*").unwrap())
}

/// Detect an alert marker at the head of blockquote content.
pub fn detect(children: &[Node]) -> Option<AlertKind> {
    let first = children.first()?;
    let Node::Paragraph { children: inline } = first else {
        return None;
    };
    let Some(Node::Text { text, .. }) = inline.first() else {
        return None;
    };
    let caps = marker_re().captures(text)?;
    AlertKind::from_marker(caps.get(1).unwrap().as_str())
}

/// Convert finished blockquote content into an alert node when marked,
/// otherwise wrap it as a plain blockquote.
pub fn promote(children: Vec<Node>) -> Node {
    match detect(&children) {
        Some(kind) => Node::GithubAlert {
            kind,
            children: strip_marker(children),
        },
        None => Node::Blockquote { children },
    }
}

fn strip_marker(mut children: Vec<Node>) -> Vec<Node> {
    if let Some(Node::Paragraph { children: inline }) = children.first_mut() {
        if let Some(Node::Text { text, .. }) = inline.first_mut() {
            if let Some(m) = marker_re().find(text.as_str()) {
                let rest = text[m.end()..].to_string();
                if rest.is_empty() {
                    inline.remove(0);
                } else {
                    *text = rest;
                }
            }
        }
        // Drop the line break that followed a standalone marker line, and
        // any whitespace-only fragments it leaves exposed.
        while matches!(inline.first(), Some(Node::HardBreak))
            || matches!(inline.first(), Some(Node::Text { text, .. }) if text.trim().is_empty())
        {
            inline.remove(0);
        }
        if inline.is_empty() {
            children.remove(0);
        }
    }
    if children.is_empty() {
        children.push(Node::paragraph(Vec::new()));
    }
    children
}

/// Promote blockquotes whose first line has come to match the marker
/// pattern through editing. Suppressed while the user is mid-keystroke so
/// the conversion does not fight live input. Returns whether any
/// blockquote was converted.
pub fn promote_live(doc: &mut Node, typing: bool) -> bool {
    if typing {
        return false;
    }
    let Some(children) = doc.children_mut() else {
        return false;
    };
    let mut changed = false;
    for child in children.iter_mut() {
        if let Node::Blockquote { children: inner } = child {
            if detect(inner).is_some() {
                let inner = std::mem::take(inner);
                *child = promote(inner);
                changed = true;
            }
        }
    }
    changed
}

/// Render the canonical marker line followed by the quoted body.
pub fn render(kind: AlertKind, body: &str) -> String {
    let mut out = format!("> [!{}]", kind.marker());
    for line in body.lines() {
        out.push('\n');
        let prefixed = format!("> {line}");
        out.push_str(prefixed.trim_end());
    }
    out
}
