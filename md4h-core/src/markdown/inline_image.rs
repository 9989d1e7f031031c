//! Space-tolerant image paths
//!
//! CommonMark rejects an unquoted image destination containing spaces, so
//! `![alt](my shot.png)` survives tokenization as literal text. This pass
//! runs over finished inline runs and splices such references back into
//! image nodes. The render side wraps space-containing paths in angle
//! brackets, the CommonMark-sanctioned escape, so output stays valid.

use regex::Regex;
use std::sync::OnceLock;

use crate::node::{Mark, Node};

fn literal_image_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"!\[([^\]\n]*)\]\(([^()\n]+)\)").unwrap())
}

/// Repair literal image syntax left in text leaves. Only references whose
/// path contains whitespace are touched; everything else was either already
/// parsed or is genuinely not an image.
pub fn repair(children: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Node::Text { ref text, ref marks } if !marks.contains(&Mark::Code) => {
                splice_text(text, marks, &mut out);
            }
            other => out.push(other),
        }
    }
    out
}

fn splice_text(text: &str, marks: &[Mark], out: &mut Vec<Node>) {
    let mut last = 0;
    for caps in literal_image_re().captures_iter(text) {
        let whole = caps.get(0).unwrap();
        let path = caps.get(2).unwrap().as_str().trim();
        if !path.contains(' ') {
            continue;
        }
        if whole.start() > last {
            push_text(out, &text[last..whole.start()], marks);
        }
        out.push(Node::Image {
            src: path.to_string(),
            alt: caps.get(1).unwrap().as_str().to_string(),
            indent_prefix: String::new(),
        });
        last = whole.end();
    }
    if last < text.len() {
        push_text(out, &text[last..], marks);
    }
}

fn push_text(out: &mut Vec<Node>, text: &str, marks: &[Mark]) {
    if !text.is_empty() {
        out.push(Node::Text {
            text: text.to_string(),
            marks: marks.to_vec(),
        });
    }
}

/// Render an inline image reference, wrapping space-containing paths.
pub fn render(src: &str, alt: &str) -> String {
    if src.contains(' ') {
        format!("![{alt}](<{src}>)")
    } else {
        format!("![{alt}]({src})")
    }
}
