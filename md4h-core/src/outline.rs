//! Outline extraction from the document tree
//!
//! Headings become a flat list of records, then entries with section
//! boundaries: a heading's section runs to the next heading of equal or
//! shallower level, or the document end. Each entry carries a
//! GFM-compatible anchor slug so in-document links resolve the way the
//! rendered file does.

use std::collections::HashSet;

use crate::node::Node;

/// A heading as found in the tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeadingRecord {
    pub level: u8,
    pub text: String,
    pub pos: usize,
}

/// An outline entry with its section boundary and anchor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutlineEntry {
    pub level: u8,
    pub text: String,
    pub pos: usize,
    pub section_end: usize,
    pub slug: String,
}

/// Collect headings in document order with their absolute positions.
pub fn collect_headings(doc: &Node) -> Vec<HeadingRecord> {
    let mut out = Vec::new();
    walk(doc.children(), 0, &mut out);
    out
}

fn walk(children: &[Node], base: usize, out: &mut Vec<HeadingRecord>) {
    let mut pos = base;
    for child in children {
        if let Node::Heading { level, .. } = child {
            out.push(HeadingRecord {
                level: *level,
                text: child.text_content(),
                pos,
            });
        } else if child.is_container() {
            walk(child.children(), pos + 1, out);
        }
        pos += child.size();
    }
}

/// Compute outline entries. The section of heading *i* ends at the first
/// later heading whose level is less than or equal to *i*'s — skipped
/// levels included, so an H3 directly under an H1 still ends at the next
/// heading of level 3 or shallower.
pub fn compute_outline(headings: &[HeadingRecord], doc_size: usize) -> Vec<OutlineEntry> {
    let mut seen = HashSet::new();
    headings
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let section_end = headings[i + 1..]
                .iter()
                .find(|later| later.level <= h.level)
                .map(|later| later.pos)
                .unwrap_or(doc_size);
            OutlineEntry {
                level: h.level,
                text: h.text.clone(),
                pos: h.pos,
                section_end,
                slug: slugify(&h.text, &mut seen),
            }
        })
        .collect()
}

/// GFM-style anchor slug. Registers the result in `seen` so duplicate
/// headings number deterministically when processed in document order.
pub fn slugify(text: &str, seen: &mut HashSet<String>) -> String {
    let mut slug = String::new();
    let mut prev_hyphen = false;
    for c in text.trim().to_lowercase().chars() {
        if c.is_whitespace() || c == '-' {
            if !prev_hyphen {
                slug.push('-');
                prev_hyphen = true;
            }
        } else if c.is_alphanumeric() || c == '_' {
            slug.push(c);
            prev_hyphen = false;
        }
    }
    let slug = slug.trim_matches('-').to_string();

    let unique = if seen.contains(&slug) {
        let mut n = 1;
        loop {
            let candidate = format!("{slug}-{n}");
            if !seen.contains(&candidate) {
                break candidate;
            }
            n += 1;
        }
    } else {
        slug
    };
    seen.insert(unique.clone());
    unique
}
