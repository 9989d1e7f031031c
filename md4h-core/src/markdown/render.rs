//! Structured tree → Markdown text
//!
//! Rendering is the inverse of parsing up to a small set of
//! normalizations: space-containing image paths gain angle brackets, alert
//! marker lines are re-emitted in canonical form, and hard breaks inside
//! prose render as a trailing backslash. Indented images reproduce their
//! stored prefix byte-for-byte.

use super::{alert, inline_image, mermaid};
use crate::node::{Mark, Node};

/// Render a document tree back to Markdown.
pub fn render_markdown(doc: &Node) -> String {
    let blocks = render_blocks(doc.children());
    let mut out = blocks.join("\n\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn render_blocks(children: &[Node]) -> Vec<String> {
    children.iter().map(render_block).collect()
}

fn render_block(node: &Node) -> String {
    match node {
        Node::Paragraph { children } => render_paragraph(children),
        Node::Heading { level, children } => {
            format!(
                "{} {}",
                "#".repeat(*level as usize),
                render_inline(children)
            )
        }
        Node::Blockquote { children } => {
            prefix_lines(&render_blocks(children).join("\n\n"), "> ")
        }
        Node::GithubAlert { kind, children } => {
            alert::render(*kind, &render_blocks(children).join("\n\n"))
        }
        Node::OrderedList {
            start,
            marker,
            children,
        } => render_list(children, Some((*start, marker.delimiter()))),
        Node::BulletList { children } => render_list(children, None),
        Node::CodeBlock { fenced, info, text } => {
            if *fenced {
                format!("```{info}\n{text}\n```")
            } else {
                prefix_lines(text, "    ")
            }
        }
        Node::Mermaid { text } => mermaid::render(text),
        Node::HorizontalRule => "---".to_string(),
        // Stray inline content at block level renders as-is.
        other => render_inline(std::slice::from_ref(other)),
    }
}

/// A paragraph that is purely indented images (plus the hard breaks that
/// join them) serializes one image per line with its original prefix.
fn render_paragraph(children: &[Node]) -> String {
    let only_images = !children.is_empty()
        && children
            .iter()
            .all(|c| matches!(c, Node::Image { .. } | Node::HardBreak));
    let has_prefix = children.iter().any(
        |c| matches!(c, Node::Image { indent_prefix, .. } if !indent_prefix.is_empty()),
    );
    if only_images && has_prefix {
        return children
            .iter()
            .filter_map(|c| match c {
                Node::Image {
                    src,
                    alt,
                    indent_prefix,
                } => Some(format!("{indent_prefix}{}", inline_image::render(src, alt))),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
    }
    render_inline(children)
}

fn render_inline(children: &[Node]) -> String {
    render_inline_depth(children, 0)
}

/// Render an inline run, grouping neighbors that share marks so nested
/// emphasis serializes as one span instead of per-leaf wrappers.
fn render_inline_depth(children: &[Node], depth: usize) -> String {
    let mut out = String::new();
    let mut i = 0;
    while i < children.len() {
        match &children[i] {
            Node::Text { marks, .. } if marks.len() > depth => {
                let mark = &marks[depth];
                let mut j = i + 1;
                while j < children.len() {
                    match &children[j] {
                        Node::Text { marks: m, .. } if m.len() > depth && &m[depth] == mark => {
                            j += 1
                        }
                        _ => break,
                    }
                }
                let inner = render_inline_depth(&children[i..j], depth + 1);
                out.push_str(&apply_mark(mark, &inner));
                i = j;
            }
            Node::Text { text, .. } => {
                out.push_str(text);
                i += 1;
            }
            Node::Image { src, alt, .. } => {
                out.push_str(&inline_image::render(src, alt));
                i += 1;
            }
            Node::HardBreak => {
                out.push_str("\\\n");
                i += 1;
            }
            other => {
                out.push_str(&render_block(other));
                i += 1;
            }
        }
    }
    out
}

fn apply_mark(mark: &Mark, inner: &str) -> String {
    match mark {
        Mark::Bold => format!("**{inner}**"),
        Mark::Italic => format!("*{inner}*"),
        Mark::Code => format!("`{inner}`"),
        Mark::Strikethrough => format!("~~{inner}~~"),
        Mark::Link { href } => {
            if href.contains(' ') {
                format!("[{inner}](<{href}>)")
            } else {
                format!("[{inner}]({href})")
            }
        }
    }
}

fn render_list(items: &[Node], ordered: Option<(u64, char)>) -> String {
    let loose = items
        .iter()
        .any(|it| it.children().iter().any(|c| matches!(c, Node::Paragraph { .. })));
    let mut rendered = Vec::with_capacity(items.len());
    for (k, item) in items.iter().enumerate() {
        let marker = match ordered {
            Some((start, delim)) => format!("{}{delim} ", start + k as u64),
            None => "- ".to_string(),
        };
        let indent = " ".repeat(marker.len());
        let body = render_item_content(item.children(), loose);
        let mut lines = body.lines();
        let mut s = format!("{marker}{}", lines.next().unwrap_or(""));
        for line in lines {
            s.push('\n');
            if line.is_empty() {
                continue;
            }
            s.push_str(&indent);
            s.push_str(line);
        }
        rendered.push(s);
    }
    rendered.join(if loose { "\n\n" } else { "\n" })
}

/// List item content may be a bare inline run (tight list), blocks (loose
/// list), or an inline run followed by a nested list.
fn render_item_content(children: &[Node], loose: bool) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut run: Vec<Node> = Vec::new();
    for child in children {
        if child.is_inline() {
            run.push(child.clone());
        } else {
            if !run.is_empty() {
                parts.push(render_inline(&run));
                run.clear();
            }
            parts.push(render_block(child));
        }
    }
    if !run.is_empty() {
        parts.push(render_inline(&run));
    }
    parts.join(if loose { "\n\n" } else { "\n" })
}

fn prefix_lines(text: &str, prefix: &str) -> String {
    let mut out = Vec::new();
    for line in text.lines() {
        let prefixed = format!("{prefix}{line}");
        out.push(prefixed.trim_end().to_string());
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::super::parse_markdown;
    use super::*;
    use pretty_assertions::assert_eq;

    fn roundtrip(src: &str) -> String {
        render_markdown(&parse_markdown(src))
    }

    #[test]
    fn test_heading_and_paragraph_roundtrip() {
        let src = "# Title\n\nBody text here.\n";
        assert_eq!(roundtrip(src), src);
    }

    #[test]
    fn test_marks_roundtrip() {
        let src = "some **bold** and *italic* and `code` and ~~gone~~\n";
        assert_eq!(roundtrip(src), src);
    }

    #[test]
    fn test_nested_marks_roundtrip() {
        let src = "**a *b***\n";
        assert_eq!(roundtrip(src), src);
    }

    #[test]
    fn test_link_roundtrip() {
        let src = "see [docs](https://example.com/guide)\n";
        assert_eq!(roundtrip(src), src);
    }

    #[test]
    fn test_indented_image_roundtrip_preserves_prefix() {
        let src = "before\n\n    ![a](a.png)\n\nafter\n";
        assert_eq!(roundtrip(src), src);
    }

    #[test]
    fn test_mixed_tab_prefix_roundtrip() {
        let src = "intro\n\n\t![a](a.png)\n";
        assert_eq!(roundtrip(src), src);
    }

    #[test]
    fn test_multiple_indented_images_keep_own_prefixes() {
        let src = "x\n\n    ![a](a.png)\n     ![b](b.png)\n";
        assert_eq!(roundtrip(src), src);
    }

    #[test]
    fn test_space_path_gains_angle_brackets() {
        assert_eq!(
            roundtrip("![shot](my images/shot 1.png)\n"),
            "![shot](<my images/shot 1.png>)\n"
        );
        // And the bracketed form is stable.
        let src = "![shot](<my images/shot 1.png>)\n";
        assert_eq!(roundtrip(src), src);
    }

    #[test]
    fn test_alert_roundtrip_each_type() {
        for kind in ["NOTE", "TIP", "IMPORTANT", "WARNING", "CAUTION"] {
            let src = format!("> [!{kind}]\n> some advice\n");
            assert_eq!(roundtrip(&src), src);
        }
    }

    #[test]
    fn test_alert_marker_canonicalized() {
        assert_eq!(
            roundtrip("> [!note]\n> lower case in source\n"),
            "> [!NOTE]\n> lower case in source\n"
        );
    }

    #[test]
    fn test_plain_blockquote_roundtrip() {
        let src = "> just a quote\n";
        assert_eq!(roundtrip(src), src);
    }

    #[test]
    fn test_ordered_list_start_roundtrip() {
        let src = "5. five\n6. six\n";
        assert_eq!(roundtrip(src), src);
    }

    #[test]
    fn test_paren_marker_roundtrip() {
        let src = "1) **bold** item\n2) plain\n";
        assert_eq!(roundtrip(src), src);
    }

    #[test]
    fn test_bullet_list_roundtrip() {
        let src = "- one\n- two\n";
        assert_eq!(roundtrip(src), src);
    }

    #[test]
    fn test_mermaid_roundtrip() {
        let src = "```mermaid\ngraph TD\n  A --> B\n```\n";
        assert_eq!(roundtrip(src), src);
    }

    #[test]
    fn test_fenced_code_roundtrip() {
        let src = "```rust\nlet x = 1;\n```\n";
        assert_eq!(roundtrip(src), src);
    }

    #[test]
    fn test_indented_code_roundtrip() {
        let src = "    let x = 1;\n";
        assert_eq!(roundtrip(src), src);
    }

    #[test]
    fn test_parse_render_parse_is_stable() {
        let src = "# Doc\n\n> [!TIP]\n> advice\n\n    ![a](a.png)\n\n5. five\n6. six\n\n```mermaid\ngraph TD\n```\n";
        let once = parse_markdown(src);
        let again = parse_markdown(&render_markdown(&once));
        assert_eq!(once, again);
    }

    #[test]
    fn test_horizontal_rule() {
        assert_eq!(roundtrip("---\n"), "---\n");
    }
}
