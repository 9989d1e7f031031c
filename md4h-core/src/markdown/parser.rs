//! Markdown text → structured tree, driven by pulldown-cmark events
//!
//! The tokenizer runs with source offsets attached so the extension passes
//! can consult the raw bytes: indented-image reinterpretation needs the
//! exact leading whitespace the tokenizer strips, and ordered lists need
//! the delimiter character the event stream does not carry.

use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

use super::{alert, indented_image, inline_image, mermaid};
use crate::node::{ListMarker, Mark, Node};

/// Parse a Markdown document into a node tree.
pub fn parse_markdown(source: &str) -> Node {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(source, opts);

    let mut builder = TreeBuilder::new(source);
    for (event, range) in parser.into_offset_iter() {
        builder.event(event, range);
    }
    builder.finish()
}

enum FrameKind {
    Doc,
    Paragraph,
    Heading(u8),
    Blockquote,
    OrderedList { start: u64, marker: ListMarker },
    BulletList,
    ListItem,
    Image { src: String },
    HtmlBlock,
}

struct Frame {
    kind: FrameKind,
    children: Vec<Node>,
}

struct CodeFrame {
    fenced: bool,
    info: String,
    text: String,
    span: Range<usize>,
}

struct TreeBuilder<'a> {
    source: &'a str,
    stack: Vec<Frame>,
    marks: Vec<Mark>,
    code: Option<CodeFrame>,
}

impl<'a> TreeBuilder<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            stack: vec![Frame {
                kind: FrameKind::Doc,
                children: Vec::new(),
            }],
            marks: Vec::new(),
            code: None,
        }
    }

    fn event(&mut self, event: Event<'_>, range: Range<usize>) {
        match event {
            Event::Start(tag) => self.start(tag, range),
            Event::End(tag) => self.end(tag),
            Event::Text(t) => {
                if let Some(code) = self.code.as_mut() {
                    code.text.push_str(&t);
                } else {
                    self.push_text(&t);
                }
            }
            Event::Code(t) => {
                let mut marks = self.marks.clone();
                marks.push(Mark::Code);
                self.push_node(Node::Text {
                    text: t.to_string(),
                    marks,
                });
            }
            Event::SoftBreak => self.push_text(" "),
            Event::HardBreak => self.push_node(Node::HardBreak),
            Event::Rule => self.push_node(Node::HorizontalRule),
            Event::Html(t) => {
                if let Some(frame) = self.stack.last_mut() {
                    if matches!(frame.kind, FrameKind::HtmlBlock) {
                        frame.children.push(Node::text(t.to_string()));
                        return;
                    }
                }
                self.push_text(&t);
            }
            Event::InlineHtml(t) => self.push_text(&t),
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>, range: Range<usize>) {
        match tag {
            Tag::Paragraph => self.push_frame(FrameKind::Paragraph),
            Tag::Heading { level, .. } => self.push_frame(FrameKind::Heading(level as u8)),
            Tag::BlockQuote(_) => self.push_frame(FrameKind::Blockquote),
            Tag::List(Some(start)) => {
                let marker = detect_list_marker(self.source, range.start);
                self.push_frame(FrameKind::OrderedList { start, marker });
            }
            Tag::List(None) => self.push_frame(FrameKind::BulletList),
            Tag::Item => self.push_frame(FrameKind::ListItem),
            Tag::CodeBlock(kind) => {
                let (fenced, info) = match kind {
                    CodeBlockKind::Fenced(info) => (true, info.to_string()),
                    CodeBlockKind::Indented => (false, String::new()),
                };
                self.code = Some(CodeFrame {
                    fenced,
                    info,
                    text: String::new(),
                    span: range,
                });
            }
            Tag::Image { dest_url, .. } => self.push_frame(FrameKind::Image {
                src: dest_url.to_string(),
            }),
            Tag::Link { dest_url, .. } => self.marks.push(Mark::Link {
                href: dest_url.to_string(),
            }),
            Tag::Emphasis => self.marks.push(Mark::Italic),
            Tag::Strong => self.marks.push(Mark::Bold),
            Tag::Strikethrough => self.marks.push(Mark::Strikethrough),
            Tag::HtmlBlock => self.push_frame(FrameKind::HtmlBlock),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph
            | TagEnd::Heading(_)
            | TagEnd::BlockQuote(_)
            | TagEnd::List(_)
            | TagEnd::Item
            | TagEnd::Image
            | TagEnd::HtmlBlock => self.pop_frame(),
            TagEnd::CodeBlock => self.end_code_block(),
            TagEnd::Link | TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.marks.pop();
            }
            _ => {}
        }
    }

    fn push_frame(&mut self, kind: FrameKind) {
        self.stack.push(Frame {
            kind,
            children: Vec::new(),
        });
    }

    fn pop_frame(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let node = match frame.kind {
            FrameKind::Doc => Node::Doc {
                children: frame.children,
            },
            FrameKind::Paragraph => Node::Paragraph {
                children: finish_inline(frame.children),
            },
            FrameKind::Heading(level) => Node::Heading {
                level,
                children: finish_inline(frame.children),
            },
            FrameKind::Blockquote => alert::promote(frame.children),
            FrameKind::OrderedList { start, marker } => Node::OrderedList {
                start,
                marker,
                children: frame.children,
            },
            FrameKind::BulletList => Node::BulletList {
                children: frame.children,
            },
            FrameKind::ListItem => Node::ListItem {
                children: finish_inline(frame.children),
            },
            FrameKind::Image { src } => {
                let alt: String = frame.children.iter().map(Node::text_content).collect();
                Node::Image {
                    src,
                    alt,
                    indent_prefix: String::new(),
                }
            }
            FrameKind::HtmlBlock => {
                let raw: String = frame.children.iter().map(Node::text_content).collect();
                Node::Paragraph {
                    children: vec![Node::text(raw.trim_end().to_string())],
                }
            }
        };
        self.push_node(node);
    }

    fn end_code_block(&mut self) {
        let Some(code) = self.code.take() else {
            return;
        };
        if mermaid::is_mermaid_fence(code.fenced, &code.info) {
            let node = mermaid::node_from_body(&code.text);
            self.push_node(node);
            return;
        }
        if !code.fenced {
            if let Some(inline) = indented_image::reinterpret(self.raw_block(&code.span)) {
                self.push_node(Node::Paragraph { children: inline });
                return;
            }
        }
        let text = code.text.strip_suffix('\n').unwrap_or(&code.text).to_string();
        self.push_node(Node::CodeBlock {
            fenced: code.fenced,
            info: code.info,
            text,
        });
    }

    /// Source slice of a block, widened back to the start of its first
    /// line so stripped indentation is visible again.
    fn raw_block(&self, span: &Range<usize>) -> &str {
        let line_start = self.source[..span.start]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        &self.source[line_start..span.end]
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(frame) = self.stack.last_mut() {
            if let Some(Node::Text {
                text: prev,
                marks: prev_marks,
            }) = frame.children.last_mut()
            {
                if prev_marks == &self.marks {
                    prev.push_str(text);
                    return;
                }
            }
            frame.children.push(Node::Text {
                text: text.to_string(),
                marks: self.marks.clone(),
            });
        }
    }

    fn push_node(&mut self, node: Node) {
        if let Some(frame) = self.stack.last_mut() {
            frame.children.push(node);
        }
    }

    fn finish(mut self) -> Node {
        while self.stack.len() > 1 {
            self.pop_frame();
        }
        let root = self.stack.pop().expect("document frame");
        Node::Doc {
            children: root.children,
        }
    }
}

/// Merge adjacent same-marked text leaves, then recover image references
/// the tokenizer rejected for having spaces in the path.
fn finish_inline(children: Vec<Node>) -> Vec<Node> {
    let mut merged: Vec<Node> = Vec::with_capacity(children.len());
    for child in children {
        if let (
            Some(Node::Text {
                text: prev,
                marks: prev_marks,
            }),
            Node::Text { text, marks },
        ) = (merged.last_mut(), &child)
        {
            if prev_marks == marks {
                prev.push_str(text);
                continue;
            }
        }
        merged.push(child);
    }
    inline_image::repair(merged)
}

/// The delimiter character of an ordered list, read from the source bytes
/// at the list's first marker.
fn detect_list_marker(source: &str, start: usize) -> ListMarker {
    let rest = source[start..]
        .trim_start_matches(|c: char| c.is_whitespace())
        .trim_start_matches(|c: char| c.is_ascii_digit());
    match rest.chars().next() {
        Some(')') => ListMarker::Paren,
        _ => ListMarker::Dot,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::AlertKind;

    fn parse(src: &str) -> Node {
        parse_markdown(src)
    }

    fn doc_children(doc: &Node) -> &[Node] {
        doc.children()
    }

    #[test]
    fn test_paragraph_and_heading() {
        let doc = parse("# Title\n\nBody text\n");
        let children = doc_children(&doc);
        assert_eq!(children.len(), 2);
        assert_eq!(
            children[0],
            Node::Heading {
                level: 1,
                children: vec![Node::text("Title")],
            }
        );
        assert_eq!(children[1], Node::paragraph(vec![Node::text("Body text")]));
    }

    #[test]
    fn test_inline_marks() {
        let doc = parse("some **bold** and *italic* and `code`\n");
        let Node::Paragraph { children } = &doc_children(&doc)[0] else {
            panic!("expected paragraph");
        };
        assert!(children.contains(&Node::Text {
            text: "bold".into(),
            marks: vec![Mark::Bold],
        }));
        assert!(children.contains(&Node::Text {
            text: "italic".into(),
            marks: vec![Mark::Italic],
        }));
        assert!(children.contains(&Node::Text {
            text: "code".into(),
            marks: vec![Mark::Code],
        }));
    }

    #[test]
    fn test_regular_image() {
        let doc = parse("![alt text](img/pic.png)\n");
        let Node::Paragraph { children } = &doc_children(&doc)[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(
            children[0],
            Node::Image {
                src: "img/pic.png".into(),
                alt: "alt text".into(),
                indent_prefix: String::new(),
            }
        );
    }

    #[test]
    fn test_space_path_image_recovered() {
        let doc = parse("![shot](my images/shot 1.png)\n");
        let Node::Paragraph { children } = &doc_children(&doc)[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(
            children[0],
            Node::Image {
                src: "my images/shot 1.png".into(),
                alt: "shot".into(),
                indent_prefix: String::new(),
            }
        );
    }

    #[test]
    fn test_angle_bracket_path_image() {
        let doc = parse("![shot](<my images/shot.png>)\n");
        let Node::Paragraph { children } = &doc_children(&doc)[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(
            children[0],
            Node::Image {
                src: "my images/shot.png".into(),
                alt: "shot".into(),
                indent_prefix: String::new(),
            }
        );
    }

    #[test]
    fn test_indented_image_not_code() {
        let doc = parse("before\n\n    ![a](a.png)\n\nafter\n");
        let children = doc_children(&doc);
        assert_eq!(children.len(), 3);
        let Node::Paragraph { children: inline } = &children[1] else {
            panic!("expected paragraph, got {:?}", children[1]);
        };
        assert_eq!(
            inline[0],
            Node::Image {
                src: "a.png".into(),
                alt: "a".into(),
                indent_prefix: "    ".into(),
            }
        );
    }

    #[test]
    fn test_indented_code_stays_code() {
        let doc = parse("    let x = 1;\n");
        assert_eq!(
            doc_children(&doc)[0],
            Node::CodeBlock {
                fenced: false,
                info: String::new(),
                text: "let x = 1;".into(),
            }
        );
    }

    #[test]
    fn test_fenced_image_lookalike_stays_code() {
        let doc = parse("```\n![a](a.png)\n```\n");
        assert_eq!(
            doc_children(&doc)[0],
            Node::CodeBlock {
                fenced: true,
                info: String::new(),
                text: "![a](a.png)".into(),
            }
        );
    }

    #[test]
    fn test_mermaid_fence() {
        let doc = parse("```mermaid\ngraph TD\n  A --> B\n```\n");
        assert_eq!(
            doc_children(&doc)[0],
            Node::Mermaid {
                text: "graph TD\n  A --> B".into(),
            }
        );
    }

    #[test]
    fn test_indented_mermaid_mention_is_code() {
        let doc = parse("    mermaid diagram here\n");
        assert!(matches!(
            doc_children(&doc)[0],
            Node::CodeBlock { fenced: false, .. }
        ));
    }

    #[test]
    fn test_alert_blockquote() {
        let doc = parse("> [!NOTE]\n> remember this\n");
        let Node::GithubAlert { kind, children } = &doc_children(&doc)[0] else {
            panic!("expected alert, got {:?}", doc_children(&doc)[0]);
        };
        assert_eq!(*kind, AlertKind::Note);
        assert_eq!(
            children[0],
            Node::paragraph(vec![Node::text("remember this")])
        );
    }

    #[test]
    fn test_plain_blockquote() {
        let doc = parse("> just a quote\n");
        assert!(matches!(doc_children(&doc)[0], Node::Blockquote { .. }));
    }

    #[test]
    fn test_ordered_list_start_preserved() {
        let doc = parse("5. five\n6. six\n");
        let Node::OrderedList {
            start,
            marker,
            children,
        } = &doc_children(&doc)[0]
        else {
            panic!("expected ordered list");
        };
        assert_eq!(*start, 5);
        assert_eq!(*marker, ListMarker::Dot);
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn test_paren_list_marker_with_marks() {
        let doc = parse("1) **bold** item\n2) plain\n");
        let Node::OrderedList {
            start,
            marker,
            children,
        } = &doc_children(&doc)[0]
        else {
            panic!("expected ordered list");
        };
        assert_eq!(*start, 1);
        assert_eq!(*marker, ListMarker::Paren);
        let Node::ListItem { children: inline } = &children[0] else {
            panic!("expected list item");
        };
        assert_eq!(
            inline[0],
            Node::Text {
                text: "bold".into(),
                marks: vec![Mark::Bold],
            }
        );
    }

    #[test]
    fn test_link_mark() {
        let doc = parse("see [docs](https://example.com/guide)\n");
        let Node::Paragraph { children } = &doc_children(&doc)[0] else {
            panic!("expected paragraph");
        };
        assert!(children.contains(&Node::Text {
            text: "docs".into(),
            marks: vec![Mark::Link {
                href: "https://example.com/guide".into(),
            }],
        }));
    }

    #[test]
    fn test_multiple_indented_images() {
        let doc = parse("    ![a](a.png)\n    ![b](b.png)\n");
        let Node::Paragraph { children } = &doc_children(&doc)[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(children.len(), 3);
        assert!(children[0].is_image());
        assert_eq!(children[1], Node::HardBreak);
        assert!(children[2].is_image());
    }
}
