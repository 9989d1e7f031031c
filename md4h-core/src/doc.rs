//! Document model pairing Markdown text with its structured tree

use anyhow::{Context, Result};
use ropey::Rope;
use std::fs;
use std::path::{Path, PathBuf};

use crate::markdown::{parse_markdown, render_markdown};
use crate::node::Node;
use crate::normalize;
use crate::outline::{self, OutlineEntry};

/// A Markdown document: the text as loaded or last serialized, the node
/// tree parsed from it, and a revision counter. Positions computed
/// against one revision are invalid after the next.
#[derive(Clone)]
pub struct Document {
    pub path: Option<PathBuf>,
    pub rope: Rope,
    pub tree: Node,
    pub rev: u64,
}

impl Document {
    /// Build a document from Markdown text.
    pub fn from_markdown(text: &str) -> Self {
        Self {
            path: None,
            rope: Rope::from_str(text),
            tree: parse_markdown(text),
            rev: 1,
        }
    }

    /// Load a document from a file path
    pub fn load(path: &Path) -> Result<Self> {
        let abs_path = path
            .canonicalize()
            .with_context(|| format!("Failed to canonicalize path: {}", path.display()))?;

        let content = fs::read_to_string(&abs_path)
            .with_context(|| format!("Failed to read file: {}", abs_path.display()))?;

        let mut doc = Self::from_markdown(&content);
        doc.path = Some(abs_path);
        Ok(doc)
    }

    /// Reload the document from disk
    pub fn reload(&mut self) -> Result<()> {
        let path = self
            .path
            .clone()
            .context("Document has no backing file to reload")?;
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to reload file: {}", path.display()))?;
        self.replace_content(&content);
        Ok(())
    }

    /// Replace content with new Markdown text, bumping the revision.
    pub fn replace_content(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        self.tree = parse_markdown(text);
        self.rev += 1;
    }

    /// The current Markdown text.
    pub fn markdown(&self) -> String {
        self.rope.to_string()
    }

    /// Serialize the tree after stripping stray empty paragraphs, and
    /// refresh the rope to match. Returns the serialized text. The
    /// revision is bumped only when normalization changed the tree, since
    /// that is when previously computed positions stop being valid.
    pub fn serialize(&mut self) -> String {
        if normalize::strip_empty_paragraphs(&mut self.tree) {
            self.rev += 1;
        }
        let text = render_markdown(&self.tree);
        self.rope = Rope::from_str(&text);
        text
    }

    /// Outline entries for the current tree.
    pub fn outline(&self) -> Vec<OutlineEntry> {
        let headings = outline::collect_headings(&self.tree);
        outline::compute_outline(&headings, self.tree.content_size())
    }

    /// Get the number of lines in the document
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }
}
