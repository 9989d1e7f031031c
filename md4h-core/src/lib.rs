//! md4h Core - Document model, Markdown mapping, and sync logic
//!
//! This crate contains the core logic for md4h, independent of editor-host
//! concerns:
//! - Structured document tree with flattened positions
//! - Markdown construct mapping (parse + render) with the custom rules
//!   for indented images, space paths, alerts, list markers, and mermaid
//! - Document normalization before serialization
//! - Outline extraction and heading slugs
//! - Auto-link heuristic and image filename conventions
//! - Echo-suppressing sync classification
//! - Configuration management

pub mod autolink;
pub mod config;
pub mod doc;
pub mod imagefile;
pub mod markdown;
pub mod node;
pub mod normalize;
pub mod outline;
pub mod selection;
pub mod sync;

// Re-export commonly used types
pub use config::Config;
pub use doc::Document;
pub use markdown::{parse_markdown, render_markdown};
pub use node::{AlertKind, ListMarker, Mark, Node};
pub use selection::{Selection, SelectionState};
pub use sync::{content_hash, InboundDisposition, SyncController};
