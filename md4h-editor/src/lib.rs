//! md4h Editor - interactive state over the md4h core
//!
//! Everything here is session-scoped and event-driven: the editor session
//! and its sync decisions, the keystroke interception around atomic image
//! nodes, caret decorations, resize history, and the request-correlated
//! host bridge. All mutation happens synchronously inside a keystroke or
//! message handler; the only suspension points are host round-trips.

pub mod caret;
pub mod decoration;
pub mod editor;
pub mod history;
pub mod host;
pub mod session;

#[cfg(feature = "watch")]
pub mod watcher;

// Re-export commonly used types
pub use caret::{EventTarget, ImageCaretPlugin, KeyIntent};
pub use editor::{Editor, Notice};
pub use history::{ResizeHistories, ResizeHistory, ResizeHistoryEntry};
pub use host::{HostBridge, HostError, HostRequest, HostResponse, ResponseClass};
pub use session::EditorSession;
