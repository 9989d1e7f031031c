//! Resize history with bounded linear undo/redo
//!
//! Each image (keyed by its markdown source path) keeps up to ten resize
//! operations. The cursor moves back on undo and forward on redo;
//! pushing after an undo discards the abandoned redo branch, and pushing
//! past the cap drops the oldest entry. Undo/redo beyond the ends are
//! no-ops.

use std::collections::HashMap;

use chrono::Utc;

/// One committed resize operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResizeHistoryEntry {
    /// Milliseconds since the epoch, for display and backup matching.
    pub timestamp: i64,
    pub backup_path: String,
    pub original_width: u32,
    pub original_height: u32,
    pub new_width: u32,
    pub new_height: u32,
    pub image_data: Vec<u8>,
}

impl ResizeHistoryEntry {
    pub fn new(
        backup_path: String,
        original: (u32, u32),
        new: (u32, u32),
        image_data: Vec<u8>,
    ) -> Self {
        Self {
            timestamp: Utc::now().timestamp_millis(),
            backup_path,
            original_width: original.0,
            original_height: original.1,
            new_width: new.0,
            new_height: new.1,
            image_data,
        }
    }
}

/// History for a single image.
#[derive(Clone, Debug)]
pub struct ResizeHistory {
    entries: Vec<ResizeHistoryEntry>,
    cursor: usize,
    cap: usize,
}

impl ResizeHistory {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            cap,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a committed resize. Anything past the cursor (a redo branch
    /// abandoned by an earlier undo) is discarded first.
    pub fn push(&mut self, entry: ResizeHistoryEntry) {
        self.entries.truncate(self.cursor);
        self.entries.push(entry);
        if self.entries.len() > self.cap {
            let excess = self.entries.len() - self.cap;
            self.entries.drain(..excess);
        }
        self.cursor = self.entries.len();
    }

    /// Step back one operation, returning the entry to revert. No-op at
    /// the beginning of history.
    pub fn undo(&mut self) -> Option<&ResizeHistoryEntry> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Step forward one operation, returning the entry to re-apply. No-op
    /// at the end of history.
    pub fn redo(&mut self) -> Option<&ResizeHistoryEntry> {
        if self.cursor >= self.entries.len() {
            return None;
        }
        let entry = self.entries.get(self.cursor);
        self.cursor += 1;
        entry
    }
}

/// Histories for all images in a session.
#[derive(Debug)]
pub struct ResizeHistories {
    map: HashMap<String, ResizeHistory>,
    cap: usize,
}

impl ResizeHistories {
    pub fn new(cap: usize) -> Self {
        Self {
            map: HashMap::new(),
            cap,
        }
    }

    pub fn push(&mut self, image_path: &str, entry: ResizeHistoryEntry) {
        let cap = self.cap;
        self.map
            .entry(image_path.to_string())
            .or_insert_with(|| ResizeHistory::new(cap))
            .push(entry);
    }

    pub fn undo(&mut self, image_path: &str) -> Option<&ResizeHistoryEntry> {
        self.map.get_mut(image_path)?.undo()
    }

    pub fn redo(&mut self, image_path: &str) -> Option<&ResizeHistoryEntry> {
        self.map.get_mut(image_path)?.redo()
    }

    pub fn history(&self, image_path: &str) -> Option<&ResizeHistory> {
        self.map.get(image_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: u32) -> ResizeHistoryEntry {
        ResizeHistoryEntry {
            timestamp: n as i64,
            backup_path: format!("backup-{n}.png"),
            original_width: 100,
            original_height: 100,
            new_width: n,
            new_height: n,
            image_data: vec![n as u8],
        }
    }

    #[test]
    fn test_cap_keeps_latest_ten() {
        let mut history = ResizeHistory::new(10);
        for n in 1..=12 {
            history.push(entry(n));
        }
        assert_eq!(history.len(), 10);
        // The two oldest entries fell off the front.
        let mut widths = Vec::new();
        while let Some(e) = history.undo() {
            widths.push(e.new_width);
        }
        assert_eq!(widths, (3..=12).rev().collect::<Vec<u32>>());
    }

    #[test]
    fn test_undo_past_beginning_is_noop() {
        let mut history = ResizeHistory::new(10);
        history.push(entry(1));
        assert!(history.undo().is_some());
        assert!(history.undo().is_none());
        assert!(history.undo().is_none());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_redo_past_end_is_noop() {
        let mut history = ResizeHistory::new(10);
        history.push(entry(1));
        assert!(history.redo().is_none());
        history.undo();
        assert!(history.redo().is_some());
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_push_after_undo_discards_redo_branch() {
        let mut history = ResizeHistory::new(10);
        history.push(entry(1));
        history.push(entry(2));
        history.push(entry(3));
        history.undo();
        history.undo();
        history.push(entry(4));
        assert_eq!(history.len(), 2);
        assert_eq!(history.undo().unwrap().new_width, 4);
        assert_eq!(history.undo().unwrap().new_width, 1);
        assert!(history.undo().is_none());
    }

    #[test]
    fn test_histories_are_per_image() {
        let mut histories = ResizeHistories::new(10);
        histories.push("a.png", entry(1));
        histories.push("b.png", entry(2));
        assert_eq!(histories.undo("a.png").unwrap().new_width, 1);
        assert_eq!(histories.undo("b.png").unwrap().new_width, 2);
        assert!(histories.undo("c.png").is_none());
    }

    #[test]
    fn test_undo_then_redo_roundtrip() {
        let mut histories = ResizeHistories::new(10);
        histories.push("a.png", entry(1));
        histories.push("a.png", entry(2));
        assert_eq!(histories.undo("a.png").unwrap().new_width, 2);
        assert_eq!(histories.redo("a.png").unwrap().new_width, 2);
        assert!(histories.redo("a.png").is_none());
    }
}
