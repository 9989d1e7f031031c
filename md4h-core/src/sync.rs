//! Echo suppression for bidirectional content sync
//!
//! The editor and the backing file are two mutable views reconciled by
//! message passing, so every outbound save bounces back as an apparent
//! external edit. Before applying an inbound update, its hash is checked
//! against the single most recent outbound fingerprint: a match inside a
//! short window is an echo and gets dropped, text identical to the
//! current serialization is a no-op, and only genuinely different content
//! replaces editor state.

use std::time::{Duration, Instant};

use log::debug;

/// What to do with an inbound full-document update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InboundDisposition {
    /// The update merely reflects our own recent outbound push.
    Echo,
    /// The update matches what the editor would serialize right now.
    Unchanged,
    /// A genuine external change; editor content must be replaced.
    Apply,
}

/// djb2-family hash over the serialized text, rendered as hex. Fast and
/// stable; collision resistance is not required because the hash only
/// gates a time-windowed comparison.
pub fn content_hash(text: &str) -> String {
    let mut hash: u32 = 5381;
    for byte in text.as_bytes() {
        hash = hash.wrapping_mul(33) ^ u32::from(*byte);
    }
    format!("{hash:08x}")
}

/// Tracks the most recent outbound push. One slot, not a history.
#[derive(Debug)]
pub struct SyncController {
    last_sent_hash: Option<String>,
    last_sent_at: Option<Instant>,
    echo_window: Duration,
}

impl SyncController {
    pub fn new(echo_window: Duration) -> Self {
        Self {
            last_sent_hash: None,
            last_sent_at: None,
            echo_window,
        }
    }

    /// Forget the outbound fingerprint, as on editor (re)initialization.
    pub fn reset(&mut self) {
        self.last_sent_hash = None;
        self.last_sent_at = None;
    }

    /// Record an outbound push of `text`.
    pub fn track_sent(&mut self, text: &str) {
        self.track_sent_at(text, Instant::now());
    }

    pub fn track_sent_at(&mut self, text: &str, at: Instant) {
        self.last_sent_hash = Some(content_hash(text));
        self.last_sent_at = Some(at);
    }

    /// Classify an inbound update against the outbound fingerprint and the
    /// editor's current serialization.
    pub fn classify(&self, incoming: &str, current: &str) -> InboundDisposition {
        self.classify_at(incoming, current, Instant::now())
    }

    pub fn classify_at(&self, incoming: &str, current: &str, now: Instant) -> InboundDisposition {
        if let (Some(hash), Some(at)) = (&self.last_sent_hash, self.last_sent_at) {
            let elapsed = now.saturating_duration_since(at);
            if elapsed <= self.echo_window && *hash == content_hash(incoming) {
                debug!("inbound update matches outbound hash within window, dropping echo");
                return InboundDisposition::Echo;
            }
        }
        if incoming == current {
            return InboundDisposition::Unchanged;
        }
        InboundDisposition::Apply
    }
}
