//! Top-level editor wiring
//!
//! Composes the session, the caret plugin, resize histories, and the host
//! bridge into one editor instance. Image saves and resizes are
//! optimistic: the local effect happens immediately, the host confirms or
//! rejects, and a rejection reverts the local state and surfaces a
//! notice. Nothing here blocks; host traffic is pumped through
//! [`Editor::handle_host_response`] and [`Editor::poll`].

use std::collections::HashMap;

use crossbeam_channel::Sender;
use crossterm::event::KeyEvent;
use log::warn;

use md4h_core::Config;

use crate::caret::{EventTarget, ImageCaretPlugin, KeyIntent};
use crate::decoration::{self, Decoration};
use crate::history::{ResizeHistories, ResizeHistoryEntry};
use crate::host::{HostBridge, HostError, HostRequest, HostResponse, ResponseClass};
use crate::session::EditorSession;

/// A user-facing notification produced by host traffic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    ImageSaveFailed { placeholder_id: String, error: String },
}

/// A resize sent to the host and not yet confirmed.
struct PendingResize {
    original: (u32, u32),
    new: (u32, u32),
    image_data: Vec<u8>,
}

pub struct Editor {
    session: EditorSession,
    plugin: ImageCaretPlugin,
    histories: ResizeHistories,
    bridge: HostBridge,
    pending_resizes: HashMap<String, PendingResize>,
}

impl Editor {
    pub fn new(markdown: &str, config: &Config, tx: Sender<HostRequest>) -> Self {
        Self {
            session: EditorSession::open(markdown, config),
            plugin: ImageCaretPlugin::new(),
            histories: ResizeHistories::new(config.images.history_cap),
            bridge: HostBridge::new(tx, &config.host),
            pending_resizes: HashMap::new(),
        }
    }

    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut EditorSession {
        &mut self.session
    }

    pub fn bridge_mut(&mut self) -> &mut HostBridge {
        &mut self.bridge
    }

    /// Route a keydown through the image caret engine.
    pub fn handle_key(&mut self, key: KeyEvent, target: EventTarget) -> KeyIntent {
        self.plugin.handle_key(&mut self.session, key, target)
    }

    /// Current image-adjacency decorations.
    pub fn decorations(&self) -> Vec<Decoration> {
        decoration::compute_decorations(self.session.tree(), &self.session.selection())
    }

    /// Serialize and push the document if it changed. Returns whether a
    /// push went out.
    pub fn save(&mut self) -> Result<bool, HostError> {
        match self.session.flush_outbound() {
            Some(text) => {
                self.bridge.push_content(text)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Ask the host to save image bytes for a placeholder already in the
    /// document. The placeholder src is replaced (or the node removed)
    /// when the host answers.
    pub fn save_image(
        &mut self,
        placeholder_id: String,
        name: String,
        data: Vec<u8>,
        mime_type: String,
        target_folder: Option<String>,
    ) -> Result<(), HostError> {
        self.bridge
            .save_image(placeholder_id, name, data, mime_type, target_folder)
    }

    /// Ask the host to resize an image, remembering enough to record the
    /// operation in history once confirmed.
    pub fn request_resize(
        &mut self,
        image_path: &str,
        new: (u32, u32),
        original: (u32, u32),
        image_data: Vec<u8>,
    ) -> Result<(), HostError> {
        self.bridge
            .resize_image(image_path.to_string(), new, original, image_data.clone())?;
        self.pending_resizes.insert(
            image_path.to_string(),
            PendingResize {
                original,
                new,
                image_data,
            },
        );
        Ok(())
    }

    /// Step one resize back, instructing the host to restore the backup.
    pub fn undo_resize(&mut self, image_path: &str) -> Result<bool, HostError> {
        let Some(entry) = self.histories.undo(image_path) else {
            return Ok(false);
        };
        let backup_path = entry.backup_path.clone();
        self.bridge
            .undo_resize(image_path.to_string(), backup_path)?;
        Ok(true)
    }

    /// Step one resize forward again.
    pub fn redo_resize(&mut self, image_path: &str) -> Result<bool, HostError> {
        let Some(entry) = self.histories.redo(image_path) else {
            return Ok(false);
        };
        let new = (entry.new_width, entry.new_height);
        let image_data = entry.image_data.clone();
        self.bridge
            .redo_resize(image_path.to_string(), new, image_data)?;
        Ok(true)
    }

    /// Handle one message from the host. Returns a notice when the user
    /// should hear about it.
    pub fn handle_host_response(&mut self, response: HostResponse) -> Option<Notice> {
        match self.bridge.accept(&response) {
            ResponseClass::Stale => return None,
            ResponseClass::Fresh | ResponseClass::Uncorrelated => {}
        }
        match response {
            HostResponse::ContentChanged { markdown } => {
                self.session.apply_inbound(&markdown);
                None
            }
            HostResponse::ImageSaved {
                placeholder_id,
                new_src,
            } => {
                self.session.rewrite_image_src(&placeholder_id, Some(&new_src));
                None
            }
            HostResponse::ImageError {
                placeholder_id,
                error,
            } => {
                // Revert the optimistic placeholder; the save never landed.
                self.session.rewrite_image_src(&placeholder_id, None);
                warn!("image save failed for {placeholder_id}: {error}");
                Some(Notice::ImageSaveFailed {
                    placeholder_id,
                    error,
                })
            }
            HostResponse::ResizeCompleted {
                image_path,
                backup_path,
            } => {
                if let Some(pending) = self.pending_resizes.remove(&image_path) {
                    self.histories.push(
                        &image_path,
                        ResizeHistoryEntry::new(
                            backup_path,
                            pending.original,
                            pending.new,
                            pending.image_data,
                        ),
                    );
                }
                None
            }
            _ => None,
        }
    }

    /// Resolve timed-out host requests, returning their conservative
    /// default answers for the caller to act on (a workspace check that
    /// never came back proceeds as "in workspace").
    pub fn poll(&mut self) -> Vec<HostResponse> {
        self.bridge
            .expire()
            .iter()
            .filter_map(|e| e.fallback_response())
            .collect()
    }

    /// Tear down: nothing registered may fire after this.
    pub fn close(&mut self) {
        self.bridge.cancel_all();
        self.plugin.disarm();
        self.pending_resizes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use md4h_core::sync::InboundDisposition;

    fn editor(markdown: &str) -> (Editor, crossbeam_channel::Receiver<HostRequest>) {
        let (tx, rx) = unbounded();
        (Editor::new(markdown, &Config::default(), tx), rx)
    }

    #[test]
    fn test_save_pushes_content_once() {
        let (mut editor, rx) = editor("# Doc\n");
        assert!(!editor.save().unwrap());

        editor.session_mut().mark_dirty();
        assert!(editor.save().unwrap());
        assert_eq!(
            rx.try_recv().unwrap(),
            HostRequest::PushContent {
                markdown: "# Doc\n".into()
            }
        );
    }

    #[test]
    fn test_content_changed_goes_through_echo_filter() {
        let (mut editor, _rx) = editor("# Doc\n");
        editor.session_mut().mark_dirty();
        editor.save().unwrap();

        let rev = editor.session().rev();
        editor.handle_host_response(HostResponse::ContentChanged {
            markdown: "# Doc\n".into(),
        });
        assert_eq!(editor.session().rev(), rev);

        editor.handle_host_response(HostResponse::ContentChanged {
            markdown: "# Other\n".into(),
        });
        assert_eq!(editor.session().markdown(), "# Other\n");
    }

    #[test]
    fn test_image_saved_rewrites_placeholder() {
        let (mut editor, _rx) = editor("![pending](placeholder-1)\n");
        editor.handle_host_response(HostResponse::ImageSaved {
            placeholder_id: "placeholder-1".into(),
            new_src: "images/shot.png".into(),
        });
        let pushed = editor.session_mut().flush_outbound().unwrap();
        assert_eq!(pushed, "![pending](images/shot.png)\n");
    }

    #[test]
    fn test_image_error_removes_placeholder() {
        let (mut editor, _rx) = editor("![pending](placeholder-1)\n");
        let notice = editor.handle_host_response(HostResponse::ImageError {
            placeholder_id: "placeholder-1".into(),
            error: "disk full".into(),
        });
        assert_eq!(
            notice,
            Some(Notice::ImageSaveFailed {
                placeholder_id: "placeholder-1".into(),
                error: "disk full".into(),
            })
        );
        let pushed = editor.session_mut().flush_outbound().unwrap();
        assert!(!pushed.contains("placeholder-1"));
    }

    #[test]
    fn test_resize_confirmation_records_history() {
        let (mut editor, rx) = editor("![a](a.png)\n");
        editor
            .request_resize("a.png", (50, 50), (100, 100), vec![1, 2, 3])
            .unwrap();
        assert!(matches!(
            rx.try_recv().unwrap(),
            HostRequest::ResizeImage { .. }
        ));

        editor.handle_host_response(HostResponse::ResizeCompleted {
            image_path: "a.png".into(),
            backup_path: ".md4h/image-backups/a.png".into(),
        });

        // Undo sends the backup path back to the host.
        assert!(editor.undo_resize("a.png").unwrap());
        let HostRequest::UndoResize { backup_path, .. } = rx.try_recv().unwrap() else {
            panic!("expected undo request");
        };
        assert_eq!(backup_path, ".md4h/image-backups/a.png");

        // Redo re-applies the recorded dimensions.
        assert!(editor.redo_resize("a.png").unwrap());
        let HostRequest::RedoResize {
            new_width,
            new_height,
            ..
        } = rx.try_recv().unwrap()
        else {
            panic!("expected redo request");
        };
        assert_eq!((new_width, new_height), (50, 50));

        // Past the ends both are no-ops.
        assert!(!editor.redo_resize("a.png").unwrap());
    }

    #[test]
    fn test_unconfirmed_resize_has_no_history() {
        let (mut editor, _rx) = editor("![a](a.png)\n");
        editor
            .request_resize("a.png", (50, 50), (100, 100), vec![])
            .unwrap();
        assert!(!editor.undo_resize("a.png").unwrap());
    }

    #[test]
    fn test_workspace_check_timeout_yields_default() {
        let (tx, _rx) = unbounded();
        let mut config = Config::default();
        config.host.workspace_check_timeout_ms = 0;
        let mut editor = Editor::new("# Doc\n", &config, tx);
        editor
            .bridge_mut()
            .check_image_in_workspace("img.png".into())
            .unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));
        let fallbacks = editor.poll();
        assert_eq!(fallbacks.len(), 1);
        assert!(matches!(
            fallbacks[0],
            HostResponse::WorkspaceCheck {
                in_workspace: true,
                ..
            }
        ));
    }

    #[test]
    fn test_close_cancels_everything() {
        let (mut editor, _rx) = editor("# Doc\n");
        editor
            .bridge_mut()
            .check_image_in_workspace("img.png".into())
            .unwrap();
        editor.close();
        assert_eq!(editor.bridge_mut().pending_count(), 0);
    }

    #[test]
    fn test_inbound_classification_is_reachable() {
        let (mut editor, _rx) = editor("# Doc\n");
        assert_eq!(
            editor.session_mut().apply_inbound("# Doc\n"),
            InboundDisposition::Unchanged
        );
    }
}
