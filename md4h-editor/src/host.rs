//! Host bridge: request/response correlation with the editor host
//!
//! The host process owns file I/O, image saving, and workspace search.
//! The editor talks to it over a channel with explicit request ids:
//! responses are matched against the pending map, responses for anything
//! but the latest request of their kind are discarded as stale (file
//! search as-you-type supersedes itself constantly), and requests that
//! outlive their deadline resolve to a conservative default instead of
//! hanging the editor. Closing the editor deregisters everything.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use log::{debug, warn};
use thiserror::Error;

use md4h_core::config::HostConfig;

pub type RequestId = u64;

/// Failures at the host boundary. All of them are recovered locally; the
/// document is never left half-mutated by a failed round-trip.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("host request timed out after {0:?}")]
    Timeout(Duration),
    #[error("stale response for request {0}")]
    Stale(RequestId),
    #[error("host reported: {0}")]
    Host(String),
    #[error("host channel disconnected")]
    Disconnected,
}

/// Messages the editor sends to the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostRequest {
    SaveImage {
        placeholder_id: String,
        name: String,
        data: Vec<u8>,
        mime_type: String,
        target_folder: Option<String>,
    },
    ResizeImage {
        image_path: String,
        new_width: u32,
        new_height: u32,
        original_width: u32,
        original_height: u32,
        image_data: Vec<u8>,
    },
    UndoResize {
        image_path: String,
        backup_path: String,
    },
    RedoResize {
        image_path: String,
        new_width: u32,
        new_height: u32,
        image_data: Vec<u8>,
    },
    CheckImageInWorkspace {
        image_path: String,
        request_id: RequestId,
    },
    FindImageVersions {
        image_path: String,
        request_id: RequestId,
    },
    SearchFiles {
        query: String,
        filters: Vec<String>,
        request_id: RequestId,
    },
    PushContent {
        markdown: String,
    },
}

/// Messages the host sends back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostResponse {
    ImageSaved {
        placeholder_id: String,
        new_src: String,
    },
    ImageError {
        placeholder_id: String,
        error: String,
    },
    ResizeCompleted {
        image_path: String,
        backup_path: String,
    },
    WorkspaceCheck {
        request_id: RequestId,
        in_workspace: bool,
        absolute_path: Option<String>,
    },
    ImageVersions {
        request_id: RequestId,
        versions: Vec<ImageVersion>,
    },
    FileSearchResults {
        request_id: RequestId,
        results: Vec<FileHit>,
    },
    ContentChanged {
        markdown: String,
    },
}

/// One discovered on-disk version of an image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageVersion {
    pub filename: String,
    pub relative_path: String,
    pub width: u32,
    pub height: u32,
    pub file_size: Option<u64>,
    pub modified_date: Option<String>,
    pub is_current: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileHit {
    pub name: String,
    pub relative_path: String,
}

/// Correlated request kinds: only the latest outstanding request of each
/// kind is live; earlier ones are superseded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Kind {
    WorkspaceCheck,
    ImageVersions,
    FileSearch,
}

/// How an incoming correlated response relates to what we asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseClass {
    /// The answer to the latest outstanding request of its kind.
    Fresh,
    /// Superseded or already resolved; discard without acting.
    Stale,
    /// Not a correlated response (content updates, save confirmations).
    Uncorrelated,
}

/// A request that outlived its deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Expired {
    pub request_id: RequestId,
    kind: Kind,
}

impl Expired {
    /// The conservative stand-in answer, where one exists. A workspace
    /// check that never came back is treated as "in workspace" so the
    /// flow proceeds instead of blocking.
    pub fn fallback_response(&self) -> Option<HostResponse> {
        match self.kind {
            Kind::WorkspaceCheck => Some(HostResponse::WorkspaceCheck {
                request_id: self.request_id,
                in_workspace: true,
                absolute_path: None,
            }),
            Kind::ImageVersions | Kind::FileSearch => None,
        }
    }
}

struct Pending {
    kind: Kind,
    deadline: Instant,
}

pub struct HostBridge {
    tx: Sender<HostRequest>,
    next_id: RequestId,
    pending: HashMap<RequestId, Pending>,
    latest: HashMap<Kind, RequestId>,
    workspace_check_timeout: Duration,
    request_timeout: Duration,
}

impl HostBridge {
    pub fn new(tx: Sender<HostRequest>, config: &HostConfig) -> Self {
        Self {
            tx,
            next_id: 0,
            pending: HashMap::new(),
            latest: HashMap::new(),
            workspace_check_timeout: config.workspace_check_timeout(),
            request_timeout: config.request_timeout(),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Push serialized document content to the host for saving.
    pub fn push_content(&self, markdown: String) -> Result<(), HostError> {
        self.send(HostRequest::PushContent { markdown })
    }

    pub fn save_image(
        &self,
        placeholder_id: String,
        name: String,
        data: Vec<u8>,
        mime_type: String,
        target_folder: Option<String>,
    ) -> Result<(), HostError> {
        self.send(HostRequest::SaveImage {
            placeholder_id,
            name,
            data,
            mime_type,
            target_folder,
        })
    }

    pub fn resize_image(
        &self,
        image_path: String,
        new: (u32, u32),
        original: (u32, u32),
        image_data: Vec<u8>,
    ) -> Result<(), HostError> {
        self.send(HostRequest::ResizeImage {
            image_path,
            new_width: new.0,
            new_height: new.1,
            original_width: original.0,
            original_height: original.1,
            image_data,
        })
    }

    pub fn undo_resize(&self, image_path: String, backup_path: String) -> Result<(), HostError> {
        self.send(HostRequest::UndoResize {
            image_path,
            backup_path,
        })
    }

    pub fn redo_resize(
        &self,
        image_path: String,
        new: (u32, u32),
        image_data: Vec<u8>,
    ) -> Result<(), HostError> {
        self.send(HostRequest::RedoResize {
            image_path,
            new_width: new.0,
            new_height: new.1,
            image_data,
        })
    }

    /// Ask whether an image path is inside the workspace. The answer (or
    /// the timeout fallback) arrives keyed by the returned request id.
    pub fn check_image_in_workspace(&mut self, image_path: String) -> Result<RequestId, HostError> {
        let timeout = self.workspace_check_timeout;
        self.issue(Kind::WorkspaceCheck, timeout, |request_id| {
            HostRequest::CheckImageInWorkspace {
                image_path,
                request_id,
            }
        })
    }

    pub fn find_image_versions(&mut self, image_path: String) -> Result<RequestId, HostError> {
        let timeout = self.request_timeout;
        self.issue(Kind::ImageVersions, timeout, |request_id| {
            HostRequest::FindImageVersions {
                image_path,
                request_id,
            }
        })
    }

    /// Issue a file search. Each call supersedes the previous one; the
    /// earlier response, if it still arrives, is classified stale.
    pub fn search_files(
        &mut self,
        query: String,
        filters: Vec<String>,
    ) -> Result<RequestId, HostError> {
        let timeout = self.request_timeout;
        self.issue(Kind::FileSearch, timeout, |request_id| {
            HostRequest::SearchFiles {
                query,
                filters,
                request_id,
            }
        })
    }

    /// Classify an incoming response and settle its pending entry.
    pub fn accept(&mut self, response: &HostResponse) -> ResponseClass {
        let request_id = match response {
            HostResponse::WorkspaceCheck { request_id, .. }
            | HostResponse::ImageVersions { request_id, .. }
            | HostResponse::FileSearchResults { request_id, .. } => *request_id,
            _ => return ResponseClass::Uncorrelated,
        };
        let Some(pending) = self.pending.remove(&request_id) else {
            warn!("discarding response for unknown or expired request {request_id}");
            return ResponseClass::Stale;
        };
        if self.latest.get(&pending.kind) != Some(&request_id) {
            warn!("discarding superseded response for request {request_id}");
            return ResponseClass::Stale;
        }
        debug!("request {request_id} resolved");
        ResponseClass::Fresh
    }

    /// Collect requests past their deadline. Callers feed each expired
    /// entry's `fallback_response` back into their normal handling.
    pub fn expire(&mut self) -> Vec<Expired> {
        self.expire_at(Instant::now())
    }

    pub fn expire_at(&mut self, now: Instant) -> Vec<Expired> {
        let expired_ids: Vec<RequestId> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        expired_ids
            .into_iter()
            .map(|request_id| {
                let pending = self.pending.remove(&request_id).expect("collected above");
                warn!("request {request_id} timed out, using fallback");
                Expired {
                    request_id,
                    kind: pending.kind,
                }
            })
            .collect()
    }

    /// Deregister every pending request, as on editor teardown. Responses
    /// arriving afterwards classify as stale.
    pub fn cancel_all(&mut self) {
        self.pending.clear();
        self.latest.clear();
    }

    fn issue(
        &mut self,
        kind: Kind,
        timeout: Duration,
        build: impl FnOnce(RequestId) -> HostRequest,
    ) -> Result<RequestId, HostError> {
        self.next_id += 1;
        let request_id = self.next_id;
        self.send(build(request_id))?;
        self.pending.insert(
            request_id,
            Pending {
                kind,
                deadline: Instant::now() + timeout,
            },
        );
        self.latest.insert(kind, request_id);
        Ok(request_id)
    }

    fn send(&self, request: HostRequest) -> Result<(), HostError> {
        self.tx.send(request).map_err(|_| HostError::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn bridge() -> (HostBridge, crossbeam_channel::Receiver<HostRequest>) {
        let (tx, rx) = unbounded();
        (HostBridge::new(tx, &HostConfig::default()), rx)
    }

    fn workspace_response(request_id: RequestId) -> HostResponse {
        HostResponse::WorkspaceCheck {
            request_id,
            in_workspace: false,
            absolute_path: Some("/ws/img.png".into()),
        }
    }

    #[test]
    fn test_fresh_response_resolves() {
        let (mut bridge, rx) = bridge();
        let id = bridge.check_image_in_workspace("img.png".into()).unwrap();
        assert!(matches!(
            rx.try_recv().unwrap(),
            HostRequest::CheckImageInWorkspace { .. }
        ));
        assert_eq!(bridge.accept(&workspace_response(id)), ResponseClass::Fresh);
        assert_eq!(bridge.pending_count(), 0);
    }

    #[test]
    fn test_superseded_search_is_stale() {
        let (mut bridge, _rx) = bridge();
        let first = bridge.search_files("re".into(), vec![]).unwrap();
        let second = bridge.search_files("read".into(), vec![]).unwrap();

        let stale = HostResponse::FileSearchResults {
            request_id: first,
            results: vec![],
        };
        assert_eq!(bridge.accept(&stale), ResponseClass::Stale);

        let fresh = HostResponse::FileSearchResults {
            request_id: second,
            results: vec![],
        };
        assert_eq!(bridge.accept(&fresh), ResponseClass::Fresh);
    }

    #[test]
    fn test_duplicate_response_is_stale() {
        let (mut bridge, _rx) = bridge();
        let id = bridge.check_image_in_workspace("img.png".into()).unwrap();
        assert_eq!(bridge.accept(&workspace_response(id)), ResponseClass::Fresh);
        assert_eq!(bridge.accept(&workspace_response(id)), ResponseClass::Stale);
    }

    #[test]
    fn test_uncorrelated_responses_pass_through() {
        let (mut bridge, _rx) = bridge();
        let response = HostResponse::ContentChanged {
            markdown: "# hi\n".into(),
        };
        assert_eq!(bridge.accept(&response), ResponseClass::Uncorrelated);
    }

    #[test]
    fn test_workspace_check_timeout_defaults_to_in_workspace() {
        let (tx, _rx) = unbounded();
        let config = HostConfig {
            workspace_check_timeout_ms: 0,
            ..Default::default()
        };
        let mut bridge = HostBridge::new(tx, &config);
        let id = bridge.check_image_in_workspace("img.png".into()).unwrap();

        let expired = bridge.expire_at(Instant::now() + Duration::from_millis(1));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].request_id, id);
        let Some(HostResponse::WorkspaceCheck { in_workspace, .. }) =
            expired[0].fallback_response()
        else {
            panic!("expected workspace fallback");
        };
        assert!(in_workspace);

        // The real answer arriving late is stale.
        assert_eq!(bridge.accept(&workspace_response(id)), ResponseClass::Stale);
    }

    #[test]
    fn test_cancel_all_deregisters() {
        let (mut bridge, _rx) = bridge();
        let id = bridge.check_image_in_workspace("img.png".into()).unwrap();
        bridge.cancel_all();
        assert_eq!(bridge.pending_count(), 0);
        assert_eq!(bridge.accept(&workspace_response(id)), ResponseClass::Stale);
    }

    #[test]
    fn test_disconnected_channel_errors() {
        let (tx, rx) = unbounded();
        drop(rx);
        let mut bridge = HostBridge::new(tx, &HostConfig::default());
        assert!(matches!(
            bridge.check_image_in_workspace("img.png".into()),
            Err(HostError::Disconnected)
        ));
    }
}
