//! Snapshot transport: serves folders and dialogs from a JSON export.
//!
//! Stands in for a live session: forwards and mark-reads are applied to the
//! in-memory snapshot and recorded in an action log, and the updated snapshot
//! can be written back so a later run only sees what is still unread.
//!
//! Message order inside a dialog is chronological (oldest first); unread
//! messages are the last `unread_count` of them.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::channels::transport::{Dialog, Folder, Message, MessagingTransport, Peer};
use crate::error::ChannelError;

/// A dialog together with its message history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDialog {
    #[serde(flatten)]
    pub dialog: Dialog,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// On-disk snapshot format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub folders: Vec<Folder>,
    #[serde(default)]
    pub dialogs: Vec<SnapshotDialog>,
}

/// Side effect applied through the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TransportAction {
    Forwarded {
        from: Peer,
        to: Peer,
        message_ids: Vec<i64>,
    },
    MarkedRead {
        peer: Peer,
    },
}

#[derive(Debug, Default)]
struct Faults {
    list_folders: bool,
    list_dialogs: bool,
    forward: HashSet<Peer>,
    mark_read: HashSet<Peer>,
}

/// File- or memory-backed `MessagingTransport`.
pub struct SnapshotTransport {
    snapshot: RwLock<Snapshot>,
    actions: RwLock<Vec<TransportAction>>,
    faults: RwLock<Faults>,
}

impl SnapshotTransport {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
            actions: RwLock::new(Vec::new()),
            faults: RwLock::new(Faults::default()),
        }
    }

    /// Load a snapshot from a JSON file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ChannelError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ChannelError::Snapshot(format!("{}: {e}", path.display())))?;
        let snapshot: Snapshot = serde_json::from_str(&raw)
            .map_err(|e| ChannelError::Snapshot(format!("{}: {e}", path.display())))?;

        info!(
            path = %path.display(),
            folders = snapshot.folders.len(),
            dialogs = snapshot.dialogs.len(),
            "Loaded dialog snapshot"
        );
        Ok(Self::new(snapshot))
    }

    /// Write the current snapshot state (including read markers) to `path`.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), ChannelError> {
        let path = path.as_ref();
        let json = {
            let snapshot = self.snapshot.read().await;
            serde_json::to_string_pretty(&*snapshot)
                .map_err(|e| ChannelError::Snapshot(e.to_string()))?
        };
        tokio::fs::write(path, json)
            .await
            .map_err(|e| ChannelError::Snapshot(format!("{}: {e}", path.display())))
    }

    /// Every forward and mark-read applied so far, in order.
    pub async fn actions(&self) -> Vec<TransportAction> {
        self.actions.read().await.clone()
    }

    pub async fn unread_count(&self, peer: Peer) -> Option<u32> {
        self.snapshot
            .read()
            .await
            .dialogs
            .iter()
            .find(|d| d.dialog.peer == peer)
            .map(|d| d.dialog.unread_count)
    }

    // ── Fault injection ─────────────────────────────────────────────

    pub async fn fail_folder_listing(&self) {
        self.faults.write().await.list_folders = true;
    }

    pub async fn fail_dialog_listing(&self) {
        self.faults.write().await.list_dialogs = true;
    }

    pub async fn fail_forward_from(&self, peer: Peer) {
        self.faults.write().await.forward.insert(peer);
    }

    pub async fn fail_mark_read(&self, peer: Peer) {
        self.faults.write().await.mark_read.insert(peer);
    }
}

#[async_trait]
impl MessagingTransport for SnapshotTransport {
    async fn list_folders(&self) -> Result<Vec<Folder>, ChannelError> {
        if self.faults.read().await.list_folders {
            return Err(ChannelError::FetchFailed {
                what: "chat folders".into(),
                reason: "injected failure".into(),
            });
        }
        Ok(self.snapshot.read().await.folders.clone())
    }

    async fn list_dialogs(&self) -> Result<Vec<Dialog>, ChannelError> {
        if self.faults.read().await.list_dialogs {
            return Err(ChannelError::FetchFailed {
                what: "dialogs".into(),
                reason: "injected failure".into(),
            });
        }
        Ok(self
            .snapshot
            .read()
            .await
            .dialogs
            .iter()
            .map(|d| d.dialog.clone())
            .collect())
    }

    async fn get_unread_messages(&self, dialog: &Dialog) -> Result<Vec<Message>, ChannelError> {
        let snapshot = self.snapshot.read().await;
        let entry = snapshot
            .dialogs
            .iter()
            .find(|d| d.dialog.peer == dialog.peer)
            .ok_or_else(|| ChannelError::FetchFailed {
                what: format!("messages of {}", dialog.name),
                reason: "dialog not in snapshot".into(),
            })?;

        let count = dialog.unread_count as usize;
        let skip = entry.messages.len().saturating_sub(count);
        Ok(entry.messages[skip..].to_vec())
    }

    async fn forward_messages(
        &self,
        from: &Dialog,
        to: &Dialog,
        message_ids: &[i64],
    ) -> Result<(), ChannelError> {
        if self.faults.read().await.forward.contains(&from.peer) {
            return Err(ChannelError::ForwardFailed {
                dialog: from.name.clone(),
                reason: "injected failure".into(),
            });
        }

        {
            let snapshot = self.snapshot.read().await;
            let known = |peer: Peer| snapshot.dialogs.iter().any(|d| d.dialog.peer == peer);
            if !known(from.peer) || !known(to.peer) {
                return Err(ChannelError::ForwardFailed {
                    dialog: from.name.clone(),
                    reason: "unknown source or target dialog".into(),
                });
            }
        }

        debug!(from = %from.name, to = %to.name, count = message_ids.len(), "Forwarding");
        self.actions.write().await.push(TransportAction::Forwarded {
            from: from.peer,
            to: to.peer,
            message_ids: message_ids.to_vec(),
        });
        Ok(())
    }

    async fn mark_read(&self, dialog: &Dialog) -> Result<(), ChannelError> {
        if self.faults.read().await.mark_read.contains(&dialog.peer) {
            return Err(ChannelError::MarkReadFailed {
                dialog: dialog.name.clone(),
                reason: "injected failure".into(),
            });
        }

        {
            let mut snapshot = self.snapshot.write().await;
            let entry = snapshot
                .dialogs
                .iter_mut()
                .find(|d| d.dialog.peer == dialog.peer)
                .ok_or_else(|| ChannelError::MarkReadFailed {
                    dialog: dialog.name.clone(),
                    reason: "dialog not in snapshot".into(),
                })?;
            entry.dialog.unread_count = 0;
        }

        self.actions
            .write()
            .await
            .push(TransportAction::MarkedRead { peer: dialog.peer });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::transport::EntityKind;

    fn message(id: i64, text: &str) -> Message {
        Message {
            id,
            text: Some(text.into()),
            date: None,
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            folders: vec![Folder {
                title: "AI".into(),
                include_peers: vec![Peer::Channel(1)],
                ..Default::default()
            }],
            dialogs: vec![
                SnapshotDialog {
                    dialog: Dialog {
                        peer: Peer::Channel(1),
                        name: "Rust News".into(),
                        entity: EntityKind::Channel { megagroup: false },
                        unread_count: 2,
                    },
                    messages: vec![message(10, "old"), message(11, "new a"), message(12, "new b")],
                },
                SnapshotDialog {
                    dialog: Dialog {
                        peer: Peer::Channel(2),
                        name: "Digest".into(),
                        entity: EntityKind::Channel { megagroup: false },
                        unread_count: 0,
                    },
                    messages: vec![],
                },
            ],
        }
    }

    #[tokio::test]
    async fn unread_messages_are_the_latest_in_order() {
        let transport = SnapshotTransport::new(snapshot());
        let dialogs = transport.list_dialogs().await.unwrap();

        let messages = transport.get_unread_messages(&dialogs[0]).await.unwrap();
        let ids: Vec<i64> = messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![11, 12]);
    }

    #[tokio::test]
    async fn unread_count_larger_than_history_returns_everything() {
        let mut snap = snapshot();
        snap.dialogs[0].dialog.unread_count = 50;
        let transport = SnapshotTransport::new(snap);
        let dialogs = transport.list_dialogs().await.unwrap();
        assert_eq!(transport.get_unread_messages(&dialogs[0]).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn mark_read_clears_unread_and_logs() {
        let transport = SnapshotTransport::new(snapshot());
        let dialogs = transport.list_dialogs().await.unwrap();

        transport.mark_read(&dialogs[0]).await.unwrap();
        assert_eq!(transport.unread_count(Peer::Channel(1)).await, Some(0));
        assert_eq!(
            transport.actions().await,
            vec![TransportAction::MarkedRead { peer: Peer::Channel(1) }]
        );
    }

    #[tokio::test]
    async fn forward_records_batch() {
        let transport = SnapshotTransport::new(snapshot());
        let dialogs = transport.list_dialogs().await.unwrap();

        transport
            .forward_messages(&dialogs[0], &dialogs[1], &[11, 12])
            .await
            .unwrap();
        assert_eq!(
            transport.actions().await,
            vec![TransportAction::Forwarded {
                from: Peer::Channel(1),
                to: Peer::Channel(2),
                message_ids: vec![11, 12],
            }]
        );
    }

    #[tokio::test]
    async fn injected_faults_surface_as_errors() {
        let transport = SnapshotTransport::new(snapshot());
        let dialogs = transport.list_dialogs().await.unwrap();

        transport.fail_forward_from(Peer::Channel(1)).await;
        transport.fail_mark_read(Peer::Channel(1)).await;
        transport.fail_folder_listing().await;

        assert!(transport.forward_messages(&dialogs[0], &dialogs[1], &[11]).await.is_err());
        assert!(transport.mark_read(&dialogs[0]).await.is_err());
        assert!(transport.list_folders().await.is_err());
        assert!(transport.actions().await.is_empty());
    }

    #[tokio::test]
    async fn load_and_save_round_trip_read_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dialogs.json");
        tokio::fs::write(&path, serde_json::to_string(&snapshot()).unwrap())
            .await
            .unwrap();

        let transport = SnapshotTransport::load(&path).await.unwrap();
        let dialogs = transport.list_dialogs().await.unwrap();
        transport.mark_read(&dialogs[0]).await.unwrap();
        transport.save(&path).await.unwrap();

        let reloaded = SnapshotTransport::load(&path).await.unwrap();
        assert_eq!(reloaded.unread_count(Peer::Channel(1)).await, Some(0));
        assert_eq!(reloaded.list_folders().await.unwrap()[0].title, "AI");
    }

    #[tokio::test]
    async fn load_missing_file_fails() {
        let result = SnapshotTransport::load("/nonexistent/dialogs.json").await;
        assert!(matches!(result, Err(ChannelError::Snapshot(_))));
    }
}
