//! Messaging transport capability and the records it hands out.
//!
//! The transport owns the connection, session and wire protocol. The pipeline
//! only sees plain data: dialogs with membership metadata, messages with text,
//! and chat folders with include/exclude rules.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

/// Reference to a chat entity, as stored in folder include/exclude lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Peer {
    Channel(i64),
    Chat(i64),
    User(i64),
}

/// What kind of entity sits behind a dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityKind {
    /// Broadcast channel, or a supergroup when `megagroup` is set.
    Channel {
        #[serde(default)]
        megagroup: bool,
    },
    /// Basic group chat.
    Chat,
    User,
}

/// A conversation handle. Identity is `peer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dialog {
    pub peer: Peer,
    /// Display name (channel title for channels).
    pub name: String,
    pub entity: EntityKind,
    #[serde(default)]
    pub unread_count: u32,
}

impl PartialEq for Dialog {
    fn eq(&self, other: &Self) -> bool {
        self.peer == other.peer
    }
}

impl Eq for Dialog {}

impl Dialog {
    /// Channel-type dialog: broadcast channel or supergroup.
    pub fn is_channel(&self) -> bool {
        matches!(self.entity, EntityKind::Channel { .. })
    }

    /// Group-type dialog: basic group or supergroup.
    pub fn is_group(&self) -> bool {
        matches!(
            self.entity,
            EntityKind::Chat | EntityKind::Channel { megagroup: true }
        )
    }

    pub fn is_user(&self) -> bool {
        matches!(self.entity, EntityKind::User)
    }

    /// Broadcast channel that is not a supergroup.
    pub fn is_broadcast(&self) -> bool {
        matches!(self.entity, EntityKind::Channel { megagroup: false })
    }

    pub fn has_unread(&self) -> bool {
        self.unread_count > 0
    }
}

/// A message inside a dialog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl Message {
    /// Text content, if present and not blank.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// A user-defined chat folder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Folder {
    pub title: String,
    #[serde(default)]
    pub include_peers: Vec<Peer>,
    #[serde(default)]
    pub exclude_peers: Vec<Peer>,
    /// Include every broadcast channel not otherwise excluded.
    #[serde(default)]
    pub broadcasts: bool,
}

/// Operations the triage run needs from the messaging service.
#[async_trait]
pub trait MessagingTransport: Send + Sync {
    /// All chat folders configured for the account.
    async fn list_folders(&self) -> Result<Vec<Folder>, ChannelError>;

    /// All dialogs of the account, in service order.
    async fn list_dialogs(&self) -> Result<Vec<Dialog>, ChannelError>;

    /// The `dialog.unread_count` most recent messages, oldest first. Forward
    /// batches keep this order.
    async fn get_unread_messages(&self, dialog: &Dialog) -> Result<Vec<Message>, ChannelError>;

    /// Forward `message_ids` from `from` to `to` in one operation.
    async fn forward_messages(
        &self,
        from: &Dialog,
        to: &Dialog,
        message_ids: &[i64],
    ) -> Result<(), ChannelError>;

    /// Mark the whole dialog history as read.
    async fn mark_read(&self, dialog: &Dialog) -> Result<(), ChannelError>;
}

// ── Dialog filters ──────────────────────────────────────────────────

/// Channel-type dialogs that are not groups.
pub fn channels(dialogs: &[Dialog]) -> Vec<Dialog> {
    dialogs
        .iter()
        .filter(|d| d.is_channel() && !d.is_group())
        .cloned()
        .collect()
}

pub fn groups(dialogs: &[Dialog]) -> Vec<Dialog> {
    dialogs.iter().filter(|d| d.is_group()).cloned().collect()
}

pub fn private_chats(dialogs: &[Dialog]) -> Vec<Dialog> {
    dialogs.iter().filter(|d| d.is_user()).cloned().collect()
}

pub fn with_unread(dialogs: Vec<Dialog>) -> Vec<Dialog> {
    dialogs.into_iter().filter(Dialog::has_unread).collect()
}
