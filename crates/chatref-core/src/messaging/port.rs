use std::path::PathBuf;

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId, MessageRef},
    messaging::types::{ChatSummary, MediaRef, Message},
    Result,
};

/// Messaging client port.
///
/// Telegram is the only implementation today. Everything about transport,
/// authentication and rate limits lives behind this trait; the core only sees
/// these operations.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn connect(&self) -> Result<()>;
    async fn disconnect(&self) -> Result<()>;

    async fn list_recent_chats(&self, limit: usize) -> Result<Vec<ChatSummary>>;

    /// Look up a username/handle. Fails with `Error::UnknownPeer` when nothing matches.
    async fn resolve_handle(&self, handle: &str) -> Result<ChatId>;

    /// Up to `limit` most recent messages, newest first.
    async fn fetch_history(&self, chat_id: ChatId, limit: usize) -> Result<Vec<Message>>;
    async fn fetch_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<Message>;

    /// Download media to a local file and return its path.
    async fn download_media(&self, media: &MediaRef) -> Result<PathBuf>;

    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;
}
