//! In-memory `MessagingPort` for tests.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{ChatSummary, MediaKind, MediaRef, Message, Reaction, Sender},
    },
    Result,
};

#[derive(Default)]
pub(crate) struct FakeMessenger {
    pub chats: Vec<ChatSummary>,
    pub handles: HashMap<String, ChatId>,
    pub messages: HashMap<ChatId, Vec<Message>>,
    pub fail_connect: bool,

    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub fetch_message_calls: AtomicUsize,
    pub downloads: Mutex<Vec<MediaRef>>,
    pub sent: Mutex<Vec<(ChatId, String)>>,
}

impl FakeMessenger {
    pub fn with_chat(mut self, id: i64, name: &str) -> Self {
        self.chats.push(ChatSummary {
            chat_id: ChatId(id),
            display_name: name.to_string(),
            username: None,
        });
        self
    }

    pub fn with_handle(mut self, handle: &str, id: i64) -> Self {
        self.handles.insert(handle.to_string(), ChatId(id));
        self
    }

    pub fn with_message(mut self, msg: Message) -> Self {
        self.messages.entry(msg.chat_id).or_default().push(msg);
        self
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn fetch_message_count(&self) -> usize {
        self.fetch_message_calls.load(Ordering::SeqCst)
    }

    pub fn downloaded(&self) -> Vec<MediaRef> {
        self.downloads.lock().unwrap().clone()
    }

    pub fn sent_messages(&self) -> Vec<(ChatId, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    async fn connect(&self) -> Result<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect {
            return Err(Error::RemoteUnavailable("fake is offline".to_string()));
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_recent_chats(&self, limit: usize) -> Result<Vec<ChatSummary>> {
        Ok(self.chats.iter().take(limit).cloned().collect())
    }

    async fn resolve_handle(&self, handle: &str) -> Result<ChatId> {
        self.handles
            .get(handle)
            .copied()
            .ok_or_else(|| Error::UnknownPeer(handle.to_string()))
    }

    async fn fetch_history(&self, chat_id: ChatId, limit: usize) -> Result<Vec<Message>> {
        let mut msgs = self.messages.get(&chat_id).cloned().unwrap_or_default();
        msgs.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        msgs.truncate(limit);
        Ok(msgs)
    }

    async fn fetch_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<Message> {
        self.fetch_message_calls.fetch_add(1, Ordering::SeqCst);
        self.messages
            .get(&chat_id)
            .and_then(|msgs| msgs.iter().find(|m| m.id == message_id))
            .cloned()
            .ok_or(Error::MessageNotFound {
                chat_id,
                message_id,
            })
    }

    async fn download_media(&self, media: &MediaRef) -> Result<PathBuf> {
        self.downloads.lock().unwrap().push(media.clone());
        Ok(PathBuf::from(format!("/tmp/fake/{}", media.file_id)))
    }

    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        if chat_id.0 == 0 {
            return Err(Error::InvalidPeer(chat_id.to_string()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((chat_id, text.to_string()));
        Ok(MessageRef {
            chat_id,
            message_id: MessageId(sent.len() as i32),
        })
    }
}

pub(crate) fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap()
}

/// Plain text message from `sender` at 12:`minute`.
pub(crate) fn text_message(chat: i64, id: i32, minute: u32, sender: Sender, text: &str) -> Message {
    Message {
        id: MessageId(id),
        chat_id: ChatId(chat),
        sender: Some(sender),
        text: Some(text.to_string()),
        caption: None,
        media: None,
        date: at(minute),
        reply_to: None,
        reactions: Vec::new(),
    }
}

pub(crate) fn photo_message(chat: i64, id: i32, minute: u32, sender: Sender, file_id: &str) -> Message {
    Message {
        text: None,
        media: Some(MediaRef {
            kind: MediaKind::Photo,
            file_id: file_id.to_string(),
        }),
        ..text_message(chat, id, minute, sender, "")
    }
}

pub(crate) fn reaction(emoji: &str, count: u32) -> Reaction {
    Reaction {
        emoji: emoji.to_string(),
        count,
    }
}
