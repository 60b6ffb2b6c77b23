use chrono::{DateTime, Utc};

use crate::domain::{ChatId, MessageId};

/// One row of the recent chats listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatSummary {
    pub chat_id: ChatId,
    pub display_name: String,
    pub username: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SenderKind {
    User,
    Channel,
}

/// Author of a message: a user, or a channel/group posting as itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sender {
    pub id: i64,
    pub kind: SenderKind,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Channel or group title, for `SenderKind::Channel`.
    pub title: Option<String>,
    pub username: Option<String>,
}

impl Sender {
    pub fn user(id: i64, first_name: &str) -> Self {
        Self {
            id,
            kind: SenderKind::User,
            first_name: Some(first_name.to_string()),
            last_name: None,
            title: None,
            username: None,
        }
    }

    pub fn channel(id: i64, title: &str) -> Self {
        Self {
            id,
            kind: SenderKind::Channel,
            first_name: None,
            last_name: None,
            title: Some(title.to_string()),
            username: None,
        }
    }

    pub fn with_username(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }

    pub fn with_last_name(mut self, last_name: &str) -> Self {
        self.last_name = Some(last_name.to_string());
        self
    }

    pub fn display_name(&self) -> String {
        let name = match self.kind {
            SenderKind::User => [self.first_name.as_deref(), self.last_name.as_deref()]
                .into_iter()
                .flatten()
                .filter(|s| !s.trim().is_empty())
                .collect::<Vec<_>>()
                .join(" "),
            SenderKind::Channel => self.title.clone().unwrap_or_default(),
        };
        if name.trim().is_empty() {
            "unknown".to_string()
        } else {
            name
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    pub fn placeholder(self) -> &'static str {
        match self {
            MediaKind::Photo => "[photo]",
            MediaKind::Video => "[video]",
        }
    }
}

/// Opaque handle the messaging client can turn back into a download.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub file_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reaction {
    pub emoji: String,
    pub count: u32,
}

#[derive(Clone, Debug)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender: Option<Sender>,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub media: Option<MediaRef>,
    pub date: DateTime<Utc>,
    pub reply_to: Option<MessageId>,
    pub reactions: Vec<Reaction>,
}

impl Message {
    /// Text, or the media caption when there is no text.
    pub fn body(&self) -> Option<&str> {
        self.text
            .as_deref()
            .or(self.caption.as_deref())
            .filter(|s| !s.is_empty())
    }

    pub fn sender_id(&self) -> Option<i64> {
        self.sender.as_ref().map(|s| s.id)
    }
}
