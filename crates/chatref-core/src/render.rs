//! History rendering: raw message stream -> chronological transcript.
//!
//! `count` bounds the fetch window. A sender filter is applied after the fetch,
//! so a filtered transcript can hold fewer than `count` messages.

use std::{collections::HashMap, path::PathBuf};

use chrono::{DateTime, Local, Utc};

use crate::{
    domain::{ChatId, MessageId},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{MediaKind, Reaction, Sender},
    },
    Result,
};

const REPLY_OPEN: &str = "<-<-<-<-<-<-<-<-";
const REPLY_CLOSE: &str = "->->->->->->->->";
const SEPARATOR: &str = "- - - - - - - - - - - - - - - - - - - - - -";

#[derive(Clone, Copy, Debug)]
pub struct RenderOptions {
    pub count: usize,
    /// Keep only messages whose sender has this id.
    pub filter_sender: Option<ChatId>,
    /// Download photos/videos instead of printing a placeholder.
    pub include_media: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaLine {
    File(PathBuf),
    Placeholder(MediaKind),
}

#[derive(Clone, Debug)]
pub struct ReplyBlock {
    pub sender: String,
    pub media: Option<MediaKind>,
    pub text: Option<String>,
    pub date: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub enum ReplyPreview {
    Message(ReplyBlock),
    /// The reply target was deleted or is otherwise out of reach.
    Unavailable(MessageId),
}

#[derive(Clone, Debug)]
pub struct RenderedMessage {
    pub id: MessageId,
    pub reply: Option<ReplyPreview>,
    pub sender: String,
    pub media: Option<MediaLine>,
    pub text: Option<String>,
    pub reactions: Option<String>,
    pub date: DateTime<Utc>,
}

#[derive(Clone, Debug, Default)]
pub struct Transcript {
    /// Oldest first.
    pub messages: Vec<RenderedMessage>,
    /// Messages examined before the sender filter.
    pub fetched: usize,
}

pub struct HistoryRenderer<'a> {
    port: &'a dyn MessagingPort,
}

impl<'a> HistoryRenderer<'a> {
    pub fn new(port: &'a dyn MessagingPort) -> Self {
        Self { port }
    }

    pub async fn render(&self, chat_id: ChatId, opts: RenderOptions) -> Result<Transcript> {
        let mut messages = self.port.fetch_history(chat_id, opts.count).await?;
        let fetched = messages.len();

        if let Some(sender) = opts.filter_sender {
            messages.retain(|m| m.sender_id() == Some(sender.0));
        }

        messages.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));

        let mut downloaded: HashMap<String, PathBuf> = HashMap::new();
        let mut out = Vec::with_capacity(messages.len());
        for msg in &messages {
            let reply = match msg.reply_to {
                Some(target) => Some(self.reply_preview(chat_id, target).await?),
                None => None,
            };

            let media = match &msg.media {
                Some(media) if opts.include_media => {
                    let path = match downloaded.get(&media.file_id) {
                        Some(path) => path.clone(),
                        None => {
                            let path = self.port.download_media(media).await?;
                            tracing::debug!(file_id = %media.file_id, path = %path.display(), "downloaded media");
                            downloaded.insert(media.file_id.clone(), path.clone());
                            path
                        }
                    };
                    Some(MediaLine::File(path))
                }
                Some(media) => Some(MediaLine::Placeholder(media.kind)),
                None => None,
            };

            out.push(RenderedMessage {
                id: msg.id,
                reply,
                sender: sender_label(msg.sender.as_ref()),
                media,
                text: msg.body().map(str::to_string),
                reactions: reaction_summary(&msg.reactions),
                date: msg.date,
            });
        }

        Ok(Transcript {
            messages: out,
            fetched,
        })
    }

    async fn reply_preview(&self, chat_id: ChatId, target: MessageId) -> Result<ReplyPreview> {
        match self.port.fetch_message(chat_id, target).await {
            Ok(replied) => Ok(ReplyPreview::Message(ReplyBlock {
                sender: sender_label(replied.sender.as_ref()),
                media: replied.media.as_ref().map(|m| m.kind),
                text: replied.body().map(str::to_string),
                date: replied.date,
            })),
            Err(Error::MessageNotFound { .. }) => {
                tracing::warn!(chat_id = %chat_id, message_id = %target, "reply target unavailable");
                Ok(ReplyPreview::Unavailable(target))
            }
            Err(e) => Err(e),
        }
    }
}

/// `Name == @handle`, or `Name == id:<id>` when there is no handle.
pub fn sender_label(sender: Option<&Sender>) -> String {
    let Some(sender) = sender else {
        return "unknown".to_string();
    };
    let name = sender.display_name();
    match sender.username.as_deref().filter(|u| !u.is_empty()) {
        Some(username) => format!("{name} == @{username}"),
        None => format!("{name} == id:{}", sender.id),
    }
}

/// `3 👍; 1 🔥`, or `None` when there are no reactions.
pub fn reaction_summary(reactions: &[Reaction]) -> Option<String> {
    if reactions.is_empty() {
        return None;
    }
    Some(
        reactions
            .iter()
            .map(|r| format!("{} {}", r.count, r.emoji))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn format_transcript(messages: &[RenderedMessage]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for msg in messages {
        match &msg.reply {
            Some(ReplyPreview::Message(reply)) => {
                lines.push(format!("{REPLY_OPEN} in reply to {}:", reply.sender));
                if let Some(kind) = reply.media {
                    lines.push(format!("\t{}", kind.placeholder()));
                }
                if let Some(text) = &reply.text {
                    lines.push(format!("\tText: {text}"));
                }
                lines.push(format!("\t| {} |", format_date(&reply.date)));
                lines.push(REPLY_CLOSE.to_string());
            }
            Some(ReplyPreview::Unavailable(id)) => {
                lines.push(format!("{REPLY_OPEN} in reply to message {id} (unavailable)"));
                lines.push(REPLY_CLOSE.to_string());
            }
            None => {}
        }

        lines.push(msg.sender.clone());
        match &msg.media {
            Some(MediaLine::File(path)) => lines.push(format!("file://{}", path.display())),
            Some(MediaLine::Placeholder(kind)) => lines.push(kind.placeholder().to_string()),
            None => {}
        }
        if let Some(text) = &msg.text {
            lines.push(format!("Text: {text}"));
        }
        if let Some(reactions) = &msg.reactions {
            lines.push(format!("Reactions: {reactions}"));
        }
        lines.push(format!("| {} |", format_date(&msg.date)));
        lines.push(SEPARATOR.to_string());
    }
    lines.join("\n")
}
