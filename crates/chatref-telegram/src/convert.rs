//! teloxide types -> core messaging types.

use teloxide::types::{Chat, User};

use chatref_core::{
    domain::{ChatId, MessageId},
    messaging::types::{ChatSummary, MediaKind, MediaRef, Message, Sender},
};

pub(crate) fn chat_summary(chat: &Chat) -> ChatSummary {
    ChatSummary {
        chat_id: ChatId(chat.id.0),
        display_name: chat_display_name(chat),
        username: chat.username().map(str::to_string),
    }
}

pub(crate) fn chat_display_name(chat: &Chat) -> String {
    if let Some(title) = chat.title() {
        return title.to_string();
    }
    let name = join_name(chat.first_name(), chat.last_name());
    if !name.is_empty() {
        return name;
    }
    match chat.username() {
        Some(u) => format!("@{u}"),
        None => chat.id.0.to_string(),
    }
}

pub(crate) fn message(msg: &teloxide::types::Message) -> Message {
    Message {
        id: MessageId(msg.id.0),
        chat_id: ChatId(msg.chat.id.0),
        sender: sender(msg),
        text: msg.text().map(str::to_string),
        caption: msg.caption().map(str::to_string),
        media: media(msg),
        date: msg.date,
        reply_to: msg.reply_to_message().map(|r| MessageId(r.id.0)),
        // The Bot API does not deliver reaction counts with messages.
        reactions: Vec::new(),
    }
}

/// Channel posts and anonymous admins carry `sender_chat`; it wins over `from`.
fn sender(msg: &teloxide::types::Message) -> Option<Sender> {
    if let Some(chat) = msg.sender_chat() {
        let mut s = Sender::channel(chat.id.0, &chat_display_name(chat));
        if let Some(u) = chat.username() {
            s = s.with_username(u);
        }
        return Some(s);
    }
    msg.from().map(user_sender)
}

fn user_sender(user: &User) -> Sender {
    let mut s = Sender::user(user.id.0 as i64, &user.first_name);
    if let Some(last) = user.last_name.as_deref() {
        s = s.with_last_name(last);
    }
    if let Some(u) = user.username.as_deref() {
        s = s.with_username(u);
    }
    s
}

fn media(msg: &teloxide::types::Message) -> Option<MediaRef> {
    if let Some(sizes) = msg.photo() {
        // Sizes are ordered smallest first.
        return sizes.last().map(|p| MediaRef {
            kind: MediaKind::Photo,
            file_id: p.file.id.clone(),
        });
    }
    msg.video().map(|v| MediaRef {
        kind: MediaKind::Video,
        file_id: v.file.id.clone(),
    })
}

fn join_name(first: Option<&str>, last: Option<&str>) -> String {
    [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Local file name for a downloaded media item.
pub(crate) fn media_file_name(media: &MediaRef) -> String {
    let stem: String = media
        .file_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(96)
        .collect();
    let stem = if stem.is_empty() { "media".to_string() } else { stem };
    let ext = match media.kind {
        MediaKind::Photo => "jpg",
        MediaKind::Video => "mp4",
    };
    format!("{stem}.{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_joining_skips_blanks() {
        assert_eq!(join_name(Some("Ada"), Some("Lovelace")), "Ada Lovelace");
        assert_eq!(join_name(Some("Ada"), Some("  ")), "Ada");
        assert_eq!(join_name(None, None), "");
    }

    #[test]
    fn media_file_names() {
        let photo = MediaRef {
            kind: MediaKind::Photo,
            file_id: "AgAC/BQ+x_y-z".to_string(),
        };
        assert_eq!(media_file_name(&photo), "AgACBQx_y-z.jpg");

        let video = MediaRef {
            kind: MediaKind::Video,
            file_id: "///".to_string(),
        };
        assert_eq!(media_file_name(&video), "media.mp4");
    }
}
