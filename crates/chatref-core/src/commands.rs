//! Command implementations. Each returns the text to print.

use std::collections::BTreeMap;

use unicode_width::UnicodeWidthStr;

use crate::{
    domain::ChatId,
    errors::Error,
    fingerprint::FINGERPRINT_LEN,
    render::{format_transcript, HistoryRenderer, RenderOptions},
    session::Session,
    store::{insert_chat, HashTable, IdentityStore, TagTable},
    Result,
};

const ID_WIDTH: usize = 17;

#[derive(Clone, Debug)]
pub struct ShowArgs {
    pub count: usize,
    /// Download photos/videos (`false` for `--nofiles`).
    pub files: bool,
    /// Only keep messages from this sender (any resolvable token).
    pub by: Option<String>,
}

/// List recent chats and remember their fingerprints.
pub async fn chats(session: &Session, count: usize) -> Result<String> {
    let listed = session.port().list_recent_chats(count).await?;
    if listed.is_empty() {
        return Ok("No chats.".to_string());
    }

    let tags = session.store().load_tags()?;
    let tags_by_chat = tags_by_chat(&tags);

    let mut discovered = HashTable::new();
    let mut rows = Vec::with_capacity(listed.len());
    for chat in &listed {
        let fp = insert_chat(&mut discovered, chat.chat_id);
        let tag = tags_by_chat
            .get(&chat.chat_id)
            .map(|t| t.join(","))
            .unwrap_or_default();
        rows.push([
            fp.into_string(),
            chat.chat_id.to_string(),
            chat.display_name.clone(),
            tag,
        ]);
    }

    session.store().save_hashes(&discovered)?;

    let widths = [
        FINGERPRINT_LEN,
        rows.iter()
            .map(|r| display_width(&r[1]))
            .max()
            .unwrap_or(0)
            .max(ID_WIDTH),
        rows.iter()
            .map(|r| display_width(&r[2]))
            .max()
            .unwrap_or(0)
            .max(display_width("NAME")),
        rows.iter()
            .map(|r| display_width(&r[3]))
            .max()
            .unwrap_or(0)
            .max(display_width("TAG")),
    ];

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(table_row(&["HASH", "ID", "NAME", "TAG"], &widths));
    for row in &rows {
        let cells = [
            row[0].as_str(),
            row[1].as_str(),
            row[2].as_str(),
            row[3].as_str(),
        ];
        lines.push(table_row(&cells, &widths));
    }
    Ok(lines.join("\n"))
}

pub async fn send(session: &Session, chat: &str, text: &str) -> Result<String> {
    if text.trim().is_empty() {
        return Err(Error::InvalidArgument("message text is empty".to_string()));
    }
    let resolved = session.resolve(chat).await?;
    session.port().send_message(resolved.chat_id, text).await?;
    Ok(format!("Sent to {}.", resolved.chat_id))
}

pub async fn tag(session: &Session, chat: &str, tag: &str) -> Result<String> {
    let tag = tag.trim();
    validate_tag(tag)?;

    let resolved = session.resolve(chat).await?;
    let mut tags = session.store().load_tags()?;
    if let Some(previous) = tags.insert(tag.to_string(), resolved.chat_id) {
        if previous != resolved.chat_id {
            tracing::info!(tag, from = %previous, to = %resolved.chat_id, "tag moved");
        }
    }
    session.store().save_tags(&tags)?;
    Ok(format!("Tag '{tag}' added to chat {}", resolved.chat_id))
}

/// Needs no remote connection.
pub fn get_tags(store: &IdentityStore) -> Result<String> {
    let tags = store.load_tags()?;
    if tags.is_empty() {
        return Ok("No tags.".to_string());
    }
    let mut lines = vec!["Tags:".to_string()];
    lines.extend(tags.iter().map(|(tag, chat_id)| format!("{tag}: {chat_id}")));
    Ok(lines.join("\n"))
}

pub async fn show(session: &Session, chat: &str, args: ShowArgs) -> Result<String> {
    let chat_id = session.resolve(chat).await?.chat_id;
    let filter_sender = match args.by.as_deref() {
        Some(by) => Some(session.resolve(by).await?.chat_id),
        None => None,
    };

    let transcript = HistoryRenderer::new(session.port())
        .render(
            chat_id,
            RenderOptions {
                count: args.count,
                filter_sender,
                include_media: args.files,
            },
        )
        .await?;

    if transcript.messages.is_empty() {
        return Ok(match filter_sender {
            Some(sender) => format!(
                "No messages from {sender} among the last {} fetched.",
                transcript.fetched
            ),
            None => "No messages.".to_string(),
        });
    }

    let mut out = format_transcript(&transcript.messages);
    if let Some(sender) = filter_sender {
        if transcript.messages.len() < transcript.fetched {
            out.push_str(&format!(
                "\n{} of the last {} messages are from {sender}.",
                transcript.messages.len(),
                transcript.fetched
            ));
        }
    }
    Ok(out)
}

fn validate_tag(tag: &str) -> Result<()> {
    if tag.is_empty() {
        return Err(Error::InvalidArgument("tag is empty".to_string()));
    }
    if tag.chars().any(char::is_whitespace) {
        return Err(Error::InvalidArgument(format!(
            "tag '{tag}' must not contain whitespace"
        )));
    }
    Ok(())
}

fn tags_by_chat(tags: &TagTable) -> BTreeMap<ChatId, Vec<&str>> {
    let mut out: BTreeMap<ChatId, Vec<&str>> = BTreeMap::new();
    for (tag, chat_id) in tags {
        out.entry(*chat_id).or_default().push(tag.as_str());
    }
    out
}

fn table_row(cells: &[&str], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| pad_right(cell, *width))
        .collect::<Vec<_>>()
        .join("\t")
        .trim_end()
        .to_string()
}

fn display_width(value: &str) -> usize {
    UnicodeWidthStr::width(value)
}

fn pad_right(value: &str, width: usize) -> String {
    let mut output = value.to_string();
    let current = display_width(value);
    if current < width {
        output.push_str(&" ".repeat(width - current));
    }
    output
}
