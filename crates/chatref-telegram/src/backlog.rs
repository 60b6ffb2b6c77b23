//! In-memory index over the pending update backlog.
//!
//! Bots have no dialog list or history endpoint; what the bot can see is the
//! set of updates Telegram still holds for it. `Backlog` indexes those by chat
//! and message id for the duration of one session.

use std::collections::{BTreeMap, HashMap};

use chatref_core::{
    domain::{ChatId, MessageId},
    messaging::types::{ChatSummary, Message},
};

#[derive(Debug, Default)]
pub struct Backlog {
    chats: HashMap<ChatId, ChatSummary>,
    messages: BTreeMap<(ChatId, MessageId), Message>,
}

impl Backlog {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.chats.clear();
        self.messages.clear();
    }

    /// Index a message seen in the backlog. Later versions (edits) replace
    /// earlier ones.
    pub fn insert(&mut self, chat: ChatSummary, message: Message) {
        self.chats.insert(chat.chat_id, chat);
        self.messages
            .insert((message.chat_id, message.id), message);
    }

    /// Index a message only seen as a reply target. Never replaces a message
    /// delivered in its own right.
    pub fn insert_reply_target(&mut self, message: Message) {
        self.messages
            .entry((message.chat_id, message.id))
            .or_insert(message);
    }

    /// Chats ordered by most recent activity, newest first.
    pub fn recent_chats(&self, limit: usize) -> Vec<ChatSummary> {
        let mut last_seen: HashMap<ChatId, (chrono::DateTime<chrono::Utc>, MessageId)> =
            HashMap::new();
        for ((chat_id, id), msg) in &self.messages {
            if !self.chats.contains_key(chat_id) {
                continue;
            }
            let entry = last_seen.entry(*chat_id).or_insert((msg.date, *id));
            if (msg.date, *id) > *entry {
                *entry = (msg.date, *id);
            }
        }

        let mut ordered: Vec<_> = last_seen.into_iter().collect();
        ordered.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ordered
            .into_iter()
            .take(limit)
            .filter_map(|(chat_id, _)| self.chats.get(&chat_id).cloned())
            .collect()
    }

    pub fn find_username(&self, handle: &str) -> Option<ChatId> {
        self.chats
            .values()
            .find(|c| {
                c.username
                    .as_deref()
                    .is_some_and(|u| u.eq_ignore_ascii_case(handle))
            })
            .map(|c| c.chat_id)
    }

    /// Up to `limit` messages of one chat, newest first.
    pub fn history(&self, chat_id: ChatId, limit: usize) -> Vec<Message> {
        let mut msgs: Vec<Message> = self
            .messages
            .range((chat_id, MessageId(i32::MIN))..=(chat_id, MessageId(i32::MAX)))
            .map(|(_, m)| m.clone())
            .collect();
        msgs.sort_by(|a, b| (b.date, b.id).cmp(&(a.date, a.id)));
        msgs.truncate(limit);
        msgs
    }

    pub fn get(&self, chat_id: ChatId, message_id: MessageId) -> Option<Message> {
        self.messages.get(&(chat_id, message_id)).cloned()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn chat(id: i64, name: &str, username: Option<&str>) -> ChatSummary {
        ChatSummary {
            chat_id: ChatId(id),
            display_name: name.to_string(),
            username: username.map(str::to_string),
        }
    }

    fn msg(chat_id: i64, id: i32, minute: u32, text: &str) -> Message {
        Message {
            id: MessageId(id),
            chat_id: ChatId(chat_id),
            sender: None,
            text: Some(text.to_string()),
            caption: None,
            media: None,
            date: Utc
                .with_ymd_and_hms(2024, 5, 1, 12, minute, 0)
                .single()
                .unwrap(),
            reply_to: None,
            reactions: Vec::new(),
        }
    }

    #[test]
    fn recent_chats_by_last_activity() {
        let mut b = Backlog::default();
        b.insert(chat(1, "one", None), msg(1, 10, 1, "a"));
        b.insert(chat(2, "two", None), msg(2, 5, 3, "b"));
        b.insert(chat(1, "one", None), msg(1, 11, 2, "c"));
        b.insert(chat(3, "three", None), msg(3, 1, 0, "d"));

        let names: Vec<_> = b
            .recent_chats(10)
            .into_iter()
            .map(|c| c.display_name)
            .collect();
        assert_eq!(names, vec!["two", "one", "three"]);
        assert_eq!(b.recent_chats(1).len(), 1);
    }

    #[test]
    fn reply_targets_do_not_list_chats_or_replace_messages() {
        let mut b = Backlog::default();
        b.insert(chat(1, "one", None), msg(1, 10, 1, "original"));
        b.insert_reply_target(msg(1, 10, 1, "stale copy"));
        b.insert_reply_target(msg(9, 3, 0, "only a target"));

        assert_eq!(b.get(ChatId(1), MessageId(10)).unwrap().text.as_deref(), Some("original"));
        assert!(b.get(ChatId(9), MessageId(3)).is_some());
        assert_eq!(b.recent_chats(10).len(), 1);
    }

    #[test]
    fn history_is_newest_first_and_scoped_to_chat() {
        let mut b = Backlog::default();
        b.insert(chat(1, "one", None), msg(1, 1, 1, "first"));
        b.insert(chat(1, "one", None), msg(1, 2, 2, "second"));
        b.insert(chat(1, "one", None), msg(1, 3, 3, "third"));
        b.insert(chat(2, "two", None), msg(2, 4, 4, "elsewhere"));

        let ids: Vec<_> = b.history(ChatId(1), 2).iter().map(|m| m.id.0).collect();
        assert_eq!(ids, vec![3, 2]);
        assert!(b.history(ChatId(7), 5).is_empty());
    }

    #[test]
    fn username_lookup_ignores_case() {
        let mut b = Backlog::default();
        b.insert(chat(5, "news", Some("NewsRoom")), msg(5, 1, 0, "x"));
        assert_eq!(b.find_username("newsroom"), Some(ChatId(5)));
        assert_eq!(b.find_username("other"), None);

        b.clear();
        assert!(b.is_empty());
    }
}
