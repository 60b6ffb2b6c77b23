use std::path::PathBuf;

use crate::domain::{ChatId, MessageId};

/// Core error type.
///
/// Adapter crates map their transport errors into this type so every command
/// fails the same way: one human-readable line, no retries.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt state in {path}: {source}")]
    CorruptState {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no chat given")]
    MissingChat,

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("ambiguous fingerprint prefix '{prefix}', matches: {}", .candidates.join(", "))]
    AmbiguousPrefix {
        prefix: String,
        candidates: Vec<String>,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown peer: {0}")]
    UnknownPeer(String),

    #[error("invalid peer: {0}")]
    InvalidPeer(String),

    #[error("message {message_id} not found in chat {chat_id}")]
    MessageNotFound {
        chat_id: ChatId,
        message_id: MessageId,
    },

    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
