//! Telegram adapter (teloxide).
//!
//! This crate implements the `chatref-core` MessagingPort over the Telegram Bot API.
//! Chat listings and history are served from the bot's pending update backlog,
//! which is read without acknowledging it.

use std::path::PathBuf;

use async_trait::async_trait;

use teloxide::{
    net::Download,
    prelude::*,
    types::{Recipient, Update, UpdateKind},
    ApiError, DownloadError, RequestError,
};

use tokio::{sync::Mutex, time::sleep};

pub mod backlog;
mod convert;

use backlog::Backlog;
use chatref_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{ChatSummary, MediaRef, Message},
    },
    Result,
};

/// Largest page `getUpdates` returns.
const UPDATES_PAGE: u8 = 100;

pub struct TelegramClient {
    bot: Bot,
    download_dir: PathBuf,
    backlog: Mutex<Backlog>,
}

impl TelegramClient {
    pub fn new(bot: Bot, download_dir: PathBuf) -> Self {
        Self {
            bot,
            download_dir,
            backlog: Mutex::new(Backlog::default()),
        }
    }

    pub fn from_token(token: &str, download_dir: PathBuf) -> Self {
        Self::new(Bot::new(token), download_dir)
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: RequestError) -> Error {
        match e {
            RequestError::Network(e) => Error::RemoteUnavailable(format!("telegram: {e}")),
            RequestError::Io(e) => Error::RemoteUnavailable(format!("telegram: {e}")),
            other => Error::External(format!("telegram error: {other}")),
        }
    }

    fn map_send_err(chat_id: ChatId, e: RequestError) -> Error {
        match e {
            RequestError::Api(
                ApiError::ChatNotFound
                | ApiError::UserNotFound
                | ApiError::BotBlocked
                | ApiError::BotKicked
                | ApiError::UserDeactivated
                | ApiError::CantInitiateConversation,
            ) => Error::InvalidPeer(format!("cannot send to chat {chat_id}")),
            other => Self::map_err(other),
        }
    }

    fn map_resolve_err(handle: &str, e: RequestError) -> Error {
        match e {
            RequestError::Api(ApiError::ChatNotFound | ApiError::UserNotFound) => {
                Error::UnknownPeer(handle.to_string())
            }
            other => Self::map_err(other),
        }
    }

    async fn with_retry<T, Fut>(
        &self,
        map: impl Fn(RequestError) -> Error,
        mut op: impl FnMut() -> Fut,
    ) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    RequestError::RetryAfter(wait) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        tracing::debug!(?wait, "rate limited, retrying");
                        sleep(wait).await;
                        continue;
                    }
                    other => return Err(map(other)),
                },
            }
        }
    }

    /// Read the pending updates without passing an offset. Telegram only
    /// drops updates once a later offset confirms them, so other consumers of
    /// the same bot still receive everything.
    async fn load_backlog(&self) -> Result<Backlog> {
        let updates = self
            .with_retry(Self::map_err, || {
                self.bot.get_updates().limit(UPDATES_PAGE).timeout(0)
            })
            .await?;

        if updates.len() >= UPDATES_PAGE as usize {
            tracing::warn!(
                pending = updates.len(),
                "update backlog is full; only the oldest pending updates are visible"
            );
        }

        let mut backlog = Backlog::default();
        for update in &updates {
            index_update(&mut backlog, update);
        }
        Ok(backlog)
    }

    async fn ensure_loaded(&self) -> Result<tokio::sync::MutexGuard<'_, Backlog>> {
        let mut guard = self.backlog.lock().await;
        if guard.is_empty() {
            *guard = self.load_backlog().await?;
        }
        Ok(guard)
    }
}

fn index_update(backlog: &mut Backlog, update: &Update) {
    let msg = match &update.kind {
        UpdateKind::Message(m)
        | UpdateKind::EditedMessage(m)
        | UpdateKind::ChannelPost(m)
        | UpdateKind::EditedChannelPost(m) => m,
        _ => return,
    };

    backlog.insert(convert::chat_summary(&msg.chat), convert::message(msg));
    if let Some(target) = msg.reply_to_message() {
        backlog.insert_reply_target(convert::message(target));
    }
}

#[async_trait]
impl MessagingPort for TelegramClient {
    async fn connect(&self) -> Result<()> {
        let me = self.with_retry(Self::map_err, || self.bot.get_me()).await?;
        tracing::debug!(bot = %me.username(), "connected to telegram");

        let backlog = self.load_backlog().await?;
        tracing::debug!(empty = backlog.is_empty(), "update backlog loaded");
        *self.backlog.lock().await = backlog;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.backlog.lock().await.clear();
        Ok(())
    }

    async fn list_recent_chats(&self, limit: usize) -> Result<Vec<ChatSummary>> {
        Ok(self.ensure_loaded().await?.recent_chats(limit))
    }

    async fn resolve_handle(&self, handle: &str) -> Result<ChatId> {
        if let Some(id) = self.backlog.lock().await.find_username(handle) {
            return Ok(id);
        }

        let recipient = Recipient::ChannelUsername(format!("@{handle}"));
        let chat = self
            .with_retry(
                |e| Self::map_resolve_err(handle, e),
                || self.bot.get_chat(recipient.clone()),
            )
            .await?;
        Ok(ChatId(chat.id.0))
    }

    async fn fetch_history(&self, chat_id: ChatId, limit: usize) -> Result<Vec<Message>> {
        Ok(self.ensure_loaded().await?.history(chat_id, limit))
    }

    async fn fetch_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<Message> {
        self.ensure_loaded()
            .await?
            .get(chat_id, message_id)
            .ok_or(Error::MessageNotFound {
                chat_id,
                message_id,
            })
    }

    async fn download_media(&self, media: &MediaRef) -> Result<PathBuf> {
        let path = self.download_dir.join(convert::media_file_name(media));
        let cached = tokio::fs::try_exists(&path)
            .await
            .map_err(|source| Error::Storage {
                path: path.clone(),
                source,
            })?;
        if cached {
            return Ok(path);
        }

        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|source| Error::Storage {
                path: self.download_dir.clone(),
                source,
            })?;

        let file = self
            .with_retry(Self::map_err, || self.bot.get_file(media.file_id.clone()))
            .await?;

        let mut dst = tokio::fs::File::create(&path)
            .await
            .map_err(|source| Error::Storage {
                path: path.clone(),
                source,
            })?;
        if let Err(e) = self.bot.download_file(&file.path, &mut dst).await {
            drop(dst);
            let _ = tokio::fs::remove_file(&path).await;
            return Err(match e {
                DownloadError::Io(source) => Error::Storage { path, source },
                other => Error::RemoteUnavailable(format!("download failed: {other}")),
            });
        }

        tracing::debug!(path = %path.display(), "media downloaded");
        Ok(path)
    }

    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(
                |e| Self::map_send_err(chat_id, e),
                || self.bot.send_message(Self::tg_chat(chat_id), text.to_string()),
            )
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{io, time::Duration};

    use super::*;

    fn client() -> TelegramClient {
        TelegramClient::from_token("123:test", std::env::temp_dir().join("chatref-tg-tests"))
    }

    #[test]
    fn handle_lookup_misses_are_unknown_peers() {
        for api in [ApiError::ChatNotFound, ApiError::UserNotFound] {
            let err = TelegramClient::map_resolve_err("ghost", RequestError::Api(api));
            assert!(matches!(err, Error::UnknownPeer(ref h) if h == "ghost"));
        }

        let err = TelegramClient::map_resolve_err(
            "ghost",
            RequestError::Api(ApiError::Unknown("Bad Request: whatever".to_string())),
        );
        assert!(matches!(err, Error::External(_)));
    }

    #[test]
    fn send_rejections_are_invalid_peers() {
        for api in [
            ApiError::ChatNotFound,
            ApiError::UserNotFound,
            ApiError::BotBlocked,
            ApiError::BotKicked,
            ApiError::UserDeactivated,
            ApiError::CantInitiateConversation,
        ] {
            let err = TelegramClient::map_send_err(ChatId(42), RequestError::Api(api));
            assert!(matches!(err, Error::InvalidPeer(ref m) if m.contains("42")));
        }
    }

    #[test]
    fn transport_failures_are_remote_unavailable() {
        let io_err = || io::Error::new(io::ErrorKind::ConnectionReset, "reset");

        assert!(matches!(
            TelegramClient::map_err(RequestError::Io(io_err())),
            Error::RemoteUnavailable(_)
        ));
        assert!(matches!(
            TelegramClient::map_send_err(ChatId(1), RequestError::Io(io_err())),
            Error::RemoteUnavailable(_)
        ));
        assert!(matches!(
            TelegramClient::map_resolve_err("h", RequestError::Io(io_err())),
            Error::RemoteUnavailable(_)
        ));
        assert!(matches!(
            TelegramClient::map_err(RequestError::MigrateToChatId(-100)),
            Error::External(_)
        ));
    }

    #[tokio::test]
    async fn retries_rate_limit_once() {
        let tg = client();
        let mut calls = 0usize;
        let res = tg
            .with_retry(TelegramClient::map_err, || {
                calls += 1;
                let out = if calls == 1 {
                    Err(RequestError::RetryAfter(Duration::from_millis(1)))
                } else {
                    Ok(7)
                };
                std::future::ready(out)
            })
            .await;
        assert_eq!(res.unwrap(), 7);
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn second_rate_limit_surfaces_error() {
        let tg = client();
        let mut calls = 0usize;
        let res: Result<()> = tg
            .with_retry(TelegramClient::map_err, || {
                calls += 1;
                std::future::ready(Err(RequestError::RetryAfter(Duration::from_millis(1))))
            })
            .await;
        assert!(matches!(res, Err(Error::External(_))));
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn download_cache_check_errors_are_storage_errors() {
        let blocker =
            std::env::temp_dir().join(format!("chatref-tg-blocker-{}", std::process::id()));
        std::fs::write(&blocker, b"not a directory").unwrap();

        let tg = TelegramClient::from_token("123:test", blocker.clone());
        let media = MediaRef {
            kind: chatref_core::messaging::types::MediaKind::Photo,
            file_id: "AgACphoto".to_string(),
        };
        let err = tg.download_media(&media).await.unwrap_err();
        match err {
            Error::Storage { path, .. } => assert_eq!(path, blocker.join("AgACphoto.jpg")),
            other => panic!("expected storage error, got {other:?}"),
        }

        let _ = std::fs::remove_file(&blocker);
    }
}
