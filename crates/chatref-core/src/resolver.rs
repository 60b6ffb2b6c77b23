//! Operator token -> chat id.
//!
//! Order, first match wins: tag, fingerprint (or prefix), raw integer, remote
//! handle lookup.

use crate::{
    domain::ChatId,
    errors::Error,
    messaging::port::MessagingPort,
    store::{find_by_prefix, HashTable, PrefixMatch, TagTable},
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolvedVia {
    Tag,
    Fingerprint,
    Numeric,
    Handle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolved {
    pub chat_id: ChatId,
    pub via: ResolvedVia,
}

/// Result of the offline part of resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocalResolution {
    Found(Resolved),
    /// Not known locally; the cleaned-up handle must be looked up remotely.
    NeedsLookup(String),
}

pub struct Resolver<'a> {
    hashes: &'a HashTable,
    tags: &'a TagTable,
}

impl<'a> Resolver<'a> {
    pub fn new(hashes: &'a HashTable, tags: &'a TagTable) -> Self {
        Self { hashes, tags }
    }

    pub fn resolve_local(&self, token: &str) -> Result<LocalResolution> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::MissingChat);
        }

        if let Some(chat_id) = self.tags.get(token) {
            return Ok(found(*chat_id, ResolvedVia::Tag));
        }

        match find_by_prefix(self.hashes, token) {
            PrefixMatch::Unique(chat_id) => return Ok(found(chat_id, ResolvedVia::Fingerprint)),
            PrefixMatch::Ambiguous(candidates) => {
                return Err(Error::AmbiguousPrefix {
                    prefix: token.to_string(),
                    candidates: candidates
                        .into_iter()
                        .map(|(fp, chat_id)| format!("{} ({chat_id})", fp.short(12)))
                        .collect(),
                });
            }
            PrefixMatch::NotFound => {}
        }

        if looks_numeric(token) {
            return token
                .parse::<i64>()
                .map(|n| found(ChatId(n), ResolvedVia::Numeric))
                .map_err(|_| Error::InvalidIdentifier(format!("{token} is out of range for a chat id")));
        }

        Ok(LocalResolution::NeedsLookup(clean_handle(token)?))
    }

    pub async fn resolve(&self, token: &str, port: &dyn MessagingPort) -> Result<Resolved> {
        match self.resolve_local(token)? {
            LocalResolution::Found(resolved) => {
                tracing::debug!(token, chat_id = %resolved.chat_id, via = ?resolved.via, "resolved locally");
                Ok(resolved)
            }
            LocalResolution::NeedsLookup(handle) => {
                tracing::debug!(handle = %handle, "looking up handle remotely");
                let chat_id = port.resolve_handle(&handle).await?;
                Ok(Resolved {
                    chat_id,
                    via: ResolvedVia::Handle,
                })
            }
        }
    }
}

fn found(chat_id: ChatId, via: ResolvedVia) -> LocalResolution {
    LocalResolution::Found(Resolved { chat_id, via })
}

fn looks_numeric(token: &str) -> bool {
    let digits = token.strip_prefix('-').unwrap_or(token);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// Strip `@` / t.me link decoration and check the remaining handle.
fn clean_handle(token: &str) -> Result<String> {
    let mut handle = token;
    for prefix in ["https://", "http://"] {
        if let Some(rest) = handle.strip_prefix(prefix) {
            handle = rest;
        }
    }
    if let Some(rest) = handle.strip_prefix("t.me/") {
        handle = rest;
    }
    let handle = handle.trim_start_matches('@').trim_end_matches('/');

    if handle.is_empty() || !handle.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::InvalidIdentifier(format!(
            "'{token}' is not a tag, fingerprint, chat id or username"
        )));
    }
    Ok(handle.to_string())
}
