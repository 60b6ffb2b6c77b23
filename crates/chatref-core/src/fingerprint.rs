//! Chat fingerprints: SHA-256 of the decimal chat id, lowercase hex.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::domain::ChatId;

/// Length of a full fingerprint in hex characters.
pub const FINGERPRINT_LEN: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap a key read back from the hash table.
    pub(crate) fn from_stored(key: String) -> Self {
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading `len` characters, for compact display.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub fn fingerprint(chat_id: ChatId) -> Fingerprint {
    let mut h = Sha256::new();
    h.update(chat_id.0.to_string().as_bytes());
    let digest = h.finalize();
    Fingerprint(to_hex(&digest))
}

/// Normalize `token` into something that can be matched against stored
/// fingerprints, or `None` if it cannot be a fingerprint prefix at all.
pub fn normalize_prefix(token: &str) -> Option<String> {
    let token = token.trim();
    if token.is_empty() || token.len() > FINGERPRINT_LEN {
        return None;
    }
    if !token.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(token.to_ascii_lowercase())
}

pub fn is_fingerprint_prefix(token: &str) -> bool {
    normalize_prefix(token).is_some()
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
