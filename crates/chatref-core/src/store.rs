//! Persistent identity tables.
//!
//! Two flat JSON files:
//! - hashes: fingerprint -> chat id. Accumulates; a save never drops a key that
//!   is already on disk, and the on-disk value wins on conflict.
//! - tags: tag -> chat id. Authoritative per save; the file is replaced whole.
//!
//! There is no locking. Two processes saving hashes at the same time can still
//! lose an update; the additive merge only narrows the window.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{
    domain::ChatId,
    errors::Error,
    fingerprint::{fingerprint, normalize_prefix, Fingerprint},
    Result,
};

pub type HashTable = BTreeMap<String, ChatId>;
pub type TagTable = BTreeMap<String, ChatId>;

/// Outcome of a fingerprint prefix lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrefixMatch {
    Unique(ChatId),
    Ambiguous(Vec<(Fingerprint, ChatId)>),
    NotFound,
}

/// Older files stored ids as decimal strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredId {
    Number(i64),
    Text(String),
}

#[derive(Clone, Debug)]
pub struct IdentityStore {
    hashes_path: PathBuf,
    tags_path: PathBuf,
}

impl IdentityStore {
    pub fn new(hashes_path: PathBuf, tags_path: PathBuf) -> Self {
        Self {
            hashes_path,
            tags_path,
        }
    }

    pub fn hashes_path(&self) -> &Path {
        &self.hashes_path
    }

    pub fn tags_path(&self) -> &Path {
        &self.tags_path
    }

    /// Load the hash table, skipping entries whose key is not the fingerprint
    /// of their value. Skipped entries stay on disk untouched.
    pub fn load_hashes(&self) -> Result<HashTable> {
        let raw = read_table(&self.hashes_path)?;
        let (valid, skipped) = verify_hashes(raw);
        for key in &skipped {
            tracing::warn!(
                key = %key,
                path = %self.hashes_path.display(),
                "skipping hash entry that does not match its chat id"
            );
        }
        Ok(valid)
    }

    /// Merge `new_entries` into the on-disk table. Keys already on disk keep
    /// their stored value.
    pub fn save_hashes(&self, new_entries: &HashTable) -> Result<()> {
        let mut merged = read_table(&self.hashes_path)?;
        let before = merged.len();
        for (key, chat_id) in new_entries {
            merged.entry(key.clone()).or_insert(*chat_id);
        }
        tracing::info!(
            added = merged.len() - before,
            total = merged.len(),
            "saving chat hashes"
        );
        write_table(&self.hashes_path, &merged)
    }

    pub fn load_tags(&self) -> Result<TagTable> {
        read_table(&self.tags_path)
    }

    /// Replace the tag file with exactly `tags`.
    pub fn save_tags(&self, tags: &TagTable) -> Result<()> {
        write_table(&self.tags_path, tags)
    }
}

/// Record `chat_id` under its fingerprint. Returns the fingerprint.
pub fn insert_chat(table: &mut HashTable, chat_id: ChatId) -> Fingerprint {
    let fp = fingerprint(chat_id);
    table.insert(fp.as_str().to_string(), chat_id);
    fp
}

/// Split a raw table into entries that satisfy `key == fingerprint(value)` and
/// the keys that do not.
pub fn verify_hashes(raw: HashTable) -> (HashTable, Vec<String>) {
    let mut valid = HashTable::new();
    let mut skipped = Vec::new();
    for (key, chat_id) in raw {
        if fingerprint(chat_id).as_str() == key {
            valid.insert(key, chat_id);
        } else {
            skipped.push(key);
        }
    }
    (valid, skipped)
}

/// Find the stored fingerprints starting with `prefix`.
pub fn find_by_prefix(table: &HashTable, prefix: &str) -> PrefixMatch {
    let Some(prefix) = normalize_prefix(prefix) else {
        return PrefixMatch::NotFound;
    };

    if let Some(chat_id) = table.get(&prefix) {
        return PrefixMatch::Unique(*chat_id);
    }

    let candidates: Vec<(Fingerprint, ChatId)> = table
        .range(prefix.clone()..)
        .take_while(|(key, _)| key.starts_with(&prefix))
        .map(|(key, chat_id)| (Fingerprint::from_stored(key.clone()), *chat_id))
        .collect();

    let Some(&(_, first)) = candidates.first() else {
        return PrefixMatch::NotFound;
    };
    if candidates.iter().all(|(_, id)| *id == first) {
        PrefixMatch::Unique(first)
    } else {
        PrefixMatch::Ambiguous(candidates)
    }
}

fn read_table(path: &Path) -> Result<BTreeMap<String, ChatId>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(source) => {
            return Err(Error::Storage {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if contents.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let raw: BTreeMap<String, StoredId> =
        serde_json::from_str(&contents).map_err(|source| Error::CorruptState {
            path: path.to_path_buf(),
            source,
        })?;

    let mut table = BTreeMap::new();
    for (key, value) in raw {
        let chat_id = match value {
            StoredId::Number(n) => n,
            StoredId::Text(s) => s.trim().parse::<i64>().map_err(|_| Error::CorruptState {
                path: path.to_path_buf(),
                source: <serde_json::Error as serde::de::Error>::custom(format!(
                    "value for '{key}' is not a chat id: {s:?}"
                )),
            })?,
        };
        table.insert(key, ChatId(chat_id));
    }
    Ok(table)
}

fn write_table(path: &Path, table: &BTreeMap<String, ChatId>) -> Result<()> {
    let storage_err = |source: io::Error| Error::Storage {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            ensure_dir(parent).map_err(storage_err)?;
        }
    }

    let payload = serde_json::to_string_pretty(table).map_err(|source| Error::CorruptState {
        path: path.to_path_buf(),
        source,
    })?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, payload).map_err(storage_err)?;
    set_file_permissions(&tmp, 0o600).map_err(storage_err)?;
    fs::rename(&tmp, path).map_err(storage_err)?;
    Ok(())
}

fn ensure_dir(path: &Path) -> std::result::Result<(), io::Error> {
    fs::create_dir_all(path)?;
    set_dir_permissions(path, 0o700)?;
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path, mode: u32) -> std::result::Result<(), io::Error> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path, mode: u32) -> std::result::Result<(), io::Error> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path, _mode: u32) -> std::result::Result<(), io::Error> {
    Ok(())
}

#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path, _mode: u32) -> std::result::Result<(), io::Error> {
    Ok(())
}
