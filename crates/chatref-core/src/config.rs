use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{errors::Error, store::IdentityStore, Result};

/// Typed configuration, read from the environment (and `.env` if present).
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: Option<String>,

    pub data_dir: PathBuf,
    pub hashes_file: PathBuf,
    pub tags_file: PathBuf,
    pub download_dir: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_env()
    }

    fn from_env() -> Self {
        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").and_then(non_empty);

        let data_dir = env_path("CHATREF_DATA_DIR").unwrap_or_else(default_data_dir);
        let hashes_file =
            env_path("CHATREF_HASHES_FILE").unwrap_or_else(|| data_dir.join("chat_hashes.json"));
        let tags_file =
            env_path("CHATREF_TAGS_FILE").unwrap_or_else(|| data_dir.join("chat_tags.json"));
        let download_dir =
            env_path("CHATREF_DOWNLOAD_DIR").unwrap_or_else(|| data_dir.join("downloads"));

        Self {
            telegram_bot_token,
            data_dir,
            hashes_file,
            tags_file,
            download_dir,
        }
    }

    /// Token for commands that talk to Telegram.
    pub fn require_token(&self) -> Result<&str> {
        self.telegram_bot_token.as_deref().ok_or_else(|| {
            Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
        })
    }

    pub fn identity_store(&self) -> IdentityStore {
        IdentityStore::new(self.hashes_file.clone(), self.tags_file.clone())
    }
}

fn default_data_dir() -> PathBuf {
    let base = env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    base.join(".local").join("share").join("chatref")
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.trim().to_string())
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }
        out.push((key.to_string(), val));
    }
    out
}
