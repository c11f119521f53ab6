//! Durable key/value storage backing the client session.
//!
//! The session survives restarts by mirroring itself into a [`DurableStore`].
//! [`FileStore`] keeps entries in a JSON file; [`MemoryStore`] keeps them in
//! process and is what tests inject.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError, RwLock},
};

use anyhow::Context;
use tracing::warn;
use uuid::Uuid;

/// Key holding the JSON-serialized user.
pub const USER_KEY: &str = "user";
/// Key holding the raw bearer token.
pub const TOKEN_KEY: &str = "token";

pub trait DurableStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&self, key: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// Entries persisted as a flat JSON object.
///
/// Nothing is cached: every call reads the file, so several stores (or
/// processes) sharing one path see each other's writes. A write lands on
/// disk before it becomes visible to any reader.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Opens `path`. A missing or unreadable file reads as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> HashMap<String, String> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, path = %self.path.display(), "ignoring corrupt session file");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        }
    }

    fn flush(&self, entries: &HashMap<String, String>) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        let tmp = self.path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)
            .with_context(|| format!("write {}", tmp.display()))?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e).with_context(|| format!("replace {}", self.path.display()));
        }
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut HashMap<String, String>)) -> anyhow::Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.load();
        apply(&mut entries);
        self.flush(&entries)
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.load().remove(key)
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}
